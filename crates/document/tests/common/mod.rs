//! Shared helpers: an in-memory document chip and generated certificate chains
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use idcheck_apdu_core::prelude::*;
use idcheck_document::{FileId, files};
use parking_lot::Mutex;
use rcgen::{
    BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, PKCS_ECDSA_P256_SHA256,
    SignatureAlgorithm,
};

/// Personal data stored on simulated documents
pub const PERSONAL_DATA: &[u8] = b"P<UTODOE<<JANE<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<";

/// Commands received by a simulated document, shared with the test
pub type CommandLog = Arc<Mutex<Vec<Bytes>>>;

/// A chip answering SELECT and READ BINARY from an in-memory file map
#[derive(Debug, Default)]
pub struct SimulatedDocument {
    files: HashMap<FileId, Vec<u8>>,
    select_status: HashMap<FileId, StatusWord>,
    read_status: HashMap<FileId, StatusWord>,
    selected: Option<FileId>,
    removed_after: Option<usize>,
    delay: Option<Duration>,
    log: CommandLog,
}

impl SimulatedDocument {
    /// A document holding `certificate` and the default personal data
    pub fn new(certificate: &[u8]) -> Self {
        Self::default()
            .with_file(files::CERTIFICATE, certificate)
            .with_file(files::PERSONAL_DATA, PERSONAL_DATA)
    }

    pub fn with_file(mut self, id: FileId, contents: &[u8]) -> Self {
        self.files.insert(id, contents.to_vec());
        self
    }

    pub fn without_file(mut self, id: FileId) -> Self {
        self.files.remove(&id);
        self
    }

    /// Answer SELECT of `id` with `status`
    pub fn failing_select(mut self, id: FileId, status: StatusWord) -> Self {
        self.select_status.insert(id, status);
        self
    }

    /// Answer READ BINARY of `id` with `status`
    pub fn failing_read(mut self, id: FileId, status: StatusWord) -> Self {
        self.read_status.insert(id, status);
        self
    }

    /// Leave the field after answering `count` commands
    pub const fn removed_after(mut self, count: usize) -> Self {
        self.removed_after = Some(count);
        self
    }

    /// Stall every answer by `delay`
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle on the commands received so far
    pub fn log(&self) -> CommandLog {
        Arc::clone(&self.log)
    }

    fn answer(&mut self, command: &Command) -> Vec<u8> {
        let status = match command.ins {
            0xA4 => self.select(command),
            0xB0 => match self.read(command) {
                Ok(mut payload) => {
                    payload.extend_from_slice(&[0x90, 0x00]);
                    return payload;
                }
                Err(status) => status,
            },
            _ => status::INVALID_INSTRUCTION,
        };
        vec![status.sw1, status.sw2]
    }

    fn select(&mut self, command: &Command) -> StatusWord {
        let Some([group, file]) = command.data.as_deref().and_then(|d| <[u8; 2]>::try_from(d).ok())
        else {
            return status::WRONG_LENGTH;
        };
        let id = FileId::new(group, file);

        if let Some(status) = self.select_status.get(&id) {
            return *status;
        }
        if self.files.contains_key(&id) {
            self.selected = Some(id);
            status::SUCCESS
        } else {
            status::FILE_NOT_FOUND
        }
    }

    fn read(&self, command: &Command) -> Result<Vec<u8>, StatusWord> {
        let id = self.selected.ok_or(status::COMMAND_NOT_ALLOWED)?;
        if let Some(status) = self.read_status.get(&id) {
            return Err(*status);
        }

        let contents = &self.files[&id];
        let offset = usize::from(u16::from_be_bytes([command.p1, command.p2]));
        if offset > contents.len() {
            return Err(status::INCORRECT_P1P2);
        }
        let available = &contents[offset..];
        let wanted = match command.le {
            Some(0) | None => available.len(),
            Some(le) => usize::from(le).min(available.len()),
        };
        Ok(available[..wanted].to_vec())
    }
}

impl CardTransport for SimulatedDocument {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let mut log = self.log.lock();
        if self.removed_after.is_some_and(|count| log.len() >= count) {
            return Err(TransportError::Removed);
        }
        log.push(Bytes::copy_from_slice(command));
        drop(log);

        let command = Command::from_bytes(command).map_err(|_| TransportError::Transmission)?;
        Ok(Bytes::from(self.answer(&command)))
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.selected = None;
        Ok(())
    }
}

/// Hands out one simulated document, then reports no further tags
#[derive(Debug)]
pub struct SimulatedTagSource {
    document: Option<SimulatedDocument>,
    detect_after: Duration,
}

impl SimulatedTagSource {
    pub const fn new(document: SimulatedDocument) -> Self {
        Self {
            document: Some(document),
            detect_after: Duration::ZERO,
        }
    }

    /// A source where no document is ever presented
    pub const fn empty() -> Self {
        Self {
            document: None,
            detect_after: Duration::ZERO,
        }
    }

    pub const fn detect_after(mut self, delay: Duration) -> Self {
        self.detect_after = delay;
        self
    }
}

impl TagSource for SimulatedTagSource {
    type Transport = SimulatedDocument;

    fn wait_for_tag(&mut self) -> Result<Self::Transport, TransportError> {
        std::thread::sleep(self.detect_after);
        self.document.take().ok_or(TransportError::Timeout)
    }
}

/// One physical card handed to several tag sources
#[derive(Debug, Clone)]
pub struct SharedDocument(Arc<Mutex<SimulatedDocument>>);

impl SharedDocument {
    pub fn new(document: SimulatedDocument) -> Self {
        Self(Arc::new(Mutex::new(document)))
    }

    /// A tag source presenting this card once
    pub fn source(&self) -> SharedTagSource {
        SharedTagSource(Some(self.clone()))
    }
}

impl CardTransport for SharedDocument {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.0.lock().do_transmit_raw(command)
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.0.lock().reset()
    }
}

/// Tag source over a [`SharedDocument`]
#[derive(Debug)]
pub struct SharedTagSource(Option<SharedDocument>);

impl TagSource for SharedTagSource {
    type Transport = SharedDocument;

    fn wait_for_tag(&mut self) -> Result<Self::Transport, TransportError> {
        self.0.take().ok_or(TransportError::Timeout)
    }
}

/// A trusted root and a document certificate it signed
#[derive(Debug, Clone)]
pub struct TestChain {
    pub root_der: Vec<u8>,
    pub root_pem: String,
    pub document_der: Vec<u8>,
}

impl TestChain {
    /// P-256 root signing a P-256 document certificate
    pub fn generate() -> Self {
        Self::generate_with(&PKCS_ECDSA_P256_SHA256, &PKCS_ECDSA_P256_SHA256)
    }

    pub fn generate_with(
        root_alg: &'static SignatureAlgorithm,
        document_alg: &'static SignatureAlgorithm,
    ) -> Self {
        let root_key = KeyPair::generate_for(root_alg).unwrap();
        let mut root_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        root_params
            .distinguished_name
            .push(DnType::CommonName, "Test Country Signing CA");
        root_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let root_cert = root_params.self_signed(&root_key).unwrap();

        let document_key = KeyPair::generate_for(document_alg).unwrap();
        let mut document_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        document_params
            .distinguished_name
            .push(DnType::CommonName, "Test Document Signer");
        let document_cert = document_params
            .signed_by(&document_key, &root_cert, &root_key)
            .unwrap();

        Self {
            root_der: root_cert.der().to_vec(),
            root_pem: root_cert.pem(),
            document_der: document_cert.der().to_vec(),
        }
    }

    pub fn root(&self) -> idcheck_document::TrustedRoot {
        idcheck_document::TrustedRoot::from_der(&self.root_der).unwrap()
    }

    pub fn authenticator(&self) -> idcheck_document::Authenticator {
        idcheck_document::Authenticator::new(self.root())
    }

    pub fn document(&self) -> SimulatedDocument {
        SimulatedDocument::new(&self.document_der)
    }

    /// SHA-256 of the document's SubjectPublicKeyInfo, computed independently
    pub fn expected_fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let (_, cert) = x509_parser::parse_x509_certificate(&self.document_der).unwrap();
        hex::encode_upper(Sha256::digest(cert.tbs_certificate.subject_pki.raw))
    }
}
