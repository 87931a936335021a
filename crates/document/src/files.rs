//! Elementary files read from the document chip

use std::fmt;

/// Two-part identifier of an elementary file: (group, file)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    /// Group byte
    pub group: u8,
    /// File byte
    pub file: u8,
}

impl FileId {
    /// Create a file identifier
    pub const fn new(group: u8, file: u8) -> Self {
        Self { group, file }
    }

    /// The identifier as sent in the SELECT data field
    pub const fn to_bytes(self) -> [u8; 2] {
        [self.group, self.file]
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.group, self.file)
    }
}

/// Document signing certificate
pub const CERTIFICATE: FileId = FileId::new(0x01, 0x02);

/// Personal data record
pub const PERSONAL_DATA: FileId = FileId::new(0x02, 0x03);

/// Which record a read concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    /// The document certificate
    Certificate,
    /// The personal data block
    PersonalData,
}

impl Record {
    /// File holding this record
    pub const fn file_id(self) -> FileId {
        match self {
            Self::Certificate => CERTIFICATE,
            Self::PersonalData => PERSONAL_DATA,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Certificate => f.write_str("certificate"),
            Self::PersonalData => f.write_str("personal data"),
        }
    }
}
