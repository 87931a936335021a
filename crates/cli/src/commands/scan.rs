use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use colored::Colorize;
use idcheck_apdu_transport_pcsc::PcscTagSource;
use idcheck_document::{
    Authenticator, KeyComparison, ScanEvent, ScanState, Scanner, SharedSession,
};
use tracing::info;

use crate::settings::Settings;

/// Scan one document, print its status and compare the printed key
pub(crate) fn scan_command(settings: &Settings, key: Option<String>) -> eyre::Result<ExitCode> {
    let root = settings.load_trusted_root()?;
    info!(root = %root.certificate().subject(), "Using trusted root");

    let source = PcscTagSource::new(settings.pcsc_config())?;
    let scanner = Scanner::new(Authenticator::new(root), settings.engine_config());

    println!("{}", "Hold the document against the reader...".cyan());
    let state = scanner.request_scan(source)?.wait_with(|event| {
        if let ScanEvent::TagDetected = event {
            println!("Document detected, reading...");
        }
    });

    let session = scanner.session();
    let verified = {
        let session = session.lock();
        let status = match &state {
            ScanState::Summarized => session.status().green(),
            ScanState::Errored(_) if session.fingerprint().is_some() => {
                session.status().yellow()
            }
            _ => session.status().red(),
        };
        println!("{status}");
        session.fingerprint().is_some()
    };

    if !verified {
        return Ok(ExitCode::FAILURE);
    }

    let comparison = compare_printed_key(&session, key, || {
        prompt("Key printed on the document (empty to skip): ")
    })?;
    if let Some(comparison) = comparison {
        match comparison {
            KeyComparison::Match => println!("{}", comparison.to_string().green()),
            _ => println!("{}", comparison.to_string().red()),
        }
    }

    Ok(exit_code(&state, comparison))
}

/// Compare `key`, or the key returned by `read_key`, with the session's fingerprint
///
/// The session stays unlocked while the key is read. An empty key skips the
/// comparison.
fn compare_printed_key(
    session: &SharedSession,
    key: Option<String>,
    read_key: impl FnOnce() -> io::Result<String>,
) -> io::Result<Option<KeyComparison>> {
    let key = match key {
        Some(key) => key,
        None => read_key()?,
    };
    if key.trim().is_empty() {
        return Ok(None);
    }

    let mut session = session.lock();
    session.enter_printed_key(key);
    Ok(Some(session.compare_key()))
}

fn exit_code(state: &ScanState, comparison: Option<KeyComparison>) -> ExitCode {
    let verified = matches!(state, ScanState::Summarized);
    if verified && comparison.is_none_or(KeyComparison::is_match) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn prompt(message: &str) -> io::Result<String> {
    print!("{message}");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use idcheck_document::{AuthenticationSession, Fingerprint, ScanReport};
    use parking_lot::Mutex;

    fn verified_session(fingerprint: Fingerprint) -> SharedSession {
        let mut session = AuthenticationSession::new();
        let generation = session.request_scan().unwrap();
        session.complete(
            generation,
            ScanReport {
                state: ScanState::Summarized,
                fingerprint: Some(fingerprint),
                subject: None,
                personal_data: None,
            },
        );
        Arc::new(Mutex::new(session))
    }

    #[test]
    fn test_session_unlocked_while_key_is_read() {
        let fingerprint = Fingerprint::of_public_key(b"document key");
        let session = verified_session(fingerprint);

        let comparison = compare_printed_key(&session, None, || {
            assert!(session.try_lock().is_some());
            Ok(fingerprint.to_hex().to_lowercase())
        })
        .unwrap();

        assert_eq!(comparison, Some(KeyComparison::Match));
        assert!(session.try_lock().is_some());
    }

    #[test]
    fn test_empty_key_skips_comparison() {
        let session = verified_session(Fingerprint::of_public_key(b"document key"));

        let comparison = compare_printed_key(&session, Some("  ".into()), || {
            unreachable!("key was given on the command line")
        })
        .unwrap();
        assert_eq!(comparison, None);

        let comparison =
            compare_printed_key(&session, Some("AB:CD".into()), || unreachable!()).unwrap();
        assert_eq!(comparison, Some(KeyComparison::Mismatch));
    }
}
