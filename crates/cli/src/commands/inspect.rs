use std::path::Path;
use std::process::ExitCode;

use colored::Colorize;
use eyre::WrapErr;
use idcheck_document::Certificate;

use crate::settings::Settings;

/// Show a certificate file and check it against the trusted root, if configured
pub(crate) fn inspect_command(settings: &Settings, cert_file: &Path) -> eyre::Result<ExitCode> {
    let bytes = std::fs::read(cert_file)
        .wrap_err_with(|| format!("failed to read {}", cert_file.display()))?;
    let cert = Certificate::from_bytes(&bytes)?;

    println!("Subject:     {}", cert.subject());
    println!("Issuer:      {}", cert.issuer());
    println!("Serial:      {}", cert.serial());
    println!("Not before:  {}", cert.not_before());
    println!("Not after:   {}", cert.not_after());
    println!("Algorithm:   {}", cert.signature_oid());
    println!("Fingerprint: {}", cert.fingerprint().to_string().bold());

    if settings.trusted_root.is_none() {
        println!("{}", "No trusted root configured, signature not checked".yellow());
        return Ok(ExitCode::SUCCESS);
    }

    let root = settings.load_trusted_root()?;
    if root.verify(&cert) {
        println!("{}", format!("Signed by {}", root.certificate().subject()).green());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{}", "NOT signed by the trusted root".red());
        Ok(ExitCode::FAILURE)
    }
}
