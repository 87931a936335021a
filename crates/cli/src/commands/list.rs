use std::process::ExitCode;

use colored::Colorize;
use idcheck_apdu_transport_pcsc::PcscDeviceManager;

/// List all available readers
pub(crate) fn list_command() -> eyre::Result<ExitCode> {
    let manager = PcscDeviceManager::new()?;
    let readers = manager.list_readers()?;

    if readers.is_empty() {
        println!("No readers found!");
        return Ok(ExitCode::FAILURE);
    }

    println!("Available readers:");
    for (i, reader) in readers.iter().enumerate() {
        let status = if reader.has_card() {
            "document present".green()
        } else {
            "no document".normal()
        };
        println!("{}. {} ({})", i + 1, reader.name().bold(), status);
    }

    Ok(ExitCode::SUCCESS)
}
