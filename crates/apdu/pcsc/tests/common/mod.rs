//! Common test utilities

use idcheck_apdu_transport_pcsc::{PcscConfig, PcscDeviceManager, PcscTransport};

/// Try to get a real reader with a card for tests
pub fn get_reader_with_card() -> Option<String> {
    let manager = PcscDeviceManager::new().ok()?;
    let readers = manager.list_readers().ok()?;

    readers
        .into_iter()
        .find(|r| r.has_card())
        .map(|r| r.name().to_string())
}

/// Try to get a real transport for tests
pub fn get_test_transport() -> Option<PcscTransport> {
    let manager = PcscDeviceManager::new().ok()?;
    let reader_name = get_reader_with_card()?;

    manager
        .open_reader_with_config(&reader_name, PcscConfig::default())
        .ok()
}
