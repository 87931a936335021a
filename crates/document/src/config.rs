//! Engine configuration

use std::time::Duration;

/// Default bound on reading a presented document, from detection to result
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the scan worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Abort a scan whose document has not been read this long after it was
    /// detected (`None` waits forever)
    pub scan_timeout: Option<Duration>,

    /// Abort a scan if no document is presented within this long after the
    /// request (`None` waits until the tag source gives up)
    pub detection_timeout: Option<Duration>,

    /// Name given to scan worker threads
    pub worker_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scan_timeout: Some(DEFAULT_SCAN_TIMEOUT),
            detection_timeout: None,
            worker_name: "idcheck-scan".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan timeout
    pub const fn with_scan_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Set the bound on waiting for a document
    pub const fn with_detection_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.detection_timeout = timeout;
        self
    }

    /// Set the worker thread name
    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new();
        assert_eq!(config.scan_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.detection_timeout, None);

        let config = config
            .with_scan_timeout(None)
            .with_detection_timeout(Some(Duration::from_secs(60)))
            .with_worker_name("reader-1");
        assert_eq!(config.scan_timeout, None);
        assert_eq!(config.detection_timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.worker_name, "reader-1");
    }
}
