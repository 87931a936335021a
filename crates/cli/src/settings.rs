//! Settings file handling
//!
//! Values come from, lowest priority first: built-in defaults, the TOML file,
//! `IDCHECK_*` environment variables, then command line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{OptionExt, WrapErr};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use idcheck_apdu_transport_pcsc::PcscConfig;
use idcheck_document::{DEFAULT_SCAN_TIMEOUT, EngineConfig, TrustedRoot};
use serde::{Deserialize, Serialize};

/// Settings file read when `--config` is not given
pub(crate) const DEFAULT_CONFIG_FILE: &str = "idcheck.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    /// DER or PEM file holding the issuing authority's root certificate
    pub(crate) trusted_root: Option<PathBuf>,
    /// Only scan documents presented to this reader
    pub(crate) reader: Option<String>,
    /// Abort a scan this many seconds after the document was detected, 0 waits forever
    pub(crate) scan_timeout_secs: u64,
    /// Stop waiting for a document after this many seconds, 0 waits forever
    pub(crate) detection_timeout_secs: u64,
    /// Reader polling interval while waiting for a document
    pub(crate) poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            trusted_root: None,
            reader: None,
            scan_timeout_secs: DEFAULT_SCAN_TIMEOUT.as_secs(),
            detection_timeout_secs: 60,
            poll_interval_ms: 500,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from the default file if it exists
    pub(crate) fn load(path: Option<&Path>) -> eyre::Result<Self> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        if path.is_some() && !file.exists() {
            eyre::bail!("settings file {} not found", file.display());
        }

        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("IDCHECK_"))
            .extract()
            .wrap_err_with(|| format!("invalid settings in {}", file.display()))
    }

    pub(crate) fn scan_timeout(&self) -> Option<Duration> {
        (self.scan_timeout_secs > 0).then(|| Duration::from_secs(self.scan_timeout_secs))
    }

    pub(crate) fn detection_timeout(&self) -> Option<Duration> {
        (self.detection_timeout_secs > 0)
            .then(|| Duration::from_secs(self.detection_timeout_secs))
    }

    pub(crate) fn engine_config(&self) -> EngineConfig {
        EngineConfig::new()
            .with_scan_timeout(self.scan_timeout())
            .with_detection_timeout(self.detection_timeout())
    }

    /// The reader gives up on its own, so an abandoned worker always exits
    pub(crate) fn pcsc_config(&self) -> PcscConfig {
        let config = PcscConfig::new()
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_detection_timeout(self.detection_timeout());
        match &self.reader {
            Some(reader) => config.with_reader(reader.clone()),
            None => config,
        }
    }

    pub(crate) fn load_trusted_root(&self) -> eyre::Result<TrustedRoot> {
        let path = self
            .trusted_root
            .as_ref()
            .ok_or_eyre("no trusted root configured: pass --trusted-root or set trusted_root")?;
        TrustedRoot::load(path).wrap_err("failed to load trusted root")
    }
}
