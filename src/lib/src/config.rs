//! Configuration for the remote signer

use crate::error::WSError;
use std::env;
use std::time::Duration;

/// Environment variable holding the signing service URL
pub const ENV_URL: &str = "WINSIGN_URL";
/// Environment variable holding the request timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "WINSIGN_TIMEOUT_SECS";
/// Environment variable holding the accepted file extension
pub const ENV_EXTENSION: &str = "WINSIGN_EXTENSION";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_EXTENSION: &str = "exe";
pub const DEFAULT_MAX_RESPONSE_SIZE: u64 = 1024 * 1024 * 1024;

/// Configuration for signing a build output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerConfig {
    /// Signing service address, e.g. `http://signer.internal:31338/sign`
    pub endpoint_url: String,

    /// Upper bound on a single sign exchange (connect, upload and download)
    pub request_timeout: Duration,

    /// Extension of the files to sign, without the leading dot
    ///
    /// Matched case-sensitively against the suffix after the last `.`.
    pub accepted_extension: String,

    /// Largest signed response accepted, in bytes
    pub max_response_size: u64,
}

impl SignerConfig {
    /// Create a config for the given endpoint with default settings
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            accepted_extension: DEFAULT_EXTENSION.to_string(),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }

    /// Build a config from `WINSIGN_URL`, `WINSIGN_TIMEOUT_SECS` and `WINSIGN_EXTENSION`
    pub fn from_env() -> Result<Self, WSError> {
        let url = env::var(ENV_URL)
            .map_err(|_| WSError::InvalidConfig(format!("{} is not set", ENV_URL)))?;
        let mut config = Self::new(url);

        if let Ok(secs) = env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                WSError::InvalidConfig(format!("{} must be a number of seconds", ENV_TIMEOUT_SECS))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Ok(ext) = env::var(ENV_EXTENSION) {
            config.accepted_extension = ext;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_accepted_extension(mut self, extension: impl Into<String>) -> Self {
        self.accepted_extension = extension.into();
        self
    }

    pub fn with_max_response_size(mut self, limit: u64) -> Self {
        self.max_response_size = limit;
        self
    }

    /// Check that the config can drive a sign run
    pub fn validate(&self) -> Result<(), WSError> {
        let url = self.endpoint_url.trim();
        if url.is_empty() {
            return Err(WSError::InvalidConfig("endpoint URL is empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(WSError::InvalidConfig(format!(
                "endpoint URL must use http or https: {}",
                url
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(WSError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        if self.accepted_extension.is_empty() || self.accepted_extension.contains('.') {
            return Err(WSError::InvalidConfig(format!(
                "accepted extension must be a bare suffix such as \"exe\", got {:?}",
                self.accepted_extension
            )));
        }
        if self.max_response_size == 0 {
            return Err(WSError::InvalidConfig(
                "maximum response size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
