//! Remote sign exchange
//!
//! Uploads an unsigned artifact to the signing service as a single-part
//! `multipart/form-data` request and returns the signed replacement bytes.
//! The service decides the signing identity; the client sends nothing but
//! the file.

pub mod multipart;
pub mod transport;

pub use multipart::{FilePart, MultipartForm};
pub use transport::{SignResponse, SignTransport, UreqTransport};

use crate::candidate::Candidate;
use crate::config::SignerConfig;
use crate::error::WSError;
use std::fs;

/// Form field carrying the file, as expected by the signing service
pub const FILE_FIELD: &str = "file";

/// Client for the remote signing endpoint
pub struct RemoteSigner {
    endpoint_url: String,
    transport: Box<dyn SignTransport>,
}

impl RemoteSigner {
    /// Create a signer using the `ureq` transport configured from `config`
    pub fn new(config: &SignerConfig) -> Self {
        Self::with_transport(
            config.endpoint_url.clone(),
            Box::new(UreqTransport::from_config(config)),
        )
    }

    /// Create a signer with a caller-provided transport
    pub fn with_transport(endpoint_url: impl Into<String>, transport: Box<dyn SignTransport>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            transport,
        }
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Send `candidate` to the signing service and return the signed content
    ///
    /// # Errors
    /// - `IOError` if the candidate cannot be read
    /// - `TransportError` if no reply was obtained
    /// - `RemoteSignError` on a non-2xx status or an empty 2xx body
    pub fn sign(&self, candidate: &Candidate) -> Result<Vec<u8>, WSError> {
        let content = fs::read(candidate.path())?;
        self.sign_bytes(candidate.file_name(), content)
    }

    /// Send already-loaded file content to the signing service
    ///
    /// `file_name` is announced in the upload; the service may use it to pick
    /// the signing format.
    pub fn sign_bytes(&self, file_name: &str, content: Vec<u8>) -> Result<Vec<u8>, WSError> {
        let form = MultipartForm::new(FilePart::new(FILE_FIELD, file_name, content))?;

        let response = self.transport.post_form(&self.endpoint_url, &form)?;
        if !response.status.is_success() {
            return Err(WSError::RemoteSignError {
                status: response.status,
                empty_body: false,
            });
        }
        if response.body.is_empty() {
            return Err(WSError::RemoteSignError {
                status: response.status,
                empty_body: true,
            });
        }

        log::debug!(
            "{} signed {} via {}: {} bytes",
            self.endpoint_url,
            file_name,
            self.transport.name(),
            response.body.len()
        );
        Ok(response.body)
    }
}
