use super::multipart::MultipartForm;
use crate::config::SignerConfig;
use crate::error::{StatusLine, WSError};
use std::sync::Arc;
use std::time::Duration;

/// What the signing service sent back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignResponse {
    pub status: StatusLine,
    /// Complete response body; left empty for non-2xx replies
    pub body: Vec<u8>,
}

/// HTTP transport used to reach the signing service
///
/// Implementations perform exactly one request per call and never retry.
/// A non-2xx reply is returned as `Ok` with its status line so the caller can
/// decide; `Err` is reserved for failures where no reply was obtained.
pub trait SignTransport: Send + Sync {
    /// POST `form` to `url`
    fn post_form(&self, url: &str, form: &MultipartForm) -> Result<SignResponse, WSError>;

    /// Transport name for logging
    fn name(&self) -> &str;
}

impl<T: SignTransport + ?Sized> SignTransport for Arc<T> {
    fn post_form(&self, url: &str, form: &MultipartForm) -> Result<SignResponse, WSError> {
        (**self).post_form(url, form)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Blocking transport backed by a `ureq` agent
pub struct UreqTransport {
    client: ureq::Agent,
    max_response_size: u64,
}

impl UreqTransport {
    /// Create a transport whose every exchange is bounded by `timeout`
    pub fn new(timeout: Duration, max_response_size: u64) -> Self {
        // Return a Response for all status codes so the status line reaches the caller
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            client: agent,
            max_response_size,
        }
    }

    pub fn from_config(config: &SignerConfig) -> Self {
        Self::new(config.request_timeout, config.max_response_size)
    }
}

impl SignTransport for UreqTransport {
    fn post_form(&self, url: &str, form: &MultipartForm) -> Result<SignResponse, WSError> {
        let length = form.content_length();
        log::debug!(
            "Uploading {} ({} bytes) to {}",
            form.part().file_name,
            form.part().content.len(),
            url
        );

        // An explicit Content-Length keeps the streamed upload out of chunked encoding
        let mut body = form.reader();
        let response = self
            .client
            .post(url)
            .header("Content-Type", &form.content_type())
            .header("Content-Length", &length.to_string())
            .header("User-Agent", concat!("winsign/", env!("CARGO_PKG_VERSION")))
            .send(ureq::SendBody::from_reader(&mut body))
            .map_err(|e| WSError::TransportError(format!("Failed to send request to {}: {}", url, e)))?;

        // ureq does not keep the reason phrase, so only the code is reported
        let status = StatusLine::from_code(response.status().as_u16());
        if !status.is_success() {
            return Ok(SignResponse {
                status,
                body: Vec::new(),
            });
        }

        let mut response_body = response.into_body();
        let signed = response_body
            .with_config()
            .limit(self.max_response_size)
            .read_to_vec()
            .map_err(|e| WSError::TransportError(format!("Failed to read response body: {}", e)))?;

        Ok(SignResponse {
            status,
            body: signed,
        })
    }

    fn name(&self) -> &str {
        "ureq"
    }
}
