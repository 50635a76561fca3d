//! Audit logging for signing runs.
//!
//! Every artifact that goes through the signer produces a small trail of
//! structured events under the `winsign::audit` target, so release pipelines
//! can prove which files were sent to the signing service and what came back.
//!
//! # Usage
//!
//! ```rust,ignore
//! use winsign::audit::{self, AuditConfig, LogDestination};
//!
//! // Initialize audit logging (typically once at program start)
//! audit::init(AuditConfig {
//!     destination: LogDestination::File("sign-audit.jsonl".to_string()),
//!     ..Default::default()
//! })?;
//! ```
//!
//! # Event Types
//!
//! - `signing.attempt` - Artifact is about to be uploaded
//! - `signing.success` - Signed artifact replaced the original
//! - `signing.failure` - Signing failed, the run is aborted
//! - `signing.skipped` - Artifact was left untouched
//!
//! # JSON Output Example
//!
//! ```json
//! {
//!   "timestamp": "2026-01-04T20:00:00Z",
//!   "level": "INFO",
//!   "target": "winsign::audit",
//!   "event_type": "signing.success",
//!   "correlation_id": "0b6f4f3e-3c4e-4d0e-9d8f-5f1e0b7a2c11",
//!   "artifact": "target/app.exe",
//!   "artifact_hash": "sha256:e3b0c442...",
//!   "signed_hash": "sha256:9f86d081...",
//!   "elapsed_ms": 1834
//! }
//! ```

use crate::error::WSError;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::OnceLock;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

/// Global audit configuration state
static AUDIT_INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Audit log configuration
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Enable audit logging (default: true)
    pub enabled: bool,
    /// Log destination
    pub destination: LogDestination,
    /// Use JSON format (default: true)
    pub json_format: bool,
    /// Log level filter (default: "winsign::audit=info")
    pub filter: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            destination: LogDestination::Stderr,
            json_format: true,
            filter: "winsign::audit=info".to_string(),
        }
    }
}

/// Audit log destination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to stdout
    Stdout,
    /// Write to stderr (default)
    #[default]
    Stderr,
    /// Append to a file (path)
    File(String),
}

/// Initialize the audit logging subsystem.
///
/// This should be called once at program startup. Subsequent calls are ignored.
/// Fails only if the audit file cannot be opened.
pub fn init(config: AuditConfig) -> Result<(), WSError> {
    if AUDIT_INITIALIZED.get().is_some() {
        return Ok(());
    }

    if !config.enabled {
        let _ = AUDIT_INITIALIZED.set(true);
        return Ok(());
    }

    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.destination {
        LogDestination::Stdout => install(filter, config.json_format, std::io::stdout),
        LogDestination::Stderr => install(filter, config.json_format, std::io::stderr),
        LogDestination::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| {
                    WSError::InternalError(format!("Failed to open audit log file '{}': {}", path, e))
                })?;
            install(filter, config.json_format, std::sync::Mutex::new(file))
        }
    }

    let _ = AUDIT_INITIALIZED.set(true);
    Ok(())
}

fn install<W>(filter: EnvFilter, json_format: bool, writer: W)
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    if json_format {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_span_events(FmtSpan::NONE)
                    .with_writer(writer),
            )
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(writer))
            .try_init();
    }
}

/// Generate a new correlation ID tying together the events of one artifact.
pub fn new_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `sha256:<hex>` digest of `data`, as written into audit events.
pub fn artifact_hash(data: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(data)))
}

// ============================================================================
// Audit Event Functions
// ============================================================================

/// Log a signing attempt event.
pub fn log_signing_attempt(correlation_id: &str, artifact: &Path, artifact_hash: &str, endpoint: &str) {
    tracing::info!(
        target: "winsign::audit",
        event_type = "signing.attempt",
        correlation_id = correlation_id,
        artifact = %artifact.display(),
        artifact_hash = artifact_hash,
        endpoint = endpoint,
        "Signing operation initiated"
    );
}

/// Log a successful signing event.
pub fn log_signing_success(
    correlation_id: &str,
    artifact: &Path,
    artifact_hash: &str,
    signed_hash: &str,
    elapsed_ms: u64,
) {
    tracing::info!(
        target: "winsign::audit",
        event_type = "signing.success",
        correlation_id = correlation_id,
        artifact = %artifact.display(),
        artifact_hash = artifact_hash,
        signed_hash = signed_hash,
        elapsed_ms = elapsed_ms,
        "Signing operation completed successfully"
    );
}

/// Log a failed signing event.
pub fn log_signing_failure(correlation_id: &str, artifact: &Path, error: &WSError) {
    let safe_message = sanitize_error_message(&error.to_string());

    tracing::warn!(
        target: "winsign::audit",
        event_type = "signing.failure",
        correlation_id = correlation_id,
        artifact = %artifact.display(),
        error_type = error.kind(),
        error_message = %safe_message,
        "Signing operation failed"
    );
}

/// Log an artifact left untouched.
pub fn log_signing_skipped(artifact: &Path, reason: &str) {
    tracing::info!(
        target: "winsign::audit",
        event_type = "signing.skipped",
        artifact = %artifact.display(),
        reason = reason,
        "Artifact not signed"
    );
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Sanitize error messages to avoid leaking sensitive information.
fn sanitize_error_message(message: &str) -> String {
    let sanitized = message
        .split_whitespace()
        .map(|word| {
            if word.len() > 40 && word.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
            {
                "[REDACTED]"
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if sanitized.len() > 500 {
        let mut end = 497;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &sanitized[..end])
    } else {
        sanitized
    }
}
