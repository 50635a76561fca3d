//! Signing orchestration
//!
//! This module provides the main entry point for signing a build output
//! directory, orchestrating for each entry:
//! 1. Candidate selection (regular file, extension, eligibility policy)
//! 2. Sign exchange with the remote service
//! 3. Atomic replacement of the original with the signed output
//!
//! Files are handled one at a time. The first failure aborts the run; files
//! signed before it stay signed.

use crate::audit;
use crate::candidate::{self, AlwaysEligible, Candidate, EligibilityPolicy, Selection, SkipReason};
use crate::config::SignerConfig;
use crate::error::WSError;
use crate::remote::{RemoteSigner, SignTransport};
use crate::replace::replace_with_signed;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// A file that was replaced by its signed version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedArtifact {
    pub path: PathBuf,
    /// Size of the signed file
    pub size: u64,
    /// Wall-clock time spent on the exchange and the replacement
    pub elapsed: Duration,
}

/// A directory entry that was left untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedArtifact {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// What happened to a single path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Signed(SignedArtifact),
    Skipped(SkipReason),
}

/// Summary of a directory run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignReport {
    pub signed: Vec<SignedArtifact>,
    pub skipped: Vec<SkippedArtifact>,
}

impl SignReport {
    /// Entries skipped for the given reason
    pub fn skipped_for(&self, reason: SkipReason) -> impl Iterator<Item = &SkippedArtifact> {
        self.skipped.iter().filter(move |s| s.reason == reason)
    }

    pub fn total_elapsed(&self) -> Duration {
        self.signed.iter().map(|s| s.elapsed).sum()
    }
}

/// Signs the eligible files of a build output directory in place
pub struct Signer {
    config: SignerConfig,
    remote: RemoteSigner,
    policy: Box<dyn EligibilityPolicy>,
}

impl Signer {
    /// Create a signer talking to `config.endpoint_url` over HTTP
    ///
    /// # Example
    /// ```no_run
    /// use winsign::{Signer, SignerConfig};
    /// use std::path::Path;
    ///
    /// let signer = Signer::new(SignerConfig::new("http://signer.internal:31338/sign"))?;
    /// let report = signer.process_directory(Path::new("target/release"))?;
    /// println!("{} file(s) signed", report.signed.len());
    /// # Ok::<(), winsign::WSError>(())
    /// ```
    pub fn new(config: SignerConfig) -> Result<Self, WSError> {
        config.validate()?;
        let remote = RemoteSigner::new(&config);
        Ok(Self {
            config,
            remote,
            policy: Box::new(AlwaysEligible),
        })
    }

    /// Create a signer with a caller-provided transport
    pub fn with_transport(
        config: SignerConfig,
        transport: Box<dyn SignTransport>,
    ) -> Result<Self, WSError> {
        config.validate()?;
        let remote = RemoteSigner::with_transport(config.endpoint_url.clone(), transport);
        Ok(Self {
            config,
            remote,
            policy: Box::new(AlwaysEligible),
        })
    }

    /// Replace the eligibility policy (default: [`AlwaysEligible`])
    pub fn with_policy(mut self, policy: impl EligibilityPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn config(&self) -> &SignerConfig {
        &self.config
    }

    /// Sign every eligible file directly inside `dir`
    ///
    /// A path that is not a directory is treated as an empty build output.
    ///
    /// # Errors
    /// Listing failures are returned as-is. A failure on any file stops the
    /// run and is returned as `ArtifactError` naming that file.
    pub fn process_directory(&self, dir: &Path) -> Result<SignReport, WSError> {
        let mut report = SignReport::default();
        if !dir.is_dir() {
            log::warn!("{} is not a directory, nothing to sign", dir.display());
            return Ok(report);
        }

        let entries = candidate::list_entries(dir)?;
        log::debug!("Inspecting {} entries in {}", entries.len(), dir.display());

        for path in entries {
            match self.sign_file(&path)? {
                FileOutcome::Signed(artifact) => report.signed.push(artifact),
                FileOutcome::Skipped(reason) => report.skipped.push(SkippedArtifact { path, reason }),
            }
        }

        log::info!(
            "Signed {} file(s) in {}, skipped {}",
            report.signed.len(),
            dir.display(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Sign `path` if it is eligible
    ///
    /// # Errors
    /// Returns `ArtifactError` naming `path` when the exchange or the
    /// replacement fails. Skips are not errors.
    pub fn sign_file(&self, path: &Path) -> Result<FileOutcome, WSError> {
        let candidate =
            match candidate::select(path, &self.config.accepted_extension, self.policy.as_ref()) {
                Selection::Sign(candidate) => candidate,
                Selection::Skip(path, reason) => {
                    self.log_skip(&path, reason);
                    return Ok(FileOutcome::Skipped(reason));
                }
            };

        self.sign_candidate(&candidate)
            .map(FileOutcome::Signed)
            .map_err(|e| e.for_artifact(candidate.path()))
    }

    fn sign_candidate(&self, candidate: &Candidate) -> Result<SignedArtifact, WSError> {
        let start = Instant::now();
        let correlation_id = audit::new_correlation_id();
        let path = candidate.path();

        let content = fs::read(path)?;
        let unsigned_hash = audit::artifact_hash(&content);
        audit::log_signing_attempt(
            &correlation_id,
            path,
            &unsigned_hash,
            self.remote.endpoint_url(),
        );

        let signed = match self.exchange_and_replace(candidate, content) {
            Ok(signed) => signed,
            Err(e) => {
                audit::log_signing_failure(&correlation_id, path, &e);
                return Err(e);
            }
        };

        let elapsed = start.elapsed();
        audit::log_signing_success(
            &correlation_id,
            path,
            &unsigned_hash,
            &audit::artifact_hash(&signed),
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        );
        log::info!(
            "Signed {} in {:.1} seconds.",
            path.display(),
            elapsed.as_secs_f64()
        );

        Ok(SignedArtifact {
            path: path.to_path_buf(),
            size: signed.len() as u64,
            elapsed,
        })
    }

    fn exchange_and_replace(
        &self,
        candidate: &Candidate,
        content: Vec<u8>,
    ) -> Result<Vec<u8>, WSError> {
        let signed = self.remote.sign_bytes(candidate.file_name(), content)?;
        replace_with_signed(candidate.path(), &signed)?;
        Ok(signed)
    }

    fn log_skip(&self, path: &Path, reason: SkipReason) {
        match reason {
            SkipReason::NotAFile | SkipReason::Unreadable => {
                log::trace!("Skipping {}: {}", path.display(), reason);
            }
            SkipReason::WrongExtension => {
                log::debug!(
                    "Artifact extension is not ``{}'', the artifact is not signed {}",
                    self.config.accepted_extension,
                    path.display()
                );
                audit::log_signing_skipped(path, "wrong_extension");
            }
            SkipReason::Excluded => {
                log::info!(
                    "Signing of {} is disabled by policy, the artifact is not signed.",
                    path.display()
                );
                audit::log_signing_skipped(path, "excluded");
            }
        }
    }
}
