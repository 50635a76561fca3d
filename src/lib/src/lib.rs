//! Sign build outputs through a remote HTTP signing service.

// `Signer::process_directory()` is what build integrations should call.
// The remote service owns the keys; this crate only selects files, uploads them and swaps the results into place.

#![forbid(unsafe_code)]

mod config;
mod error;
mod signer;

/// Candidate selection
///
/// Lists a build output directory and filters its entries by extension and
/// by a pluggable eligibility policy.
pub mod candidate;

/// Remote sign exchange
///
/// Multipart upload of one artifact to the signing service through an
/// injectable HTTP transport.
pub mod remote;

/// Atomic replacement of an artifact with its signed version
pub mod replace;

/// Structured audit events for signing runs
pub mod audit;

#[allow(unused_imports)]
pub use candidate::{AlwaysEligible, Candidate, EligibilityPolicy, SkipReason};
#[allow(unused_imports)]
pub use config::*;
#[allow(unused_imports)]
pub use error::*;
#[allow(unused_imports)]
pub use remote::{RemoteSigner, SignResponse, SignTransport, UreqTransport};
#[allow(unused_imports)]
pub use signer::*;

pub mod reexports {
    pub use {log, thiserror, ureq};
}
