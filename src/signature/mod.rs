//! Detached signature verification.
//!
//! The [`SignatureVerifier`] trait is implemented by:
//!
//! - [`GpgVerifier`]: checks `.asc` signatures with the local `gpg` binary
//! - [`NoOpSignatureVerifier`]: used when `gpg` is unavailable or signature
//!   checks are disabled; every check is skipped
mod gpg;
mod noop;

use std::path::Path;

use async_trait::async_trait;

use crate::{
    coordinate::Companion,
    transport::{Transport, TransportError},
    verification::VerificationStatus,
};

pub use gpg::GpgVerifier;
pub use noop::NoOpSignatureVerifier;

/// The suffix of detached ASCII-armored signatures.
pub const SIGNATURE_EXTENSION: &str = "asc";

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to execute {tool}, {source}")]
    ToolFailure {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

/// Verifies a file against its detached signature.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Checks `signed` against the signature published at `signature.url`.
    ///
    /// Implementations that can check anything download the signature to
    /// `signature.path` first; implementations that cannot must not touch
    /// the network.
    async fn verify(
        &self,
        transport: &dyn Transport,
        signed: &Path,
        signature: &Companion,
    ) -> Result<VerificationStatus, SignatureError>;

    fn name(&self) -> &'static str;
}
