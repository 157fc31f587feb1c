use std::path::Path;

use async_trait::async_trait;

use super::{SignatureError, SignatureVerifier};
use crate::{
    coordinate::Companion,
    transport::Transport,
    verification::{SkipReason, VerificationStatus},
};

/// Signature verifier used when no signature tool can be used.
///
/// Every verification is reported as skipped with the configured reason and
/// nothing is downloaded.
pub struct NoOpSignatureVerifier {
    reason: String,
}

impl NoOpSignatureVerifier {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl SignatureVerifier for NoOpSignatureVerifier {
    async fn verify(
        &self,
        _transport: &dyn Transport,
        _signed: &Path,
        _signature: &Companion,
    ) -> Result<VerificationStatus, SignatureError> {
        Ok(VerificationStatus::Skipped(SkipReason::ToolUnavailable(
            self.reason.clone(),
        )))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
