use std::{fmt::Display, path::PathBuf};

/// Why a verification step did not run to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The local tooling for this step is missing or disabled.
    ToolUnavailable(String),
    /// The tool is present but the publisher key is not trusted locally, so
    /// the user has been asked to finish the check by hand.
    ManualVerificationRequired { instructions: String },
}

/// The result of one checksum or signature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Passed,
    Skipped(SkipReason),
    Failed(String),
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ToolUnavailable(reason) => write!(f, "{}", reason),
            SkipReason::ManualVerificationRequired { instructions } => {
                write!(f, "{}", instructions)
            }
        }
    }
}

/// A fatal checksum or signature mismatch.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Checksum verification of {} failed, {reason}", file.display())]
    ChecksumMismatch { file: PathBuf, reason: String },

    #[error("Signature verification of {} failed, {reason}", file.display())]
    BadSignature { file: PathBuf, reason: String },
}
