use std::path::Path;

use async_trait::async_trait;
use log::{debug, info, warn};

use super::{Checksum, ChecksumAlgorithm, ChecksumError, ChecksumOptions, DEFAULT_CHUNK_SIZE};
use crate::{
    coordinate::{Companion, ResolvedArtifact},
    transport::Transport,
    verification::{SkipReason, VerificationStatus},
};

/// Compares a local file against a downloaded checksum file.
#[async_trait]
pub trait DigestStrategy: Send + Sync {
    async fn verify(
        &self,
        filepath: &Path,
        published: &Path,
    ) -> Result<VerificationStatus, ChecksumError>;

    fn name(&self) -> &'static str;
}

/// Computes the digest in-process.
pub struct LocalDigest {
    algorithm: ChecksumAlgorithm,
}

impl LocalDigest {
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        Self { algorithm }
    }
}

#[async_trait]
impl DigestStrategy for LocalDigest {
    async fn verify(
        &self,
        filepath: &Path,
        published: &Path,
    ) -> Result<VerificationStatus, ChecksumError> {
        let contents = tokio::fs::read_to_string(published).await?;
        let expected = Checksum::from_published(self.algorithm, &contents).ok_or_else(|| {
            ChecksumError::MalformedChecksumFile {
                path: published.display().to_string(),
                algorithm: self.algorithm,
            }
        })?;

        let actual = Checksum::from_file(ChecksumOptions {
            filepath: filepath.to_path_buf(),
            algorithm: self.algorithm,
            chunk_size: Some(DEFAULT_CHUNK_SIZE),
        })
        .await?;

        debug!("expected {}, computed {}", expected, actual);
        if actual == expected {
            Ok(VerificationStatus::Passed)
        } else {
            Ok(VerificationStatus::Failed(format!(
                "expected {} but computed {}",
                expected.digest, actual.digest
            )))
        }
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Used when digest checking is turned off; every check is skipped.
pub struct SkipDigest {
    reason: String,
}

impl SkipDigest {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl DigestStrategy for SkipDigest {
    async fn verify(
        &self,
        _filepath: &Path,
        _published: &Path,
    ) -> Result<VerificationStatus, ChecksumError> {
        Ok(VerificationStatus::Skipped(SkipReason::ToolUnavailable(
            self.reason.clone(),
        )))
    }

    fn name(&self) -> &'static str {
        "skip"
    }
}

/// Downloads the detached checksum of an artifact and checks it with the
/// selected [`DigestStrategy`].
pub struct ChecksumVerifier {
    algorithm: ChecksumAlgorithm,
    strategy: Box<dyn DigestStrategy>,
}

impl ChecksumVerifier {
    pub fn new(algorithm: ChecksumAlgorithm, strategy: Box<dyn DigestStrategy>) -> Self {
        Self {
            algorithm,
            strategy,
        }
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// The checksum file companion of `artifact`.
    pub fn companion(&self, artifact: &ResolvedArtifact) -> Companion {
        artifact.companion(self.algorithm.extension())
    }

    /// Fetches `companion` and checks `artifact` against it.
    ///
    /// The checksum file is downloaded even when the strategy skips the
    /// comparison, so it is available for manual checks and for its own
    /// signature verification.
    pub async fn verify(
        &self,
        transport: &dyn Transport,
        artifact: &ResolvedArtifact,
        companion: &Companion,
    ) -> Result<VerificationStatus, ChecksumError> {
        info!("Fetching {} checksum {}", self.algorithm, companion.url);
        transport.fetch(&companion.url, &companion.path).await?;

        let status = self
            .strategy
            .verify(&artifact.local_path, &companion.path)
            .await?;

        match &status {
            VerificationStatus::Passed => info!(
                "{} checksum of {} verified",
                self.algorithm,
                artifact.local_path.display()
            ),
            VerificationStatus::Skipped(reason) => warn!(
                "Skipping {} checksum verification ({}), {}",
                self.algorithm,
                self.strategy.name(),
                reason
            ),
            VerificationStatus::Failed(reason) => warn!(
                "{} checksum of {} does not match, {}",
                self.algorithm,
                artifact.local_path.display(),
                reason
            ),
        }

        Ok(status)
    }
}
