//! The resolve, fetch and verify pipeline.
//!
//! A run resolves the requested version, downloads the artifact, checks its
//! checksum, then checks the signatures of the artifact and of the checksum
//! file. The first fatal step ends the run. Companion files are deleted only
//! when the run succeeded and nobody was asked to verify anything by hand.
mod cleanup;

use std::{
    future::Future,
    path::{Path, PathBuf},
    pin::Pin,
};

use log::{debug, error, info, warn};
use tokio::sync::mpsc::UnboundedSender;

pub use cleanup::{CleanupObligation, Disposition};

use crate::{
    capabilities::Capabilities,
    checksum::ChecksumVerifier,
    config::Config,
    coordinate::{
        ArtifactCoordinate, ArtifactLocator, Companion, ResolvedArtifact, Version, VersionOrigin,
        VersionSpec,
    },
    error::PipelineError,
    resolver::VersionResolver,
    signature::{SignatureVerifier, SIGNATURE_EXTENSION},
    transport::{HttpTransport, Transport, TransportError},
    verification::{SkipReason, VerificationError, VerificationStatus},
};

/// What to install and where.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub coordinate: ArtifactCoordinate,
    /// Destination file, or a directory to place the canonical filename in.
    pub target: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticLevel {
    Detail,
    Info,
    Success,
    Warning,
    Error,
}

/// A message produced while running, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

/// Everything a caller needs to report on a finished run.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Where the artifact was (or would have been) written.
    pub primary_file: PathBuf,
    /// The located artifact, once resolution got that far.
    pub artifact: Option<ResolvedArtifact>,
    pub diagnostics: Vec<Diagnostic>,
    pub manual_verification_requested: bool,
    /// Companion files left on disk.
    pub preserved_files: Vec<PathBuf>,
    /// Where the artifact can be downloaded by hand.
    pub manual_download_url: String,
    /// The fatal error that ended the run, if any.
    pub error: Option<PipelineError>,
}

impl PipelineOutcome {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }
}

/// Per-run mutable state, kept off the pipeline so runs stay independent.
struct RunState {
    diagnostics: Vec<Diagnostic>,
    manual_verification_requested: bool,
    artifact: Option<ResolvedArtifact>,
    reporter: Option<UnboundedSender<Diagnostic>>,
}

impl RunState {
    fn new(reporter: Option<UnboundedSender<Diagnostic>>) -> Self {
        Self {
            diagnostics: Vec::new(),
            manual_verification_requested: false,
            artifact: None,
            reporter,
        }
    }

    fn report(&mut self, level: DiagnosticLevel, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            level,
            message: message.into(),
        };

        if let Some(reporter) = &self.reporter {
            // The display may already be gone; the outcome still has the message.
            let _ = reporter.send(diagnostic.clone());
        }
        self.diagnostics.push(diagnostic);
    }

    /// Records a skipped step, raising the manual verification flag when asked to.
    fn report_skip(&mut self, step: &str, reason: &SkipReason) {
        match reason {
            SkipReason::ToolUnavailable(reason) => {
                self.report(DiagnosticLevel::Warning, format!("Skipped {}, {}", step, reason))
            }
            SkipReason::ManualVerificationRequired { instructions } => {
                self.manual_verification_requested = true;
                self.report(
                    DiagnosticLevel::Warning,
                    format!("Could not complete {}. {}", step, instructions),
                );
            }
        }
    }
}

/// Produces a future per run that resolves when the run should be abandoned.
type InterruptSource = Box<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct Pipeline {
    transport: Box<dyn Transport>,
    resolver: VersionResolver,
    locator: ArtifactLocator,
    checksum: ChecksumVerifier,
    signature: Box<dyn SignatureVerifier>,
    reporter: Option<UnboundedSender<Diagnostic>>,
    interrupt: Option<InterruptSource>,
}

impl Pipeline {
    pub fn new(
        transport: Box<dyn Transport>,
        resolver: VersionResolver,
        locator: ArtifactLocator,
        checksum: ChecksumVerifier,
        signature: Box<dyn SignatureVerifier>,
    ) -> Self {
        Self {
            transport,
            resolver,
            locator,
            checksum,
            signature,
            reporter: None,
            interrupt: None,
        }
    }

    /// Builds a pipeline over HTTP, choosing verification strategies from
    /// what is available on this machine.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let capabilities = Capabilities::probe(config);

        Ok(Self::new(
            Box::new(HttpTransport::new(config.timeout())?),
            VersionResolver::new(&config.search_url, &config.subject),
            ArtifactLocator::new(&config.repository_url, &config.manual_download_url),
            capabilities.checksum_verifier(config),
            capabilities.signature_verifier(config),
        ))
    }

    /// Streams diagnostics to `reporter` as they are produced.
    pub fn with_reporter(mut self, reporter: UnboundedSender<Diagnostic>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Abandons a run as failed, preserving all files, once the future
    /// returned by `interrupt` resolves.
    pub fn with_interrupt<F, Fut>(mut self, interrupt: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.interrupt = Some(Box::new(move || Box::pin(interrupt())));
        self
    }

    pub async fn run(&self, request: &InstallRequest) -> PipelineOutcome {
        debug!("{:?}", request);
        let mut state = RunState::new(self.reporter.clone());
        let mut obligation = CleanupObligation::new();

        let result = {
            let steps = self.execute(request, &mut state, &mut obligation);
            let interrupted = async {
                match &self.interrupt {
                    Some(interrupt) => interrupt().await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                result = steps => result,
                _ = interrupted => {
                    warn!("Interrupted");
                    Err(PipelineError::Interrupted)
                }
            }
        };

        let disposition = if result.is_ok() && !state.manual_verification_requested {
            Disposition::Delete
        } else {
            Disposition::Preserve
        };
        let preserved_files = obligation.discharge(disposition);

        let primary_file = state
            .artifact
            .as_ref()
            .map(|artifact| artifact.local_path.clone())
            .unwrap_or_else(|| request.target.clone());

        match &result {
            Ok(()) => {
                info!("Installed {}", primary_file.display());
                state.report(
                    DiagnosticLevel::Success,
                    format!("Installed {}", primary_file.display()),
                );
            }
            Err(e) => {
                error!("{}", e);
                state.report(DiagnosticLevel::Error, e.to_string());
            }
        }

        if !preserved_files.is_empty() {
            let listing = preserved_files
                .iter()
                .map(|file| file.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            state.report(
                DiagnosticLevel::Warning,
                format!("Kept verification files for inspection: {}", listing),
            );
        }

        PipelineOutcome {
            primary_file,
            artifact: state.artifact,
            diagnostics: state.diagnostics,
            manual_verification_requested: state.manual_verification_requested,
            preserved_files,
            manual_download_url: self.locator.manual_download_url(&request.coordinate),
            error: result.err(),
        }
    }

    async fn execute(
        &self,
        request: &InstallRequest,
        state: &mut RunState,
        obligation: &mut CleanupObligation,
    ) -> Result<(), PipelineError> {
        let coordinate = &request.coordinate;
        let transport = self.transport.as_ref();

        let version = match &coordinate.version {
            VersionSpec::Latest => {
                state.report(
                    DiagnosticLevel::Info,
                    format!(
                        "Resolving the latest version of {}:{}",
                        coordinate.group, coordinate.id
                    ),
                );
                let resolved = self
                    .resolver
                    .resolve_latest(transport, &coordinate.group, &coordinate.id)
                    .await?;
                let version = Version::parse(&resolved, VersionOrigin::Resolved)?;
                state.report(
                    DiagnosticLevel::Detail,
                    format!("Latest version is {}", version),
                );
                version
            }
            VersionSpec::Exact(version) => Version::parse(version, VersionOrigin::Requested)?,
        };

        let resolved = coordinate.resolve(version);
        let target = if request.target.is_dir() {
            request.target.join(resolved.filename())
        } else {
            request.target.clone()
        };
        let artifact = self.locator.locate(&resolved, &target);
        state.artifact = Some(artifact.clone());

        state.report(
            DiagnosticLevel::Info,
            format!("Downloading {} to {}", resolved, target.display()),
        );
        state.report(DiagnosticLevel::Detail, artifact.url.clone());
        transport.fetch(&artifact.url, &artifact.local_path).await?;

        let checksum = self.checksum.companion(&artifact);
        obligation.register(&checksum.path);
        state.report(
            DiagnosticLevel::Info,
            format!("Verifying {} checksum", self.checksum.algorithm()),
        );
        let status = self.checksum.verify(transport, &artifact, &checksum).await?;
        match status {
            VerificationStatus::Passed => state.report(DiagnosticLevel::Success, "Checksum verified"),
            VerificationStatus::Skipped(reason) => {
                state.report_skip("checksum verification", &reason)
            }
            VerificationStatus::Failed(reason) => {
                return Err(VerificationError::ChecksumMismatch {
                    file: artifact.local_path.clone(),
                    reason,
                }
                .into());
            }
        }

        let signature = artifact.companion(SIGNATURE_EXTENSION);
        obligation.register(&signature.path);
        self.verify_signature(state, &artifact.local_path, &signature).await?;

        let checksum_signature = checksum.companion(SIGNATURE_EXTENSION);
        obligation.register(&checksum_signature.path);
        self.verify_signature(state, &checksum.path, &checksum_signature).await?;

        Ok(())
    }

    async fn verify_signature(
        &self,
        state: &mut RunState,
        signed: &Path,
        signature: &Companion,
    ) -> Result<(), PipelineError> {
        state.report(
            DiagnosticLevel::Info,
            format!("Verifying signature of {}", signed.display()),
        );
        debug!("Checking {} with {}", signature.url, self.signature.name());
        let status = self
            .signature
            .verify(self.transport.as_ref(), signed, signature)
            .await?;

        match status {
            VerificationStatus::Passed => {
                state.report(DiagnosticLevel::Success, "Signature verified");
                Ok(())
            }
            VerificationStatus::Skipped(reason) => {
                warn!("Signature of {} not verified, {}", signed.display(), reason);
                state.report_skip("signature verification", &reason);
                Ok(())
            }
            VerificationStatus::Failed(reason) => Err(VerificationError::BadSignature {
                file: signed.to_path_buf(),
                reason,
            }
            .into()),
        }
    }
}
