use crate::{
    checksum::ChecksumError,
    coordinate::InvalidVersionError,
    resolver::ResolutionError,
    signature::SignatureError,
    transport::TransportError,
    verification::VerificationError,
};

/// Fatal failures of an installer run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Resolution Error: {0}")]
    Resolution(ResolutionError),

    #[error("Invalid Version: {0}")]
    InvalidVersion(#[from] InvalidVersionError),

    #[error("Transport Error: {0}")]
    Transport(#[from] TransportError),

    #[error("Verification Error: {0}")]
    Verification(#[from] VerificationError),

    #[error("Checksum Error: {0}")]
    Checksum(ChecksumError),

    #[error("Signature Error: {0}")]
    Signature(SignatureError),

    #[error("Interrupted before the installation completed")]
    Interrupted,
}

impl From<ResolutionError> for PipelineError {
    fn from(error: ResolutionError) -> Self {
        match error {
            ResolutionError::Transport(error) => PipelineError::Transport(error),
            other => PipelineError::Resolution(other),
        }
    }
}

impl From<ChecksumError> for PipelineError {
    fn from(error: ChecksumError) -> Self {
        match error {
            ChecksumError::Transport(error) => PipelineError::Transport(error),
            other => PipelineError::Checksum(other),
        }
    }
}

impl From<SignatureError> for PipelineError {
    fn from(error: SignatureError) -> Self {
        match error {
            SignatureError::Transport(error) => PipelineError::Transport(error),
            other => PipelineError::Signature(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failures_surface_as_transport_errors() {
        let transport = || TransportError::Status {
            url: "https://repo.example.com/a.jar.md5".to_string(),
            status: 404,
        };

        for error in [
            PipelineError::from(ResolutionError::Transport(transport())),
            PipelineError::from(ChecksumError::Transport(transport())),
            PipelineError::from(SignatureError::Transport(transport())),
        ] {
            assert!(matches!(error, PipelineError::Transport(_)));
        }
    }

    #[test]
    fn test_resolution_errors_keep_their_kind() {
        let error = PipelineError::from(ResolutionError::NoPackage {
            group: "io.zipkin.java".to_string(),
            id: "zipkin-server".to_string(),
        });
        assert!(matches!(error, PipelineError::Resolution(_)));
        assert_eq!(
            error.to_string(),
            "Resolution Error: No package found for io.zipkin.java:zipkin-server"
        );
    }
}
