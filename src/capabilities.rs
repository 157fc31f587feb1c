//! Startup probing of optional local tooling.
//!
//! The pipeline never asks whether a tool exists; it is handed a strategy
//! chosen here, either the full implementation or its skipping fallback.
use std::path::PathBuf;

use log::{debug, warn};

use crate::{
    checksum::{ChecksumVerifier, DigestStrategy, LocalDigest, SkipDigest},
    config::Config,
    signature::{GpgVerifier, NoOpSignatureVerifier, SignatureVerifier},
};

/// Why a capability is not available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    Disabled,
    NotFound(String),
}

/// The optional capabilities found on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub digest: Result<(), Unavailable>,
    pub gpg: Result<PathBuf, Unavailable>,
}

impl Capabilities {
    pub fn probe(config: &Config) -> Self {
        let digest = if config.verify_checksum {
            Ok(())
        } else {
            Err(Unavailable::Disabled)
        };

        let gpg = if !config.verify_signature {
            Err(Unavailable::Disabled)
        } else if let Some(gpg_path) = &config.gpg_path {
            // `which` also rejects files without execute permission.
            match which::which(gpg_path) {
                Ok(_) => Ok(gpg_path.clone()),
                Err(_) => Err(Unavailable::NotFound(format!(
                    "configured gpg {} is not an executable file",
                    gpg_path.display()
                ))),
            }
        } else {
            which::which("gpg")
                .map_err(|_| Unavailable::NotFound("gpg not found in PATH".to_string()))
        };

        let capabilities = Self { digest, gpg };
        debug!("{:?}", capabilities);
        capabilities
    }

    pub fn checksum_verifier(&self, config: &Config) -> ChecksumVerifier {
        let strategy: Box<dyn DigestStrategy> = match &self.digest {
            Ok(()) => Box::new(LocalDigest::new(config.checksum_algorithm)),
            Err(_) => Box::new(SkipDigest::new("checksum verification is disabled")),
        };

        ChecksumVerifier::new(config.checksum_algorithm, strategy)
    }

    pub fn signature_verifier(&self, config: &Config) -> Box<dyn SignatureVerifier> {
        match &self.gpg {
            Ok(gpg_path) => Box::new(
                GpgVerifier::new(gpg_path.clone(), &config.signing_key_id, &config.keyserver)
                    .with_homedir(config.gpg_homedir.clone()),
            ),
            Err(Unavailable::Disabled) => Box::new(NoOpSignatureVerifier::new(
                "signature verification is disabled",
            )),
            Err(Unavailable::NotFound(reason)) => {
                warn!("Signature verification unavailable, {}", reason);
                Box::new(NoOpSignatureVerifier::new(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_capabilities() {
        let config = Config {
            verify_checksum: false,
            verify_signature: false,
            ..Config::default()
        };
        let capabilities = Capabilities::probe(&config);

        assert_eq!(capabilities.digest, Err(Unavailable::Disabled));
        assert_eq!(capabilities.gpg, Err(Unavailable::Disabled));
        assert_eq!(capabilities.signature_verifier(&config).name(), "noop");
    }

    #[test]
    fn test_missing_configured_gpg() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            gpg_path: Some(dir.path().join("gpg")),
            ..Config::default()
        };
        let capabilities = Capabilities::probe(&config);

        assert!(matches!(capabilities.gpg, Err(Unavailable::NotFound(_))));
        assert_eq!(capabilities.signature_verifier(&config).name(), "noop");
    }

    #[cfg(unix)]
    fn write_gpg(dir: &std::path::Path, mode: u32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let gpg_path = dir.join("gpg");
        std::fs::write(&gpg_path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&gpg_path, std::fs::Permissions::from_mode(mode)).unwrap();
        gpg_path
    }

    #[cfg(unix)]
    #[test]
    fn test_configured_gpg_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let gpg_path = write_gpg(dir.path(), 0o755);
        let config = Config {
            gpg_path: Some(gpg_path.clone()),
            ..Config::default()
        };
        let capabilities = Capabilities::probe(&config);

        assert_eq!(capabilities.gpg, Ok(gpg_path));
        assert_eq!(capabilities.signature_verifier(&config).name(), "gpg");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_configured_gpg_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            gpg_path: Some(write_gpg(dir.path(), 0o644)),
            ..Config::default()
        };
        let capabilities = Capabilities::probe(&config);

        assert!(matches!(capabilities.gpg, Err(Unavailable::NotFound(_))));
        assert_eq!(capabilities.signature_verifier(&config).name(), "noop");
    }

    #[test]
    fn test_checksum_verifier_follows_config() {
        let config = Config {
            checksum_algorithm: crate::checksum::ChecksumAlgorithm::SHA256,
            ..Config::default()
        };
        let verifier = Capabilities::probe(&config).checksum_verifier(&config);
        assert_eq!(verifier.algorithm(), crate::checksum::ChecksumAlgorithm::SHA256);
    }
}
