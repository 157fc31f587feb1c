use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    process::{Output, Stdio},
};

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::process::Command;

use super::{SignatureError, SignatureVerifier};
use crate::{
    coordinate::Companion,
    transport::Transport,
    verification::{SkipReason, VerificationStatus},
};

/// Verifies detached signatures with an external `gpg` binary.
///
/// Keys are never imported: when the publisher key is missing from the
/// keyring the check is handed back to the user with instructions.
pub struct GpgVerifier {
    binary_path: PathBuf,
    key_id: String,
    keyserver: String,
    homedir: Option<PathBuf>,
}

impl GpgVerifier {
    pub fn new(binary_path: PathBuf, key_id: &str, keyserver: &str) -> Self {
        Self {
            binary_path,
            key_id: key_id.to_string(),
            keyserver: keyserver.to_string(),
            homedir: None,
        }
    }

    /// Use `homedir` as the gpg home (keyring location) instead of the default.
    pub fn with_homedir(mut self, homedir: Option<PathBuf>) -> Self {
        self.homedir = homedir;
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary_path);
        command.arg("--batch").stdin(Stdio::null());
        if let Some(homedir) = &self.homedir {
            command.arg("--homedir").arg(homedir);
        }
        command
    }

    fn tool_failure(&self, source: std::io::Error) -> SignatureError {
        SignatureError::ToolFailure {
            tool: self.binary_path.display().to_string(),
            source,
        }
    }

    /// Whether the publisher key is present in the keyring.
    pub async fn has_key(&self) -> Result<bool, SignatureError> {
        let status = self
            .command()
            .arg("--list-keys")
            .arg(&self.key_id)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| self.tool_failure(e))?;

        debug!("gpg --list-keys {} exited with {}", self.key_id, status);
        Ok(status.success())
    }

    async fn verify_detached(
        &self,
        signature: &Path,
        signed: &Path,
    ) -> Result<Output, SignatureError> {
        self.command()
            .arg("--verify")
            .arg(signature)
            .arg(signed)
            .output()
            .await
            .map_err(|e| self.tool_failure(e))
    }

    /// What the user has to run to finish verification by hand.
    pub fn manual_instructions(&self, signed: &Path, signature: &Path) -> String {
        format!(
            "The signing key {key} is not in your gpg keyring. Import it with \
             `gpg --keyserver {keyserver} --recv-keys {key}`, check its fingerprint, \
             then run `gpg --verify {signature} {signed}`",
            key = self.key_id,
            keyserver = self.keyserver,
            signature = signature.display(),
            signed = signed.display(),
        )
    }
}

#[async_trait]
impl SignatureVerifier for GpgVerifier {
    async fn verify(
        &self,
        transport: &dyn Transport,
        signed: &Path,
        signature: &Companion,
    ) -> Result<VerificationStatus, SignatureError> {
        info!("Fetching signature {}", signature.url);
        transport.fetch(&signature.url, &signature.path).await?;

        let has_key = match self.has_key().await {
            Ok(has_key) => has_key,
            Err(SignatureError::ToolFailure { tool, source })
                if matches!(
                    source.kind(),
                    ErrorKind::NotFound | ErrorKind::PermissionDenied
                ) =>
            {
                warn!("Cannot run {}, {}", tool, source);
                return Ok(VerificationStatus::Skipped(SkipReason::ToolUnavailable(
                    format!("cannot run {}, {}", tool, source),
                )));
            }
            Err(e) => return Err(e),
        };

        if !has_key {
            warn!("Signing key {} is not in the gpg keyring", self.key_id);
            return Ok(VerificationStatus::Skipped(
                SkipReason::ManualVerificationRequired {
                    instructions: self.manual_instructions(signed, &signature.path),
                },
            ));
        }

        let output = self.verify_detached(&signature.path, signed).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("gpg --verify output: {}", stderr.trim());

        if output.status.success() {
            info!("Signature of {} verified", signed.display());
            Ok(VerificationStatus::Passed)
        } else {
            let reason = stderr
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .last()
                .unwrap_or("gpg reported a bad signature")
                .to_string();
            Ok(VerificationStatus::Failed(reason))
        }
    }

    fn name(&self) -> &'static str {
        "gpg"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::transport::HttpTransport;
    use std::{os::unix::fs::PermissionsExt, time::Duration};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY_ID: &str = "D401AB61";
    const KEYSERVER: &str = "keyserver.ubuntu.com";

    /// Writes a stand-in for gpg that answers `--list-keys` and `--verify`
    /// with the given exit codes.
    fn fake_gpg(dir: &Path, list_exit: i32, verify_exit: i32) -> PathBuf {
        let script = format!(
            "#!/bin/sh\n\
             for arg in \"$@\"; do\n\
               case \"$arg\" in\n\
                 --list-keys) exit {list_exit} ;;\n\
                 --verify)\n\
                   if [ {verify_exit} -eq 0 ]; then echo 'gpg: Good signature' >&2; \
                   else echo 'gpg: BAD signature from \"Publisher\"' >&2; fi\n\
                   exit {verify_exit} ;;\n\
               esac\n\
             done\n\
             exit 2\n"
        );
        let path = dir.join("gpg");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    async fn signature_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/out.jar.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("-----BEGIN PGP SIGNATURE-----"))
            .mount(&server)
            .await;
        server
    }

    async fn run(list_exit: i32, verify_exit: i32) -> (VerificationStatus, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let server = signature_server().await;
        let gpg = GpgVerifier::new(fake_gpg(dir.path(), list_exit, verify_exit), KEY_ID, KEYSERVER);
        let signed = dir.path().join("out.jar");
        std::fs::write(&signed, b"jar").unwrap();
        let companion = Companion {
            url: format!("{}/out.jar.asc", server.uri()),
            path: dir.path().join("out.jar.asc"),
        };
        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();

        let status = gpg.verify(&transport, &signed, &companion).await.unwrap();
        assert!(companion.path.exists());
        (status, dir)
    }

    #[tokio::test]
    async fn test_good_signature_passes() {
        let (status, _dir) = run(0, 0).await;
        assert_eq!(status, VerificationStatus::Passed);
    }

    #[tokio::test]
    async fn test_bad_signature_fails_with_gpg_message() {
        let (status, _dir) = run(0, 1).await;
        match status {
            VerificationStatus::Failed(reason) => assert!(reason.contains("BAD signature")),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_key_requests_manual_verification() {
        let (status, _dir) = run(2, 0).await;
        match status {
            VerificationStatus::Skipped(SkipReason::ManualVerificationRequired { instructions }) => {
                assert!(instructions.contains("--recv-keys D401AB61"));
                assert!(instructions.contains("out.jar.asc"));
            }
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_tool_failure() {
        let dir = tempfile::tempdir().unwrap();
        let gpg = GpgVerifier::new(dir.path().join("no-such-gpg"), KEY_ID, KEYSERVER);
        assert!(matches!(
            gpg.has_key().await,
            Err(SignatureError::ToolFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_unrunnable_binary_skips_verification() {
        let dir = tempfile::tempdir().unwrap();
        let server = signature_server().await;
        let binary_path = dir.path().join("gpg");
        std::fs::write(&binary_path, "").unwrap();
        std::fs::set_permissions(&binary_path, std::fs::Permissions::from_mode(0o644)).unwrap();
        let gpg = GpgVerifier::new(binary_path, KEY_ID, KEYSERVER);

        let signed = dir.path().join("out.jar");
        std::fs::write(&signed, b"jar").unwrap();
        let companion = Companion {
            url: format!("{}/out.jar.asc", server.uri()),
            path: dir.path().join("out.jar.asc"),
        };
        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();

        let status = gpg.verify(&transport, &signed, &companion).await.unwrap();
        assert!(matches!(
            status,
            VerificationStatus::Skipped(SkipReason::ToolUnavailable(_))
        ));
    }
}
