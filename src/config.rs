//! Installer configuration.
//!
//! Every field has a default, so a configuration file only needs the keys
//! it wants to change. Command-line flags are applied on top of the file.
use std::{io::ErrorKind, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::checksum::ChecksumAlgorithm;

pub const DEFAULT_REPOSITORY_URL: &str = "https://jcenter.bintray.com";
pub const DEFAULT_SEARCH_URL: &str = "https://api.bintray.com/search/packages/maven";
pub const DEFAULT_SUBJECT: &str = "openzipkin";
pub const DEFAULT_MANUAL_DOWNLOAD_URL: &str = "https://search.maven.org/remote_content";
pub const DEFAULT_SIGNING_KEY_ID: &str = "D401AB61";
pub const DEFAULT_KEYSERVER: &str = "keyserver.ubuntu.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file {0} does not exist")]
    NotFound(PathBuf),

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration file {path}, {source}")]
    DeserializeError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration, {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the Maven-layout repository artifacts are downloaded from.
    pub repository_url: String,
    /// Registry search endpoint used to resolve `LATEST`.
    pub search_url: String,
    /// Organization that owns the packages in the registry.
    pub subject: String,
    /// Endpoint users are pointed at when the installer fails.
    pub manual_download_url: String,
    /// Identifier of the key artifacts are signed with.
    pub signing_key_id: String,
    /// Keyserver suggested for importing the signing key.
    pub keyserver: String,
    /// Timeout applied to every HTTP request.
    pub timeout_secs: u64,
    pub checksum_algorithm: ChecksumAlgorithm,
    pub verify_checksum: bool,
    pub verify_signature: bool,
    /// Explicit gpg binary, looked up in PATH when unset.
    pub gpg_path: Option<PathBuf>,
    /// Alternative gpg home directory holding the keyring.
    pub gpg_homedir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repository_url: DEFAULT_REPOSITORY_URL.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            manual_download_url: DEFAULT_MANUAL_DOWNLOAD_URL.to_string(),
            signing_key_id: DEFAULT_SIGNING_KEY_ID.to_string(),
            keyserver: DEFAULT_KEYSERVER.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            checksum_algorithm: ChecksumAlgorithm::default(),
            verify_checksum: true,
            verify_signature: true,
            gpg_path: None,
            gpg_homedir: None,
        }
    }
}

impl Config {
    /// Read a configuration from a TOML string.
    pub fn from_toml(s: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s).map_err(|source| ConfigError::DeserializeError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a TOML file.
    pub async fn from_file(filepath: &Path) -> Result<Self, ConfigError> {
        let contents = match tokio::fs::read_to_string(filepath).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(filepath.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        Self::from_toml(&contents, filepath)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        for (name, url) in [
            ("repository_url", &self.repository_url),
            ("search_url", &self.search_url),
            ("manual_download_url", &self.manual_download_url),
        ] {
            reqwest::Url::parse(url)
                .map_err(|e| ConfigError::Invalid(format!("{} '{}' is not a URL, {}", name, url, e)))?;
        }

        if self.signing_key_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "signing_key_id must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config = Config::from_toml("", Path::new("quickstart.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml(
            r#"
            repository_url = "https://repo1.maven.org/maven2"
            timeout_secs = 5
            checksum_algorithm = "sha1"
            verify_signature = false
            "#,
            Path::new("quickstart.toml"),
        )
        .unwrap();

        assert_eq!(config.repository_url, "https://repo1.maven.org/maven2");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.checksum_algorithm, ChecksumAlgorithm::SHA1);
        assert!(!config.verify_signature);
        assert!(config.verify_checksum);
        assert_eq!(config.subject, DEFAULT_SUBJECT);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = Config::from_toml("mirror = \"x\"", Path::new("quickstart.toml"));
        assert!(matches!(result, Err(ConfigError::DeserializeError { .. })));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result = Config::from_toml("timeout_secs = 0", Path::new("quickstart.toml"));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = Config::from_toml("search_url = \"not a url\"", Path::new("quickstart.toml"));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quickstart.toml");
        std::fs::write(&path, "subject = \"example\"\n").unwrap();

        let config = Config::from_file(&path).await.unwrap();
        assert_eq!(config.subject, "example");
    }

    #[tokio::test]
    async fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_file(&dir.path().join("absent.toml")).await;
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
