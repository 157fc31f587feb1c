//! HTTP transport used for every network request the installer makes.
//!
//! Each request is a single attempt with the configured timeout. Downloads are
//! streamed into a temporary file next to the destination and only moved over
//! it once the whole body has arrived, so a failed fetch never leaves a
//! truncated file behind.
use std::{path::Path, time::Duration};

use async_trait::async_trait;
use log::debug;
use tokio::io::AsyncWriteExt;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} timed out after {seconds} seconds")]
    Timeout { url: String, seconds: u64 },

    #[error("Request to {url} failed, {reason}")]
    Request { url: String, reason: String },

    #[error("Failed to write {path}, {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client, {0}")]
    Client(String),
}

/// The network primitive the rest of the installer builds on.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Downloads `url` to `destination`, replacing any existing file.
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), TransportError>;

    /// Downloads `url` and returns its body as text.
    async fn fetch_text(&self, url: &str) -> Result<String, TransportError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, TransportError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    fn request_error(&self, url: &str, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            TransportError::Request {
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), TransportError> {
        let write_error = |source: std::io::Error| TransportError::Write {
            path: destination.display().to_string(),
            source,
        };

        let mut response = self.get(url).await?;

        let directory = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staging = tempfile::NamedTempFile::new_in(directory).map_err(write_error)?;
        let mut file = tokio::fs::File::from_std(staging.reopen().map_err(write_error)?);

        let mut total_written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.request_error(url, e))?
        {
            file.write_all(&chunk).await.map_err(write_error)?;
            total_written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_error)?;
        file.sync_all().await.map_err(write_error)?;
        drop(file);

        staging
            .persist(destination)
            .map_err(|e| write_error(e.error))?;

        debug!("Wrote {} bytes to {}", total_written, destination.display());
        Ok(())
    }

    async fn fetch_text(&self, url: &str) -> Result<String, TransportError> {
        let response = self.get(url).await?;
        response.text().await.map_err(|e| self.request_error(url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> HttpTransport {
        HttpTransport::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_writes_body_to_destination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/artifact.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jar bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("out.jar");
        transport()
            .fetch(&format!("{}/artifact.jar", server.uri()), &destination)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"jar bytes");
    }

    #[tokio::test]
    async fn test_fetch_overwrites_existing_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/artifact.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("out.jar");
        std::fs::write(&destination, b"old and longer content").unwrap();

        transport()
            .fetch(&format!("{}/artifact.jar", server.uri()), &destination)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_fetch_not_found_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.jar"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("out.jar");
        let err = transport()
            .fetch(&format!("{}/missing.jar", server.uri()), &destination)
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Status { status: 404, .. }));
        assert!(!destination.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow.jar"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();
        let err = transport
            .fetch(&format!("{}/slow.jar", server.uri()), &dir.path().join("out.jar"))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_fetch_into_missing_directory_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("missing").join("out.jar");
        let err = transport()
            .fetch(&format!("{}/a.jar", server.uri()), &destination)
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Write { .. }));
    }

    #[tokio::test]
    async fn test_fetch_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let body = transport()
            .fetch_text(&format!("{}/search", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_fetch_text_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = transport()
            .fetch_text(&format!("{}/search", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 503, .. }));
    }
}
