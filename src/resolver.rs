//! Resolution of the `LATEST` sentinel through the registry search API.
use log::{debug, info};
use serde::Deserialize;

use crate::transport::{Transport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("No package found for {group}:{id}")]
    NoPackage { group: String, id: String },

    #[error("Ambiguous result for {group}:{id}, the registry returned {count} packages where exactly one was expected")]
    Ambiguous {
        group: String,
        id: String,
        count: usize,
    },

    #[error("Malformed registry response for {group}:{id}, {reason}")]
    MalformedResponse {
        group: String,
        id: String,
        reason: String,
    },

    #[error("Invalid registry search URL {url}, {reason}")]
    InvalidSearchUrl { url: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A package entry from the registry search response.
///
/// Only the fields the installer reads are declared; everything else in the
/// payload is ignored.
#[derive(Debug, Deserialize)]
struct PackageSummary {
    #[serde(default)]
    name: Option<String>,
    latest_version: Option<String>,
}

/// Queries the registry search endpoint for the newest version of a package.
#[derive(Debug, Clone)]
pub struct VersionResolver {
    search_url: String,
    subject: String,
}

impl VersionResolver {
    pub fn new(search_url: &str, subject: &str) -> Self {
        Self {
            search_url: search_url.to_string(),
            subject: subject.to_string(),
        }
    }

    /// The search query for `group:id`, filtered by the maintaining subject.
    pub fn search_url(&self, group: &str, id: &str) -> Result<reqwest::Url, ResolutionError> {
        reqwest::Url::parse_with_params(
            &self.search_url,
            &[("g", group), ("a", id), ("subject", self.subject.as_str())],
        )
        .map_err(|e| ResolutionError::InvalidSearchUrl {
            url: self.search_url.clone(),
            reason: e.to_string(),
        })
    }

    /// Returns the latest version string of the single package matching `group:id`.
    ///
    /// The returned string is not validated here.
    pub async fn resolve_latest(
        &self,
        transport: &dyn Transport,
        group: &str,
        id: &str,
    ) -> Result<String, ResolutionError> {
        let url = self.search_url(group, id)?;
        info!("Resolving latest version of {}:{} via {}", group, id, url);

        let body = transport.fetch_text(url.as_str()).await?;
        let version = latest_version_from_response(&body, group, id)?;

        debug!("Resolved {}:{} to {}", group, id, version);
        Ok(version)
    }
}

/// Extracts `latest_version` from a search response holding exactly one package.
pub fn latest_version_from_response(
    body: &str,
    group: &str,
    id: &str,
) -> Result<String, ResolutionError> {
    let malformed = |reason: String| ResolutionError::MalformedResponse {
        group: group.to_string(),
        id: id.to_string(),
        reason,
    };

    let packages: Vec<PackageSummary> =
        serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;

    match packages.as_slice() {
        [] => Err(ResolutionError::NoPackage {
            group: group.to_string(),
            id: id.to_string(),
        }),
        [package] => {
            debug!("Matched package {:?}", package.name);
            package
                .latest_version
                .clone()
                .ok_or_else(|| malformed("package has no latest_version".to_string()))
        }
        _ => Err(ResolutionError::Ambiguous {
            group: group.to_string(),
            id: id.to_string(),
            count: packages.len(),
        }),
    }
}
