use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use super::{ArtifactCoordinate, ResolvedCoordinate};

/// Builds download URLs for coordinates against a Maven-layout repository.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    repository_url: String,
    manual_download_url: String,
}

/// An artifact whose download URL and local destination are fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub coordinate: ResolvedCoordinate,
    pub url: String,
    pub local_path: PathBuf,
}

/// A detached file published next to an artifact, such as `.md5` or `.asc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Companion {
    pub url: String,
    pub path: PathBuf,
}

impl ArtifactLocator {
    pub fn new(repository_url: &str, manual_download_url: &str) -> Self {
        Self {
            repository_url: repository_url.trim_end_matches('/').to_string(),
            manual_download_url: manual_download_url.to_string(),
        }
    }

    /// Composes `<repository>/<groupPath>/<id>/<version>/<filename>` for the
    /// coordinate and pairs it with `target` as the local destination.
    pub fn locate(&self, coordinate: &ResolvedCoordinate, target: &Path) -> ResolvedArtifact {
        let url = format!(
            "{}/{}/{}/{}/{}",
            self.repository_url,
            coordinate.group_path(),
            coordinate.id,
            coordinate.version,
            coordinate.filename()
        );

        ResolvedArtifact {
            coordinate: coordinate.clone(),
            url,
            local_path: target.to_path_buf(),
        }
    }

    /// A URL a user can open to download the artifact by hand.
    ///
    /// Works for unresolved coordinates too, since the endpoint understands
    /// the `LATEST` sentinel.
    pub fn manual_download_url(&self, coordinate: &ArtifactCoordinate) -> String {
        let version = coordinate.version.to_string();
        let mut params = vec![
            ("g", coordinate.group.as_str()),
            ("a", coordinate.id.as_str()),
            ("v", version.as_str()),
        ];
        if !coordinate.classifier.is_empty() {
            params.push(("c", coordinate.classifier.as_str()));
        }

        match reqwest::Url::parse_with_params(&self.manual_download_url, &params) {
            Ok(url) => url.to_string(),
            Err(_) => self.manual_download_url.clone(),
        }
    }
}

impl ResolvedArtifact {
    /// The companion published under `<url>.<suffix>`, stored at `<local_path>.<suffix>`.
    pub fn companion(&self, suffix: &str) -> Companion {
        Companion {
            url: format!("{}.{}", self.url, suffix),
            path: append_suffix(&self.local_path, suffix),
        }
    }
}

impl Companion {
    /// A companion of this companion, e.g. the `.md5.asc` signature of an `.md5` file.
    pub fn companion(&self, suffix: &str) -> Companion {
        Companion {
            url: format!("{}.{}", self.url, suffix),
            path: append_suffix(&self.path, suffix),
        }
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
