//! Artifact coordinates and their validation.
//!
//! A coordinate is the `GROUP:ARTIFACT:VERSION[:CLASSIFIER]` tuple naming a
//! single downloadable jar. Its version may be the `LATEST` sentinel until the
//! resolver replaces it with a concrete [`Version`].
pub mod locator;
pub mod version;

use std::{fmt::Display, str::FromStr};

pub use locator::{ArtifactLocator, Companion, ResolvedArtifact};
pub use version::{InvalidVersionError, Version, VersionOrigin, VersionSpec};

/// The delimiter separating the parts of a coordinate string.
const COORDINATE_DELIMITER: char = ':';

/// The classifier of runnable, self-contained jars.
pub const EXEC_CLASSIFIER: &str = "exec";

#[derive(Debug, thiserror::Error)]
pub enum CoordinateError {
    #[error("Invalid coordinate '{0}', expected GROUP:ARTIFACT:VERSION[:CLASSIFIER]")]
    InvalidFormat(String),

    #[error("Invalid coordinate '{coordinate}', the {part} must not be empty")]
    EmptyPart {
        coordinate: String,
        part: &'static str,
    },
}

/// A coordinate as requested, before its version has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCoordinate {
    pub group: String,
    pub id: String,
    pub version: VersionSpec,
    /// Empty when the artifact has no classifier.
    pub classifier: String,
}

impl ArtifactCoordinate {
    pub fn new(group: &str, id: &str, version: VersionSpec, classifier: &str) -> Self {
        Self {
            group: group.to_string(),
            id: id.to_string(),
            version,
            classifier: classifier.to_string(),
        }
    }

    /// Pins the coordinate to a validated version.
    pub fn resolve(&self, version: Version) -> ResolvedCoordinate {
        ResolvedCoordinate {
            group: self.group.clone(),
            id: self.id.clone(),
            version,
            classifier: self.classifier.clone(),
        }
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(COORDINATE_DELIMITER).collect();
        let (group, id, version, classifier) = match parts.as_slice() {
            [group, id, version] => (*group, *id, *version, ""),
            [group, id, version, classifier] => (*group, *id, *version, *classifier),
            _ => return Err(CoordinateError::InvalidFormat(s.to_string())),
        };

        for (part, value) in [("group", group), ("artifact", id), ("version", version)] {
            if value.is_empty() {
                return Err(CoordinateError::EmptyPart {
                    coordinate: s.to_string(),
                    part,
                });
            }
        }

        let version = match version.parse::<VersionSpec>() {
            Ok(version) => version,
            Err(never) => match never {},
        };

        Ok(Self::new(group, id, version, classifier))
    }
}

impl Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.id, self.version)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }

        Ok(())
    }
}

/// A coordinate whose version is concrete and well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCoordinate {
    pub group: String,
    pub id: String,
    pub version: Version,
    pub classifier: String,
}

impl ResolvedCoordinate {
    /// The repository path of the group, `io.zipkin.java` becoming `io/zipkin/java`.
    pub fn group_path(&self) -> String {
        self.group.replace('.', "/")
    }

    /// The canonical jar filename, `<id>-<version>[-<classifier>].jar`.
    pub fn filename(&self) -> String {
        if self.classifier.is_empty() {
            format!("{}-{}.jar", self.id, self.version)
        } else {
            format!("{}-{}-{}.jar", self.id, self.version, self.classifier)
        }
    }

    pub fn is_executable(&self) -> bool {
        self.classifier == EXEC_CLASSIFIER
    }
}

impl Display for ResolvedCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.id, self.version)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_coordinate() {
        let coordinate: ArtifactCoordinate =
            "io.zipkin.java:zipkin-server:2.4.5:exec".parse().unwrap();

        assert_eq!(coordinate.group, "io.zipkin.java");
        assert_eq!(coordinate.id, "zipkin-server");
        assert_eq!(coordinate.version, VersionSpec::Exact("2.4.5".to_string()));
        assert_eq!(coordinate.classifier, "exec");
    }

    #[test]
    fn test_parse_latest_any_case() {
        let coordinate: ArtifactCoordinate =
            "io.zipkin.java:zipkin-autoconfigure-collector-kafka:latest:module"
                .parse()
                .unwrap();

        assert_eq!(coordinate.version, VersionSpec::Latest);
        assert_eq!(coordinate.classifier, "module");
    }

    #[test]
    fn test_parse_without_classifier() {
        for input in ["io.zipkin.java:zipkin:2.4.5", "io.zipkin.java:zipkin:2.4.5:"] {
            let coordinate: ArtifactCoordinate = input.parse().unwrap();
            assert_eq!(coordinate.classifier, "");
        }
    }

    #[test]
    fn test_parse_rejects_wrong_part_count() {
        for input in ["", "io.zipkin.java", "io.zipkin.java:zipkin", "a:b:c:d:e"] {
            assert!(matches!(
                input.parse::<ArtifactCoordinate>(),
                Err(CoordinateError::InvalidFormat(_))
            ));
        }
    }

    #[test]
    fn test_parse_rejects_empty_parts() {
        let err = ":zipkin:1.0.0".parse::<ArtifactCoordinate>().unwrap_err();
        assert!(matches!(err, CoordinateError::EmptyPart { part: "group", .. }));

        let err = "io.zipkin::1.0.0".parse::<ArtifactCoordinate>().unwrap_err();
        assert!(matches!(err, CoordinateError::EmptyPart { part: "artifact", .. }));

        let err = "io.zipkin:zipkin::exec".parse::<ArtifactCoordinate>().unwrap_err();
        assert!(matches!(err, CoordinateError::EmptyPart { part: "version", .. }));
    }

    #[test]
    fn test_display_round_trips_the_input() {
        for input in [
            "io.zipkin.java:zipkin-server:2.4.5:exec",
            "io.zipkin.java:zipkin-server:LATEST:exec",
            "io.zipkin.java:zipkin:2.4.5",
        ] {
            let coordinate: ArtifactCoordinate = input.parse().unwrap();
            assert_eq!(coordinate.to_string(), input);
        }
    }

    #[test]
    fn test_resolved_filename_with_and_without_classifier() {
        let version = Version::parse("2.4.5", VersionOrigin::Requested).unwrap();
        let exec = ArtifactCoordinate::new(
            "io.zipkin.java",
            "zipkin-server",
            VersionSpec::Latest,
            "exec",
        )
        .resolve(version.clone());
        let plain =
            ArtifactCoordinate::new("io.zipkin.java", "zipkin", VersionSpec::Latest, "")
                .resolve(version);

        assert_eq!(exec.filename(), "zipkin-server-2.4.5-exec.jar");
        assert!(exec.is_executable());
        assert_eq!(plain.filename(), "zipkin-2.4.5.jar");
        assert!(!plain.is_executable());
        assert_eq!(plain.group_path(), "io/zipkin/java");
    }
}
