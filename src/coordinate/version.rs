use std::{fmt::Display, str::FromStr};

/// The case-insensitive sentinel asking for the newest published version.
pub const LATEST: &str = "LATEST";

/// Where a version string came from, used only to phrase errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum VersionOrigin {
    #[strum(serialize = "requested")]
    Requested,
    #[strum(serialize = "resolved")]
    Resolved,
}

#[derive(Debug, thiserror::Error)]
#[error("The {origin} version '{version}' is not in MAJOR.MINOR.PATCH format")]
pub struct InvalidVersionError {
    pub version: String,
    pub origin: VersionOrigin,
}

/// Either a literal version or the `LATEST` sentinel, as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    Latest,
    Exact(String),
}

impl FromStr for VersionSpec {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(LATEST) {
            Ok(VersionSpec::Latest)
        } else {
            Ok(VersionSpec::Exact(s.to_string()))
        }
    }
}

impl Display for VersionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionSpec::Latest => write!(f, "{}", LATEST),
            VersionSpec::Exact(version) => write!(f, "{}", version),
        }
    }
}

/// A version string that is exactly three dot-separated non-negative integers.
///
/// The only way to obtain one is [`Version::parse`], so holding a `Version`
/// means the format has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    /// Validates `version` without any normalization.
    ///
    /// Leading zeros are kept as-is, while whitespace, a `v` prefix or a
    /// pre-release suffix are all rejected.
    pub fn parse(version: &str, origin: VersionOrigin) -> Result<Self, InvalidVersionError> {
        let mut parts = 0;
        let well_formed = version.split('.').all(|part| {
            parts += 1;
            !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
        });

        if well_formed && parts == 3 {
            Ok(Version(version.to_string()))
        } else {
            Err(InvalidVersionError {
                version: version.to_string(),
                origin,
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
