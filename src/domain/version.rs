use crate::error::{ReleaseError, Result};
use std::fmt;
use std::str::FromStr;

/// Semantic version representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Parse a strict `X.Y.Z` version string.
    ///
    /// Pre-release and build metadata suffixes are rejected, as are prefixes
    /// such as `v`.
    pub fn parse(input: &str) -> Result<Self> {
        let parsed = semver::Version::parse(input)
            .map_err(|_| ReleaseError::InvalidVersion(input.to_string()))?;

        if !parsed.pre.is_empty() || !parsed.build.is_empty() {
            return Err(ReleaseError::InvalidVersion(input.to_string()));
        }

        Ok(Version::new(parsed.major, parsed.minor, parsed.patch))
    }

    /// Bump version according to bump type.
    ///
    /// Fails with `VersionOverflow` when the bumped component is already at
    /// `u64::MAX`.
    pub fn bump(&self, bump_type: VersionBump) -> Result<Self> {
        let overflow = || ReleaseError::VersionOverflow {
            version: self.to_string(),
            bump: bump_type.name().to_string(),
        };

        Ok(match bump_type {
            VersionBump::Major => Version {
                major: self.major.checked_add(1).ok_or_else(overflow)?,
                minor: 0,
                patch: 0,
            },
            VersionBump::Minor => Version {
                major: self.major,
                minor: self.minor.checked_add(1).ok_or_else(overflow)?,
                patch: 0,
            },
            VersionBump::Patch => Version {
                major: self.major,
                minor: self.minor,
                patch: self.patch.checked_add(1).ok_or_else(overflow)?,
            },
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl serde::Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for Version {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

/// Relative version bump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBump {
    Major,
    Minor,
    Patch,
}

impl VersionBump {
    pub fn name(&self) -> &'static str {
        match self {
            VersionBump::Major => "major",
            VersionBump::Minor => "minor",
            VersionBump::Patch => "patch",
        }
    }
}

/// What the operator asked for: a relative bump or an explicit target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BumpRequest {
    Relative(VersionBump),
    /// Explicit target literal, validated by the planner
    Explicit(String),
}

impl FromStr for BumpRequest {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ReleaseError::InvalidVersion(s.to_string()));
        }

        Ok(match trimmed.to_lowercase().as_str() {
            "major" => BumpRequest::Relative(VersionBump::Major),
            "minor" => BumpRequest::Relative(VersionBump::Minor),
            "patch" => BumpRequest::Relative(VersionBump::Patch),
            _ => BumpRequest::Explicit(trimmed.to_string()),
        })
    }
}

impl fmt::Display for BumpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BumpRequest::Relative(bump) => write!(f, "{}", bump.name()),
            BumpRequest::Explicit(literal) => write!(f, "{}", literal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
    }

    #[test]
    fn test_version_parse_invalid() {
        assert!(Version::parse("1.2").is_err());
        assert!(Version::parse("1.2.3.4").is_err());
        assert!(Version::parse("v1.2.3").is_err());
        assert!(Version::parse("1.2.3-beta.1").is_err());
        assert!(Version::parse("1.2.3+build").is_err());
        assert!(Version::parse("").is_err());
        assert!(Version::parse("01.2.3").is_err());
    }

    #[test]
    fn test_version_ordering() {
        assert!(Version::new(1, 0, 0) > Version::new(0, 9, 9));
        assert!(Version::new(1, 2, 0) > Version::new(1, 1, 9));
        assert!(Version::new(1, 2, 4) > Version::new(1, 2, 3));
        assert_eq!(Version::new(1, 2, 3), Version::new(1, 2, 3));
    }

    #[test]
    fn test_version_bump_major() {
        let v = Version::new(1, 2, 3);
        assert_eq!(v.bump(VersionBump::Major).unwrap(), Version::new(2, 0, 0));
    }

    #[test]
    fn test_version_bump_minor() {
        let v = Version::new(1, 2, 3);
        assert_eq!(v.bump(VersionBump::Minor).unwrap(), Version::new(1, 3, 0));
    }

    #[test]
    fn test_version_bump_patch() {
        let v = Version::new(1, 2, 3);
        assert_eq!(v.bump(VersionBump::Patch).unwrap(), Version::new(1, 2, 4));
    }

    #[test]
    fn test_bump_always_increases() {
        let versions = [
            Version::new(0, 0, 0),
            Version::new(0, 1, 9),
            Version::new(3, 0, 12),
        ];
        for v in versions {
            for bump in [VersionBump::Major, VersionBump::Minor, VersionBump::Patch] {
                assert!(v.bump(bump).unwrap() > v);
            }
        }
    }

    #[test]
    fn test_bump_overflow_is_an_error() {
        let v = Version::new(1, 2, u64::MAX);
        let err = v.bump(VersionBump::Patch).unwrap_err();
        assert!(matches!(err, ReleaseError::VersionOverflow { .. }));

        // Components that reset are not affected
        assert_eq!(v.bump(VersionBump::Minor).unwrap(), Version::new(1, 3, 0));
        assert!(Version::new(u64::MAX, 0, 0).bump(VersionBump::Major).is_err());
        assert!(Version::new(0, u64::MAX, 0).bump(VersionBump::Minor).is_err());
    }

    #[test]
    fn test_version_display() {
        assert_eq!(Version::new(1, 2, 3).to_string(), "1.2.3");
    }

    #[test]
    fn test_bump_request_from_str() {
        assert_eq!(
            "minor".parse::<BumpRequest>().unwrap(),
            BumpRequest::Relative(VersionBump::Minor)
        );
        assert_eq!(
            "MAJOR".parse::<BumpRequest>().unwrap(),
            BumpRequest::Relative(VersionBump::Major)
        );
        assert_eq!(
            "2.0.0".parse::<BumpRequest>().unwrap(),
            BumpRequest::Explicit("2.0.0".to_string())
        );
        assert!("  ".parse::<BumpRequest>().is_err());
    }
}
