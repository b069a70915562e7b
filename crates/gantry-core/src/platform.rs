//! Target platform and python-version identifiers.
//!
//! A platform selects both the image tag (`<prefix>/<platform>`) and the
//! per-platform command overrides in a [`CommandMap`](crate::CommandMap).

use crate::error::{OrchestratorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of platforms this tool knows how to build images for.
///
/// Each entry must have a matching `dockerfiles/Dockerfile.<platform>`.
pub const KNOWN_PLATFORMS: &[&str] = &[
    "centos7",
    "centos8",
    "fedora34",
    "opensuse15",
    "debian11",
    "ubuntu2004",
];

/// A validated target platform identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Platform(String);

impl Platform {
    /// All known platforms, in declaration order.
    pub fn all() -> Vec<Platform> {
        KNOWN_PLATFORMS
            .iter()
            .map(|p| Platform(p.to_string()))
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Platform {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        if KNOWN_PLATFORMS.contains(&s) {
            Ok(Platform(s.to_string()))
        } else {
            Err(OrchestratorError::UnknownPlatform(s.to_string()))
        }
    }
}

impl TryFrom<String> for Platform {
    type Error = OrchestratorError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Platform> for String {
    fn from(p: Platform) -> String {
        p.0
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Python interpreter generation the test jobs run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PyVersion {
    Py2,
    Py3,
}

impl PyVersion {
    /// Interpreter executable name inside the container.
    pub fn interpreter(&self) -> &'static str {
        match self {
            PyVersion::Py2 => "python2",
            PyVersion::Py3 => "python3",
        }
    }

    /// Short tag used in job labels ("py2" / "py3").
    pub fn tag(&self) -> &'static str {
        match self {
            PyVersion::Py2 => "py2",
            PyVersion::Py3 => "py3",
        }
    }
}

impl FromStr for PyVersion {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "2" => Ok(PyVersion::Py2),
            "3" => Ok(PyVersion::Py3),
            other => Err(OrchestratorError::UnknownPyVersion(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_platform_parses() {
        let p: Platform = "centos7".parse().expect("centos7 is known");
        assert_eq!(p.as_str(), "centos7");
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let err = "slackware".parse::<Platform>().unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownPlatform(_)));
    }

    #[test]
    fn test_all_matches_known_set() {
        let all = Platform::all();
        assert_eq!(all.len(), KNOWN_PLATFORMS.len());
        assert_eq!(all[0].as_str(), "centos7");
    }

    #[test]
    fn test_pyversion_parse() {
        assert_eq!("2".parse::<PyVersion>().unwrap(), PyVersion::Py2);
        assert_eq!("3".parse::<PyVersion>().unwrap(), PyVersion::Py3);
        assert!("4".parse::<PyVersion>().is_err());
    }

    #[test]
    fn test_pyversion_interpreter() {
        assert_eq!(PyVersion::Py2.interpreter(), "python2");
        assert_eq!(PyVersion::Py3.tag(), "py3");
    }
}
