//! Interpreter version identifiers.

use crate::bundler::{Error, Result};
use std::fmt;

/// A pyenv version identifier such as `3.9.1`, `3.12-dev` or `pypy3.9-7.3.9`.
///
/// The identifier becomes a directory name under `<pyenv root>/versions`, so
/// only characters that are safe in a single path component are accepted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct PythonVersion(String);

impl PythonVersion {
    /// Validates and wraps a version identifier.
    pub fn parse(version: &str) -> Result<Self> {
        let version = version.trim();
        let invalid = |reason| Error::InvalidPythonVersion {
            version: version.to_string(),
            reason,
        };

        if version.is_empty() {
            return Err(invalid("version cannot be empty"));
        }
        if version == "." || version == ".." {
            return Err(invalid("version cannot be a relative path component"));
        }
        if !version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'))
        {
            return Err(invalid(
                "only ASCII letters, digits, '.', '-', '_' and '+' are allowed",
            ));
        }

        Ok(Self(version.to_string()))
    }

    /// Returns the identifier as passed to pyenv.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PythonVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_pyenv_identifiers() {
        for v in ["3.9.1", "3.12-dev", "pypy3.9-7.3.9", "miniconda3-4.7.12", "3.13.0t"] {
            assert_eq!(PythonVersion::parse(v).unwrap().as_str(), v);
        }
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(PythonVersion::parse(" 3.8.10\n").unwrap().as_str(), "3.8.10");
    }

    #[test]
    fn rejects_path_like_identifiers() {
        for v in ["", "..", ".", "3.9/../../etc", "3.9 1", "3.9\\1"] {
            assert!(
                matches!(
                    PythonVersion::parse(v),
                    Err(Error::InvalidPythonVersion { .. })
                ),
                "{v:?} should be rejected"
            );
        }
    }
}
