use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Opaque identifier naming one schema version of a data class,
/// e.g. `vnd.evispa.product.code.v1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionTag(String);

impl VersionTag {
    /// Builds a tag without checking it. Prefer `parse` for user input.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fails for tags `parse` would reject or rewrite, such as the ones built
    /// through `new` from untrusted text.
    pub fn check(&self) -> Result<(), VersionTagError> {
        if self.0.trim().is_empty() {
            return Err(VersionTagError::Empty);
        }
        if self.0.chars().any(char::is_whitespace) {
            return Err(VersionTagError::InvalidFormat(self.0.clone()));
        }
        Ok(())
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VersionTag {
    type Err = VersionTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = VersionTag(s.trim().to_string());
        tag.check().map_err(|error| match error {
            VersionTagError::InvalidFormat(_) => VersionTagError::InvalidFormat(s.to_string()),
            other => other,
        })?;
        Ok(tag)
    }
}

impl TryFrom<String> for VersionTag {
    type Error = VersionTagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionTag> for String {
    fn from(tag: VersionTag) -> Self {
        tag.0
    }
}

impl From<&str> for VersionTag {
    fn from(tag: &str) -> Self {
        VersionTag::new(tag)
    }
}

impl AsRef<str> for VersionTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for VersionTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum VersionTagError {
    #[error("Version tag cannot be empty")]
    Empty,

    #[error("Invalid version tag: {0:?}")]
    InvalidFormat(String),
}
