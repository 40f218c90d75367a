//! Script values.

use crate::{Fingerprint, fingerprint};
use serde::{Deserialize, Serialize};

/// Source text executed by the rendering toolchain.
///
/// Scripts are immutable. Repairs and regenerations always produce a new
/// `Script`; nothing edits one in place.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
#[display("{}", _0)]
pub struct Script(String);

impl Script {
    /// Wrap source text.
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// The raw source.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A new script with surrounding whitespace removed.
    pub fn trimmed(&self) -> Script {
        Script(self.0.trim().to_string())
    }

    /// Whether the script has no non-whitespace content.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Number of lines in the source.
    pub fn line_count(&self) -> usize {
        self.0.lines().count()
    }

    /// Whitespace-insensitive signature of this script.
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.0)
    }
}

impl From<String> for Script {
    fn from(source: String) -> Self {
        Self(source)
    }
}

impl From<&str> for Script {
    fn from(source: &str) -> Self {
        Self(source.to_string())
    }
}

impl AsRef<str> for Script {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
