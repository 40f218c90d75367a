//! Whitespace-insensitive script signatures.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Normalized signature of a script, used only for equality and dedup.
///
/// Two scripts share a fingerprint when they differ only in blank lines or
/// in leading/trailing whitespace on individual lines.
///
/// # Examples
///
/// ```
/// use animatic_core::fingerprint;
///
/// let a = fingerprint("circle = Circle()\n\n   self.play(Create(circle))  \n");
/// let b = fingerprint("circle = Circle()\nself.play(Create(circle))");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The normalized text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the source contained no non-blank lines.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short hex digest for log fields, so scripts never land in logs verbatim.
    pub fn short(&self) -> String {
        let digest = format!("{:x}", Sha256::digest(self.0.as_bytes()));
        digest[..12].to_string()
    }
}

/// Compute the fingerprint of a script source.
///
/// Splits on line breaks, trims each line, drops empty lines and rejoins
/// with `\n`.
pub fn fingerprint(source: &str) -> Fingerprint {
    let normalized = source
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Fingerprint(normalized)
}
