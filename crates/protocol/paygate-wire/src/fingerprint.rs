//! Certificate fingerprints.
//!
//! A fingerprint is the thumbprint of a certificate: the uppercase hex SHA-1 of
//! its DER encoding when computed locally. Peers may send it in any case, so
//! equality and hashing ignore ASCII case while the original text is kept
//! verbatim. Re-serializing a received envelope must reproduce the exact bytes
//! the signer canonicalized.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A certificate thumbprint used as the trust-cache key.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Create a fingerprint from its textual form.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Create a fingerprint from raw digest bytes (uppercase hex).
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode_upper(digest))
    }

    /// The fingerprint exactly as received or computed.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Uppercase form, suitable for display and URLs.
    pub fn to_normalized(&self) -> String {
        self.0.to_ascii_uppercase()
    }

    /// Whether the fingerprint is empty or whitespace.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Fingerprint {}

impl Hash for Fingerprint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_uppercase());
        }
        state.write_usize(self.0.len());
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.trim()))
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_case_insensitive_equality() {
        let upper = Fingerprint::new("AB12CD");
        let lower = Fingerprint::new("ab12cd");
        assert_eq!(upper, lower);
        assert_ne!(upper, Fingerprint::new("AB12CE"));
    }

    #[test]
    fn test_hash_consistent_with_eq() {
        let mut map = HashMap::new();
        map.insert(Fingerprint::new("deadbeef"), 1);
        assert_eq!(map.get(&Fingerprint::new("DEADBEEF")), Some(&1));
    }

    #[test]
    fn test_original_text_preserved() {
        let fp = Fingerprint::new("deadBEEF");
        assert_eq!(fp.as_str(), "deadBEEF");
        assert_eq!(serde_json::to_string(&fp).unwrap(), r#""deadBEEF""#);
        assert_eq!(fp.to_normalized(), "DEADBEEF");
    }

    #[test]
    fn test_from_digest_is_uppercase_hex() {
        let fp = Fingerprint::from_digest(&[0x0a, 0xff, 0x10]);
        assert_eq!(fp.as_str(), "0AFF10");
    }

    #[test]
    fn test_parse_trims() {
        let fp: Fingerprint = "  AB  ".parse().unwrap();
        assert_eq!(fp.as_str(), "AB");
        assert!(Fingerprint::new("   ").is_empty());
    }
}
