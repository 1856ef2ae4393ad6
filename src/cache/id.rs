//! 16-hex-character cache identity.

use rand::RngCore;

use crate::error::{Error, Result};

/// A stable, randomly generated identifier tying a role to its cache
/// directory across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheId(String);

impl CacheId {
    /// Generates a fresh id from a CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 8];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        let id = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self(id)
    }

    /// Parses and validates an existing id string (16 lowercase hex chars).
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() == 16 && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
            Ok(Self(s.to_string()))
        } else {
            Err(Error::InvalidCacheId(s.to_string()))
        }
    }

    /// The underlying string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
