//! Deterministic identifiers for datasets and runs.
//!
//! Both are BLAKE3 digests rendered as hex, stable across builds and platforms.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Content hash of an assembled feature matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl From<blake3::Hash> for DatasetHash {
    fn from(hash: blake3::Hash) -> Self {
        Self(hash.to_hex().to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash of a pipeline configuration in canonical JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Hash any serializable config. Struct fields serialize in declaration
    /// order and maps should be `BTreeMap`, so the JSON is canonical.
    pub fn of<T: Serialize>(config: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(config)?;
        Ok(Self(blake3::hash(json.as_bytes()).to_hex().to_string()))
    }

    /// First 12 hex characters, for directory names and log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
