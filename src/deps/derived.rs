//! Derived worker package manifest (§4.4.8): a small declarative summary of
//! resolved collections, tool versions, and the pinned interpreter, handed
//! to the worker as a single base64-encoded environment variable.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;

use crate::error::Result;

use super::lock::Lock;

/// The worker-facing package manifest.
#[derive(Debug, Serialize)]
pub struct DerivedManifest {
    pub interpreter: String,
    pub collections: Vec<DerivedCollection>,
    pub tools: Vec<DerivedTool>,
}

/// A single resolved collection entry in the derived manifest.
#[derive(Debug, Serialize)]
pub struct DerivedCollection {
    pub name: String,
    pub version: String,
}

/// A single resolved tool entry in the derived manifest.
#[derive(Debug, Serialize)]
pub struct DerivedTool {
    pub name: String,
    pub constraint: String,
}

impl DerivedManifest {
    /// Builds the derived manifest from a resolved lock.
    pub fn from_lock(lock: &Lock) -> Self {
        Self {
            interpreter: lock.interpreter.pinned.clone(),
            collections: lock
                .collections
                .iter()
                .map(|c| DerivedCollection {
                    name: c.name.clone(),
                    version: if c.resolved_version.is_empty() {
                        c.constraint.clone()
                    } else {
                        c.resolved_version.clone()
                    },
                })
                .collect(),
            tools: lock
                .tools
                .iter()
                .map(|t| DerivedTool {
                    name: t.name.clone(),
                    constraint: t.constraint.clone(),
                })
                .collect(),
        }
    }

    /// Serializes to JSON and base64-encodes the result, matching the
    /// single-environment-variable worker contract.
    pub fn to_base64(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(BASE64.encode(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::lock::{CollectionEntry, ToolEntry};
    use crate::manifest::InterpreterSpec;
    use base64::Engine as _;

    #[test]
    fn encodes_to_valid_base64_json() {
        let lock = Lock::build(
            InterpreterSpec {
                min: "3.11".into(),
                max: "3.13".into(),
                pinned: "3.13".into(),
            },
            vec![ToolEntry {
                name: "runner".into(),
                constraint: ">=13.0.0".into(),
            }],
            vec![CollectionEntry {
                name: "community.docker".into(),
                constraint: ">=3.0.0".into(),
                resolved_version: "3.1.0".into(),
            }],
            vec![],
        );

        let derived = DerivedManifest::from_lock(&lock);
        let encoded = derived.to_base64().unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(&encoded).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(value["interpreter"], "3.13");
        assert_eq!(value["collections"][0]["version"], "3.1.0");
    }
}
