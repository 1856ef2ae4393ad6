//! The lock file: resolved versions, pinned interpreter, and the content
//! hash that detects drift from the manifest (§4.4.5, §4.4.6).

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::manifest::InterpreterSpec;

/// Current lock file schema version.
pub const LOCK_SCHEMA_VERSION: u32 = 1;

/// A resolved tool entry: constraint as written plus the resolved version
/// (empty if unresolved due to a non-fatal network failure).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolEntry {
    pub name: String,
    pub constraint: String,
}

/// A resolved collection entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub name: String,
    pub constraint: String,
    pub resolved_version: String,
}

/// A resolved role entry. `name` is the unqualified role name (scenario
/// prefix stripped); `prefix` retains the scenario for routing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub prefix: String,
    pub name: String,
    pub constraint: String,
    pub resolved_version: String,
    pub src: String,
}

/// The lock file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lock {
    pub schema_version: u32,
    pub interpreter: InterpreterSpec,
    pub tools: Vec<ToolEntry>,
    pub collections: Vec<CollectionEntry>,
    pub roles: Vec<RoleEntry>,
    pub hash: String,
}

impl Lock {
    /// Builds a lock from already-sorted entries, computing and filling in
    /// the content hash.
    pub fn build(
        interpreter: InterpreterSpec,
        mut tools: Vec<ToolEntry>,
        mut collections: Vec<CollectionEntry>,
        mut roles: Vec<RoleEntry>,
    ) -> Self {
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        collections.sort_by(|a, b| a.name.cmp(&b.name));
        roles.sort_by(|a, b| a.name.cmp(&b.name));

        let hash = content_hash(&interpreter, &tools, &collections, &roles);

        Self {
            schema_version: LOCK_SCHEMA_VERSION,
            interpreter,
            tools,
            collections,
            roles,
            hash,
        }
    }

    /// Loads a lock file from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| Error::LockParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Saves the lock to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, content.as_bytes())?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Compares this lock's recorded hash to a freshly computed one over
    /// `other`'s inputs, reporting only the boolean — policy (what to print,
    /// what exit code) is the caller's job.
    pub fn is_stale_against(&self, freshly_resolved: &Lock) -> bool {
        self.hash != freshly_resolved.hash
    }
}

/// Computes the SHA-256 content hash over the canonical line-oriented
/// serialization specified by §4.4.5, in this exact order: collections,
/// roles, tools, interpreter.
pub fn content_hash(
    interpreter: &InterpreterSpec,
    tools: &[ToolEntry],
    collections: &[CollectionEntry],
    roles: &[RoleEntry],
) -> String {
    let mut canonical = String::new();

    let mut sorted_collections = collections.to_vec();
    sorted_collections.sort_by(|a, b| a.name.cmp(&b.name));
    for c in &sorted_collections {
        let resolved_or_constraint = if c.resolved_version.is_empty() {
            &c.constraint
        } else {
            &c.resolved_version
        };
        canonical.push_str(&format!("collection:{}:{}\n", c.name, resolved_or_constraint));
    }

    let mut sorted_roles = roles.to_vec();
    sorted_roles.sort_by(|a, b| a.name.cmp(&b.name));
    for r in &sorted_roles {
        let resolved_or_constraint = if r.resolved_version.is_empty() {
            &r.constraint
        } else {
            &r.resolved_version
        };
        canonical.push_str(&format!(
            "role:{}:{}:{}:{}\n",
            r.prefix, r.name, resolved_or_constraint, r.src
        ));
    }

    let mut sorted_tools = tools.to_vec();
    sorted_tools.sort_by(|a, b| a.name.cmp(&b.name));
    for t in &sorted_tools {
        canonical.push_str(&format!("tool:{}:{}\n", t.name, t.constraint));
    }

    canonical.push_str(&format!(
        "python:{}:{}:{}\n",
        interpreter.min, interpreter.max, interpreter.pinned
    ));

    let digest = Sha256::digest(canonical.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_interpreter() -> InterpreterSpec {
        InterpreterSpec {
            min: "3.11".into(),
            max: "3.13".into(),
            pinned: "3.13".into(),
        }
    }

    #[test]
    fn changing_any_single_field_changes_the_hash() {
        let base = Lock::build(
            sample_interpreter(),
            vec![ToolEntry {
                name: "runner".into(),
                constraint: ">=10.0.0".into(),
            }],
            vec![CollectionEntry {
                name: "community.docker".into(),
                constraint: ">=3.0.0".into(),
                resolved_version: "3.1.0".into(),
            }],
            vec![],
        );

        let mut changed_constraint = base.clone();
        changed_constraint.collections[0].constraint = ">=4.0.0".into();
        assert_ne!(
            content_hash(
                &changed_constraint.interpreter,
                &changed_constraint.tools,
                &changed_constraint.collections,
                &changed_constraint.roles
            ),
            base.hash
        );

        let mut changed_resolved = base.clone();
        changed_resolved.collections[0].resolved_version = "3.2.0".into();
        assert_ne!(
            content_hash(
                &changed_resolved.interpreter,
                &changed_resolved.tools,
                &changed_resolved.collections,
                &changed_resolved.roles
            ),
            base.hash
        );

        let mut changed_tool = base.clone();
        changed_tool.tools[0].constraint = ">=11.0.0".into();
        assert_ne!(
            content_hash(
                &changed_tool.interpreter,
                &changed_tool.tools,
                &changed_tool.collections,
                &changed_tool.roles
            ),
            base.hash
        );

        let mut changed_interpreter = base.clone();
        changed_interpreter.interpreter.pinned = "3.12".into();
        assert_ne!(
            content_hash(
                &changed_interpreter.interpreter,
                &changed_interpreter.tools,
                &changed_interpreter.collections,
                &changed_interpreter.roles
            ),
            base.hash
        );
    }

    #[test]
    fn hash_is_stable_under_input_permutation() {
        let collections_a = vec![
            CollectionEntry {
                name: "z.z".into(),
                constraint: ">=1.0.0".into(),
                resolved_version: "1.0.0".into(),
            },
            CollectionEntry {
                name: "a.a".into(),
                constraint: ">=1.0.0".into(),
                resolved_version: "1.0.0".into(),
            },
        ];
        let collections_b = {
            let mut v = collections_a.clone();
            v.reverse();
            v
        };

        let hash_a = content_hash(&sample_interpreter(), &[], &collections_a, &[]);
        let hash_b = content_hash(&sample_interpreter(), &[], &collections_b, &[]);
        assert_eq!(hash_a, hash_b);
    }

    #[test]
    fn building_twice_from_identical_inputs_is_idempotent() {
        let a = Lock::build(sample_interpreter(), vec![], vec![], vec![]);
        let b = Lock::build(sample_interpreter(), vec![], vec![], vec![]);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("molectl.lock.yml");
        let lock = Lock::build(
            sample_interpreter(),
            vec![ToolEntry {
                name: "runner".into(),
                constraint: ">=10.0.0".into(),
            }],
            vec![],
            vec![],
        );
        lock.save(&path).unwrap();
        let loaded = Lock::load(&path).unwrap();
        assert_eq!(loaded.hash, lock.hash);
    }
}
