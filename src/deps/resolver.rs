//! Orchestrates merge → per-entity resolution with the index → git →
//! literal fallback chain (§4.4.3), producing the sorted lists the lock
//! hash is computed over. Never aborts on a network failure; only
//! validation/parse errors (§4.4.7) are fatal.

use futures::future::join_all;
use semver::Version;
use tracing::warn;

use crate::error::Result;
use crate::manifest::{CollectionRequirement, Manifest, RoleRequirement, SourceKind};

use super::compat;
use super::constraint::{Constraint, RoleRef};
use super::git_client;
use super::index_client::IndexClient;
use super::lock::{CollectionEntry, Lock, RoleEntry, ToolEntry};
use super::merge::{self, RequirementsDescriptor, RoleMeta};

/// Resolves every dependency in `manifest` against the merged inputs and
/// returns a fully built [`Lock`]. Resolution failures are logged and leave
/// `resolved_version` empty rather than aborting; validation failures
/// (disallowed interpreter, empty names) propagate as errors.
pub async fn resolve(
    manifest: &Manifest,
    meta: &RoleMeta,
    requirements: &RequirementsDescriptor,
    index: &IndexClient,
) -> Result<Lock> {
    manifest.validate()?;

    let pinned = compat::validate_interpreter(&manifest.dependencies.interpreter.pinned)?;
    let mut interpreter = manifest.dependencies.interpreter.clone();
    interpreter.pinned = pinned.clone();

    let (adjusted_tools, _warnings) = compat::adjust_all(&manifest.dependencies.tools, &pinned);
    let tools = vec![
        ToolEntry {
            name: "runner".into(),
            constraint: adjusted_tools.runner,
        },
        ToolEntry {
            name: "linter".into(),
            constraint: adjusted_tools.linter,
        },
        ToolEntry {
            name: "lint_yaml".into(),
            constraint: adjusted_tools.lint_yaml,
        },
        ToolEntry {
            name: "test_harness".into(),
            constraint: adjusted_tools.test_harness,
        },
    ]
    .into_iter()
    .filter(|t| !t.constraint.is_empty())
    .collect();

    let merged_collections = merge::merge_collections(meta, requirements, &manifest.dependencies.collections);
    let merged_roles = merge::merge_roles(requirements, &manifest.dependencies.roles);

    let collection_futures = merged_collections
        .iter()
        .map(|c| resolve_collection(c, index));
    let collections = join_all(collection_futures).await;

    let role_futures = merged_roles.iter().map(resolve_role);
    let roles = join_all(role_futures).await;

    Ok(Lock::build(interpreter, tools, collections, roles))
}

async fn resolve_collection(req: &CollectionRequirement, index: &IndexClient) -> CollectionEntry {
    let constraint = Constraint::parse(&req.constraint).unwrap_or(Constraint { raw: String::new() });

    if constraint.is_exact_pin() {
        return CollectionEntry {
            name: req.name.clone(),
            constraint: req.constraint.clone(),
            resolved_version: constraint.version().to_string(),
        };
    }

    if req.source == SourceKind::Index {
        match index.list_versions(&req.name).await {
            Ok(versions) if !versions.is_empty() => {
                if let Some(best) = greatest_satisfying(&versions, &constraint) {
                    return CollectionEntry {
                        name: req.name.clone(),
                        constraint: req.constraint.clone(),
                        resolved_version: best,
                    };
                }
                warn!("no version of '{}' satisfies constraint '{}'", req.name, req.constraint);
            }
            Ok(_) => warn!("index has no published versions for '{}'", req.name),
            Err(e) => warn!("index lookup for '{}' failed: {e}, falling back", req.name),
        }
    }

    if let Some(url) = &req.source_url {
        match git_client::list_tags(url).await {
            Ok(tags) if !tags.is_empty() => {
                if let Some(best) = greatest_satisfying(&tags, &constraint) {
                    return CollectionEntry {
                        name: req.name.clone(),
                        constraint: req.constraint.clone(),
                        resolved_version: best,
                    };
                }
            }
            Ok(_) => warn!("git remote for '{}' has no tags", req.name),
            Err(e) => warn!("git lookup for '{}' failed: {e}, falling back to literal constraint", req.name),
        }
    }

    warn!(
        "could not resolve '{}' from any source, recording constraint '{}' with no resolved version",
        req.name, req.constraint
    );
    CollectionEntry {
        name: req.name.clone(),
        constraint: req.constraint.clone(),
        resolved_version: String::new(),
    }
}

async fn resolve_role(req: &RoleRequirement) -> RoleEntry {
    let reference = RoleRef::parse(&req.name);
    let constraint = Constraint::parse(&req.constraint).unwrap_or(Constraint { raw: String::new() });

    if constraint.is_exact_pin() {
        return RoleEntry {
            prefix: reference.scenario.clone(),
            name: reference.unqualified_name().to_string(),
            constraint: req.constraint.clone(),
            resolved_version: constraint.version().to_string(),
            src: req.src.clone(),
        };
    }

    if req.scm == Some(SourceKind::Git) && !req.src.is_empty() {
        match git_client::list_tags(&req.src).await {
            Ok(tags) if !tags.is_empty() => {
                if let Some(best) = greatest_satisfying(&tags, &constraint) {
                    return RoleEntry {
                        prefix: reference.scenario.clone(),
                        name: reference.unqualified_name().to_string(),
                        constraint: req.constraint.clone(),
                        resolved_version: best,
                        src: req.src.clone(),
                    };
                }
                warn!(
                    "no tag of '{}' satisfies constraint '{}'",
                    req.name, req.constraint
                );
            }
            Ok(_) => {
                warn!("git remote for '{}' has no tags, checking default branch", req.name);
                if constraint.is_bare() {
                    if let Ok(Some(tip)) = git_client::default_branch_tip(&req.src).await {
                        return RoleEntry {
                            prefix: reference.scenario.clone(),
                            name: reference.unqualified_name().to_string(),
                            constraint: req.constraint.clone(),
                            resolved_version: tip,
                            src: req.src.clone(),
                        };
                    }
                }
            }
            Err(e) => warn!("git lookup for '{}' failed: {e}, falling back to literal constraint", req.name),
        }
    }

    warn!(
        "could not resolve role '{}' from any source, recording constraint '{}' with no resolved version",
        req.name, req.constraint
    );
    RoleEntry {
        prefix: reference.scenario.clone(),
        name: reference.unqualified_name().to_string(),
        constraint: req.constraint.clone(),
        resolved_version: String::new(),
        src: req.src.clone(),
    }
}

/// Picks the greatest version satisfying `constraint` from `candidates`,
/// tolerating a leading `v` on each candidate.
fn greatest_satisfying(candidates: &[String], constraint: &Constraint) -> Option<String> {
    let mut best: Option<(Version, &str)> = None;

    for candidate in candidates {
        let normalized = candidate.strip_prefix('v').unwrap_or(candidate);
        let Ok(version) = Version::parse(normalized) else {
            continue;
        };
        if !satisfies(&version, constraint) {
            continue;
        }
        if best.as_ref().map(|(v, _)| &version > v).unwrap_or(true) {
            best = Some((version, candidate));
        }
    }

    best.map(|(_, original)| original.to_string())
}

fn satisfies(version: &Version, constraint: &Constraint) -> bool {
    if constraint.is_bare() {
        return true;
    }
    let Ok(required) = Version::parse(constraint.version().trim_start_matches('v')) else {
        return true;
    };
    match constraint.operator() {
        Some(">=") => version >= &required,
        Some("<=") => version <= &required,
        Some("==") => version == &required,
        Some(">") => version > &required,
        Some("<") => version < &required,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greatest_satisfying_tolerates_leading_v() {
        let tags: Vec<String> = ["v5.0.0", "v6.0.0", "v6.1.0", "v7.9.0"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let constraint = Constraint::parse(">=6.0.0").unwrap();
        assert_eq!(greatest_satisfying(&tags, &constraint), Some("v7.9.0".to_string()));
    }

    #[test]
    fn greatest_satisfying_returns_none_when_nothing_matches() {
        let tags = vec!["v1.0.0".to_string()];
        let constraint = Constraint::parse(">=6.0.0").unwrap();
        assert_eq!(greatest_satisfying(&tags, &constraint), None);
    }
}
