//! Merges the three dependency inputs (role meta, per-scenario requirements
//! descriptor, manifest) into the two deterministic, sorted lists the
//! resolver and the lock hash both operate over.

use std::collections::HashMap;

use crate::manifest::{CollectionRequirement, RoleRequirement, SourceKind};

/// A role's own `meta/main.yml`-equivalent: collection names only, no
/// constraint information.
#[derive(Debug, Clone, Default)]
pub struct RoleMeta {
    pub collections: Vec<String>,
}

/// A single role entry from the per-scenario requirements descriptor.
#[derive(Debug, Clone)]
pub struct RequirementsRole {
    pub name: String,
    pub src: String,
    pub scm: Option<SourceKind>,
}

/// The per-scenario requirements descriptor (`requirements.yml`-equivalent).
#[derive(Debug, Clone, Default)]
pub struct RequirementsDescriptor {
    pub collections: Vec<CollectionRequirement>,
    pub roles: Vec<RequirementsRole>,
}

/// Merges collection requirements from all three sources. Manifest entries
/// override requirements-descriptor entries, which override meta-only
/// names; a name with no constraint in any source resolves to "latest"
/// (empty constraint).
pub fn merge_collections(
    meta: &RoleMeta,
    requirements: &RequirementsDescriptor,
    manifest: &[CollectionRequirement],
) -> Vec<CollectionRequirement> {
    let mut by_name: HashMap<String, CollectionRequirement> = HashMap::new();

    for name in &meta.collections {
        by_name.entry(name.clone()).or_insert_with(|| CollectionRequirement {
            name: name.clone(),
            constraint: String::new(),
            source: SourceKind::Index,
            source_url: None,
        });
    }

    for req in &requirements.collections {
        by_name.insert(req.name.clone(), req.clone());
    }

    for req in manifest {
        by_name.insert(req.name.clone(), req.clone());
    }

    let mut merged: Vec<CollectionRequirement> = by_name.into_values().collect();
    merged.sort_by(|a, b| a.name.cmp(&b.name));
    merged
}

/// Merges role requirements. Only names present in the manifest survive;
/// a manifest entry with an empty `src`/`scm` is backfilled from the
/// requirements descriptor when a matching unqualified name exists there.
pub fn merge_roles(
    requirements: &RequirementsDescriptor,
    manifest: &[RoleRequirement],
) -> Vec<RoleRequirement> {
    let by_req_name: HashMap<&str, &RequirementsRole> = requirements
        .roles
        .iter()
        .map(|r| (r.name.as_str(), r))
        .collect();

    let mut merged: Vec<RoleRequirement> = manifest
        .iter()
        .map(|entry| {
            let mut entry = entry.clone();
            let unqualified = super::constraint::RoleRef::parse(&entry.name)
                .unqualified_name()
                .to_string();
            if entry.src.is_empty() || entry.scm.is_none() {
                if let Some(backfill) = by_req_name.get(unqualified.as_str()) {
                    if entry.src.is_empty() {
                        entry.src = backfill.src.clone();
                    }
                    if entry.scm.is_none() {
                        entry.scm = backfill.scm;
                    }
                }
            }
            entry
        })
        .collect();

    merged.sort_by(|a, b| a.name.cmp(&b.name));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_overrides_requirements_overrides_meta() {
        let meta = RoleMeta {
            collections: vec!["community.docker".into()],
        };
        let requirements = RequirementsDescriptor {
            collections: vec![CollectionRequirement {
                name: "community.docker".into(),
                constraint: ">=1.0.0".into(),
                ..Default::default()
            }],
            roles: vec![],
        };
        let manifest = vec![CollectionRequirement {
            name: "community.docker".into(),
            constraint: ">=3.0.0".into(),
            ..Default::default()
        }];

        let merged = merge_collections(&meta, &requirements, &manifest);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].constraint, ">=3.0.0");
    }

    #[test]
    fn meta_only_collection_resolves_to_latest() {
        let meta = RoleMeta {
            collections: vec!["ansible.posix".into()],
        };
        let merged = merge_collections(&meta, &RequirementsDescriptor::default(), &[]);
        assert_eq!(merged[0].constraint, "");
    }

    #[test]
    fn roles_absent_from_manifest_are_dropped() {
        let requirements = RequirementsDescriptor {
            collections: vec![],
            roles: vec![
                RequirementsRole {
                    name: "geerlingguy.docker".into(),
                    src: "https://example.invalid/a.git".into(),
                    scm: Some(SourceKind::Git),
                },
                RequirementsRole {
                    name: "geerlingguy.nginx".into(),
                    src: "https://example.invalid/b.git".into(),
                    scm: Some(SourceKind::Git),
                },
            ],
        };
        let manifest = vec![RoleRequirement {
            name: "default.geerlingguy.docker".into(),
            src: String::new(),
            scm: None,
            constraint: ">=6.0.0".into(),
        }];

        let merged = merge_roles(&requirements, &manifest);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "default.geerlingguy.docker");
    }

    #[test]
    fn manifest_role_is_backfilled_from_requirements() {
        let requirements = RequirementsDescriptor {
            collections: vec![],
            roles: vec![RequirementsRole {
                name: "geerlingguy.docker".into(),
                src: "https://example.invalid/docker.git".into(),
                scm: Some(SourceKind::Git),
            }],
        };
        let manifest = vec![RoleRequirement {
            name: "default.geerlingguy.docker".into(),
            src: String::new(),
            scm: None,
            constraint: ">=6.0.0".into(),
        }];

        let merged = merge_roles(&requirements, &manifest);
        assert_eq!(merged[0].src, "https://example.invalid/docker.git");
        assert_eq!(merged[0].scm, Some(SourceKind::Git));
    }

    #[test]
    fn output_is_sorted_by_name() {
        let manifest = vec![
            CollectionRequirement {
                name: "z.z".into(),
                ..Default::default()
            },
            CollectionRequirement {
                name: "a.a".into(),
                ..Default::default()
            },
        ];
        let merged = merge_collections(&RoleMeta::default(), &RequirementsDescriptor::default(), &manifest);
        assert_eq!(merged[0].name, "a.a");
        assert_eq!(merged[1].name, "z.z");
    }
}
