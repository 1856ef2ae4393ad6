//! Version constraint parsing and the small tagged reference types used
//! throughout dependency resolution.

use std::fmt;

use crate::error::{Error, Result};

/// Recognized constraint operators, checked longest-first so `>=`/`<=`/`==`
/// are never mistaken for `>`/`<`.
const OPERATORS: &[&str] = &[">=", "<=", "==", ">", "<"];

/// A parsed version constraint: an optional operator plus version, or bare
/// (meaning "latest").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// The operator and version as originally written (`">=6.0.0"`), or
    /// empty for a bare/latest constraint.
    pub raw: String,
}

impl Constraint {
    /// Parses `"<name><op><ver>"` or a bare name, returning `(name, rest)`
    /// exactly as the constraint syntax specifies: `rest` is empty for bare
    /// names, otherwise the operator concatenated with the version.
    pub fn split_name(input: &str) -> (String, String) {
        for op in OPERATORS {
            if let Some(idx) = input.find(op) {
                let name = input[..idx].to_string();
                let rest = input[idx..].to_string();
                return (name, rest);
            }
        }
        (input.to_string(), String::new())
    }

    /// Parses a standalone constraint string (no name prefix), such as the
    /// manifest's `constraint` field.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "latest" || trimmed == "main" || trimmed == "master" {
            return Ok(Self { raw: String::new() });
        }
        for op in OPERATORS {
            if let Some(version) = trimmed.strip_prefix(op) {
                if version.trim().is_empty() {
                    return Err(Error::ConstraintParse(raw.to_string()));
                }
                return Ok(Self {
                    raw: trimmed.to_string(),
                });
            }
        }
        Err(Error::ConstraintParse(raw.to_string()))
    }

    /// True if this constraint resolves to "whatever is newest" rather than
    /// a specific version.
    pub fn is_bare(&self) -> bool {
        self.raw.is_empty()
    }

    /// The operator, if any (`">="`, `"=="`, ...).
    pub fn operator(&self) -> Option<&str> {
        OPERATORS.iter().find(|op| self.raw.starts_with(*op)).copied()
    }

    /// The version portion, with the operator stripped.
    pub fn version(&self) -> &str {
        match self.operator() {
            Some(op) => self.raw[op.len()..].trim(),
            None => "",
        }
    }

    /// True if this is an exact pin (`==`) with a fully specified version,
    /// which resolves without querying any source.
    pub fn is_exact_pin(&self) -> bool {
        self.operator() == Some("==") && !self.version().is_empty()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw.is_empty() {
            write!(f, "latest")
        } else {
            write!(f, "{}", self.raw)
        }
    }
}

/// A collection reference: `namespace.name` with an optional trailing
/// constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    pub name: String,
    pub constraint: Constraint,
}

impl CollectionRef {
    /// Parses `"namespace.name"` or `"namespace.name>=x.y.z"`.
    pub fn parse(input: &str) -> Result<Self> {
        let (name, rest) = Constraint::split_name(input);
        let constraint = if rest.is_empty() {
            Constraint { raw: String::new() }
        } else {
            Constraint::parse(&rest)?
        };
        Ok(Self { name, constraint })
    }
}

/// A scenario-qualified role reference: `<scenario>.<role-name>`. Kept as a
/// tagged pair rather than a single string so downstream code never has to
/// re-split it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRef {
    pub scenario: String,
    pub name: String,
}

impl RoleRef {
    /// Splits a scenario-qualified reference. If there is no `.` the whole
    /// string is treated as the name with an empty scenario.
    pub fn parse(input: &str) -> Self {
        match input.split_once('.') {
            Some((scenario, name)) => Self {
                scenario: scenario.to_string(),
                name: name.to_string(),
            },
            None => Self {
                scenario: String::new(),
                name: input.to_string(),
            },
        }
    }

    /// The role name with its scenario prefix stripped, for external
    /// display and for the lock file's `name` field.
    pub fn unqualified_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_name_handles_every_operator() {
        assert_eq!(
            Constraint::split_name("runner>=10.0.0"),
            ("runner".to_string(), ">=10.0.0".to_string())
        );
        assert_eq!(
            Constraint::split_name("runner==1.2.3"),
            ("runner".to_string(), "==1.2.3".to_string())
        );
        assert_eq!(
            Constraint::split_name("runner"),
            ("runner".to_string(), String::new())
        );
    }

    #[test]
    fn parse_accepts_bare_and_latest_synonyms() {
        for bare in ["", "latest", "main", "master"] {
            assert!(Constraint::parse(bare).unwrap().is_bare());
        }
    }

    #[test]
    fn parse_rejects_operator_without_version() {
        assert!(Constraint::parse(">=").is_err());
    }

    #[test]
    fn exact_pin_requires_full_version() {
        let pinned = Constraint::parse("==6.0.0").unwrap();
        assert!(pinned.is_exact_pin());
        let range = Constraint::parse(">=6.0.0").unwrap();
        assert!(!range.is_exact_pin());
    }

    #[test]
    fn collection_ref_splits_namespace_and_constraint() {
        let r = CollectionRef::parse("community.docker>=3.0.0").unwrap();
        assert_eq!(r.name, "community.docker");
        assert_eq!(r.constraint.raw, ">=3.0.0");
    }

    #[test]
    fn role_ref_strips_scenario_prefix_for_display() {
        let r = RoleRef::parse("default.geerlingguy.docker");
        assert_eq!(r.scenario, "default");
        assert_eq!(r.unqualified_name(), "geerlingguy.docker");
    }

    #[test]
    fn role_ref_without_scenario_keeps_whole_name() {
        let r = RoleRef::parse("geerlingguy.docker");
        assert_eq!(r.scenario, "");
        assert_eq!(r.unqualified_name(), "geerlingguy.docker");
    }

    proptest::proptest! {
        #[test]
        fn parser_is_total_over_recognized_operators(
            name in "[a-z][a-z0-9_.]{0,20}",
            op in proptest::sample::select(vec![">=", "<=", "==", ">", "<"]),
            version in "[0-9]+\\.[0-9]+\\.[0-9]+",
        ) {
            let input = format!("{name}{op}{version}");
            let (parsed_name, rest) = Constraint::split_name(&input);
            proptest::prop_assert_eq!(parsed_name, name);
            proptest::prop_assert_eq!(rest, format!("{op}{version}"));
        }

        #[test]
        fn parser_is_total_for_bare_names(name in "[a-z][a-z0-9_]{0,20}") {
            let (parsed_name, rest) = Constraint::split_name(&name);
            proptest::prop_assert_eq!(parsed_name, name);
            proptest::prop_assert_eq!(rest, String::new());
        }
    }
}
