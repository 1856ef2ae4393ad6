//! Interpreter whitelist and tool/interpreter compatibility table (§4.4.4).

use std::collections::HashMap;

use once_cell_lite::Lazy;

use crate::error::{Error, Result};
use crate::manifest::ToolVersions;

use super::constraint::Constraint;

/// The closed set of interpreter versions the tool accepts, in major.minor
/// form. Patch suffixes are truncated before comparison.
pub const ALLOWED_INTERPRETERS: &[&str] = &["3.13", "3.12", "3.11"];

/// Truncates a version string to major.minor (`"3.11.4"` -> `"3.11"`).
pub fn truncate_to_major_minor(version: &str) -> String {
    let mut parts = version.splitn(3, '.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) => format!("{major}.{minor}"),
        _ => version.to_string(),
    }
}

/// Validates an interpreter version against the closed allowed set,
/// truncating patch versions first.
pub fn validate_interpreter(version: &str) -> Result<String> {
    let truncated = truncate_to_major_minor(version);
    if ALLOWED_INTERPRETERS.contains(&truncated.as_str()) {
        Ok(truncated)
    } else {
        Err(Error::DependencyValidation(format!(
            "interpreter version '{version}' is not one of {ALLOWED_INTERPRETERS:?}"
        )))
    }
}

/// A compatibility band: the pinned interpreter range a tool's major version
/// supports.
#[derive(Debug, Clone, Copy)]
pub struct CompatBand {
    pub min: &'static str,
    pub max: &'static str,
}

impl CompatBand {
    fn contains(&self, interpreter: &str) -> bool {
        interpreter_in_range(interpreter, self.min, self.max)
    }
}

fn interpreter_in_range(interpreter: &str, min: &str, max: &str) -> bool {
    parse_mm(interpreter)
        .zip(parse_mm(min))
        .zip(parse_mm(max))
        .map(|((v, lo), hi)| v >= lo && v <= hi)
        .unwrap_or(false)
}

fn parse_mm(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.splitn(2, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

/// The full compatibility table, keyed by `(tool, major-version-band)`.
///
/// This is a deliberately small, hand-curated table: only the four tools the
/// manifest tracks (runner, linter, lint-yaml, test-harness) ever need an
/// entry, and entries are added as real incompatibilities are discovered.
static COMPAT_TABLE: Lazy<HashMap<(&'static str, u32), CompatBand>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert(
        ("runner", 10),
        CompatBand {
            min: "3.9",
            max: "3.12",
        },
    );
    table.insert(
        ("runner", 13),
        CompatBand {
            min: "3.11",
            max: "3.13",
        },
    );
    table
});

/// Result of adjusting a single tool's constraint against the pinned
/// interpreter.
pub struct ToolAdjustment {
    pub tool: &'static str,
    pub original: String,
    pub adjusted: String,
    pub warning: Option<String>,
}

/// Checks a tool's stated constraint against the pinned interpreter,
/// substituting the highest-majored compatible band when necessary.
///
/// If the tool's major band is absent from the table, the constraint is
/// accepted unchanged. If the pinned interpreter already satisfies the
/// band, it is accepted unchanged. Otherwise the highest-majored band whose
/// range includes the pinned interpreter is substituted and a warning
/// produced, matching scenario 3's literal message shape.
pub fn adjust_tool(tool: &'static str, constraint: &str, pinned_interpreter: &str) -> ToolAdjustment {
    let parsed = Constraint::parse(constraint).ok();
    let major = parsed
        .as_ref()
        .and_then(|c| c.version().split('.').next())
        .and_then(|s| s.parse::<u32>().ok());

    let Some(major) = major else {
        return ToolAdjustment {
            tool,
            original: constraint.to_string(),
            adjusted: constraint.to_string(),
            warning: None,
        };
    };

    let Some(band) = COMPAT_TABLE.get(&(tool, major)) else {
        return ToolAdjustment {
            tool,
            original: constraint.to_string(),
            adjusted: constraint.to_string(),
            warning: None,
        };
    };

    if band.contains(pinned_interpreter) {
        return ToolAdjustment {
            tool,
            original: constraint.to_string(),
            adjusted: constraint.to_string(),
            warning: None,
        };
    }

    let substitute = COMPAT_TABLE
        .iter()
        .filter(|((t, _), band)| *t == tool && band.contains(pinned_interpreter))
        .max_by_key(|((_, major), _)| *major);

    match substitute {
        Some(((_, new_major), _)) => {
            let operator = parsed.as_ref().and_then(|c| c.operator()).unwrap_or(">=");
            let version = parsed
                .as_ref()
                .map(|c| c.version().to_string())
                .unwrap_or_default();
            let new_version = replace_major(&version, *new_major);
            let adjusted = format!("{operator}{new_version}");
            ToolAdjustment {
                tool,
                original: constraint.to_string(),
                warning: Some(format!(
                    "Adjusted {tool} from {constraint} to {adjusted} for interpreter {pinned_interpreter} compatibility"
                )),
                adjusted,
            }
        }
        None => ToolAdjustment {
            tool,
            original: constraint.to_string(),
            adjusted: constraint.to_string(),
            warning: None,
        },
    }
}

fn replace_major(version: &str, major: u32) -> String {
    let mut parts: Vec<&str> = version.split('.').collect();
    if parts.is_empty() {
        return major.to_string();
    }
    let rest = if parts.len() > 1 {
        parts.split_off(1).join(".")
    } else {
        String::new()
    };
    if rest.is_empty() {
        major.to_string()
    } else {
        format!("{major}.{rest}")
    }
}

/// Applies [`adjust_tool`] to all four tracked tool versions, returning any
/// warnings produced.
pub fn adjust_all(tools: &ToolVersions, pinned_interpreter: &str) -> (ToolVersions, Vec<String>) {
    let mut warnings = Vec::new();
    let mut adjusted = tools.clone();

    for (tool, constraint, set) in [
        ("runner", &tools.runner, &mut adjusted.runner as &mut String),
        ("linter", &tools.linter, &mut adjusted.linter as &mut String),
        (
            "lint_yaml",
            &tools.lint_yaml,
            &mut adjusted.lint_yaml as &mut String,
        ),
        (
            "test_harness",
            &tools.test_harness,
            &mut adjusted.test_harness as &mut String,
        ),
    ] {
        if constraint.is_empty() {
            continue;
        }
        let result = adjust_tool(tool, constraint, pinned_interpreter);
        if let Some(warning) = result.warning {
            tracing::warn!("{warning}");
            warnings.push(warning);
        }
        *set = result.adjusted;
    }

    (adjusted, warnings)
}

/// A tiny `once_cell`-free lazy cell, used so the compat table doesn't pull
/// in an extra crate beyond the teacher's existing dependency set for a
/// single static map.
mod once_cell_lite {
    use std::sync::OnceLock;

    pub struct Lazy<T> {
        cell: OnceLock<T>,
        init: fn() -> T,
    }

    impl<T> Lazy<T> {
        pub const fn new(init: fn() -> T) -> Self {
            Self {
                cell: OnceLock::new(),
                init,
            }
        }
    }

    impl<T> std::ops::Deref for Lazy<T> {
        type Target = T;
        fn deref(&self) -> &T {
            self.cell.get_or_init(self.init)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_interpreters_pass_validation() {
        for v in ALLOWED_INTERPRETERS {
            assert!(validate_interpreter(v).is_ok());
        }
    }

    #[test]
    fn patch_versions_are_truncated_before_validation() {
        assert_eq!(validate_interpreter("3.13.4").unwrap(), "3.13");
    }

    #[test]
    fn disallowed_interpreter_is_rejected() {
        assert!(validate_interpreter("3.10").is_err());
        assert!(validate_interpreter("2.7").is_err());
    }

    #[test]
    fn runner_is_adjusted_for_incompatible_interpreter() {
        let result = adjust_tool("runner", ">=10.0.0", "3.13");
        assert_eq!(result.adjusted, ">=13.0.0");
        assert_eq!(
            result.warning.unwrap(),
            "Adjusted runner from >=10.0.0 to >=13.0.0 for interpreter 3.13 compatibility"
        );
    }

    #[test]
    fn compatible_tool_is_accepted_unchanged() {
        let result = adjust_tool("runner", ">=10.0.0", "3.12");
        assert_eq!(result.adjusted, ">=10.0.0");
        assert!(result.warning.is_none());
    }

    #[test]
    fn unknown_tool_band_is_accepted_as_is() {
        let result = adjust_tool("linter", ">=1.0.0", "3.13");
        assert_eq!(result.adjusted, ">=1.0.0");
        assert!(result.warning.is_none());
    }
}
