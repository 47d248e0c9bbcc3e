use crate::error::{FlowError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// File constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "pkgflow.yaml";
pub const DEFAULT_STATE_FILE: &str = ".pkgflow.json";

/// Separator used when an action path is shown as a single string.
pub const PATH_SEPARATOR: &str = ".";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path, state_file: &str) -> PathBuf {
    root.join(state_file)
}

/// Join action names into the dotted form used in messages.
pub fn dotted<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| n.as_ref())
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
}

// ---------------------------------------------------------------------------
// Name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_\-]*$").unwrap())
}

/// Action and parameter names end up in dotted paths, CLI flags and
/// environment variable names, so they are restricted to identifiers.
pub fn validate_name(name: &str) -> Result<()> {
    if name.len() > 64 || !name_re().is_match(name) {
        return Err(FlowError::InvalidDefinition(format!(
            "invalid name '{name}': must start with a letter and contain only letters, digits, '_' or '-'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
