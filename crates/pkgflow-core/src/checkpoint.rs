//! On-disk execution state.
//!
//! A checkpoint is a small JSON document in the project root:
//!
//! ```json
//! { "action": ["patch", "update"], "args": { "branch": "master" } }
//! ```
//!
//! It is human-readable and safe to delete by hand.

use crate::error::{FlowError, Result};
use crate::io::{atomic_write, remove_if_exists};
use crate::params::ParamBag;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Action path from the root action down to the current leaf.
    pub action: Vec<String>,
    #[serde(default)]
    pub args: ParamBag,
}

impl Checkpoint {
    pub fn new(action: Vec<String>, args: ParamBag) -> Self {
        Self { action, args }
    }

    pub fn root(&self) -> Option<&str> {
        self.action.first().map(String::as_str)
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    /// `Ok(None)` when no checkpoint exists.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        let checkpoint: Checkpoint =
            serde_json::from_str(&data).map_err(|e| FlowError::CorruptCheckpoint {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if checkpoint.action.is_empty() {
            return Err(FlowError::CorruptCheckpoint {
                path: path.to_path_buf(),
                reason: "empty action path".to_string(),
            });
        }
        Ok(Some(checkpoint))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut data = serde_json::to_string_pretty(self)?;
        data.push('\n');
        atomic_write(path, data.as_bytes())
    }

    /// Delete the checkpoint file. Returns whether one existed.
    pub fn clear(path: &Path) -> Result<bool> {
        remove_if_exists(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn checkpoint_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pkgflow.json");

        let cp = Checkpoint::new(
            vec!["patch".into(), "update".into()],
            ParamBag::new().with("branch", "master").with("local_patches", false),
        );
        cp.save(&path).unwrap();

        let loaded = Checkpoint::load(&path).unwrap().unwrap();
        assert_eq!(loaded, cp);
        assert_eq!(loaded.root(), Some("patch"));
    }

    #[test]
    fn on_disk_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pkgflow.json");
        Checkpoint::new(vec!["fix".into()], ParamBag::new().with("no_bump", true))
            .save(&path)
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "action": ["fix"], "args": { "no_bump": true } })
        );
    }

    #[test]
    fn missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(Checkpoint::load(&dir.path().join("nope.json")).unwrap().is_none());
    }

    #[test]
    fn args_default_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pkgflow.json");
        std::fs::write(&path, r#"{"action": ["patch"]}"#).unwrap();
        let cp = Checkpoint::load(&path).unwrap().unwrap();
        assert!(cp.args.is_empty());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pkgflow.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Checkpoint::load(&path),
            Err(FlowError::CorruptCheckpoint { .. })
        ));

        std::fs::write(&path, r#"{"action": [], "args": {}}"#).unwrap();
        assert!(matches!(
            Checkpoint::load(&path),
            Err(FlowError::CorruptCheckpoint { .. })
        ));
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pkgflow.json");
        Checkpoint::new(vec!["patch".into()], ParamBag::new())
            .save(&path)
            .unwrap();
        assert!(Checkpoint::clear(&path).unwrap());
        assert!(!Checkpoint::clear(&path).unwrap());
        assert!(!path.exists());
    }
}
