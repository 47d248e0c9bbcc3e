use crate::catalog::Catalog;
use crate::error::Result;
use crate::module::Module;
use crate::params::ParamBag;
use crate::paths;
use crate::script::{ScriptAction, ScriptModule};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Checkpoint file name, relative to the project root.
    #[serde(default = "default_state_file")]
    pub state_file: String,
    /// Merged underneath command-line args when an action starts.
    #[serde(default)]
    pub defaults: ParamBag,
    /// Print a header before each step of a non-atomic action.
    #[serde(default = "default_step_headers")]
    pub step_headers: bool,
    #[serde(default)]
    pub modules: Vec<ScriptModule>,
}

fn default_state_file() -> String {
    paths::DEFAULT_STATE_FILE.to_string()
}

fn default_step_headers() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            defaults: ParamBag::new(),
            step_headers: default_step_headers(),
            modules: Vec::new(),
        }
    }
}

impl Config {
    /// Load `pkgflow.yaml` from `root`. A missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn state_path(&self, root: &Path) -> PathBuf {
        paths::state_path(root, &self.state_file)
    }

    /// Turn the declared script modules into registrable modules.
    pub fn modules(&self, root: &Path) -> Result<Vec<Module>> {
        self.modules.iter().map(|m| m.to_module(root)).collect()
    }

    /// Build the catalog from every declared module, in file order.
    pub fn catalog(&self, root: &Path) -> Result<Catalog> {
        Catalog::from_modules(self.modules(root)?)
    }

    /// Non-fatal problems worth telling the user about.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.state_file.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "state_file is empty".to_string(),
            });
        }

        let top_level: HashSet<&str> = self
            .modules
            .iter()
            .flat_map(|m| m.actions.iter().map(|a| a.name.as_str()))
            .collect();

        let mut module_names = HashSet::new();
        for module in &self.modules {
            if !module_names.insert(module.name.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("module name '{}' is used more than once", module.name),
                });
            }
            if module.actions.is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("module '{}' declares no actions", module.name),
                });
            }
            for action in &module.actions {
                if let Some(target) = &action.alias {
                    if !top_level.contains(target.as_str()) {
                        warnings.push(ConfigWarning {
                            level: WarnLevel::Error,
                            message: format!(
                                "alias '{}' points to unknown action '{target}'",
                                action.name
                            ),
                        });
                    }
                }
                check_sibling_names(action, &mut warnings);
            }
        }
        warnings
    }
}

/// Sibling names must be unique or a checkpoint path becomes ambiguous.
fn check_sibling_names(action: &ScriptAction, warnings: &mut Vec<ConfigWarning>) {
    let mut seen = HashSet::new();
    for step in &action.steps {
        if !seen.insert(step.name.as_str()) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "action '{}' has more than one step named '{}'; only the first is reachable on resume",
                    action.name, step.name
                ),
            });
        }
        check_sibling_names(step, warnings);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
