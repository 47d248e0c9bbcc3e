//! The action catalog: every top-level action contributed by every
//! registered module, plus the callables backing their leaves.
//!
//! The catalog is built explicitly at startup from a list of modules. It also
//! translates between an execution path (root action down to the current
//! leaf) and the list of names stored in a checkpoint.

use crate::action::{ActionDef, ActionKind};
use crate::error::{FlowError, Result};
use crate::module::Module;
use crate::params::ParamBag;
use crate::paths::{dotted, validate_name};
use crate::step::Step;
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;

/// Root-to-leaf sequence of action definitions.
pub type ActionPath<'a> = Vec<&'a ActionDef>;

struct ModuleSteps {
    name: String,
    steps: IndexMap<String, Step>,
}

#[derive(Default)]
pub struct Catalog {
    actions: Vec<ActionDef>,
    modules: Vec<ModuleSteps>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from modules in registration order.
    pub fn from_modules(modules: impl IntoIterator<Item = Module>) -> Result<Self> {
        let mut catalog = Self::new();
        for module in modules {
            catalog.register(module)?;
        }
        Ok(catalog)
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    pub fn register(&mut self, module: Module) -> Result<()> {
        let name = module.name().to_string();
        self.register_as(module, &name)
    }

    /// Register `module` under `module_name`. All-or-nothing: on error the
    /// catalog is left untouched.
    pub fn register_as(&mut self, module: Module, module_name: &str) -> Result<()> {
        let step_names: Vec<String> = module.step_names().map(str::to_string).collect();
        let (_, mut actions, steps) = module.into_parts();

        // Callables are looked up by module name, so two modules sharing one
        // would shadow each other's steps.
        if self.modules.iter().any(|m| m.name == module_name) {
            return Err(FlowError::InvalidDefinition(format!(
                "module '{module_name}' is already registered"
            )));
        }

        let mut batch = HashSet::new();
        for action in &actions {
            let owner = action.module.as_deref().unwrap_or(module_name);
            if let Some(existing) = self.get(&action.name) {
                return Err(FlowError::DuplicateAction {
                    action: action.name.clone(),
                    module: owner.to_string(),
                    existing_module: existing.module_name().to_string(),
                });
            }
            if !batch.insert(action.name.as_str()) {
                return Err(FlowError::DuplicateAction {
                    action: action.name.clone(),
                    module: owner.to_string(),
                    existing_module: owner.to_string(),
                });
            }
            validate_tree(action)?;
        }

        for action in &mut actions {
            action.assign_module(module_name);
        }
        debug!(
            module = module_name,
            actions = actions.len(),
            steps = ?step_names,
            "registered module"
        );
        self.actions.extend(actions);
        self.modules.push(ModuleSteps {
            name: module_name.to_string(),
            steps,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn actions(&self) -> &[ActionDef] {
        &self.actions
    }

    pub fn get(&self, name: &str) -> Option<&ActionDef> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Resolve a top-level name through any alias chain. Returns the target
    /// definition and the constants contributed by the aliases, outermost
    /// alias winning on conflicts.
    pub fn resolve(&self, name: &str) -> Result<(&ActionDef, ParamBag)> {
        let mut consts = ParamBag::new();
        let mut seen = HashSet::new();
        let mut current = self
            .get(name)
            .ok_or_else(|| FlowError::InvalidAction(name.to_string()))?;

        while let Some(target) = current.alias_target() {
            if !seen.insert(current.name.as_str()) {
                return Err(FlowError::InvalidDefinition(format!(
                    "alias cycle through '{}'",
                    current.name
                )));
            }
            consts.merge_missing(&current.const_params);
            current = self.get(target).ok_or_else(|| {
                FlowError::InvalidDefinition(format!(
                    "alias '{}' points to unknown action '{target}'",
                    current.name
                ))
            })?;
        }
        Ok((current, consts))
    }

    /// Find the callable implementing `action`: a step of the same name in
    /// the action's owning module, searching modules in registration order.
    pub fn resolve_callable(&self, action: &ActionDef) -> Option<&Step> {
        let module = action.module_name();
        self.modules
            .iter()
            .filter(|m| m.name == module)
            .find_map(|m| m.steps.get(&action.name))
    }

    // -----------------------------------------------------------------------
    // Path (de)serialization
    // -----------------------------------------------------------------------

    pub fn serialize_path(path: &[&ActionDef]) -> Vec<String> {
        path.iter().map(|a| a.name.clone()).collect()
    }

    /// Walk the catalog top-down: the first name must be a top-level action,
    /// each following name one of the previous action's steps.
    pub fn deserialize_path<S: AsRef<str>>(&self, names: &[S]) -> Result<ActionPath<'_>> {
        let Some((first, rest)) = names.split_first() else {
            return Err(FlowError::InvalidAction("empty action path".to_string()));
        };
        let root = self
            .get(first.as_ref())
            .filter(|a| a.alias_target().is_none())
            .ok_or_else(|| FlowError::InvalidAction(first.as_ref().to_string()))?;

        let mut path = vec![root];
        for (depth, name) in rest.iter().enumerate() {
            let parent = path[path.len() - 1];
            let step = parent.step(name.as_ref()).ok_or_else(|| {
                FlowError::InvalidAction(dotted(&names[..depth + 2]))
            })?;
            path.push(step);
        }
        Ok(path)
    }
}

/// Reject malformed trees before anything from the batch becomes visible.
fn validate_tree(root: &ActionDef) -> Result<()> {
    let mut result = Ok(());
    root.walk(&mut |action, depth| {
        if result.is_err() {
            return;
        }
        if let Err(e) = validate_name(&action.name).and_then(|_| validate_params(action)) {
            result = Err(e);
            return;
        }
        match &action.kind {
            ActionKind::Alias { .. } if depth > 0 => {
                result = Err(FlowError::InvalidDefinition(format!(
                    "alias '{}' must be a top-level action",
                    action.name
                )));
            }
            ActionKind::Branch(steps) if steps.is_empty() => {
                result = Err(FlowError::InvalidDefinition(format!(
                    "action '{}' declares an empty step list",
                    action.name
                )));
            }
            _ => {}
        }
    });
    result
}

/// Command-line parameters become flags, so their names and shortcuts must
/// be unique and must not clash with `--help` / `-h`.
fn validate_params(action: &ActionDef) -> Result<()> {
    let mut names = HashSet::new();
    let mut shortcuts = HashSet::new();
    for spec in action.required_params.iter().chain(&action.optional_params) {
        let clash = if spec.name == "help" || spec.shortcut == Some('h') {
            Some("collides with the built-in help flag")
        } else if !names.insert(spec.name.as_str()) {
            Some("is declared more than once")
        } else if spec.shortcut.is_some_and(|c| !shortcuts.insert(c)) {
            Some("reuses another parameter's shortcut")
        } else {
            None
        };
        if let Some(problem) = clash {
            return Err(FlowError::InvalidDefinition(format!(
                "parameter '{}' of action '{}' {problem}",
                spec.name, action.name
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
