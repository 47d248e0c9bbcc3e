//! Action definitions: the declarative workflow tree.
//!
//! An [`ActionDef`] is a leaf (backed by a step callable of the same name in
//! its module), a branch (an ordered list of child actions), or an alias that
//! points at another top-level action. Trees are built bottom-up from owned
//! values, so they can never contain cycles.

use crate::params::{ParamBag, ParamSpec};
use serde_json::Value;

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    /// Invocable step.
    Leaf,
    /// Ordered child steps, run depth-first.
    Branch(Vec<ActionDef>),
    /// Stand-in for another top-level action. Only valid at the top level;
    /// the catalog resolves it before anything runs.
    Alias { target: String },
}

// ---------------------------------------------------------------------------
// ActionDef
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ActionDef {
    pub name: String,
    /// Owning module. Unset definitions inherit it at registration.
    pub module: Option<String>,
    pub kind: ActionKind,
    pub required_params: Vec<ParamSpec>,
    pub optional_params: Vec<ParamSpec>,
    /// Injected on every invocation; the caller cannot override these.
    pub const_params: ParamBag,
    /// Progress through this action survives process restarts.
    pub continuable: bool,
    /// No step-progress headers for this action.
    pub atomic: bool,
    pub help: Option<String>,
}

impl ActionDef {
    fn with_kind(name: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            name: name.into(),
            module: None,
            kind,
            required_params: Vec::new(),
            optional_params: Vec::new(),
            const_params: ParamBag::new(),
            continuable: false,
            atomic: false,
            help: None,
        }
    }

    pub fn leaf(name: impl Into<String>) -> Self {
        Self::with_kind(name, ActionKind::Leaf)
    }

    pub fn branch(name: impl Into<String>, steps: Vec<ActionDef>) -> Self {
        Self::with_kind(name, ActionKind::Branch(steps))
    }

    pub fn alias(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            ActionKind::Alias {
                target: target.into(),
            },
        )
    }

    // -- builder ------------------------------------------------------------

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn required(mut self, spec: ParamSpec) -> Self {
        self.required_params.push(spec);
        self
    }

    pub fn optional(mut self, spec: ParamSpec) -> Self {
        self.optional_params.push(spec);
        self
    }

    pub fn constant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.const_params.insert(name, value);
        self
    }

    pub fn continuable(mut self) -> Self {
        self.continuable = true;
        self
    }

    pub fn atomic(mut self) -> Self {
        self.atomic = true;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    // -- queries ------------------------------------------------------------

    /// Child steps; empty for leaves and aliases.
    pub fn steps(&self) -> &[ActionDef] {
        match &self.kind {
            ActionKind::Branch(steps) => steps,
            _ => &[],
        }
    }

    pub fn has_steps(&self) -> bool {
        !self.steps().is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, ActionKind::Leaf)
    }

    pub fn alias_target(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Alias { target } => Some(target),
            _ => None,
        }
    }

    pub fn step(&self, name: &str) -> Option<&ActionDef> {
        self.steps().iter().find(|s| s.name == name)
    }

    pub fn module_name(&self) -> &str {
        self.module.as_deref().unwrap_or("")
    }

    /// Set `module` on this definition if unset, then on every descendant,
    /// each child inheriting from its already-resolved parent.
    pub(crate) fn assign_module(&mut self, inherited: &str) {
        let own = self
            .module
            .get_or_insert_with(|| inherited.to_string())
            .clone();
        if let ActionKind::Branch(steps) = &mut self.kind {
            for step in steps {
                step.assign_module(&own);
            }
        }
    }

    /// Visit this definition and every descendant, parents first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a ActionDef, usize)) {
        self.walk_at(0, f);
    }

    fn walk_at<'a>(&'a self, depth: usize, f: &mut impl FnMut(&'a ActionDef, usize)) {
        f(self, depth);
        for step in self.steps() {
            step.walk_at(depth + 1, f);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn patch() -> ActionDef {
        ActionDef::branch(
            "patch",
            vec![
                ActionDef::leaf("get_env"),
                ActionDef::branch(
                    "update",
                    vec![ActionDef::leaf("fetch"), ActionDef::leaf("rebase")],
                )
                .module("git"),
                ActionDef::leaf("commit"),
            ],
        )
        .continuable()
    }

    #[test]
    fn module_inherited_from_resolved_parent() {
        let mut action = patch();
        action.assign_module("dist");

        assert_eq!(action.module_name(), "dist");
        assert_eq!(action.steps()[0].module_name(), "dist");
        let update = action.step("update").unwrap();
        assert_eq!(update.module_name(), "git");
        assert_eq!(update.steps()[0].module_name(), "git");
        assert_eq!(update.steps()[1].module_name(), "git");
        assert_eq!(action.step("commit").unwrap().module_name(), "dist");
    }

    #[test]
    fn kind_queries() {
        let alias = ActionDef::alias("quickfix", "fix").constant("no_bump", true);
        assert_eq!(alias.alias_target(), Some("fix"));
        assert!(!alias.is_leaf());
        assert!(alias.steps().is_empty());

        let p = patch();
        assert!(p.has_steps());
        assert!(p.step("get_env").unwrap().is_leaf());
        assert!(p.step("missing").is_none());
    }

    #[test]
    fn walk_visits_parents_first_with_depth() {
        let p = patch();
        let mut seen = Vec::new();
        p.walk(&mut |a, depth| seen.push((a.name.as_str(), depth)));
        assert_eq!(
            seen,
            [
                ("patch", 0),
                ("get_env", 1),
                ("update", 1),
                ("fetch", 2),
                ("rebase", 2),
                ("commit", 1)
            ]
        );
    }
}
