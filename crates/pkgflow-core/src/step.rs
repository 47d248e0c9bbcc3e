//! Step callables and the control signals they return.
//!
//! A step declares its parameter schema explicitly; the binder in
//! [`crate::invoke`] matches that schema by name against the current
//! [`ParamBag`] and hands the step a [`BoundArgs`] in declaration order.

use crate::params::ParamBag;
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// What a step asks the runner to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Step done; merge `0` into the args and move on.
    Continue(ParamBag),
    /// A human has to do something out of band. The process stops here and
    /// is resumed later. With `rerun` the same step runs again on resume,
    /// otherwise the step counts as done and the following step runs.
    Suspend {
        message: String,
        args: ParamBag,
        rerun: bool,
    },
    /// Terminate the whole action successfully, skipping remaining steps.
    Finish { message: String },
    /// Jump to another step of the same root action, named relative to the
    /// root (e.g. `["final_step"]` or `["update", "rebase"]`).
    Goto { path: Vec<String>, args: ParamBag },
}

impl Signal {
    pub fn done() -> Self {
        Signal::Continue(ParamBag::new())
    }

    pub fn with_args(args: ParamBag) -> Self {
        Signal::Continue(args)
    }

    /// Suspend; the same step runs again on `--continue`.
    pub fn action_required(message: impl Into<String>) -> Self {
        Signal::Suspend {
            message: message.into(),
            args: ParamBag::new(),
            rerun: true,
        }
    }

    /// Suspend; `--continue` proceeds with the following step.
    pub fn action_required_then_next(message: impl Into<String>) -> Self {
        Signal::Suspend {
            message: message.into(),
            args: ParamBag::new(),
            rerun: false,
        }
    }

    pub fn finish(message: impl Into<String>) -> Self {
        Signal::Finish {
            message: message.into(),
        }
    }

    pub fn goto<S: Into<String>>(path: impl IntoIterator<Item = S>) -> Self {
        Signal::Goto {
            path: path.into_iter().map(Into::into).collect(),
            args: ParamBag::new(),
        }
    }

    /// Merge extra args into the signal's bag. `Finish` carries none.
    pub fn and_args(mut self, extra: ParamBag) -> Self {
        match &mut self {
            Signal::Continue(args)
            | Signal::Suspend { args, .. }
            | Signal::Goto { args, .. } => args.merge(extra),
            Signal::Finish { .. } => {}
        }
        self
    }
}

// ---------------------------------------------------------------------------
// BoundArgs
// ---------------------------------------------------------------------------

/// Arguments bound to a step's declared parameters, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    values: Vec<(String, Value)>,
}

impl BoundArgs {
    pub(crate) fn push(&mut self, name: &str, value: Value) {
        self.values.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn str(&self, name: &str) -> anyhow::Result<&str> {
        self.get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("argument '{name}' is not a string"))
    }

    /// Missing or non-boolean values read as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// One declared input of a step. No default means the value must come from
/// the args (or the action's constants).
#[derive(Debug, Clone, PartialEq)]
pub struct StepParam {
    pub name: String,
    pub default: Option<Value>,
}

pub type StepFn = dyn Fn(&BoundArgs) -> anyhow::Result<Signal>;

/// A callable implementing a leaf action of the same name.
pub struct Step {
    name: String,
    params: Vec<StepParam>,
    func: Box<StepFn>,
}

impl Step {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&BoundArgs) -> anyhow::Result<Signal> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            func: Box::new(func),
        }
    }

    /// Declare a parameter without a default.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(StepParam {
            name: name.into(),
            default: None,
        });
        self
    }

    pub fn param_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(StepParam {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[StepParam] {
        &self.params
    }

    pub fn call(&self, args: &BoundArgs) -> anyhow::Result<Signal> {
        (self.func)(args)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn and_args_merges_into_suspend() {
        let sig = Signal::action_required("resolve conflicts")
            .and_args(ParamBag::new().with("conflict", true));
        match sig {
            Signal::Suspend { args, rerun, .. } => {
                assert!(rerun);
                assert_eq!(args.get("conflict"), Some(&serde_json::Value::Bool(true)));
            }
            other => panic!("unexpected signal: {other:?}"),
        }
    }

    #[test]
    fn goto_collects_names() {
        assert_eq!(
            Signal::goto(["update", "rebase"]),
            Signal::Goto {
                path: vec!["update".into(), "rebase".into()],
                args: ParamBag::new()
            }
        );
    }

    #[test]
    fn bound_args_accessors() {
        let mut args = BoundArgs::default();
        args.push("version", json!("1.2.3"));
        args.push("force", json!(true));

        assert_eq!(args.str("version").unwrap(), "1.2.3");
        assert!(args.flag("force"));
        assert!(!args.flag("missing"));
        assert!(args.str("force").is_err());
        assert_eq!(args.iter().nth(1), Some(("force", &json!(true))));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn step_records_schema_and_calls() {
        let step = Step::new("bump", |args| {
            Ok(Signal::with_args(
                ParamBag::new().with("bumped", args.str("version")?.to_string()),
            ))
        })
        .param("version")
        .param_default("release", "1");

        assert_eq!(step.name(), "bump");
        assert_eq!(step.params().len(), 2);
        assert_eq!(step.params()[1].default, Some(json!("1")));

        let mut args = BoundArgs::default();
        args.push("version", json!("2.0"));
        args.push("release", json!("1"));
        let out = step.call(&args).unwrap();
        assert_eq!(out, Signal::with_args(ParamBag::new().with("bumped", "2.0")));
    }
}
