//! Modules declared in `pkgflow.yaml`.
//!
//! A script module is a set of action trees whose leaves are shell commands,
//! manual pauses, early finishes or jumps. Shell leaves run with `sh -c` in
//! the project root. Every bound argument is exported as `PKGFLOW_<NAME>` and
//! the bound arguments are also written to stdin as a JSON object.

use crate::action::ActionDef;
use crate::error::{FlowError, Result};
use crate::module::Module;
use crate::params::{ParamBag, ParamSpec};
use crate::step::{BoundArgs, Signal, Step};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptModule {
    pub name: String,
    #[serde(default)]
    pub actions: Vec<ScriptAction>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    /// The step fails and so does the action.
    #[default]
    Fail,
    /// Suspend so the user can fix things and `--continue` (re-runs the step).
    Pause,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptAction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default)]
    pub continuable: bool,
    #[serde(default)]
    pub atomic: bool,
    #[serde(default)]
    pub required: Vec<ParamSpec>,
    #[serde(default)]
    pub optional: Vec<ParamSpec>,
    #[serde(default)]
    pub const_args: ParamBag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub steps: Vec<ScriptAction>,

    // -- leaf body ----------------------------------------------------------
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goto: Option<Vec<String>>,
    /// Store trimmed stdout of `run` under this name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture: Option<String>,
    #[serde(default)]
    pub on_failure: OnFailure,
    /// Parameters the leaf needs, without defaults.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Parameters the leaf accepts, with defaults.
    #[serde(default)]
    pub defaults: ParamBag,
}

// ---------------------------------------------------------------------------
// Leaf bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum LeafBody {
    Run {
        command: String,
        capture: Option<String>,
        on_failure: OnFailure,
    },
    Pause(String),
    Finish(String),
    Goto(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
struct Leaf {
    name: String,
    body: LeafBody,
    requires: Vec<String>,
    defaults: ParamBag,
}

impl ScriptAction {
    fn leaf_body(&self) -> Result<Option<LeafBody>> {
        let mut bodies = Vec::new();
        if let Some(command) = &self.run {
            bodies.push(LeafBody::Run {
                command: command.clone(),
                capture: self.capture.clone(),
                on_failure: self.on_failure,
            });
        }
        if let Some(message) = &self.pause {
            bodies.push(LeafBody::Pause(message.clone()));
        }
        if let Some(message) = &self.finish {
            bodies.push(LeafBody::Finish(message.clone()));
        }
        if let Some(path) = &self.goto {
            bodies.push(LeafBody::Goto(path.clone()));
        }
        if bodies.len() > 1 {
            return Err(FlowError::InvalidDefinition(format!(
                "step '{}' may only use one of run, pause, finish or goto",
                self.name
            )));
        }
        Ok(bodies.pop())
    }

    fn to_action(&self, depth: usize, leaves: &mut Vec<Leaf>) -> Result<ActionDef> {
        let body = self.leaf_body()?;
        let mut action = match (&self.alias, self.steps.is_empty(), body) {
            (Some(target), true, None) if depth == 0 => ActionDef::alias(&self.name, target),
            (Some(_), _, _) => {
                return Err(FlowError::InvalidDefinition(format!(
                    "alias '{}' must be a top-level action without steps or a body",
                    self.name
                )))
            }
            (None, false, None) => {
                let steps = self
                    .steps
                    .iter()
                    .map(|s| s.to_action(depth + 1, leaves))
                    .collect::<Result<Vec<_>>>()?;
                ActionDef::branch(&self.name, steps)
            }
            (None, true, Some(body)) => {
                leaves.push(Leaf {
                    name: self.name.clone(),
                    body,
                    requires: self.requires.clone(),
                    defaults: self.defaults.clone(),
                });
                ActionDef::leaf(&self.name)
            }
            (None, false, Some(_)) => {
                return Err(FlowError::InvalidDefinition(format!(
                    "action '{}' has both steps and a body",
                    self.name
                )))
            }
            (None, true, None) => {
                return Err(FlowError::InvalidDefinition(format!(
                    "action '{}' needs steps, an alias or one of run, pause, finish, goto",
                    self.name
                )))
            }
        };

        action.required_params = self.required.clone();
        action.optional_params = self.optional.clone();
        action.const_params = self.const_args.clone();
        action.continuable = self.continuable;
        action.atomic = self.atomic;
        action.help = self.help.clone();
        Ok(action)
    }
}

// ---------------------------------------------------------------------------
// Module construction
// ---------------------------------------------------------------------------

impl ScriptModule {
    /// Build a registrable module whose shell steps run in `root`.
    pub fn to_module(&self, root: &Path) -> Result<Module> {
        let mut leaves = Vec::new();
        let mut module = Module::new(&self.name);
        for action in &self.actions {
            module = module.action(action.to_action(0, &mut leaves)?);
        }

        // The same leaf may be shared by several trees, but only with one body.
        let mut seen: HashMap<String, Leaf> = HashMap::new();
        for leaf in leaves {
            if let Some(previous) = seen.get(&leaf.name) {
                if *previous != leaf {
                    return Err(FlowError::InvalidDefinition(format!(
                        "step '{}' is defined twice with different bodies in module '{}'",
                        leaf.name, self.name
                    )));
                }
                continue;
            }
            module = module.step(leaf_step(&leaf, root));
            seen.insert(leaf.name.clone(), leaf);
        }
        Ok(module)
    }
}

fn leaf_step(leaf: &Leaf, root: &Path) -> Step {
    let body = leaf.body.clone();
    let name = leaf.name.clone();
    let root = root.to_path_buf();
    let mut step = Step::new(&leaf.name, move |args| run_leaf(&name, &body, &root, args));
    for param in &leaf.requires {
        step = step.param(param);
    }
    for (param, default) in &leaf.defaults {
        step = step.param_default(param, default.clone());
    }
    step
}

fn run_leaf(name: &str, body: &LeafBody, root: &Path, args: &BoundArgs) -> anyhow::Result<Signal> {
    match body {
        LeafBody::Pause(message) => Ok(Signal::action_required_then_next(message.clone())),
        LeafBody::Finish(message) => Ok(Signal::finish(message.clone())),
        LeafBody::Goto(path) => Ok(Signal::goto(path.clone())),
        LeafBody::Run {
            command,
            capture,
            on_failure,
        } => {
            let output = run_command(command, root, args, capture.is_some())?;
            if !output.success {
                let status = output
                    .code
                    .map(|c| format!("exit code {c}"))
                    .unwrap_or_else(|| "a signal".to_string());
                return match on_failure {
                    OnFailure::Pause => Ok(Signal::action_required(format!(
                        "step '{name}' failed with {status}: fix the problem, then run `pkgflow --continue`"
                    ))),
                    OnFailure::Fail => Err(anyhow::anyhow!("`{command}` failed with {status}")),
                };
            }
            let mut out = ParamBag::new();
            if let Some(var) = capture {
                out.insert(var, output.stdout.trim().to_string());
            }
            Ok(Signal::with_args(out))
        }
    }
}

// ---------------------------------------------------------------------------
// Subprocess
// ---------------------------------------------------------------------------

struct CommandOutput {
    success: bool,
    code: Option<i32>,
    stdout: String,
}

/// `PKGFLOW_<NAME>` with the name upper-cased and `-` mapped to `_`.
pub fn env_var_name(param: &str) -> String {
    format!("PKGFLOW_{}", param.to_uppercase().replace('-', "_"))
}

fn env_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn run_command(
    command: &str,
    root: &Path,
    args: &BoundArgs,
    capture: bool,
) -> anyhow::Result<CommandOutput> {
    let input: serde_json::Map<String, Value> = args
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    let stdin_json = serde_json::to_string(&input)?;

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd.current_dir(root);
    cmd.env("PKGFLOW_ROOT", root);
    for (k, v) in args.iter() {
        cmd.env(env_var_name(k), env_value(v));
    }
    cmd.stdin(Stdio::piped());
    cmd.stdout(if capture {
        Stdio::piped()
    } else {
        Stdio::inherit()
    });
    cmd.stderr(Stdio::inherit());

    debug!(command, root = %root.display(), "spawning step command");
    let mut child = cmd
        .spawn()
        .map_err(|e| anyhow::anyhow!("failed to spawn `sh -c {command}`: {e}"))?;

    // Feed stdin from its own thread while stdout is drained, so neither
    // pipe can fill up and block the other.
    let stdin = child.stdin.take();
    let output = std::thread::scope(|scope| {
        let writer = scope.spawn(move || -> std::io::Result<()> {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            // A command that never reads stdin closes the pipe early.
            match stdin.write_all(stdin_json.as_bytes()) {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        });
        let output = child.wait_with_output();
        let written = writer
            .join()
            .map_err(|_| anyhow::anyhow!("stdin writer for `{command}` panicked"))?;
        written?;
        anyhow::Ok(output?)
    })?;

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
