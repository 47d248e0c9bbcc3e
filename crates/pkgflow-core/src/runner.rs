//! The execution driver.
//!
//! A [`Runner`] holds the current execution path and args. It is `Idle` while
//! the path is empty and `Active` otherwise. `engage()` runs leaves one at a
//! time until the action completes, finishes early, or suspends because a
//! human has to do something; suspension ends the process and a later
//! `resume()` picks the checkpoint back up.
//!
//! Checkpoints are only written while the root action is continuable.

use crate::action::ActionDef;
use crate::catalog::{ActionPath, Catalog};
use crate::checkpoint::Checkpoint;
use crate::error::{FlowError, Result};
use crate::invoke::invoke;
use crate::params::ParamBag;
use crate::paths::dotted;
use crate::step::Signal;
use crate::tree::{descend_to_leaf, next_leaf};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Progress hooks for whoever drives the runner. All methods default to
/// doing nothing.
pub trait Observer {
    fn action_started(&mut self, _root: &ActionDef, _args: &ParamBag) {}

    fn action_resumed(&mut self, _path: &[&ActionDef]) {}

    /// Called before each leaf runs.
    fn step_started(&mut self, _path: &[&ActionDef]) {}

    fn action_required(&mut self, _path: &[&ActionDef], _message: &str) {}
}

pub struct NoopObserver;

impl Observer for NoopObserver {}

// ---------------------------------------------------------------------------
// RunOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every step ran.
    Completed { action: String },
    /// A step asked for manual intervention. `path` is where a resume
    /// continues from.
    Suspended {
        action: String,
        path: Vec<String>,
        message: String,
        resumable: bool,
    },
    /// A step ended the action early.
    Finished { action: String, message: String },
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct Runner<'a> {
    catalog: &'a Catalog,
    state_path: PathBuf,
    path: ActionPath<'a>,
    args: ParamBag,
    observer: Box<dyn Observer + 'a>,
}

impl<'a> Runner<'a> {
    pub fn new(catalog: &'a Catalog, state_path: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            state_path: state_path.into(),
            path: Vec::new(),
            args: ParamBag::new(),
            observer: Box::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: impl Observer + 'a) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn path(&self) -> &[&'a ActionDef] {
        &self.path
    }

    pub fn args(&self) -> &ParamBag {
        &self.args
    }

    pub fn is_active(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// The checkpoint currently on disk, if any.
    pub fn checkpoint(&self) -> Result<Option<Checkpoint>> {
        Checkpoint::load(&self.state_path)
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Start `name` (resolving aliases) with `args`. Refuses to replace a
    /// checkpoint belonging to a different action.
    pub fn new_action(&mut self, name: &str, args: ParamBag) -> Result<()> {
        let catalog = self.catalog;
        let (action, alias_consts) = catalog.resolve(name)?;

        if let Some(existing) = Checkpoint::load(&self.state_path)? {
            if existing.root() != Some(action.name.as_str()) {
                return Err(FlowError::ActionInProgress(dotted(&existing.action)));
            }
            warn!(
                action = %action.name,
                checkpoint = %dotted(&existing.action),
                "restarting action, discarding its saved progress"
            );
        }

        let mut start = args;
        start.merge(alias_consts);
        start.merge(action.const_params.clone());

        info!(action = %action.name, requested = name, "starting action");
        self.path = vec![action];
        self.args = start;
        self.observer.action_started(action, &self.args);

        if action.has_steps() {
            self.save_checkpoint()?;
        }
        Ok(())
    }

    /// Load the checkpoint and continue where it left off.
    pub fn resume(&mut self) -> Result<RunOutcome> {
        let checkpoint = Checkpoint::load(&self.state_path)?.ok_or(FlowError::NoActionInProgress)?;
        let catalog = self.catalog;
        self.path = catalog.deserialize_path(&checkpoint.action)?;
        self.args = checkpoint.args;

        info!(path = %dotted(&checkpoint.action), "resuming action");
        self.observer.action_resumed(&self.path);
        self.engage()
    }

    /// Drop the in-memory state and delete the checkpoint. Returns whether a
    /// checkpoint existed.
    pub fn abort(&mut self) -> Result<bool> {
        self.path.clear();
        self.args = ParamBag::new();
        let removed = Checkpoint::clear(&self.state_path)?;
        if removed {
            info!(file = %self.state_path.display(), "aborted action");
        }
        Ok(removed)
    }

    /// `new_action` followed by `engage`.
    pub fn run(&mut self, name: &str, args: ParamBag) -> Result<RunOutcome> {
        self.new_action(name, args)?;
        self.engage()
    }

    /// Run leaves until the action completes, finishes or suspends.
    pub fn engage(&mut self) -> Result<RunOutcome> {
        let Some(&root) = self.path.first() else {
            return Err(FlowError::NoActionInProgress);
        };

        if descend_to_leaf(&mut self.path) {
            self.save_checkpoint()?;
        }

        loop {
            let Some(&step) = self.path.last() else {
                return Err(FlowError::NoActionInProgress);
            };
            self.observer.step_started(&self.path);

            // A hard error leaves the checkpoint pointing at this step, so the
            // user can fix the cause and resume.
            let signal = invoke(self.catalog, step, &mut self.args)?;

            let mut select_next = false;
            let mut suspended = None;
            match signal {
                Signal::Continue(out) => {
                    self.args.merge(out);
                    select_next = true;
                }
                Signal::Suspend {
                    message,
                    args,
                    rerun,
                } => {
                    self.args.merge(args);
                    info!(step = %step.name, rerun, "action required");
                    self.observer.action_required(&self.path, &message);
                    select_next = !rerun;
                    suspended = Some(message);
                }
                Signal::Finish { message } => {
                    info!(action = %root.name, step = %step.name, "action finished early");
                    self.finish()?;
                    return Ok(RunOutcome::Finished {
                        action: root.name.clone(),
                        message,
                    });
                }
                Signal::Goto { path, args } => {
                    self.args.merge(args);
                    let mut names = vec![root.name.clone()];
                    names.extend(path);
                    let catalog = self.catalog;
                    let mut target = catalog.deserialize_path(&names)?;
                    descend_to_leaf(&mut target);
                    debug!(from = %step.name, to = %dotted(&names), "goto");
                    self.path = target;
                }
            }

            if select_next {
                match next_leaf(&self.path) {
                    Some(next) => self.path = next,
                    None => {
                        // A pause on the last leaf still reports its message,
                        // but there is nothing left to resume.
                        if let Some(message) = suspended {
                            let path = Catalog::serialize_path(&self.path);
                            info!(action = %root.name, "action required after last step");
                            self.finish()?;
                            return Ok(RunOutcome::Suspended {
                                action: root.name.clone(),
                                path,
                                message,
                                resumable: false,
                            });
                        }
                        info!(action = %root.name, "action completed");
                        self.finish()?;
                        return Ok(RunOutcome::Completed {
                            action: root.name.clone(),
                        });
                    }
                }
            }

            self.save_checkpoint()?;

            if let Some(message) = suspended {
                return Ok(RunOutcome::Suspended {
                    action: root.name.clone(),
                    path: Catalog::serialize_path(&self.path),
                    message,
                    resumable: root.continuable,
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Checkpoint helpers
    // -----------------------------------------------------------------------

    fn root_continuable(&self) -> bool {
        self.path.first().is_some_and(|root| root.continuable)
    }

    fn save_checkpoint(&self) -> Result<()> {
        if !self.root_continuable() {
            return Ok(());
        }
        let checkpoint = Checkpoint::new(Catalog::serialize_path(&self.path), self.args.clone());
        debug!(path = %dotted(&checkpoint.action), "saving checkpoint");
        checkpoint.save(&self.state_path)
    }

    fn finish(&mut self) -> Result<()> {
        if self.root_continuable() {
            Checkpoint::clear(&self.state_path)?;
        }
        self.path.clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;
    use crate::step::Step;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    type Log = Rc<RefCell<Vec<String>>>;

    fn logging_step(log: &Log, name: &str) -> Step {
        let log = Rc::clone(log);
        let owned = name.to_string();
        Step::new(name, move |_| {
            log.borrow_mut().push(owned.clone());
            Ok(Signal::done())
        })
    }

    /// `patch = [get_env, ensure_branch, update, commit]`; `update` asks for
    /// manual work until `conflicts_resolved` is set.
    fn patch_module(log: &Log) -> Module {
        let update_log = Rc::clone(log);
        Module::new("dist")
            .action(
                ActionDef::branch(
                    "patch",
                    vec![
                        ActionDef::leaf("get_env"),
                        ActionDef::leaf("ensure_branch"),
                        ActionDef::leaf("update"),
                        ActionDef::leaf("commit"),
                    ],
                )
                .continuable(),
            )
            .action(ActionDef::branch("fix", vec![ActionDef::leaf("commit")]).continuable())
            .action(ActionDef::alias("quickfix", "fix").constant("no_bump", true))
            .step({
                let log = Rc::clone(log);
                Step::new("get_env", move |_| {
                    log.borrow_mut().push("get_env".into());
                    Ok(Signal::with_args(ParamBag::new().with("branch", "master")))
                })
            })
            .step(logging_step(log, "ensure_branch"))
            .step(
                Step::new("update", move |args| {
                    update_log.borrow_mut().push("update".into());
                    if args.flag("conflicts_resolved") {
                        Ok(Signal::done())
                    } else {
                        Ok(Signal::action_required("resolve conflicts, then continue"))
                    }
                })
                .param_default("conflicts_resolved", false),
            )
            .step(logging_step(log, "commit").param("branch"))
    }

    fn log_entries(log: &Log) -> Vec<String> {
        log.borrow().clone()
    }

    #[test]
    fn suspend_then_resume_in_fresh_process() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join(".pkgflow.json");
        let log: Log = Rc::default();

        {
            let catalog = Catalog::from_modules([patch_module(&log)]).unwrap();
            let mut runner = Runner::new(&catalog, &state);
            let outcome = runner.run("patch", ParamBag::new()).unwrap();
            assert!(matches!(outcome, RunOutcome::Suspended { resumable: true, .. }));
        }
        assert_eq!(log_entries(&log), ["get_env", "ensure_branch", "update"]);

        let cp = Checkpoint::load(&state).unwrap().unwrap();
        assert_eq!(cp.action, ["patch", "update"]);
        assert_eq!(cp.args.get_str("branch"), Some("master"));

        // the user resolves the conflicts; record that in the checkpoint
        let mut cp = cp;
        cp.args.insert("conflicts_resolved", true);
        cp.save(&state).unwrap();

        log.borrow_mut().clear();
        let catalog = Catalog::from_modules([patch_module(&log)]).unwrap();
        let mut runner = Runner::new(&catalog, &state);
        let outcome = runner.resume().unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Completed {
                action: "patch".into()
            }
        );
        assert_eq!(log_entries(&log), ["update", "commit"]);
        assert!(!state.exists());
        assert!(!runner.is_active());
    }

    #[test]
    fn checkpoint_written_before_first_step() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join(".pkgflow.json");
        let log: Log = Rc::default();
        let catalog = Catalog::from_modules([patch_module(&log)]).unwrap();
        let mut runner = Runner::new(&catalog, &state);

        runner.new_action("patch", ParamBag::new()).unwrap();
        let cp = Checkpoint::load(&state).unwrap().unwrap();
        assert_eq!(cp.action, ["patch"]);
        assert!(log_entries(&log).is_empty());
    }

    #[test]
    fn alias_resolves_to_target_with_constants() {
        let dir = TempDir::new().unwrap();
        let log: Log = Rc::default();
        let catalog = Catalog::from_modules([patch_module(&log)]).unwrap();
        let mut runner = Runner::new(&catalog, dir.path().join(".pkgflow.json"));

        runner.new_action("quickfix", ParamBag::new()).unwrap();
        assert_eq!(runner.path()[0].name, "fix");
        assert_eq!(runner.path().len(), 1);
        assert_eq!(runner.args().get("no_bump"), Some(&serde_json::Value::Bool(true)));

        let cp = runner.checkpoint().unwrap().unwrap();
        assert_eq!(cp.action, ["fix"]);
    }

    #[test]
    fn another_action_in_progress_is_refused() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join(".pkgflow.json");
        let log: Log = Rc::default();
        let catalog = Catalog::from_modules([patch_module(&log)]).unwrap();

        Runner::new(&catalog, &state)
            .run("patch", ParamBag::new())
            .unwrap();

        let mut runner = Runner::new(&catalog, &state);
        let err = runner.new_action("fix", ParamBag::new()).unwrap_err();
        match err {
            FlowError::ActionInProgress(name) => assert_eq!(name, "patch.update"),
            other => panic!("unexpected error: {other}"),
        }
        let cp = Checkpoint::load(&state).unwrap().unwrap();
        assert_eq!(cp.action, ["patch", "update"]);

        // restarting the same action is allowed
        runner.new_action("patch", ParamBag::new()).unwrap();
        assert_eq!(runner.checkpoint().unwrap().unwrap().action, ["patch"]);
    }

    #[test]
    fn abort_without_checkpoint_is_noop() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::new();
        let mut runner = Runner::new(&catalog, dir.path().join(".pkgflow.json"));

        assert!(!runner.abort().unwrap());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn abort_removes_checkpoint() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join(".pkgflow.json");
        let log: Log = Rc::default();
        let catalog = Catalog::from_modules([patch_module(&log)]).unwrap();
        let mut runner = Runner::new(&catalog, &state);
        runner.run("patch", ParamBag::new()).unwrap();

        assert!(runner.abort().unwrap());
        assert!(!state.exists());
        assert!(!runner.is_active());
        assert!(runner.args().is_empty());
        assert!(matches!(runner.resume(), Err(FlowError::NoActionInProgress)));
    }

    #[test]
    fn engage_when_idle_fails() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::new();
        let mut runner = Runner::new(&catalog, dir.path().join(".pkgflow.json"));
        assert!(matches!(runner.engage(), Err(FlowError::NoActionInProgress)));
    }

    fn five_steps(log: &Log, goto_from_s3: Vec<&'static str>) -> Module {
        let s3_log = Rc::clone(log);
        let s4_log = Rc::clone(log);
        Module::new("flow")
            .action(
                ActionDef::branch(
                    "root",
                    vec![
                        ActionDef::leaf("s1"),
                        ActionDef::leaf("s2"),
                        ActionDef::leaf("s3"),
                        ActionDef::leaf("s4"),
                        ActionDef::leaf("final_step"),
                    ],
                )
                .continuable(),
            )
            .step(logging_step(log, "s1"))
            .step(logging_step(log, "s2"))
            .step(Step::new("s3", move |_| {
                s3_log.borrow_mut().push("s3".into());
                Ok(Signal::goto(goto_from_s3.clone()))
            }))
            .step(Step::new("s4", move |_| {
                s4_log.borrow_mut().push("s4".into());
                Ok(Signal::done())
            }))
            .step({
                let log = Rc::clone(log);
                Step::new("final_step", move |args| {
                    log.borrow_mut().push("final_step".into());
                    if args.flag("approved") {
                        Ok(Signal::done())
                    } else {
                        Ok(Signal::action_required("approve the build"))
                    }
                })
                .param_default("approved", false)
            })
    }

    #[test]
    fn goto_jumps_to_named_step() {
        let dir = TempDir::new().unwrap();
        let log: Log = Rc::default();
        let catalog = Catalog::from_modules([five_steps(&log, vec!["final_step"])]).unwrap();
        let mut runner = Runner::new(&catalog, dir.path().join(".pkgflow.json"));

        runner.run("root", ParamBag::new()).unwrap();
        assert_eq!(log_entries(&log), ["s1", "s2", "s3", "final_step"]);
        assert_eq!(
            Catalog::serialize_path(runner.path()),
            ["root", "final_step"]
        );
    }

    #[test]
    fn goto_target_continues_with_its_following_siblings() {
        let dir = TempDir::new().unwrap();
        let log: Log = Rc::default();
        let catalog = Catalog::from_modules([five_steps(&log, vec!["s4"])]).unwrap();
        let mut runner = Runner::new(&catalog, dir.path().join(".pkgflow.json"));

        runner
            .run("root", ParamBag::new().with("approved", true))
            .unwrap();
        assert_eq!(log_entries(&log), ["s1", "s2", "s3", "s4", "final_step"]);
        assert!(!runner.is_active());
    }

    #[test]
    fn goto_unknown_step_is_invalid_action() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join(".pkgflow.json");
        let log: Log = Rc::default();
        let catalog = Catalog::from_modules([five_steps(&log, vec!["nowhere"])]).unwrap();
        let mut runner = Runner::new(&catalog, &state);

        let err = runner.run("root", ParamBag::new()).unwrap_err();
        assert!(matches!(err, FlowError::InvalidAction(ref p) if p == "root.nowhere"));
        // progress up to the failing step is kept
        assert_eq!(Checkpoint::load(&state).unwrap().unwrap().action, ["root", "s3"]);
    }

    #[test]
    fn finish_stops_early_and_clears_checkpoint() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join(".pkgflow.json");
        let log: Log = Rc::default();
        let catalog = Catalog::from_modules([Module::new("m")
            .action(
                ActionDef::branch(
                    "build",
                    vec![ActionDef::leaf("check"), ActionDef::leaf("compile")],
                )
                .continuable(),
            )
            .step(Step::new("check", |_| Ok(Signal::finish("nothing to build"))))
            .step(logging_step(&log, "compile"))])
        .unwrap();

        let outcome = Runner::new(&catalog, &state)
            .run("build", ParamBag::new())
            .unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Finished {
                action: "build".into(),
                message: "nothing to build".into()
            }
        );
        assert!(log_entries(&log).is_empty());
        assert!(!state.exists());
    }

    #[test]
    fn suspend_without_rerun_resumes_at_next_step() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join(".pkgflow.json");
        let log: Log = Rc::default();
        let module = || {
            Module::new("m")
                .action(
                    ActionDef::branch(
                        "release",
                        vec![
                            ActionDef::leaf("prepare"),
                            ActionDef::leaf("review"),
                            ActionDef::leaf("tag"),
                        ],
                    )
                    .continuable(),
                )
                .step(logging_step(&log, "prepare"))
                .step(Step::new("review", |_| {
                    Ok(Signal::action_required_then_next("review the diff")
                        .and_args(ParamBag::new().with("reviewed", true)))
                }))
                .step(logging_step(&log, "tag").param("reviewed"))
        };

        let catalog = Catalog::from_modules([module()]).unwrap();
        let outcome = Runner::new(&catalog, &state)
            .run("release", ParamBag::new())
            .unwrap();
        match outcome {
            RunOutcome::Suspended { path, message, .. } => {
                assert_eq!(path, ["release", "tag"]);
                assert_eq!(message, "review the diff");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let catalog = Catalog::from_modules([module()]).unwrap();
        Runner::new(&catalog, &state).resume().unwrap();
        assert_eq!(log_entries(&log), ["prepare", "tag"]);
        assert!(!state.exists());
    }

    #[test]
    fn pause_on_last_step_is_reported() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join(".pkgflow.json");
        let log: Log = Rc::default();
        let catalog = Catalog::from_modules([Module::new("m")
            .action(
                ActionDef::branch(
                    "release",
                    vec![ActionDef::leaf("build"), ActionDef::leaf("upload")],
                )
                .continuable(),
            )
            .step(logging_step(&log, "build"))
            .step(Step::new("upload", |_| {
                Ok(Signal::action_required_then_next("upload the tarball by hand"))
            }))])
        .unwrap();

        let mut runner = Runner::new(&catalog, &state);
        let outcome = runner.run("release", ParamBag::new()).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Suspended {
                action: "release".into(),
                path: vec!["release".into(), "upload".into()],
                message: "upload the tarball by hand".into(),
                resumable: false,
            }
        );
        assert_eq!(log_entries(&log), ["build"]);
        assert!(!state.exists());
        assert!(!runner.is_active());
    }

    #[test]
    fn goto_into_nested_branch_runs_its_leaves_then_climbs_out() {
        let dir = TempDir::new().unwrap();
        let log: Log = Rc::default();
        let jumped = Rc::new(RefCell::new(false));
        let catalog = Catalog::from_modules([Module::new("dist")
            .action(
                ActionDef::branch(
                    "patch",
                    vec![
                        ActionDef::leaf("prep"),
                        ActionDef::branch(
                            "update",
                            vec![ActionDef::leaf("fetch"), ActionDef::leaf("rebase")],
                        ),
                        ActionDef::leaf("check"),
                        ActionDef::leaf("commit"),
                    ],
                )
                .continuable(),
            )
            .step(logging_step(&log, "prep"))
            .step(logging_step(&log, "fetch"))
            .step(logging_step(&log, "rebase"))
            .step({
                let log = Rc::clone(&log);
                let jumped = Rc::clone(&jumped);
                Step::new("check", move |_| {
                    log.borrow_mut().push("check".into());
                    if jumped.replace(true) {
                        Ok(Signal::done())
                    } else {
                        Ok(Signal::goto(["update"]))
                    }
                })
            })
            .step(logging_step(&log, "commit"))])
        .unwrap();

        let outcome = Runner::new(&catalog, dir.path().join(".pkgflow.json"))
            .run("patch", ParamBag::new())
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Completed { .. }));
        assert_eq!(
            log_entries(&log),
            ["prep", "fetch", "rebase", "check", "fetch", "rebase", "check", "commit"]
        );
    }

    #[test]
    fn step_error_keeps_checkpoint_at_failing_step() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join(".pkgflow.json");
        let log: Log = Rc::default();
        let catalog = Catalog::from_modules([patch_module(&log)]).unwrap();

        // commit requires `branch`, which get_env would have produced
        let mut cp = Checkpoint::new(vec!["patch".into(), "commit".into()], ParamBag::new());
        cp.save(&state).unwrap();
        let err = Runner::new(&catalog, &state).resume().unwrap_err();
        assert!(matches!(
            err,
            FlowError::RequiredActionArgumentNotAvailable { ref arg, .. } if arg == "branch"
        ));
        assert_eq!(Checkpoint::load(&state).unwrap().unwrap(), cp);

        cp.args.insert("branch", "f40");
        cp.save(&state).unwrap();
        Runner::new(&catalog, &state).resume().unwrap();
        assert_eq!(log_entries(&log), ["commit"]);
    }

    #[test]
    fn non_continuable_action_never_checkpoints() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join(".pkgflow.json");
        let log: Log = Rc::default();
        let catalog = Catalog::from_modules([Module::new("m")
            .action(ActionDef::branch(
                "lint",
                vec![ActionDef::leaf("rpmlint"), ActionDef::leaf("ask")],
            ))
            .step(logging_step(&log, "rpmlint"))
            .step(Step::new("ask", |_| Ok(Signal::action_required("look at warnings"))))])
        .unwrap();

        let outcome = Runner::new(&catalog, &state)
            .run("lint", ParamBag::new())
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Suspended { resumable: false, .. }));
        assert!(!state.exists());
    }

    #[test]
    fn corrupt_checkpoint_blocks_new_action() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join(".pkgflow.json");
        std::fs::write(&state, "garbage").unwrap();
        let log: Log = Rc::default();
        let catalog = Catalog::from_modules([patch_module(&log)]).unwrap();

        let err = Runner::new(&catalog, &state)
            .new_action("patch", ParamBag::new())
            .unwrap_err();
        assert!(matches!(err, FlowError::CorruptCheckpoint { .. }));
        assert_eq!(std::fs::read_to_string(&state).unwrap(), "garbage");
    }

    #[derive(Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl Observer for Recorder {
        fn step_started(&mut self, path: &[&ActionDef]) {
            self.0.borrow_mut().push(dotted(&Catalog::serialize_path(path)));
        }

        fn action_required(&mut self, _path: &[&ActionDef], message: &str) {
            self.0.borrow_mut().push(format!("required: {message}"));
        }
    }

    #[test]
    fn observer_sees_each_step() {
        let dir = TempDir::new().unwrap();
        let log: Log = Rc::default();
        let seen: Log = Rc::default();
        let catalog = Catalog::from_modules([patch_module(&log)]).unwrap();
        let mut runner = Runner::new(&catalog, dir.path().join(".pkgflow.json"))
            .with_observer(Recorder(Rc::clone(&seen)));

        runner.run("patch", ParamBag::new()).unwrap();
        assert_eq!(
            log_entries(&seen),
            [
                "patch.get_env",
                "patch.ensure_branch",
                "patch.update",
                "required: resolve conflicts, then continue"
            ]
        );
    }
}
