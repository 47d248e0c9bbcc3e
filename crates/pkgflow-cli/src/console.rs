use pkgflow_core::paths::dotted;
use pkgflow_core::{ActionDef, Observer, ParamBag};

/// Prints progress to stderr so stdout stays clean for `--json`.
pub struct ConsoleObserver {
    pub headers: bool,
}

impl Observer for ConsoleObserver {
    fn action_started(&mut self, root: &ActionDef, args: &ParamBag) {
        let names: Vec<&str> = args.keys().collect();
        tracing::debug!(action = %root.name, args = ?names, "console: start");
    }

    fn action_resumed(&mut self, path: &[&ActionDef]) {
        let names: Vec<&str> = path.iter().map(|a| a.name.as_str()).collect();
        eprintln!("Resuming {}", dotted(&names));
    }

    fn step_started(&mut self, path: &[&ActionDef]) {
        if !self.headers {
            return;
        }
        // Atomic actions run as a single unit and get no per-step headers.
        let Some(root) = path.first() else { return };
        if root.atomic || path.len() < 2 {
            return;
        }
        if let Some(step) = path.last() {
            eprintln!("## {}", step.name);
        }
    }
}
