use crate::console::ConsoleObserver;
use crate::output::print_outcome;
use pkgflow_core::config::Config;
use pkgflow_core::Runner;
use std::path::Path;

pub fn run(root: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    let catalog = super::load_catalog(root, config)?;
    let observer = ConsoleObserver {
        headers: config.step_headers && !json,
    };
    let mut runner = Runner::new(&catalog, config.state_path(root)).with_observer(observer);
    let outcome = runner.resume()?;
    print_outcome(&outcome, json)
}
