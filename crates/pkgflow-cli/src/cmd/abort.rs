use crate::output::print_json;
use pkgflow_core::checkpoint::Checkpoint;
use pkgflow_core::config::Config;
use pkgflow_core::paths::dotted;
use pkgflow_core::{Catalog, Runner};
use std::path::Path;

/// Discard the checkpoint. Works without any configured actions and on a
/// checkpoint that no longer parses.
pub fn run(root: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    let state_path = config.state_path(root);
    let previous = Checkpoint::load(&state_path)
        .ok()
        .flatten()
        .map(|c| dotted(&c.action));

    let catalog = Catalog::new();
    let removed = Runner::new(&catalog, &state_path).abort()?;

    if json {
        #[derive(serde::Serialize)]
        struct AbortOutput {
            aborted: bool,
            action: Option<String>,
        }
        return print_json(&AbortOutput {
            aborted: removed,
            action: previous,
        });
    }

    match (removed, previous) {
        (true, Some(action)) => println!("Aborted {action}."),
        (true, None) => println!("Aborted."),
        (false, _) => println!("No action in progress."),
    }
    Ok(())
}
