use crate::output::print_json;
use anyhow::Context;
use pkgflow_core::checkpoint::Checkpoint;
use pkgflow_core::config::Config;
use pkgflow_core::paths::dotted;
use std::path::Path;

pub fn run(root: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    let state_path = config.state_path(root);
    let checkpoint = Checkpoint::load(&state_path)?;

    if json {
        #[derive(serde::Serialize)]
        struct StatusOutput<'a> {
            active: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            checkpoint: Option<&'a Checkpoint>,
        }
        return print_json(&StatusOutput {
            active: checkpoint.is_some(),
            checkpoint: checkpoint.as_ref(),
        });
    }

    let Some(checkpoint) = checkpoint else {
        println!("No action in progress.");
        return Ok(());
    };

    println!("In progress: {}", dotted(&checkpoint.action));
    if !checkpoint.args.is_empty() {
        println!();
        for (name, value) in checkpoint.args.iter() {
            let shown = match value {
                serde_json::Value::String(s) => s.clone(),
                other => serde_json::to_string(other).context("failed to render arg")?,
            };
            println!("  {name} = {shown}");
        }
    }
    Ok(())
}
