use crate::console::ConsoleObserver;
use crate::flags::parse_action_args;
use crate::output::print_outcome;
use pkgflow_core::config::Config;
use pkgflow_core::Runner;
use std::ffi::OsString;
use std::path::Path;

/// Start an action. `argv[0]` is the action name, the rest are its flags.
pub fn run(root: &Path, config: &Config, argv: Vec<OsString>, json: bool) -> anyhow::Result<()> {
    let catalog = super::load_catalog(root, config)?;
    let name = argv
        .first()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    // An alias takes the flags of the action it points to.
    let (target, mut preset) = catalog.resolve(&name)?;
    preset.merge(target.const_params.clone());
    preset.merge_missing(&config.defaults);

    let mut args = match parse_action_args(&name, target, &preset, argv) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };
    args.merge_missing(&config.defaults);

    let observer = ConsoleObserver {
        headers: config.step_headers && !json,
    };
    let mut runner = Runner::new(&catalog, config.state_path(root)).with_observer(observer);
    let outcome = runner.run(&name, args)?;
    print_outcome(&outcome, json)
}
