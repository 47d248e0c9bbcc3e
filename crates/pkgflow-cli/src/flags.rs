//! Command-line flags for catalog actions.
//!
//! Actions are only known once the config is loaded, so their flags are
//! built at runtime from each action's declared parameters.

use clap::{Arg, ArgAction, Command};
use pkgflow_core::{ActionDef, ParamBag, ParamSpec};
use std::ffi::OsString;

/// Build the clap command for `action`, invoked as `invoked_as` (which may be
/// an alias name). Required params already present in `preset` become
/// optional on the command line.
pub fn action_command(invoked_as: &str, action: &ActionDef, preset: &ParamBag) -> Command {
    let mut cmd = Command::new(invoked_as.to_string());
    if let Some(help) = &action.help {
        cmd = cmd.about(help.clone());
    }
    for spec in &action.required_params {
        cmd = cmd.arg(spec_arg(spec, !preset.contains(&spec.name)));
    }
    for spec in &action.optional_params {
        cmd = cmd.arg(spec_arg(spec, false));
    }
    cmd
}

fn spec_arg(spec: &ParamSpec, required: bool) -> Arg {
    let mut arg = Arg::new(spec.name.clone());
    if !spec.positional {
        arg = arg.long(spec.name.clone());
    }
    if let Some(c) = spec.shortcut {
        arg = arg.short(c);
    }
    if let Some(help) = &spec.help {
        arg = arg.help(help.clone());
    }
    if spec.flag {
        arg.action(ArgAction::SetTrue)
    } else {
        arg.action(ArgAction::Set).required(required)
    }
}

/// Parse `argv` (action name first) into a bag of the action's parameters.
/// Flags that were not given are left out so defaults further down apply.
pub fn parse_action_args(
    invoked_as: &str,
    action: &ActionDef,
    preset: &ParamBag,
    argv: Vec<OsString>,
) -> Result<ParamBag, clap::Error> {
    let matches = action_command(invoked_as, action, preset).try_get_matches_from(argv)?;

    let mut args = ParamBag::new();
    for spec in action
        .required_params
        .iter()
        .chain(action.optional_params.iter())
    {
        if spec.flag {
            if matches.get_flag(&spec.name) {
                args.insert(spec.name.clone(), true);
            }
        } else if let Some(value) = matches.get_one::<String>(&spec.name) {
            args.insert(spec.name.clone(), value.clone());
        }
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release() -> ActionDef {
        ActionDef::branch("release", vec![ActionDef::leaf("tag")])
            .required(ParamSpec::new("version").shortcut('v'))
            .optional(ParamSpec::new("package").positional())
            .optional(ParamSpec::new("no-push").flag().help("skip pushing"))
    }

    fn argv(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn parses_values_positionals_and_flags() {
        let args = parse_action_args(
            "release",
            &release(),
            &ParamBag::new(),
            argv(&["release", "zlib", "-v", "1.3", "--no-push"]),
        )
        .unwrap();
        assert_eq!(args.get_str("version"), Some("1.3"));
        assert_eq!(args.get_str("package"), Some("zlib"));
        assert_eq!(args.get("no-push"), Some(&serde_json::Value::Bool(true)));
    }

    #[test]
    fn absent_optionals_are_left_out() {
        let args =
            parse_action_args("release", &release(), &ParamBag::new(), argv(&["release", "--version", "2"]))
                .unwrap();
        assert_eq!(args.len(), 1);
        assert!(!args.contains("no-push"));
    }

    #[test]
    fn missing_required_is_an_error() {
        assert!(parse_action_args("release", &release(), &ParamBag::new(), argv(&["release"])).is_err());
        assert!(
            parse_action_args("release", &release(), &ParamBag::new(), argv(&["release", "--bogus"])).is_err()
        );
    }

    #[test]
    fn preset_params_are_not_demanded() {
        let preset = ParamBag::new().with("version", "9");
        let args =
            parse_action_args("quick", &release(), &preset, argv(&["quick"])).unwrap();
        assert!(args.is_empty());
    }

    #[test]
    fn command_is_valid() {
        action_command("quick", &release(), &ParamBag::new()).debug_assert();
    }
}
