use crate::output::{print_json, print_table};
use pkgflow_core::config::Config;
use pkgflow_core::ActionDef;
use std::path::Path;

pub fn run(root: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    let catalog = super::load_catalog(root, config)?;

    if json {
        #[derive(serde::Serialize)]
        struct ListEntry<'a> {
            name: &'a str,
            module: &'a str,
            depth: usize,
            #[serde(skip_serializing_if = "Option::is_none")]
            alias: Option<&'a str>,
            continuable: bool,
            atomic: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            help: Option<&'a str>,
        }

        let mut entries = Vec::new();
        for action in catalog.actions() {
            action.walk(&mut |a, depth| {
                entries.push(ListEntry {
                    name: &a.name,
                    module: a.module_name(),
                    depth,
                    alias: a.alias_target(),
                    continuable: a.continuable,
                    atomic: a.atomic,
                    help: a.help.as_deref(),
                });
            });
        }
        return print_json(&entries);
    }

    let mut rows = Vec::new();
    for action in catalog.actions() {
        action.walk(&mut |a, depth| {
            rows.push(vec![
                format!("{}{}", "  ".repeat(depth), a.name),
                a.module_name().to_string(),
                describe(a),
                a.help.clone().unwrap_or_default(),
            ]);
        });
    }
    print_table(&["ACTION", "MODULE", "FLAGS", "HELP"], rows);
    Ok(())
}

fn describe(action: &ActionDef) -> String {
    let mut flags = Vec::new();
    if let Some(target) = action.alias_target() {
        flags.push(format!("alias -> {target}"));
    }
    if action.continuable {
        flags.push("continuable".to_string());
    }
    if action.atomic {
        flags.push("atomic".to_string());
    }
    flags.join(", ")
}
