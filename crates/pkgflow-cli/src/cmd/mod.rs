pub mod abort;
pub mod action;
pub mod list;
pub mod resume;
pub mod status;

use anyhow::Context;
use pkgflow_core::config::Config;
use pkgflow_core::{Catalog, FlowError};
use std::path::Path;

/// Build the catalog from the project's config. An empty catalog is an error
/// for every command that runs something.
fn load_catalog(root: &Path, config: &Config) -> anyhow::Result<Catalog> {
    let catalog = config
        .catalog(root)
        .context("failed to build action catalog from pkgflow.yaml")?;
    if catalog.is_empty() {
        return Err(FlowError::NotConfigured.into());
    }
    Ok(catalog)
}
