use super::{confirm, load_package};
use crate::output::print_json;
use crate::report::{RunReport, TracingSink};
use anyhow::Context;
use std::path::Path;
use vro_core::package::Package;

pub fn run(root: &Path, name: &str, yes: bool, json: bool) -> anyhow::Result<()> {
    let (_, package) = load_package(root, name)?;
    if !yes
        && !confirm(&format!(
            "Expanding '{name}' overwrites {} and the modules in {}.",
            package.expand_target().display(),
            package.working_dir().display()
        ))?
    {
        println!("Cancelled");
        return Ok(());
    }

    let report = expand_package(&package)?;
    if json {
        print_json(&report)?;
    } else {
        report.print_summary();
    }
    Ok(())
}

/// Unzip the source archive and write one module per category.
pub fn expand_package(package: &Package) -> anyhow::Result<RunReport> {
    tracing::info!("unzipping {}", package.source().display());
    package
        .unzip()
        .with_context(|| format!("failed to unzip '{}'", package.name()))?;

    tracing::info!("writing modules to {}", package.working_dir().display());
    let mut sink = TracingSink::default();
    package
        .expand(&mut sink)
        .with_context(|| format!("failed to expand '{}'", package.name()))?;
    Ok(sink.into_report("expand", package.name()))
}
