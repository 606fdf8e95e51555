use super::{confirm, load_package};
use crate::output::print_json;
use crate::report::{RunReport, TracingSink};
use anyhow::Context;
use clap::Args;
use std::path::Path;
use vro_core::package::Package;

#[derive(Args)]
pub struct BuildArgs {
    /// Package name as configured in .vrocli.yml
    #[arg(long, short = 'p')]
    pub package: String,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Exit with an error if any action failed to convert
    #[arg(long)]
    pub strict: bool,
}

pub fn run(root: &Path, args: BuildArgs, json: bool) -> anyhow::Result<()> {
    let (_, package) = load_package(root, &args.package)?;
    if !args.yes
        && !confirm(&format!(
            "Building '{}' rewrites actions in {} and replaces {}.",
            args.package,
            package.expand_target().display(),
            package.build_path().display()
        ))?
    {
        println!("Cancelled");
        return Ok(());
    }

    let report = build_package(&package)?;
    if json {
        print_json(&report)?;
    } else {
        report.print_summary();
        println!("Wrote {}", package.build_path().display());
    }
    report.check(args.strict)
}

/// Convert the working modules back to XML items and zip the package.
pub fn build_package(package: &Package) -> anyhow::Result<RunReport> {
    tracing::info!("reading modules from {}", package.working_dir().display());
    let mut sink = TracingSink::default();
    package
        .build(&mut sink)
        .with_context(|| format!("failed to build '{}'", package.name()))?;
    tracing::info!("wrote {}", package.build_path().display());
    Ok(sink.into_report("build", package.name()))
}
