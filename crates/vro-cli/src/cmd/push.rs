use super::{build::build_package, confirm, load_package, RemoteArgs};
use crate::output::print_json;
use anyhow::Context;
use clap::Args;
use std::path::Path;

#[derive(Args)]
pub struct PushArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Build the package before uploading it
    #[arg(long, short = 'b')]
    pub build: bool,

    /// With --build, refuse to upload if any action failed to convert
    #[arg(long, requires = "build")]
    pub strict: bool,
}

pub fn run(root: &Path, args: PushArgs, json: bool) -> anyhow::Result<()> {
    let remote = &args.remote;
    let (config, package) = load_package(root, &remote.package)?;
    let transport = remote.transport(&config)?;

    if !remote.yes
        && !confirm(&format!(
            "Pushing '{}' to '{}' overwrites the package on the server.",
            remote.package, remote.server
        ))?
    {
        println!("Cancelled");
        return Ok(());
    }

    let report = if args.build {
        let report = build_package(&package)?;
        report.check(args.strict)?;
        Some(report)
    } else {
        None
    };

    tracing::info!("uploading {}", package.build_path().display());
    package
        .push(&transport)
        .with_context(|| format!("failed to push '{}' to '{}'", remote.package, remote.server))?;

    if json {
        print_json(&serde_json::json!({
            "package": remote.package,
            "server": remote.server,
            "path": package.build_path(),
            "build": report,
        }))?;
    } else {
        if let Some(report) = &report {
            report.print_summary();
        }
        println!("Pushed '{}' to '{}'", remote.package, remote.server);
    }
    Ok(())
}
