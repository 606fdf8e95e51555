use super::{confirm, expand::expand_package, load_package, RemoteArgs};
use crate::output::print_json;
use anyhow::Context;
use clap::Args;
use std::path::Path;

#[derive(Args)]
pub struct PullArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Expand the package after downloading it
    #[arg(long, short = 'e')]
    pub expand: bool,
}

pub fn run(root: &Path, args: PullArgs, json: bool) -> anyhow::Result<()> {
    let remote = &args.remote;
    let (config, package) = load_package(root, &remote.package)?;
    let transport = remote.transport(&config)?;

    if !remote.yes
        && !confirm(&format!(
            "Pulling '{}' from '{}' overwrites {}.",
            remote.package,
            remote.server,
            package.source().display()
        ))?
    {
        println!("Cancelled");
        return Ok(());
    }

    tracing::info!("downloading '{}' from '{}'", remote.package, remote.server);
    package
        .pull(&transport)
        .with_context(|| format!("failed to pull '{}' from '{}'", remote.package, remote.server))?;

    let report = if args.expand {
        Some(expand_package(&package)?)
    } else {
        None
    };

    if json {
        print_json(&serde_json::json!({
            "package": remote.package,
            "server": remote.server,
            "path": package.source(),
            "expand": report,
        }))?;
    } else {
        println!("Pulled '{}' to {}", remote.package, package.source().display());
        if let Some(report) = &report {
            report.print_summary();
        }
    }
    Ok(())
}
