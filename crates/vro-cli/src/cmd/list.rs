use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::ValueEnum;
use std::path::Path;
use vro_core::config::Config;
use vro_core::package::Package;

#[derive(Clone, Copy, ValueEnum)]
pub enum ListItem {
    Servers,
    Packages,
}

pub fn run(root: &Path, item: ListItem, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    match item {
        ListItem::Servers => servers(&config, json),
        ListItem::Packages => packages(root, &config, json),
    }
}

fn servers(config: &Config, json: bool) -> anyhow::Result<()> {
    if json {
        let list: Vec<_> = config
            .vro_servers
            .iter()
            .map(|(name, s)| {
                serde_json::json!({
                    "name": name,
                    "url": s.base_url(name),
                    "user": s.user,
                    "verify_ssl": s.verify_ssl,
                })
            })
            .collect();
        return print_json(&list);
    }

    if config.vro_servers.is_empty() {
        println!("No servers configured.");
        return Ok(());
    }
    let rows = config
        .vro_servers
        .iter()
        .map(|(name, s)| {
            vec![
                name.clone(),
                s.base_url(name),
                s.user.clone().unwrap_or_else(|| "-".to_string()),
                s.verify_ssl.to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "URL", "USER", "VERIFY_SSL"], rows);
    Ok(())
}

fn packages(root: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    let resolved = config
        .packages
        .keys()
        .map(|name| Package::resolve(name, config, root))
        .collect::<Result<Vec<_>, _>>()
        .context("failed to resolve package paths")?;

    if json {
        let list: Vec<_> = resolved
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name(),
                    "package": p.source(),
                    "expand_target": p.expand_target(),
                    "working_dir": p.working_dir(),
                    "build_target": p.build_path(),
                })
            })
            .collect();
        return print_json(&list);
    }

    if resolved.is_empty() {
        println!("No packages configured.");
        return Ok(());
    }
    let rows = resolved
        .iter()
        .map(|p| {
            vec![
                p.name().to_string(),
                p.source().display().to_string(),
                p.working_dir().display().to_string(),
                p.build_path().display().to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "PACKAGE", "WORKING_DIR", "BUILD"], rows);
    Ok(())
}
