use std::path::{Path, PathBuf};
use tracing::Level;
use vro_core::{config::Config, paths};

/// Resolve the project root directory.
///
/// Priority:
/// 1. `--root` flag / `VROCLI_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.vrocli.yml`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_config_root(&cwd).unwrap_or(cwd)
}

fn find_config_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| paths::config_path(dir).is_file())
        .map(Path::to_path_buf)
}

/// `-v` wins, then the configured `log_level`, then info.
///
/// An unreadable config is not an error here; the command that needs it
/// reports that.
pub fn log_level(root: &Path, verbose: bool) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    Config::load(root)
        .ok()
        .and_then(|c| c.log_level)
        .and_then(|l| l.parse().ok())
        .unwrap_or(Level::INFO)
}
