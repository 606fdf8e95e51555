use crate::error::{Result, VroError};
use crate::paths;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DefaultPaths
// ---------------------------------------------------------------------------

/// Base directories used for any package that does not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultPaths {
    /// `<packages>/<name>.package` is the downloaded source archive.
    #[serde(default = "default_packages")]
    pub packages: PathBuf,
    /// `<expand_target>/<name>` receives the unzipped archive.
    #[serde(default = "default_expand_target")]
    pub expand_target: PathBuf,
    /// `<working_dir>/<name>` holds the JavaScript modules.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    /// `<build_target>/<name>.package` is the rebuilt archive.
    #[serde(default = "default_build_target")]
    pub build_target: PathBuf,
}

fn default_packages() -> PathBuf {
    PathBuf::from("packages")
}

fn default_expand_target() -> PathBuf {
    PathBuf::from("expanded")
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_build_target() -> PathBuf {
    PathBuf::from("build")
}

impl Default for DefaultPaths {
    fn default() -> Self {
        Self {
            packages: default_packages(),
            expand_target: default_expand_target(),
            working_dir: default_working_dir(),
            build_target: default_build_target(),
        }
    }
}

// ---------------------------------------------------------------------------
// PackageConfig / ServerConfig
// ---------------------------------------------------------------------------

/// Per-package path overrides. Each one replaces the full default path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand_target: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_target: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pwd: Option<String>,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    /// Base URL override; defaults to `https://<server name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

fn default_verify_ssl() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            user: None,
            pwd: None,
            verify_ssl: default_verify_ssl(),
            url: None,
        }
    }
}

impl ServerConfig {
    pub fn base_url(&self, server_name: &str) -> String {
        match &self.url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{server_name}"),
        }
    }
}

/// `name:` with no body is written as YAML null; treat it as all defaults.
fn entries_or_default<'de, D, T>(deserializer: D) -> std::result::Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let raw: BTreeMap<String, Option<T>> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| (k, v.unwrap_or_default()))
        .collect())
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default)]
    pub default_paths: DefaultPaths,
    #[serde(default, deserialize_with = "entries_or_default")]
    pub packages: BTreeMap<String, PackageConfig>,
    #[serde(default, deserialize_with = "entries_or_default")]
    pub vro_servers: BTreeMap<String, ServerConfig>,
}

/// On-disk shape: everything lives under a top-level `vrocli` key.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    vrocli: Config,
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(VroError::NotConfigured(root.to_path_buf()));
        }
        let data = std::fs::read_to_string(&path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(data)?;
        Ok(file.vrocli)
    }

    pub fn package(&self, name: &str) -> Result<&PackageConfig> {
        self.packages
            .get(name)
            .ok_or_else(|| VroError::PackageNotConfigured(name.to_string()))
    }

    pub fn server(&self, name: &str) -> Result<&ServerConfig> {
        self.vro_servers
            .get(name)
            .ok_or_else(|| VroError::ServerNotConfigured(name.to_string()))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if let Some(level) = &self.log_level {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("unknown log_level '{level}'"),
                });
            }
        }

        if self.packages.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no packages configured".to_string(),
            });
        }

        for (name, server) in &self.vro_servers {
            if server.user.is_none() || server.pwd.is_none() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "server '{name}' has no stored credentials; pass --user/--password"
                    ),
                });
            }
            if !server.verify_ssl {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("server '{name}' disables certificate verification"),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
