use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VroError {
    #[error("not configured: no .vrocli.yml found in {0}")]
    NotConfigured(PathBuf),

    #[error("package '{0}' is not configured: add it to .vrocli.yml before using it")]
    PackageNotConfigured(String),

    #[error("server '{0}' is not configured: add it to .vrocli.yml before using it")]
    ServerNotConfigured(String),

    #[error("missing credentials for server '{0}'")]
    MissingCredentials(String),

    #[error("package archive not found: {0}")]
    ArchiveNotFound(PathBuf),

    #[error("package has not been expanded: {0} does not exist")]
    NotExpanded(PathBuf),

    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("element directory does not exist: {0}")]
    MissingElementDir(PathBuf),

    #[error("missing id comment in action of module '{module}': {snippet}")]
    MissingId { module: String, snippet: String },

    #[error("invalid id '{0}': must match [A-Za-z0-9_-]+")]
    InvalidId(String),

    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, VroError>;
