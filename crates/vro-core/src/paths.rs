use crate::error::{Result, VroError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = ".vrocli.yml";

/// Directory inside an expanded package holding one subdirectory per item.
pub const ELEMENTS_DIR: &str = "elements";
pub const DATA_FILE: &str = "data";
pub const CATEGORIES_FILE: &str = "categories";

pub const MODULE_EXT: &str = "js";
pub const PACKAGE_EXT: &str = "package";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn elements_dir(expand_root: &Path) -> PathBuf {
    expand_root.join(ELEMENTS_DIR)
}

pub fn element_dir(expand_root: &Path, id: &str) -> PathBuf {
    elements_dir(expand_root).join(id)
}

pub fn element_data(expand_root: &Path, id: &str) -> PathBuf {
    element_dir(expand_root, id).join(DATA_FILE)
}

pub fn element_categories(expand_root: &Path, id: &str) -> PathBuf {
    element_dir(expand_root, id).join(CATEGORIES_FILE)
}

/// `<working_dir>/<category>.js`
pub fn module_file(working_dir: &Path, category: &str) -> PathBuf {
    working_dir.join(format!("{category}.{MODULE_EXT}"))
}

pub fn package_file(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{PACKAGE_EXT}"))
}

// ---------------------------------------------------------------------------
// Id validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[\w-]+$").unwrap())
}

/// Ids name directories under `elements/`, so they must be a single path segment.
pub fn validate_id(id: &str) -> Result<()> {
    if !id_re().is_match(id) {
        return Err(VroError::InvalidId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
