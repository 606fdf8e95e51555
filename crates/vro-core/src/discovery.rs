use crate::error::Result;
use crate::paths::MODULE_EXT;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::str::Utf8Error;
use std::sync::OnceLock;
use walkdir::WalkDir;

static MODULE_RE: OnceLock<Regex> = OnceLock::new();

fn module_re() -> &'static Regex {
    MODULE_RE.get_or_init(|| Regex::new(r"^/\*\*[ ]*@module[ ]+([\w./-]+)[ ]*\*/").unwrap())
}

/// Header line that marks a file as a convertible module.
pub fn module_header(category: &str) -> String {
    format!("/** @module {category} */\n\n")
}

/// A `.js` file whose first line carries the `@module` marker.
#[derive(Debug, Clone)]
pub struct Module {
    pub category: String,
    pub path: PathBuf,
    /// Everything after the marker line, unless it is not UTF-8.
    pub content: std::result::Result<String, Utf8Error>,
}

/// Category named on the first line of `content`, if any.
pub fn module_category(content: &str) -> Option<&str> {
    let first = content.lines().next()?;
    module_re()
        .captures(first)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Walk `root` recursively and return one [`Module`] per marked file, in
/// file-name order. A missing root yields no modules.
///
/// Only the first line decides whether a file is a module; a file whose
/// first line is not UTF-8 is not one.
pub fn discover_modules(root: &Path) -> Result<Vec<Module>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut modules = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(MODULE_EXT)
        {
            continue;
        }
        let bytes = std::fs::read(path)?;
        let (first, rest) = match bytes.iter().position(|&b| b == b'\n') {
            Some(i) => (&bytes[..i], &bytes[i + 1..]),
            None => (&bytes[..], &[][..]),
        };
        let Some(category) = std::str::from_utf8(first).ok().and_then(module_category) else {
            continue;
        };
        modules.push(Module {
            category: category.to_string(),
            path: path.to_path_buf(),
            content: std::str::from_utf8(rest).map(str::to_string),
        });
    }
    Ok(modules)
}
