//! The expand / build pipeline for one package.
//!
//! ```text
//!  pull ──► source.package ──unzip──► expand_target/elements/<id>/{data,categories}
//!                                            │ expand            ▲ build
//!                                            ▼                   │
//!                                   working_dir/<category>.js ───┘
//!  push ◄── build.package ◄──rebuild── expand_target/
//! ```
//!
//! Per-item problems are reported on the [`OutcomeSink`]; only fatal
//! conditions (missing archive, unwritable directories, I/O) return `Err`.

use crate::action::Action;
use crate::config::Config;
use crate::discovery::{self, module_header};
use crate::error::{Result, VroError};
use crate::outcome::{Outcome, OutcomeSink};
use crate::script::{self, ScriptUnit};
use crate::transport::PackageTransport;
use crate::xml::{self, ElementRead};
use crate::{io, paths};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    name: String,
    source: PathBuf,
    expand_target: PathBuf,
    working_dir: PathBuf,
    build: PathBuf,
}

impl Package {
    pub fn new(
        name: impl Into<String>,
        source: PathBuf,
        expand_target: PathBuf,
        working_dir: PathBuf,
        build: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            expand_target,
            working_dir,
            build,
        }
    }

    /// Resolve the four locations of a configured package against `root`.
    pub fn resolve(name: &str, config: &Config, root: &Path) -> Result<Self> {
        let pkg = config.package(name)?;
        let defaults = &config.default_paths;
        let abs = |p: PathBuf| std::path::absolute(root.join(p));

        Ok(Self {
            name: name.to_string(),
            source: abs(pkg
                .package
                .clone()
                .unwrap_or_else(|| paths::package_file(&defaults.packages, name)))?,
            expand_target: abs(pkg
                .expand_target
                .clone()
                .unwrap_or_else(|| defaults.expand_target.join(name)))?,
            working_dir: abs(pkg
                .working_dir
                .clone()
                .unwrap_or_else(|| defaults.working_dir.join(name)))?,
            build: abs(pkg
                .build_target
                .clone()
                .unwrap_or_else(|| paths::package_file(&defaults.build_target, name)))?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn expand_target(&self) -> &Path {
        &self.expand_target
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn build_path(&self) -> &Path {
        &self.build
    }

    // -----------------------------------------------------------------------
    // Archive boundary
    // -----------------------------------------------------------------------

    /// Extract the source archive verbatim into the expansion directory.
    pub fn unzip(&self) -> Result<()> {
        if !self.source.is_file() {
            return Err(VroError::ArchiveNotFound(self.source.clone()));
        }
        io::ensure_dir(&self.expand_target)?;
        let mut archive = ZipArchive::new(File::open(&self.source)?)?;
        archive.extract(&self.expand_target)?;
        Ok(())
    }

    /// Zip the whole expansion directory into the build archive.
    pub fn rebuild(&self) -> Result<()> {
        if !self.expand_target.is_dir() {
            return Err(VroError::NotExpanded(self.expand_target.clone()));
        }
        if let Some(parent) = self.build.parent() {
            io::ensure_dir(parent)?;
        }
        let mut zip = ZipWriter::new(File::create(&self.build)?);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in WalkDir::new(&self.expand_target).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || entry.path() == self.build {
                continue;
            }
            zip.start_file(entry_name(entry.path(), entry.depth()), options)?;
            let mut file = File::open(entry.path())?;
            std::io::copy(&mut file, &mut zip)?;
        }
        zip.finish()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Expand: XML items -> JavaScript modules
    // -----------------------------------------------------------------------

    /// Convert every action item of the expanded package into module files.
    ///
    /// Each category file is truncated once, the first time the category is
    /// seen in this run, and appended to afterwards.
    pub fn expand(&self, sink: &mut dyn OutcomeSink) -> Result<()> {
        io::ensure_dir(&self.working_dir)?;
        let mut seen: HashSet<String> = HashSet::new();

        for id in element_ids(&self.expand_target)? {
            let draft = match xml::read_element(&self.expand_target, &id) {
                Ok(ElementRead::Action(draft)) => draft,
                Ok(ElementRead::NotAnAction(reason)) => {
                    sink.report(Outcome::Skipped {
                        unit: id,
                        reason: reason.to_string(),
                    });
                    continue;
                }
                Err(e) => {
                    sink.report(Outcome::Failed {
                        unit: id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !is_safe_category(&draft.category) {
                sink.report(Outcome::Failed {
                    unit: id,
                    reason: format!("category '{}' cannot be used as a file name", draft.category),
                });
                continue;
            }

            let (action, warning) = Action::construct(draft);
            if let Some(w) = warning {
                sink.report(Outcome::Warning {
                    unit: id.clone(),
                    message: w.to_string(),
                });
            }

            let module = paths::module_file(&self.working_dir, action.category());
            if seen.insert(action.category().to_string()) {
                io::truncate_text(&module, &module_header(action.category()))?;
            }
            action.append_script(&module)?;
            sink.report(converted(&action));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Build: JavaScript modules -> XML items -> archive
    // -----------------------------------------------------------------------

    /// Write the XML item of every action found in the working directory.
    pub fn convert_modules(&self, sink: &mut dyn OutcomeSink) -> Result<()> {
        for module in discovery::discover_modules(&self.working_dir)? {
            let content = match &module.content {
                Ok(content) => content,
                Err(e) => {
                    sink.report(Outcome::Failed {
                        unit: module.path.display().to_string(),
                        reason: format!("module is not valid UTF-8: {e}"),
                    });
                    continue;
                }
            };
            let units = match script::extract_module(&module.category, content) {
                Ok(units) => units,
                Err(e @ VroError::MissingId { .. }) => {
                    sink.report(Outcome::Failed {
                        unit: module.path.display().to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };
            for unit in units {
                self.render_unit(unit, sink)?;
            }
        }
        Ok(())
    }

    fn render_unit(&self, unit: ScriptUnit, sink: &mut dyn OutcomeSink) -> Result<()> {
        let draft = match unit.parsed {
            Ok(draft) => draft,
            Err(e) => {
                sink.report(Outcome::Failed {
                    unit: unit.id,
                    reason: format!("invalid action syntax: {e}"),
                });
                return Ok(());
            }
        };
        let (action, warning) = Action::construct(draft);
        if let Some(w) = warning {
            sink.report(Outcome::Warning {
                unit: unit.id.clone(),
                message: w.to_string(),
            });
        }
        match action.write_xml(&self.expand_target) {
            Ok(()) => sink.report(converted(&action)),
            Err(e @ (VroError::MissingElementDir(_) | VroError::InvalidId(_))) => {
                sink.report(Outcome::Failed {
                    unit: unit.id,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// [`convert_modules`](Self::convert_modules) followed by [`rebuild`](Self::rebuild).
    pub fn build(&self, sink: &mut dyn OutcomeSink) -> Result<()> {
        if !self.expand_target.is_dir() {
            return Err(VroError::NotExpanded(self.expand_target.clone()));
        }
        self.convert_modules(sink)?;
        self.rebuild()
    }

    // -----------------------------------------------------------------------
    // Remote transfer
    // -----------------------------------------------------------------------

    /// Download the package into the source archive path.
    pub fn pull(&self, transport: &dyn PackageTransport) -> Result<()> {
        let bytes = transport.fetch_package_bytes(&self.name)?;
        io::atomic_write(&self.source, &bytes)
    }

    /// Upload the build archive.
    pub fn push(&self, transport: &dyn PackageTransport) -> Result<()> {
        if !self.build.is_file() {
            return Err(VroError::ArchiveNotFound(self.build.clone()));
        }
        let bytes = std::fs::read(&self.build)?;
        transport.send_package_bytes(&self.name, bytes)
    }
}

fn converted(action: &Action) -> Outcome {
    Outcome::Converted {
        id: action.id().to_string(),
        name: action.name().to_string(),
        category: action.category().to_string(),
    }
}

/// Immediate subdirectories of `elements/`, sorted. Missing means none.
fn element_ids(expand_root: &Path) -> Result<Vec<String>> {
    let dir = paths::elements_dir(expand_root);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            ids.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    ids.sort();
    Ok(ids)
}

/// Categories become file names under the working directory; they must stay
/// inside it.
fn is_safe_category(category: &str) -> bool {
    !category.is_empty()
        && Path::new(category)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// Archive name of a walked file: its last `depth` components joined by `/`.
fn entry_name(path: &Path, depth: usize) -> String {
    let parts: Vec<_> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    parts[parts.len().saturating_sub(depth)..].join("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
