//! Plan file loading
//!
//! Reads plan documents from disk and parses them with the domain parsers.
//! The format is detected from the file extension:
//!
//! | Extension | Format |
//! |-----------|--------|
//! | `.json` | structured document |
//! | `.toml` | structured document |
//! | `.md`, `.markdown` | heading-based document (lossy import) |
//!
//! Loading a directory into a [`PlanLibrary`] is lenient: files with an
//! unknown extension are ignored, unparsable files are reported and skipped.

use mender_domain::{DomainError, Plan, PlanFormat, PlanLibrary, parse_plan};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while loading plan files.
#[derive(Error, Debug)]
pub enum PlanLoadError {
    #[error("Cannot read plan file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot detect plan format of {0} (expected .json, .toml or .md)")]
    UnknownFormat(PathBuf),

    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: DomainError,
    },
}

/// Load one plan file, detecting its format from the extension.
pub fn load_plan_file(path: &Path) -> Result<Plan, PlanLoadError> {
    let format =
        PlanFormat::from_path(path).ok_or_else(|| PlanLoadError::UnknownFormat(path.into()))?;
    load_plan_file_as(path, format)
}

/// Load one plan file in an explicit format.
pub fn load_plan_file_as(path: &Path, format: PlanFormat) -> Result<Plan, PlanLoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| PlanLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_plan(&text, format).map_err(|source| PlanLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Result of loading plan directories.
#[derive(Debug, Default)]
pub struct PlanLoadReport {
    /// Names of the plans added, in load order
    pub loaded: Vec<String>,
    pub errors: Vec<PlanLoadError>,
}

/// Load every plan file found directly in `dirs` into `library`.
///
/// Files are visited in name order per directory; a later plan with the same
/// name replaces an earlier one.
pub fn load_plan_dirs(library: &mut PlanLibrary, dirs: &[PathBuf]) -> PlanLoadReport {
    let mut report = PlanLoadReport::default();

    for dir in dirs {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "Plan directory does not exist");
                continue;
            }
            Err(source) => {
                report.errors.push(PlanLoadError::Io {
                    path: dir.clone(),
                    source,
                });
                continue;
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && PlanFormat::from_path(path).is_some())
            .collect();
        files.sort();

        for path in files {
            match load_plan_file(&path) {
                Ok(plan) => {
                    debug!(plan = %plan.name, path = %path.display(), "Loaded plan");
                    report.loaded.push(plan.name.clone());
                    if let Some(previous) = library.insert(plan) {
                        warn!(plan = %previous.name, path = %path.display(), "Plan replaced by a later file");
                    }
                }
                Err(e) => {
                    warn!("Skipping plan file: {}", e);
                    report.errors.push(e);
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_PLAN: &str = r#"
name = "backup"
version = "1.0.0"

[[steps]]
id = "dump"
tool = "run_command"
inputs = { command = "echo dump" }
"#;

    const MARKDOWN_PLAN: &str = "# Workflow: notify\n\n## Objective\nTell the team.\n\n## Steps\n1. **announce**: use the echo tool to announce\n";

    #[test]
    fn test_load_plan_file_detects_format() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("backup.toml");
        let md_path = dir.path().join("notify.md");
        std::fs::write(&toml_path, TOML_PLAN).unwrap();
        std::fs::write(&md_path, MARKDOWN_PLAN).unwrap();

        let backup = load_plan_file(&toml_path).unwrap();
        assert_eq!(backup.name, "backup");
        assert_eq!(backup.steps[0].tool, "run_command");

        let notify = load_plan_file(&md_path).unwrap();
        assert_eq!(notify.name, "notify");
        assert_eq!(notify.steps[0].id, "announce");
    }

    #[test]
    fn test_unknown_extension() {
        let err = load_plan_file(Path::new("plan.yaml")).unwrap_err();
        assert!(matches!(err, PlanLoadError::UnknownFormat(_)));
    }

    #[test]
    fn test_load_plan_dirs_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_backup.toml"), TOML_PLAN).unwrap();
        std::fs::write(dir.path().join("b_broken.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

        let mut library = PlanLibrary::new();
        let report = load_plan_dirs(
            &mut library,
            &[dir.path().to_path_buf(), dir.path().join("missing")],
        );

        assert_eq!(report.loaded, vec!["backup".to_string()]);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(report.errors[0], PlanLoadError::Parse { .. }));
        assert!(library.get("backup").is_some());
    }
}
