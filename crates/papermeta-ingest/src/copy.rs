//! Copy source documents next to their sidecars under their new names.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::record::copy_file_name;

#[derive(Error, Debug)]
pub enum CopyError {
    #[error("cannot list {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopySummary {
    pub copied: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// The two sidecar fields the copy step needs. Both are optional so that
/// foreign or hand-edited JSON files are skipped instead of failing.
#[derive(Deserialize)]
struct CopyEntry {
    source: Option<String>,
    destination: Option<String>,
}

enum EntryOutcome {
    Copied(PathBuf),
    Skipped(&'static str),
}

/// For every `*.json` sidecar in `output_dir`, copy its `source` file to
/// `<output_dir>/<destination stem>.<source extension>`.
///
/// Sidecars without `source` or `destination` are skipped. Unreadable
/// sidecars and missing source files are counted as errors and logged; they
/// do not stop the remaining copies.
pub fn copy_renamed(output_dir: &Path) -> Result<CopySummary, CopyError> {
    let read_dir = std::fs::read_dir(output_dir).map_err(|source| CopyError::ReadDir {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let mut sidecars: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
        .collect();
    sidecars.sort();

    let mut summary = CopySummary::default();
    for sidecar in &sidecars {
        match copy_one(output_dir, sidecar) {
            Ok(EntryOutcome::Copied(target)) => {
                tracing::info!(sidecar = %sidecar.display(), target = %target.display(), "copied");
                summary.copied += 1;
            }
            Ok(EntryOutcome::Skipped(reason)) => {
                tracing::info!(sidecar = %sidecar.display(), reason, "skipped");
                summary.skipped += 1;
            }
            Err(message) => {
                tracing::warn!(sidecar = %sidecar.display(), error = %message, "copy failed");
                summary.errors += 1;
            }
        }
    }
    tracing::info!(
        copied = summary.copied,
        skipped = summary.skipped,
        errors = summary.errors,
        "copy finished"
    );
    Ok(summary)
}

fn copy_one(output_dir: &Path, sidecar: &Path) -> Result<EntryOutcome, String> {
    let content = std::fs::read_to_string(sidecar).map_err(|e| e.to_string())?;
    let entry: CopyEntry = serde_json::from_str(&content).map_err(|e| e.to_string())?;

    let (Some(source), Some(destination)) = (entry.source, entry.destination) else {
        return Ok(EntryOutcome::Skipped("missing source or destination"));
    };
    if source.trim().is_empty() || destination.trim().is_empty() {
        return Ok(EntryOutcome::Skipped("empty source or destination"));
    }

    let source = PathBuf::from(source);
    if !source.is_file() {
        return Err(format!("source file {} does not exist", source.display()));
    }
    let target = output_dir.join(copy_file_name(&destination, &source));
    if target == source {
        return Ok(EntryOutcome::Skipped("source is already in place"));
    }
    std::fs::copy(&source, &target).map_err(|e| format!("{}: {e}", target.display()))?;
    Ok(EntryOutcome::Copied(target))
}
