//! JSON sidecar records.
//!
//! One pretty-printed file per document, named after the record's
//! `destination_filename`. Files are written to a temporary file in the
//! target directory and renamed into place, so a failed write leaves
//! nothing behind.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use papermeta_core::MetadataRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::SIDECAR_EXTENSION;

#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid sidecar {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Serialized form of a [`MetadataRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sidecar {
    pub title: String,
    pub title_line: u32,
    pub authors: Vec<String>,
    pub authors_display: String,
    pub authors_line: u32,
    pub date: Option<String>,
    pub date_line: Option<String>,
    pub summary: String,
    pub source: String,
    pub destination: String,
}

impl From<&MetadataRecord> for Sidecar {
    fn from(record: &MetadataRecord) -> Self {
        Self {
            title: record.title.title.clone(),
            title_line: record.title.line_number,
            authors: record.authors.authors_list.clone(),
            authors_display: record.authors.authors_display.clone(),
            authors_line: record.authors.line_number,
            date: record.date.as_ref().map(|d| d.date_value.clone()),
            date_line: record.date.as_ref().map(|d| d.source_line.clone()),
            summary: record.summary.summary.clone(),
            source: record.source_path.to_string_lossy().into_owned(),
            destination: record.destination_filename.clone(),
        }
    }
}

/// Write the sidecar for `record` into `dir`, creating `dir` if needed.
///
/// A sidecar already at the destination is replaced only when it describes
/// the same source file. Otherwise the name gets a numeric suffix
/// (`Title_2.json`, `Title_3.json`, ...) and the written `destination`
/// field carries that name. Returns the path of the written file.
pub fn write_sidecar(dir: &Path, record: &MetadataRecord) -> Result<PathBuf, SidecarError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| SidecarError::Io { path, source }
    };

    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let stem = Path::new(&record.destination_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut attempt = 0usize;
    loop {
        attempt += 1;
        let name = if attempt == 1 {
            record.destination_filename.clone()
        } else {
            format!("{stem}_{attempt}.{SIDECAR_EXTENSION}")
        };
        let target = dir.join(&name);
        let mut sidecar = Sidecar::from(record);
        sidecar.destination = name;

        let replace = match read_sidecar(&target) {
            Ok(existing) => {
                if existing.source != sidecar.source {
                    continue;
                }
                true
            }
            Err(SidecarError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => false,
            // Unreadable file under this name: leave it alone.
            Err(_) => continue,
        };

        let json = serde_json::to_vec_pretty(&sidecar).map_err(|source| SidecarError::Json {
            path: target.clone(),
            source,
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err(dir))?;
        tmp.write_all(&json).map_err(io_err(tmp.path()))?;
        tmp.as_file().sync_all().map_err(io_err(tmp.path()))?;

        let persisted = if replace {
            tmp.persist(&target).map(|_| ())
        } else {
            tmp.persist_noclobber(&target).map(|_| ())
        };
        match persisted {
            Ok(()) => {
                if attempt > 1 {
                    tracing::info!(
                        path = %target.display(),
                        source = %sidecar.source,
                        "destination taken by another document, using suffixed name"
                    );
                }
                tracing::debug!(path = %target.display(), "sidecar written");
                return Ok(target);
            }
            // Another worker claimed the name between the check and the rename.
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(SidecarError::Io {
                    path: target,
                    source: e.error,
                });
            }
        }
    }
}

pub fn read_sidecar(path: &Path) -> Result<Sidecar, SidecarError> {
    let content = std::fs::read_to_string(path).map_err(|source| SidecarError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| SidecarError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use papermeta_core::{AuthorsResult, DetectedDate, SummaryResult, TitleResult};

    use super::*;

    fn record() -> MetadataRecord {
        MetadataRecord {
            title: TitleResult {
                title: "Attention Is All You Need".into(),
                line_number: 1,
            },
            authors: AuthorsResult {
                authors_display: "Ashish Vaswani, Noam Shazeer".into(),
                authors_list: vec!["Ashish Vaswani".into(), "Noam Shazeer".into()],
                line_number: 2,
            },
            date: Some(DetectedDate {
                date_value: "2017-06-12".into(),
                source_line: "arXiv, 12 June 2017".into(),
            }),
            summary: SummaryResult {
                summary: "A transformer.".into(),
            },
            source_path: PathBuf::from("/papers/1706.03762.pdf"),
            destination_filename: "Attention_Is_All_You_Need.json".into(),
        }
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("output");
        let path = write_sidecar(&out, &record()).unwrap();
        assert_eq!(path, out.join("Attention_Is_All_You_Need.json"));

        let sidecar = read_sidecar(&path).unwrap();
        assert_eq!(sidecar, Sidecar::from(&record()));
        assert_eq!(sidecar.source, "/papers/1706.03762.pdf");
        assert_eq!(sidecar.date.as_deref(), Some("2017-06-12"));

        // Only the sidecar remains; the temporary file was renamed.
        let entries: Vec<_> = std::fs::read_dir(&out).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_field_names() {
        let value = serde_json::to_value(Sidecar::from(&record())).unwrap();
        for key in [
            "title",
            "title_line",
            "authors",
            "authors_display",
            "authors_line",
            "date",
            "date_line",
            "summary",
            "source",
            "destination",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["authors"][1], "Noam Shazeer");
    }

    #[test]
    fn test_missing_date_is_null() {
        let mut r = record();
        r.date = None;
        let value = serde_json::to_value(Sidecar::from(&r)).unwrap();
        assert!(value["date"].is_null());
    }

    #[test]
    fn test_overwrite_existing() {
        let dir = tempfile::tempdir().unwrap();
        write_sidecar(dir.path(), &record()).unwrap();
        let mut second = record();
        second.summary.summary = "Updated.".into();
        let path = write_sidecar(dir.path(), &second).unwrap();
        assert_eq!(read_sidecar(&path).unwrap().summary, "Updated.");
    }

    #[test]
    fn test_same_title_from_another_source_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_sidecar(dir.path(), &record()).unwrap();

        let mut other = record();
        other.source_path = PathBuf::from("/papers/copy-of-attention.pdf");
        let second = write_sidecar(dir.path(), &other).unwrap();
        assert_eq!(second, dir.path().join("Attention_Is_All_You_Need_2.json"));
        let written = read_sidecar(&second).unwrap();
        assert_eq!(written.source, "/papers/copy-of-attention.pdf");
        assert_eq!(written.destination, "Attention_Is_All_You_Need_2.json");

        // The first document's sidecar is untouched.
        assert_eq!(read_sidecar(&first).unwrap().source, "/papers/1706.03762.pdf");

        // Re-running the second document reuses its suffixed name.
        assert_eq!(write_sidecar(dir.path(), &other).unwrap(), second);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_read_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{oops").unwrap();
        assert!(matches!(read_sidecar(&path), Err(SidecarError::Json { .. })));
    }
}
