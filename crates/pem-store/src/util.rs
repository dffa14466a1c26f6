use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Result, StoreError};

#[must_use]
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

#[must_use]
pub fn to_iso(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[must_use]
pub fn now_utc_iso() -> String {
    to_iso(now_utc())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

pub fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(StoreError::MissingPath {
            path: path.to_path_buf(),
        })
    }
}

pub fn read_string(path: &Path) -> Result<String> {
    ensure_exists(path)?;
    Ok(fs::read_to_string(path)?)
}

pub fn write_string(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// File stem as UTF-8, if the path has one.
#[must_use]
pub fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_owned)
}

/// Files directly under `dir` with the given extension, sorted by path.
/// A missing directory yields an empty list.
pub fn list_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<std::path::PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{ensure_exists, list_files_with_extension, now_utc_iso, write_string};
    use crate::error::StoreError;

    #[test]
    fn write_string_creates_parent_dirs() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("a/b/c.txt");
        write_string(&path, "hello").expect("write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "hello");
    }

    #[test]
    fn ensure_exists_reports_missing_path() {
        let temp = tempdir().expect("tempdir");
        let missing = temp.path().join("nope");
        match ensure_exists(&missing).expect_err("missing") {
            StoreError::MissingPath { path } => assert_eq!(path, missing),
            other => panic!("expected MissingPath, got {other}"),
        }
    }

    #[test]
    fn listing_filters_by_extension_and_sorts() {
        let temp = tempdir().expect("tempdir");
        for name in ["b.asc", "a.ASC", "c.prj", "d.geojson"] {
            write_string(&temp.path().join(name), "").expect("write");
        }
        let files = list_files_with_extension(temp.path(), "asc").expect("list");
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, ["a.ASC", "b.asc"]);
        assert!(
            list_files_with_extension(&temp.path().join("missing"), "asc")
                .expect("missing dir")
                .is_empty()
        );
    }

    #[test]
    fn timestamps_are_utc_iso_seconds() {
        let stamp = now_utc_iso();
        assert!(stamp.ends_with('Z'));
        assert_eq!(stamp.len(), "2026-02-17T00:00:00Z".len());
    }
}
