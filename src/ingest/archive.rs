use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};

use super::convert::CSV_EXT;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CopyStats {
    pub copied: usize,
    pub already_archived: usize,
}

/// `<root>/<YYYY>/<MM>/<ddMMyyyy>`
pub fn archive_dir(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(date.format("%Y").to_string())
        .join(date.format("%m").to_string())
        .join(date.format("%d%m%Y").to_string())
}

pub fn create_archive_dir(root: &Path, date: NaiveDate) -> io::Result<PathBuf> {
    let dir = archive_dir(root, date);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn has_csv_ext(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(CSV_EXT))
}

/// CSV files directly inside `dir`, sorted by name.
pub fn list_csv_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && has_csv_ext(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Last-modified date in the local time zone
pub fn modified_date(path: &Path) -> io::Result<NaiveDate> {
    let modified: DateTime<Local> = fs::metadata(path)?.modified()?.into();
    Ok(modified.date_naive())
}

/// Copy the CSV files modified on `date` from `source` into `dest`.
///
/// A file whose name already exists in `dest` is left alone.
pub fn copy_files_modified_on(source: &Path, dest: &Path, date: NaiveDate) -> io::Result<CopyStats> {
    let mut stats = CopyStats::default();
    for path in list_csv_files(source)? {
        if modified_date(&path)? != date {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let target = dest.join(file_name);
        if target.exists() {
            log::debug!("{} already archived", target.display());
            stats.already_archived += 1;
            continue;
        }
        fs::copy(&path, &target)?;
        log::info!("Archived {} to {}", path.display(), target.display());
        stats.copied += 1;
    }
    Ok(stats)
}
