//! Daily batch: archive today's gateway CSV drops, convert them to XLSX and
//! load their energy readings into the store.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use emsdb::{DbRW, EmsDbError, NewReading};
use thiserror::Error;

use crate::config::Config;
use crate::sheet::xlsx::{self, XlsxError};

pub mod archive;
pub mod convert;
pub mod extract;

use convert::{ConvertError, Conversion};
use extract::{ExtractError, RawReading};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("source folder not found: {}", .0.display())]
    SourceFolderMissing(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum FileError {
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error("cannot read spreadsheet: {0}")]
    Sheet(#[from] XlsxError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("store operation failed: {0}")]
    Store(#[from] EmsDbError),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchSummary {
    pub copied: usize,
    pub converted: usize,
    pub loaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub readings: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} copied, {} converted, {} loaded ({} readings), {} skipped, {} failed",
            self.copied, self.converted, self.loaded, self.readings, self.skipped, self.failed
        )
    }
}

fn to_new_reading(reading: &RawReading) -> NewReading<'_> {
    NewReading {
        local_timestamp: Some(reading.local_timestamp.as_str()),
        active_energy_delivered: reading.active_energy_delivered.as_deref(),
        error: reading.error.as_deref(),
    }
}

/// Extract one spreadsheet and append its readings to the store.
///
/// Readings are committed one by one; a failure part way through keeps the
/// ones already inserted. Returns the number of readings inserted.
pub fn process_file(db_path: &Path, xlsx_path: &Path) -> Result<usize, FileError> {
    let sheet = xlsx::load(xlsx_path)?;
    let extraction = extract::extract(&sheet)?;

    let device_id = DbRW::open(db_path)?
        .resolve_or_create_device(&extraction.gateway_name, &extraction.device_name)?;

    let db = DbRW::open(db_path)?;
    let mut inserted = 0;
    for reading in extraction.readings {
        db.insert_reading(device_id, &to_new_reading(&reading))?;
        inserted += 1;
    }
    log::info!(
        "Loaded {} readings for {}/{} from {}",
        inserted,
        extraction.gateway_name,
        extraction.device_name,
        xlsx_path.display()
    );
    Ok(inserted)
}

fn convert_and_load(
    config: &Config,
    csv_path: &Path,
    summary: &mut BatchSummary,
) -> Result<usize, FileError> {
    let conversion = convert::convert(csv_path)?;
    if let Conversion::Created(_) = conversion {
        summary.converted += 1;
    }
    process_file(&config.db_path, conversion.path())
}

/// Run the daily batch for `today`.
///
/// Only a missing source folder or a failure while archiving ends the run;
/// problems with individual files are logged and counted in the summary.
pub fn run_batch(config: &Config, today: NaiveDate) -> Result<BatchSummary, BatchError> {
    let mut summary = BatchSummary::default();

    log::debug!("Discovering files in {}", config.source_dir.display());
    if !config.source_dir.is_dir() {
        return Err(BatchError::SourceFolderMissing(config.source_dir.clone()));
    }

    log::debug!("Archiving files modified on {today}");
    let archive_dir = archive::create_archive_dir(&config.archive_root, today)?;
    let stats = archive::copy_files_modified_on(&config.source_dir, &archive_dir, today)?;
    summary.copied = stats.copied;

    log::debug!("Converting and loading files in {}", archive_dir.display());
    let mut targets = HashSet::new();
    for csv_path in archive::list_csv_files(&archive_dir)? {
        // `a.csv` and `a.CSV` would both convert into `a.xlsx`
        let xlsx_path = convert::xlsx_path_for(&csv_path);
        if !targets.insert(xlsx_path.clone()) {
            log::warn!(
                "Skipping {}: {} is already produced by another file",
                csv_path.display(),
                xlsx_path.display()
            );
            summary.skipped += 1;
            continue;
        }
        match convert_and_load(config, &csv_path, &mut summary) {
            Ok(count) => {
                summary.loaded += 1;
                summary.readings += count;
            }
            Err(FileError::Extract(e)) => {
                log::warn!("Skipping {}: {}", csv_path.display(), e);
                summary.skipped += 1;
            }
            Err(e) => {
                log::error!("Error processing {}: {}", csv_path.display(), e);
                summary.failed += 1;
            }
        }
    }

    log::debug!("Batch done");
    Ok(summary)
}
