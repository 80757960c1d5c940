use std::fs;
use std::path::Path;

use emsdb::{DbRO, DbRW};
use ems_ingest::ingest::{self, archive, BatchError};
use ems_ingest::Config;
use tempfile::TempDir;

mod stubs;

struct Workspace {
    _dir: TempDir,
    config: Config,
}

fn workspace() -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        source_dir: dir.path().join("drop"),
        archive_root: dir.path().join("archive"),
        db_path: dir.path().join("db/ems.db"),
    };
    fs::create_dir_all(&config.source_dir).unwrap();
    Workspace { _dir: dir, config }
}

fn drop_file(config: &Config, name: &str, content: &str) -> chrono::NaiveDate {
    drop_bytes(config, name, content.as_bytes())
}

fn drop_bytes(config: &Config, name: &str, content: &[u8]) -> chrono::NaiveDate {
    let path = config.source_dir.join(name);
    fs::write(&path, content).unwrap();
    archive::modified_date(&path).unwrap()
}

fn device_count(db_path: &Path) -> usize {
    DbRO::open(db_path).unwrap().devices().unwrap().len()
}

#[test]
fn sample_export_is_archived_converted_and_loaded() {
    let ws = workspace();
    let today = drop_file(&ws.config, "gw1.csv", stubs::csv::SAMPLE_EXPORT);

    let summary = ingest::run_batch(&ws.config, today).unwrap();
    assert_eq!(summary.copied, 1);
    assert_eq!(summary.converted, 1);
    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.readings, 2);

    let archive_dir = archive::archive_dir(&ws.config.archive_root, today);
    assert!(archive_dir.join("gw1.csv").is_file());
    assert!(archive_dir.join("gw1.xlsx").is_file());

    let db = DbRO::open(&ws.config.db_path).unwrap();
    let devices = db.devices().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].gateway_name, "GW1");
    assert_eq!(devices[0].device_name, "DEV1");

    let readings = db.readings_for_device(devices[0].device_id).unwrap();
    let timestamps: Vec<&str> = readings.iter().map(|r| r.local_timestamp.as_str()).collect();
    assert_eq!(timestamps, vec!["2024-01-01T00:00", "2024-01-01T01:00"]);
    assert_eq!(readings[0].active_energy_delivered, "12.5");
    assert_eq!(readings[1].active_energy_delivered, "13.0");
    assert_eq!(readings[1].error, "0");
}

#[test]
fn rerun_keeps_spreadsheet_but_loads_readings_again() {
    let ws = workspace();
    let today = drop_file(&ws.config, "gw1.csv", stubs::csv::SAMPLE_EXPORT);

    ingest::run_batch(&ws.config, today).unwrap();
    let xlsx_path = archive::archive_dir(&ws.config.archive_root, today).join("gw1.xlsx");
    let first_bytes = fs::read(&xlsx_path).unwrap();

    let summary = ingest::run_batch(&ws.config, today).unwrap();
    assert_eq!(summary.copied, 0);
    assert_eq!(summary.converted, 0);
    assert_eq!(summary.loaded, 1);
    assert_eq!(fs::read(&xlsx_path).unwrap(), first_bytes);

    // Loading is not deduplicated
    let db = DbRO::open(&ws.config.db_path).unwrap();
    let devices = db.devices().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(db.count_readings(devices[0].device_id).unwrap(), 4);
}

#[test]
fn file_without_error_column_is_skipped() {
    let ws = workspace();
    let today = drop_file(&ws.config, "a_broken.csv", stubs::csv::MISSING_ERROR_COLUMN);
    drop_file(&ws.config, "b_good.csv", stubs::csv::SAMPLE_EXPORT);

    let summary = ingest::run_batch(&ws.config, today).unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.readings, 2);

    // Only the good file registered a device
    let db = DbRO::open(&ws.config.db_path).unwrap();
    assert_eq!(db.device_id("GW9", "DEV9").unwrap(), None);
    assert_eq!(device_count(&ws.config.db_path), 1);
}

#[test]
fn export_with_byte_order_mark_is_loaded() {
    let ws = workspace();
    let mut content = b"\xEF\xBB\xBF".to_vec();
    content.extend_from_slice(stubs::csv::SAMPLE_EXPORT.as_bytes());
    let today = drop_bytes(&ws.config, "gw1.csv", &content);

    let summary = ingest::run_batch(&ws.config, today).unwrap();
    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.readings, 2);

    let db = DbRO::open(&ws.config.db_path).unwrap();
    assert!(db.device_id("GW1", "DEV1").unwrap().is_some());
}

#[test]
fn export_with_invalid_utf8_is_loaded() {
    let ws = workspace();
    // Last reading's Error cell holds a lone Latin-1 degree sign
    let mut content = stubs::csv::SAMPLE_EXPORT
        .strip_suffix('0')
        .unwrap()
        .as_bytes()
        .to_vec();
    content.push(0xB0);
    let today = drop_bytes(&ws.config, "gw1.csv", &content);

    let summary = ingest::run_batch(&ws.config, today).unwrap();
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.readings, 2);

    let db = DbRO::open(&ws.config.db_path).unwrap();
    let device_id = db.device_id("GW1", "DEV1").unwrap().unwrap();
    let readings = db.readings_for_device(device_id).unwrap();
    assert_eq!(readings[0].error, "0");
    assert_eq!(readings[1].error, "\u{FFFD}");
}

#[test]
fn store_failure_keeps_earlier_readings_and_continues() {
    let ws = workspace();
    drop(DbRW::open(&ws.config.db_path).unwrap());
    let conn = rusqlite::Connection::open(&ws.config.db_path).unwrap();
    conn.execute_batch(
        "DROP TABLE energy_readings;
        CREATE TABLE energy_readings (
            device_id INTEGER NOT NULL REFERENCES device (device_id),
            local_timestamp TEXT NOT NULL CHECK (local_timestamp <> 'BAD'),
            active_energy_delivered TEXT NOT NULL,
            error TEXT NOT NULL
        );",
    )
    .unwrap();
    drop(conn);

    let today = drop_file(
        &ws.config,
        "a_partial.csv",
        "Gateway Name,Device Name\nGWP,DEVP\n\
        Local Time Stamp,Active energy delivered (Wh),Error\n\
        t1,1,0\nBAD,2,0\nt3,3,0\n",
    );
    drop_file(&ws.config, "b_good.csv", stubs::csv::SAMPLE_EXPORT);

    let summary = ingest::run_batch(&ws.config, today).unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.readings, 2);

    let db = DbRO::open(&ws.config.db_path).unwrap();
    let partial = db.device_id("GWP", "DEVP").unwrap().unwrap();
    let readings = db.readings_for_device(partial).unwrap();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].local_timestamp, "t1");
    let good = db.device_id("GW1", "DEV1").unwrap().unwrap();
    assert_eq!(db.count_readings(good).unwrap(), 2);
}

#[test]
fn csv_names_differing_only_in_case_are_loaded_once() {
    let ws = workspace();
    let today = drop_file(&ws.config, "gw1.csv", stubs::csv::SAMPLE_EXPORT);
    drop_file(&ws.config, "gw1.CSV", stubs::csv::SAMPLE_EXPORT);

    let summary = ingest::run_batch(&ws.config, today).unwrap();
    assert_eq!(summary.copied, 2);
    assert_eq!(summary.converted, 1);
    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.readings, 2);

    let db = DbRO::open(&ws.config.db_path).unwrap();
    let device_id = db.device_id("GW1", "DEV1").unwrap().unwrap();
    assert_eq!(db.count_readings(device_id).unwrap(), 2);
}

#[test]
fn unreadable_archive_entry_does_not_stop_the_batch() {
    let ws = workspace();
    let today = drop_file(&ws.config, "b_good.csv", stubs::csv::SAMPLE_EXPORT);
    let archive_dir = archive::create_archive_dir(&ws.config.archive_root, today).unwrap();
    fs::write(archive_dir.join("a_corrupt.csv"), "ignored").unwrap();
    fs::write(archive_dir.join("a_corrupt.xlsx"), "not a zip").unwrap();

    let summary = ingest::run_batch(&ws.config, today).unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.loaded, 1);
    assert_eq!(device_count(&ws.config.db_path), 1);
}

#[test]
fn files_from_other_days_are_not_archived() {
    let ws = workspace();
    let today = drop_file(&ws.config, "gw1.csv", stubs::csv::SAMPLE_EXPORT);
    let tomorrow = today.succ_opt().unwrap();

    let summary = ingest::run_batch(&ws.config, tomorrow).unwrap();
    assert_eq!(summary, ingest::BatchSummary::default());
    assert!(archive::archive_dir(&ws.config.archive_root, tomorrow).is_dir());
    assert!(!ws.config.db_path.exists());
}

#[test]
fn missing_source_folder_aborts_the_run() {
    let ws = workspace();
    let config = Config {
        source_dir: ws.config.source_dir.join("absent"),
        ..ws.config.clone()
    };
    let today = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let err = ingest::run_batch(&config, today).unwrap_err();
    assert!(matches!(err, BatchError::SourceFolderMissing(_)));
    assert!(!config.archive_root.exists());
}
