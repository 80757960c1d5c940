pub const DATA_DIR: &str = "EMS_DATA_DIR";
pub const CSV_DIR: &str = "EMS_CSV_DIR";
pub const ARCHIVE_DIR: &str = "EMS_ARCHIVE_DIR";
pub const DB_PATH: &str = "EMS_DB_PATH";

pub const SNAP_COMMON: &str = "SNAP_COMMON";

pub const LOG_LEVEL: &str = "LOG_LEVEL";
