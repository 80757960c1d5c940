pub const LOG_LEVEL: &str = "INFO";

// Relative to the data directory
pub const CSV_DIR: &str = "csv";
pub const ARCHIVE_DIR: &str = "archive";
pub const DB_PATH: &str = "ems-db/ems.db";
