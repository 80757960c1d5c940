use std::env;
use std::path::PathBuf;

use crate::constants::{defaults, envvars};
use crate::helpers::base_path;

/// Locations used by a batch run. Built once at start-up and passed down.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Folder the gateways drop their daily CSV exports into
    pub source_dir: PathBuf,
    /// Root of the `<YYYY>/<MM>/<ddMMyyyy>` archive tree
    pub archive_root: PathBuf,
    /// SQLite database holding devices and energy readings
    pub db_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = base_path::data_dir();
        let path_var = |var: &str, default: &str| {
            env::var_os(var)
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join(default))
        };
        Config {
            source_dir: path_var(envvars::CSV_DIR, defaults::CSV_DIR),
            archive_root: path_var(envvars::ARCHIVE_DIR, defaults::ARCHIVE_DIR),
            db_path: path_var(envvars::DB_PATH, defaults::DB_PATH),
        }
    }

    pub fn with_overrides(
        mut self,
        source_dir: Option<PathBuf>,
        archive_root: Option<PathBuf>,
        db_path: Option<PathBuf>,
    ) -> Self {
        if let Some(p) = source_dir {
            self.source_dir = p;
        }
        if let Some(p) = archive_root {
            self.archive_root = p;
        }
        if let Some(p) = db_path {
            self.db_path = p;
        }
        self
    }
}
