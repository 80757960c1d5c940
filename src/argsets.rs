use std::path::PathBuf;

use chrono::NaiveDate;
use ems_ingest::Config;

/// Path options accepted by every subcommand; unset ones fall back to the environment.
pub struct ConfigArgs {
    pub source_dir: Option<PathBuf>,
    pub archive_root: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn into_config(self) -> Config {
        Config::from_env().with_overrides(self.source_dir, self.archive_root, self.db_path)
    }
}

pub struct RunArgs {
    pub config: ConfigArgs,
    pub date: Option<NaiveDate>,
}

pub struct ConvertArgs {
    pub csv_path: PathBuf,
}

pub struct LoadArgs {
    pub config: ConfigArgs,
    pub xlsx_path: PathBuf,
}

pub struct DevicesArgs {
    pub config: ConfigArgs,
}
