use std::{env, path::PathBuf};

use crate::constants::envvars;

pub fn data_dir() -> PathBuf {
    if let Ok(data_dir) = env::var(envvars::DATA_DIR) {
        return data_dir.into();
    }
    if let Ok(snap_common_dir) = env::var(envvars::SNAP_COMMON) {
        return snap_common_dir.into();
    }
    PathBuf::from("data")
}
