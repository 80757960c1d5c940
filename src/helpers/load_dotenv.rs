use std::env;
use std::path::PathBuf;

use crate::constants::envvars;

/// Load `.env` from the working directory and from `$SNAP_COMMON`, if present.
///
/// Returns the files that were loaded; this runs before logging is set up.
pub fn load_dotenv() -> Vec<PathBuf> {
    let mut loaded = Vec::new();
    if let Ok(path) = dotenv::dotenv() {
        loaded.push(path);
    }
    if let Ok(snap_common) = env::var(envvars::SNAP_COMMON) {
        let snap_common_dotenv = PathBuf::from(snap_common).join(".env");
        if dotenv::from_path(&snap_common_dotenv).is_ok() {
            loaded.push(snap_common_dotenv);
        }
    }
    loaded
}
