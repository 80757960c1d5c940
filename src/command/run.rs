use anyhow::Result;

use ems_ingest::helpers::today;
use ems_ingest::ingest::{self, BatchError};

use crate::argsets::RunArgs;

/// Run the daily batch. Failures are logged, never turned into an exit code.
pub fn run(args: RunArgs) -> Result<()> {
    let config = args.config.into_config();
    let date = args.date.unwrap_or_else(today);
    log::info!("Starting batch for {date}");

    match ingest::run_batch(&config, date) {
        Ok(summary) => log::info!("All processing completed: {summary}"),
        Err(BatchError::SourceFolderMissing(path)) => {
            log::error!("Source folder not found: {}", path.display())
        }
        Err(e) => log::error!("Unexpected error: {e}"),
    }
    Ok(())
}
