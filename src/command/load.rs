use anyhow::Result;

use ems_ingest::ingest;

use crate::argsets::LoadArgs;

pub fn load(args: LoadArgs) -> Result<()> {
    let config = args.config.into_config();
    let count = ingest::process_file(&config.db_path, &args.xlsx_path)?;
    println!("{count}");
    Ok(())
}
