use anyhow::Result;

use ems_ingest::ingest::convert::{self, Conversion};

use crate::argsets::ConvertArgs;

pub fn convert(args: ConvertArgs) -> Result<()> {
    match convert::convert(&args.csv_path)? {
        Conversion::Created(path) => println!("{}", path.display()),
        Conversion::AlreadyConverted(path) => {
            log::warn!("{} already exists, not overwriting", path.display());
            println!("{}", path.display());
        }
    }
    Ok(())
}
