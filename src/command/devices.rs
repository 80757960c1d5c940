use anyhow::Result;
use emsdb::DbRO;

use crate::argsets::DevicesArgs;

/// Print registered devices as tab-separated `id gateway device readings` lines.
pub fn devices(args: DevicesArgs) -> Result<()> {
    let config = args.config.into_config();
    let db = DbRO::open(&config.db_path)?;
    for device in db.devices()? {
        println!(
            "{}\t{}\t{}\t{}",
            device.device_id,
            device.gateway_name,
            device.device_name,
            db.count_readings(device.device_id)?
        );
    }
    Ok(())
}
