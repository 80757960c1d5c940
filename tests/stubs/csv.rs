pub const SAMPLE_EXPORT: &str = "Gateway Name,
GW1,
Device Name,
DEV1,
Local Time Stamp,TotalDeliveredActiveEnergy (Wh),Error
2024-01-01T00:00,12.5,0
2024-01-01T01:00,13.0,0";

pub const MISSING_ERROR_COLUMN: &str = "Gateway Name,
GW9,
Device Name,
DEV9,
Local Time Stamp,TotalDeliveredActiveEnergy (Wh)
2024-01-01T00:00,12.5
";
