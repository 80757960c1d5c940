use thiserror::Error;

use crate::sheet::locate::{find_column, find_header_row, find_labeled_value};
use crate::sheet::Sheet;

pub const GATEWAY_NAME_LABEL: &str = "Gateway Name";
pub const DEVICE_NAME_LABEL: &str = "Device Name";
pub const TIMESTAMP_LABEL: &str = "Local Time Stamp";
pub const ERROR_LABEL: &str = "Error";
/// Header spellings used by different gateway vendors for delivered active energy
pub const ENERGY_LABELS: [&str; 3] = [
    "TotalDeliveredActiveEnergy (Wh)",
    "TotalActiveDeliveredEnergy (Wh)",
    "Active energy delivered (Wh)",
];

#[derive(Error, Debug, PartialEq)]
pub enum ExtractError {
    #[error("missing gateway or device name")]
    MissingIdentity,
    #[error("missing required data columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawReading {
    pub local_timestamp: String,
    pub active_energy_delivered: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct Extraction<'a> {
    pub gateway_name: String,
    pub device_name: String,
    pub readings: Readings<'a>,
}

/// Rows below the timestamp header, up to the first row with no timestamp.
#[derive(Debug)]
pub struct Readings<'a> {
    sheet: &'a Sheet,
    row: u32,
    timestamp_col: u32,
    energy_col: u32,
    error_col: u32,
    done: bool,
}

impl Iterator for Readings<'_> {
    type Item = RawReading;

    fn next(&mut self) -> Option<RawReading> {
        if self.done {
            return None;
        }
        let Some(timestamp) = self.sheet.get(self.row, self.timestamp_col) else {
            self.done = true;
            return None;
        };
        let reading = RawReading {
            local_timestamp: timestamp.to_string(),
            active_energy_delivered: self.sheet.get(self.row, self.energy_col).map(String::from),
            error: self.sheet.get(self.row, self.error_col).map(String::from),
        };
        match self.row.checked_add(1) {
            Some(row) => self.row = row,
            None => self.done = true,
        }
        Some(reading)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Locate identity and data columns in a gateway export.
///
/// Nothing is read from the data rows until `readings` is iterated.
pub fn extract(sheet: &Sheet) -> Result<Extraction<'_>, ExtractError> {
    let gateway_name = non_blank(find_labeled_value(sheet, GATEWAY_NAME_LABEL));
    let device_name = non_blank(find_labeled_value(sheet, DEVICE_NAME_LABEL));
    let (Some(gateway_name), Some(device_name)) = (gateway_name, device_name) else {
        return Err(ExtractError::MissingIdentity);
    };

    let timestamp_col = find_column(sheet, &[TIMESTAMP_LABEL]);
    let energy_col = find_column(sheet, &ENERGY_LABELS);
    let error_col = find_column(sheet, &[ERROR_LABEL]);
    let (Some(timestamp_col), Some(energy_col), Some(error_col)) =
        (timestamp_col, energy_col, error_col)
    else {
        let missing = [
            (timestamp_col, TIMESTAMP_LABEL),
            (energy_col, "active energy delivered"),
            (error_col, ERROR_LABEL),
        ]
        .into_iter()
        .filter(|(col, _)| col.is_none())
        .map(|(_, name)| name)
        .collect();
        return Err(ExtractError::MissingColumns(missing));
    };

    // The timestamp column was found, so its header row exists
    let header_row = find_header_row(sheet, TIMESTAMP_LABEL).unwrap_or_default();
    let first_row = header_row.checked_add(1);

    Ok(Extraction {
        gateway_name,
        device_name,
        readings: Readings {
            sheet,
            row: first_row.unwrap_or(header_row),
            timestamp_col,
            energy_col,
            error_col,
            done: first_row.is_none(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::convert::csv_to_sheet;

    const SAMPLE: &str = "Gateway Name,\nGW1,\nDevice Name,\nDEV1,\n\
        Local Time Stamp,TotalDeliveredActiveEnergy (Wh),Error\n\
        2024-01-01T00:00,12.5,0\n2024-01-01T01:00,13.0,0";

    fn sheet(csv: &str) -> Sheet {
        csv_to_sheet(csv.as_bytes()).unwrap()
    }

    #[test]
    fn extracts_identity_and_readings_in_order() {
        let sheet = sheet(SAMPLE);
        let extraction = extract(&sheet).unwrap();
        assert_eq!(extraction.gateway_name, "GW1");
        assert_eq!(extraction.device_name, "DEV1");

        let readings: Vec<RawReading> = extraction.readings.collect();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].local_timestamp, "2024-01-01T00:00");
        assert_eq!(readings[0].active_energy_delivered.as_deref(), Some("12.5"));
        assert_eq!(readings[1].local_timestamp, "2024-01-01T01:00");
        assert_eq!(readings[1].active_energy_delivered.as_deref(), Some("13.0"));
        assert_eq!(readings[1].error.as_deref(), Some("0"));
    }

    #[test]
    fn stops_at_first_empty_timestamp() {
        let csv = "Gateway Name,Device Name\nGW1,DEV1\n\
            Local Time Stamp,Active energy delivered (Wh),Error\n\
            t1,1,\n,2,E\nt3,3,0\n";
        let sheet = sheet(csv);
        let readings: Vec<RawReading> = extract(&sheet).unwrap().readings.collect();
        assert_eq!(
            readings,
            vec![RawReading {
                local_timestamp: "t1".into(),
                active_energy_delivered: Some("1".into()),
                error: None,
            }]
        );
    }

    #[test]
    fn values_are_passed_through_verbatim() {
        let csv = "Gateway Name,Device Name\nGW1,DEV1\n\
            Error,TotalActiveDeliveredEnergy (Wh),Local Time Stamp\n\
            E 1, 0012.500 ,01/02/2024 \n";
        let sheet = sheet(csv);
        let readings: Vec<RawReading> = extract(&sheet).unwrap().readings.collect();
        assert_eq!(readings[0].local_timestamp, "01/02/2024 ");
        assert_eq!(readings[0].active_energy_delivered.as_deref(), Some(" 0012.500 "));
        assert_eq!(readings[0].error.as_deref(), Some("E 1"));
    }

    #[test]
    fn rows_at_the_index_limit_end_the_readings() {
        let mut sheet = Sheet::new();
        sheet.set(1, 1, "Gateway Name");
        sheet.set(2, 1, "GW1");
        sheet.set(1, 2, "Device Name");
        sheet.set(2, 2, "DEV1");
        sheet.set(u32::MAX - 1, 1, "Local Time Stamp");
        sheet.set(u32::MAX - 1, 2, "Active energy delivered (Wh)");
        sheet.set(u32::MAX - 1, 3, "Error");
        sheet.set(u32::MAX, 1, "t1");
        let readings: Vec<RawReading> = extract(&sheet).unwrap().readings.collect();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].local_timestamp, "t1");

        let mut sheet = Sheet::new();
        sheet.set(1, 1, "Gateway Name");
        sheet.set(2, 1, "GW1");
        sheet.set(1, 2, "Device Name");
        sheet.set(2, 2, "DEV1");
        sheet.set(u32::MAX, 1, "Local Time Stamp");
        sheet.set(u32::MAX, 2, "Active energy delivered (Wh)");
        sheet.set(u32::MAX, 3, "Error");
        assert_eq!(extract(&sheet).unwrap().readings.count(), 0);
    }

    #[test]
    fn blank_identity_is_rejected() {
        let csv = "Gateway Name,Device Name\n  ,DEV1\nLocal Time Stamp,Active energy delivered (Wh),Error\n";
        assert_eq!(extract(&sheet(csv)).unwrap_err(), ExtractError::MissingIdentity);
        let csv = "Gateway Name\nGW1\n";
        assert_eq!(extract(&sheet(csv)).unwrap_err(), ExtractError::MissingIdentity);
    }

    #[test]
    fn missing_columns_are_named() {
        let csv = "Gateway Name,Device Name\nGW1,DEV1\nLocal Time Stamp,Energy (kWh)\nt1,1\n";
        assert_eq!(
            extract(&sheet(csv)).unwrap_err(),
            ExtractError::MissingColumns(vec!["active energy delivered", ERROR_LABEL])
        );
    }
}
