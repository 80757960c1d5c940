use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::sheet::xlsx::{self, XlsxError, XLSX_EXT};
use crate::sheet::Sheet;

pub const CSV_EXT: &str = "csv";
const SEPARATOR: char = ',';
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("cannot read CSV: {0}")]
    Read(#[from] std::io::Error),
    #[error("cannot write spreadsheet: {0}")]
    Write(#[from] XlsxError),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Conversion {
    Created(PathBuf),
    AlreadyConverted(PathBuf),
}

impl Conversion {
    pub fn path(&self) -> &Path {
        match self {
            Conversion::Created(p) | Conversion::AlreadyConverted(p) => p,
        }
    }
}

pub fn xlsx_path_for(csv_path: &Path) -> PathBuf {
    csv_path.with_extension(XLSX_EXT)
}

/// Line n becomes row n, the k-th comma-separated token becomes column k.
/// There is no quoting support.
///
/// A leading UTF-8 byte order mark is dropped and invalid UTF-8 is replaced
/// with U+FFFD, so a stray byte only affects the cell it is in.
pub fn csv_to_sheet<R: BufRead>(mut reader: R) -> std::io::Result<Sheet> {
    let mut sheet = Sheet::new();
    let mut buf = Vec::new();
    let mut row: u32 = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        row += 1;
        let mut bytes = buf.as_slice();
        if row == 1 {
            bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        }
        bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
        bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        let line = String::from_utf8_lossy(bytes);
        for (col, value) in line.split(SEPARATOR).enumerate() {
            sheet.set(row, col as u32 + 1, value);
        }
    }
    Ok(sheet)
}

/// Convert a CSV file into an XLSX file next to it, unless that file already exists.
pub fn convert(csv_path: &Path) -> Result<Conversion, ConvertError> {
    let xlsx_path = xlsx_path_for(csv_path);
    if xlsx_path.exists() {
        log::debug!("{} already converted", csv_path.display());
        return Ok(Conversion::AlreadyConverted(xlsx_path));
    }

    let sheet = csv_to_sheet(BufReader::new(File::open(csv_path)?))?;
    xlsx::save(&sheet, &xlsx_path)?;
    log::info!(
        "Converted {} into {} ({} cells)",
        csv_path.display(),
        xlsx_path.display(),
        sheet.len()
    );
    Ok(Conversion::Created(xlsx_path))
}
