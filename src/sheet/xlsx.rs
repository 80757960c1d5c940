//! Minimal XLSX (OOXML spreadsheet) persistence for [`Sheet`].
//!
//! Writing produces a single worksheet with inline strings. Reading takes the
//! first worksheet and understands inline strings, shared strings and raw values.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::Sheet;

pub const XLSX_EXT: &str = "xlsx";

const SHEET_NAME: &str = "Sheet1";
const WORKSHEET_PREFIX: &str = "xl/worksheets/sheet";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
// Worksheet limits of the XLSX format
pub const MAX_ROWS: u32 = 1_048_576;
pub const MAX_COLS: u32 = 16_384;
// Zip-bomb guard for any single XML part
const MAX_XML_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum XlsxError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Zip(#[from] ZipError),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error("workbook format error: {0}")]
    Format(String),
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="1"><fill><patternFill patternType="none"/></fill></fills><borders count="1"><border/></borders><cellStyleXfs count="1"><xf/></cellStyleXfs><cellXfs count="1"><xf xfId="0"/></cellXfs></styleSheet>"#;

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{SHEET_NAME}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
    )
}

pub fn save(sheet: &Sheet, path: impl AsRef<Path>) -> Result<(), XlsxError> {
    let file = File::create(path)?;
    write_to(sheet, BufWriter::new(file))?.flush()?;
    Ok(())
}

pub fn write_to<W: Write + Seek>(sheet: &Sheet, writer: W) -> Result<W, XlsxError> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let workbook = workbook_xml();
    let parts: [(&str, &str); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        ("_rels/.rels", ROOT_RELS_XML),
        ("xl/workbook.xml", &workbook),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML),
        ("xl/styles.xml", STYLES_XML),
    ];
    for (name, content) in parts {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }

    zip.start_file("xl/worksheets/sheet1.xml", options)?;
    zip.write_all(worksheet_xml(sheet).as_bytes())?;

    Ok(zip.finish()?)
}

fn worksheet_xml(sheet: &Sheet) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    let mut current_row = None;
    for cell in sheet.cells_used() {
        if current_row != Some(cell.row) {
            if current_row.is_some() {
                xml.push_str("</row>");
            }
            xml.push_str(&format!(r#"<row r="{}">"#, cell.row));
            current_row = Some(cell.row);
        }
        xml.push_str(&format!(
            r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            cell_ref(cell.row, cell.col),
            escape(cell.value)
        ));
    }
    if current_row.is_some() {
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

pub fn load(path: impl AsRef<Path>) -> Result<Sheet, XlsxError> {
    let file = File::open(path)?;
    read_from(BufReader::new(file))
}

pub fn read_from<R: Read + Seek>(reader: R) -> Result<Sheet, XlsxError> {
    let mut archive = ZipArchive::new(reader)?;
    let shared_strings = match read_entry(&mut archive, SHARED_STRINGS) {
        Ok(xml) => parse_shared_strings(&xml)?,
        Err(XlsxError::Zip(ZipError::FileNotFound)) => Vec::new(),
        Err(e) => return Err(e),
    };
    let sheet_name = first_worksheet_name(&archive)
        .ok_or_else(|| XlsxError::Format("no worksheet found".into()))?;
    let xml = read_entry(&mut archive, &sheet_name)?;
    parse_worksheet(&xml, &shared_strings)
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, XlsxError> {
    let entry = archive.by_name(name)?;
    let mut out = Vec::new();
    entry.take(MAX_XML_ENTRY_BYTES).read_to_end(&mut out)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(XlsxError::Format(format!("{name} exceeds size limit")));
    }
    Ok(out)
}

fn first_worksheet_name<R: Read + Seek>(archive: &ZipArchive<R>) -> Option<String> {
    archive
        .file_names()
        .filter(|n| n.starts_with(WORKSHEET_PREFIX) && n.ends_with(".xml"))
        .min_by_key(|name| {
            name.trim_start_matches(WORKSHEET_PREFIX)
                .trim_end_matches(".xml")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        })
        .map(str::to_string)
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, XlsxError> {
    let mut strings = Vec::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = true,
                _ => {}
            },
            Event::Text(te) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&te.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"t" => in_t = false,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

#[derive(Clone, Copy, PartialEq)]
enum CellKind {
    SharedString,
    InlineString,
    Raw,
}

fn attribute(e: &BytesStart, key: &[u8]) -> Result<Option<String>, XlsxError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn parse_worksheet(xml: &[u8], shared_strings: &[String]) -> Result<Sheet, XlsxError> {
    let mut sheet = Sheet::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut row: u32 = 0;
    let mut col: u32 = 0;
    let mut kind = CellKind::Raw;
    let mut in_text = false;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row = match attribute(&e, b"r")? {
                        Some(r) => r
                            .parse()
                            .map_err(|_| XlsxError::Format(format!("bad row index '{r}'")))?,
                        None => row + 1,
                    };
                    check_bounds(row, 1)?;
                    col = 0;
                }
                b"c" => {
                    (row, col) = match attribute(&e, b"r")? {
                        Some(r) => parse_cell_ref(&r)
                            .ok_or_else(|| XlsxError::Format(format!("bad cell ref '{r}'")))?,
                        None => (row, col + 1),
                    };
                    check_bounds(row, col)?;
                    kind = match attribute(&e, b"t")?.as_deref() {
                        Some("s") => CellKind::SharedString,
                        Some("inlineStr") => CellKind::InlineString,
                        _ => CellKind::Raw,
                    };
                    text.clear();
                }
                b"v" => in_text = kind != CellKind::InlineString,
                b"t" => in_text = kind == CellKind::InlineString,
                _ => {}
            },
            Event::Text(te) if in_text => text.push_str(&te.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_text = false,
                b"c" => {
                    let value = match kind {
                        CellKind::SharedString => {
                            let idx = text.trim().parse::<usize>().map_err(|_| {
                                XlsxError::Format(format!("bad shared string index '{text}'"))
                            })?;
                            shared_strings.get(idx).cloned().ok_or_else(|| {
                                XlsxError::Format(format!("shared string {idx} out of range"))
                            })?
                        }
                        CellKind::InlineString | CellKind::Raw => std::mem::take(&mut text),
                    };
                    sheet.set(row, col, value);
                    text.clear();
                }
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                // Styled but valueless cell; only advances the column
                if let Some(r) = attribute(&e, b"r")? {
                    if let Some((_, c)) = parse_cell_ref(&r) {
                        col = c;
                    }
                } else {
                    col = col.saturating_add(1);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheet)
}

fn check_bounds(row: u32, col: u32) -> Result<(), XlsxError> {
    if row == 0 || row > MAX_ROWS || col == 0 || col > MAX_COLS {
        return Err(XlsxError::Format(format!(
            "cell ({row}, {col}) outside the worksheet"
        )));
    }
    Ok(())
}

/// `(1, 28)` -> `"AB1"`
pub fn cell_ref(row: u32, col: u32) -> String {
    let mut letters = Vec::new();
    let mut n = col;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("{}{}", String::from_utf8_lossy(&letters), row)
}

/// `"AB1"` -> `(1, 28)`
pub fn parse_cell_ref(r: &str) -> Option<(u32, u32)> {
    let split = r.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = r.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    let row = digits.parse::<u32>().ok()?;
    Some((row, col))
}
