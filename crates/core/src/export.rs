//! CSV and Excel export of list data.
//!
//! Exports take already-serialized rows (display strings), so what lands in
//! the file matches what the table shows.

use std::io::{Cursor, Write};

use chrono::{DateTime, Utc};
use csv::Writer;
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    /// Office Open XML workbook (`.xlsx`).
    Excel,
}

impl ExportFormat {
    /// Parse the `format` query parameter.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            other => Err(CoreError::Validation(format!(
                "unsupported export format '{other}'"
            ))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportResult {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// `<model>_<YYYYmmdd_HHMMSS>.<ext>`
pub fn export_filename(model: &str, format: ExportFormat, now: DateTime<Utc>) -> String {
    format!(
        "{model}_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

pub fn export(
    format: ExportFormat,
    model: &str,
    headers: &[String],
    rows: &[Vec<String>],
    now: DateTime<Utc>,
) -> CoreResult<ExportResult> {
    let bytes = match format {
        ExportFormat::Csv => CsvExporter::export(headers, rows)?,
        ExportFormat::Excel => ExcelExporter::export(model, headers, rows)?,
    };
    Ok(ExportResult {
        bytes,
        content_type: format.mime_type(),
        filename: export_filename(model, format, now),
    })
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

pub struct CsvExporter;

impl CsvExporter {
    pub fn export(headers: &[String], rows: &[Vec<String>]) -> CoreResult<Vec<u8>> {
        let mut writer = Writer::from_writer(Vec::new());
        writer
            .write_record(headers)
            .map_err(|e| CoreError::Internal(format!("Failed to write CSV headers: {e}")))?;
        for row in rows {
            writer
                .write_record(row)
                .map_err(|e| CoreError::Internal(format!("Failed to write CSV row: {e}")))?;
        }
        writer
            .into_inner()
            .map_err(|e| CoreError::Internal(format!("Failed to finish CSV output: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Excel
// ---------------------------------------------------------------------------

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// Single-sheet workbook with inline strings; no shared-strings table or
/// styles.
pub struct ExcelExporter;

impl ExcelExporter {
    pub fn export(sheet_name: &str, headers: &[String], rows: &[Vec<String>]) -> CoreResult<Vec<u8>> {
        let workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
            xml_escape(&sheet_title(sheet_name))
        );
        let sheet = sheet_xml(headers, rows);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (path, body) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", ROOT_RELS),
            ("xl/workbook.xml", workbook.as_str()),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            ("xl/worksheets/sheet1.xml", sheet.as_str()),
        ] {
            zip.start_file(path, options)
                .map_err(|e| CoreError::Internal(format!("Failed to start {path}: {e}")))?;
            zip.write_all(body.as_bytes())
                .map_err(|e| CoreError::Internal(format!("Failed to write {path}: {e}")))?;
        }
        let cursor = zip
            .finish()
            .map_err(|e| CoreError::Internal(format!("Failed to finish workbook: {e}")))?;
        Ok(cursor.into_inner())
    }
}

fn sheet_xml(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (i, row) in std::iter::once(headers).chain(rows.iter().map(Vec::as_slice)).enumerate() {
        let row_number = i + 1;
        xml.push_str(&format!(r#"<row r="{row_number}">"#));
        for (col, value) in row.iter().enumerate() {
            xml.push_str(&format!(
                r#"<c r="{}{row_number}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                column_letters(col),
                xml_escape(value)
            ));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Zero-based column index to `A`, `B`, ..., `Z`, `AA`, ...
pub fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Sheet names are limited to 31 characters and may not contain `[]:*?/\`.
fn sheet_title(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    if cleaned.is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

/// Escape markup and drop characters XML 1.0 cannot carry.
fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}
