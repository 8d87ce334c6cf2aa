//! Inventory export (CSV and XLSX) with a fixed column set.

use std::io::{Cursor, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use zip::write::SimpleFileOptions;

use bytebasket_inventory::InventoryItem;

/// Hard cap on exported rows.
pub const MAX_EXPORT_ROWS: u32 = 10_000;

pub const EXPORT_COLUMNS: [&str; 14] = [
    "ID",
    "Item Name",
    "Category",
    "Quantity",
    "Minimum Stock Level",
    "Low Stock",
    "Expiration Date",
    "Expiring Soon",
    "Storage Location",
    "Dietary Category",
    "Barcode",
    "Foodbank ID",
    "Created At",
    "Updated At",
];

/// Columns holding numbers (written as numeric cells in XLSX).
const NUMERIC_COLUMNS: [usize; 2] = [3, 4];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// Case-insensitive; anything unknown is rejected by the caller.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" | "excel" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("xlsx packaging failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("export io failed: {0}")]
    Io(#[from] std::io::Error),
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn yes_no(flag: bool) -> String {
    if flag { "Yes" } else { "No" }.to_string()
}

/// One row per item, in [`EXPORT_COLUMNS`] order. Flags are evaluated at `now`.
pub fn export_row(item: &InventoryItem, now: DateTime<Utc>) -> [String; 14] {
    let status = item.status(now);
    [
        item.id.to_string(),
        item.item_name.clone(),
        item.category.clone(),
        item.quantity.to_string(),
        item.minimum_stock_level.to_string(),
        yes_no(status.low_stock),
        item.expiration_date.map(timestamp).unwrap_or_default(),
        yes_no(status.is_expiring_soon),
        item.storage_location.clone().unwrap_or_default(),
        item.dietary_category
            .map(|d| d.as_str().to_string())
            .unwrap_or_default(),
        item.barcode.clone().unwrap_or_default(),
        item.foodbank_id.to_string(),
        timestamp(item.created_at),
        timestamp(item.updated_at),
    ]
}

pub fn render(format: ExportFormat, items: &[InventoryItem], now: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => to_csv(items, now),
        ExportFormat::Xlsx => to_xlsx(items, now),
    }
}

pub fn to_csv(items: &[InventoryItem], now: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_COLUMNS)?;
    for item in items {
        writer.write_record(export_row(item, now))?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

/// Minimal single-sheet OOXML workbook using inline strings.
pub fn to_xlsx(items: &[InventoryItem], now: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let parts: [(&str, String); 5] = [
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("_rels/.rels", ROOT_RELS.to_string()),
            ("xl/workbook.xml", WORKBOOK.to_string()),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
            ("xl/worksheets/sheet1.xml", sheet_xml(items, now)),
        ];
        for (name, body) in parts {
            zip.start_file(name, options)?;
            zip.write_all(body.as_bytes())?;
        }
        zip.finish()?;
    }
    Ok(buf.into_inner())
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Inventory" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

fn sheet_xml(items: &[InventoryItem], now: DateTime<Utc>) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    let header = EXPORT_COLUMNS.map(str::to_string);
    push_row(&mut xml, 1, &header, false);
    for (idx, item) in items.iter().enumerate() {
        push_row(&mut xml, idx + 2, &export_row(item, now), true);
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn push_row(xml: &mut String, row_number: usize, cells: &[String; 14], typed: bool) {
    xml.push_str(&format!(r#"<row r="{row_number}">"#));
    for (col, value) in cells.iter().enumerate() {
        let reference = format!("{}{row_number}", column_letter(col));
        if typed && NUMERIC_COLUMNS.contains(&col) {
            xml.push_str(&format!(r#"<c r="{reference}"><v>{}</v></c>"#, escape_xml(value)));
        } else {
            xml.push_str(&format!(
                r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#,
                escape_xml(value)
            ));
        }
    }
    xml.push_str("</row>");
}

/// 0-based index to spreadsheet column letters (A..Z, AA..).
fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}
