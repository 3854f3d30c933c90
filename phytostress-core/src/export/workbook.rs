//! Spreadsheet workbook: one worksheet per table in a single `.xlsx` file.
//!
//! The workbook is the smallest SpreadsheetML package spreadsheet tools
//! accept: content types, package and workbook relationships, the workbook
//! part and one worksheet part per table. Text is written as inline strings
//! so no shared-string table is needed.

use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::analytics::{Cell, Table};
use crate::error::Result;

/// Longest sheet name spreadsheet tools accept
pub const MAX_SHEET_NAME_LEN: usize = 31;

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Sheet names for `tables`: invalid characters replaced, cut to 31
/// characters, and made unique with a numeric suffix.
pub fn sheet_names(tables: &[Table]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(tables.len());
    for table in tables {
        let base: String = table
            .title
            .chars()
            .map(|c| match c {
                ':' | '\\' | '/' | '?' | '*' | '[' | ']' => '_',
                c => c,
            })
            .collect();
        let base = if base.trim().is_empty() {
            "Sheet".to_string()
        } else {
            base
        };

        let mut name = truncate(&base, MAX_SHEET_NAME_LEN);
        let mut n = 2;
        while names.iter().any(|taken| taken.eq_ignore_ascii_case(&name)) {
            let suffix = format!("_{}", n);
            name = truncate(&base, MAX_SHEET_NAME_LEN - suffix.len()) + &suffix;
            n += 1;
        }
        names.push(name);
    }
    names
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Write `tables` as a workbook at `path`
pub fn write_workbook(path: &Path, tables: &[Table]) -> Result<()> {
    let names = sheet_names(tables);
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types(tables.len()).as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(package_rels().as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(workbook_xml(&names).as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(workbook_rels(tables.len()).as_bytes())?;

    for (i, table) in tables.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(worksheet_xml(table).as_bytes())?;
    }

    zip.finish()?;
    tracing::debug!(path = %path.display(), sheets = tables.len(), "Wrote workbook");
    Ok(())
}

fn content_types(sheets: usize) -> String {
    let mut xml = format!(
        r#"{XML_HEADER}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#
    );
    for i in 1..=sheets {
        let _ = write!(
            xml,
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        );
    }
    xml.push_str("</Types>");
    xml
}

fn package_rels() -> String {
    format!(
        r#"{XML_HEADER}<Relationships xmlns="{PACKAGE_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
    )
}

fn workbook_xml(names: &[String]) -> String {
    let mut xml = format!(r#"{XML_HEADER}<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>"#);
    for (i, name) in names.iter().enumerate() {
        let _ = write!(
            xml,
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape(name),
            i + 1,
            i + 1
        );
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels(sheets: usize) -> String {
    let mut xml = format!(r#"{XML_HEADER}<Relationships xmlns="{PACKAGE_REL_NS}">"#);
    for i in 1..=sheets {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{i}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        );
    }
    xml.push_str("</Relationships>");
    xml
}

fn worksheet_xml(table: &Table) -> String {
    let mut xml = format!(r#"{XML_HEADER}<worksheet xmlns="{MAIN_NS}"><sheetData>"#);

    let header = table.columns.iter().map(|c| Cell::Text(c.clone()));
    write_row(&mut xml, 1, header);
    for (i, row) in table.rows.iter().enumerate() {
        write_row(&mut xml, i + 2, row.iter().cloned());
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn write_row(xml: &mut String, number: usize, cells: impl Iterator<Item = Cell>) {
    let _ = write!(xml, r#"<row r="{number}">"#);
    for (col, cell) in cells.enumerate() {
        let reference = format!("{}{}", column_letters(col), number);
        let _ = match cell {
            Cell::Null => Ok(()),
            Cell::Int(v) => write!(xml, r#"<c r="{reference}"><v>{v}</v></c>"#),
            Cell::Real(v) if v.is_finite() => {
                write!(xml, r#"<c r="{reference}"><v>{v}</v></c>"#)
            }
            Cell::Real(v) => write!(
                xml,
                r#"<c r="{reference}" t="inlineStr"><is><t>{v}</t></is></c>"#
            ),
            Cell::Text(s) => write!(
                xml,
                r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                escape(&s)
            ),
        };
    }
    xml.push_str("</row>");
}

/// Zero-based column index to spreadsheet letters (0 -> A, 26 -> AA)
fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
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
