use std::collections::HashMap;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Result, UpasError};
use crate::headers::{Column, HeaderMap};
use crate::normalizer::excel_serial_to_date;

pub const ALLOWED_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];

#[derive(Debug, Clone, Copy)]
pub struct ReadLimits {
    pub max_bytes: u64,
    pub max_rows: usize,
}

/// Header line plus data rows, as strings, exactly as laid out in the file.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub file_name: String,
    pub checksum: String,
    pub header: Vec<String>,
    /// Data rows; index 0 is spreadsheet row 2.
    pub rows: Vec<Vec<String>>,
}

// ---------------------------------------------------------------------------
// RawRow
// ---------------------------------------------------------------------------

/// One data row keyed by canonical column. Row 1 is the header line.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub row_number: usize,
    cells: HashMap<Column, String>,
}

impl RawRow {
    pub fn from_cells(row_number: usize, cells: &[String], map: &HeaderMap) -> Self {
        let cells = map
            .columns()
            .filter_map(|(column, idx)| {
                let value = cells.get(idx)?.trim();
                (!value.is_empty()).then(|| (column, value.to_string()))
            })
            .collect();
        Self { row_number, cells }
    }

    pub fn get(&self, column: Column) -> Option<&str> {
        self.cells.get(&column).map(String::as_str)
    }
}

pub fn is_blank(cells: &[String]) -> bool {
    cells.iter().all(|c| c.trim().is_empty())
}

// ---------------------------------------------------------------------------
// File gate
// ---------------------------------------------------------------------------

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Reject wrong extensions and oversized files before any parsing.
pub fn check_file(path: &Path, limits: &ReadLimits) -> Result<u64> {
    let ext = extension_of(path);
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(UpasError::UnsupportedExtension(
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        ));
    }
    let size = std::fs::metadata(path)?.len();
    if size > limits.max_bytes {
        return Err(UpasError::FileTooLarge {
            size,
            limit: limits.max_bytes,
        });
    }
    Ok(size)
}

fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

pub fn read_sheet(path: &Path, limits: &ReadLimits) -> Result<Sheet> {
    check_file(path, limits)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let data = std::fs::read(path)?;
    let checksum = compute_checksum(&data);

    let mut rows = match extension_of(path).as_str() {
        "csv" => parse_csv(&data)?,
        _ => parse_workbook(path)?,
    };

    while rows.last().is_some_and(|r| is_blank(r)) {
        rows.pop();
    }
    if rows.is_empty() || is_blank(&rows[0]) {
        return Err(UpasError::EmptyFile(file_name));
    }
    let header = rows.remove(0);
    if rows.is_empty() {
        return Err(UpasError::EmptyFile(file_name));
    }
    if rows.len() > limits.max_rows {
        return Err(UpasError::TooManyRows {
            count: rows.len(),
            limit: limits.max_rows,
        });
    }

    tracing::debug!(file = %file_name, rows = rows.len(), columns = header.len(), "spreadsheet loaded");
    Ok(Sheet {
        file_name,
        checksum,
        header,
        rows,
    })
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn detect_delimiter(first_line: &str) -> u8 {
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    let tabs = first_line.matches('\t').count();
    if tabs > semicolons && tabs > commas {
        b'\t'
    } else if semicolons > commas {
        b';'
    } else {
        b','
    }
}

fn decode_text(data: &[u8]) -> String {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    match std::str::from_utf8(data) {
        Ok(s) => s.to_string(),
        Err(_) => {
            // Spreadsheet software on Windows exports CSV as Latin-1.
            tracing::info!("file is not valid UTF-8, decoding as Latin-1");
            data.iter().map(|&b| b as char).collect()
        }
    }
}

fn parse_csv(data: &[u8]) -> Result<Vec<Vec<String>>> {
    let text = decode_text(data);
    let first_line = text.lines().next().unwrap_or("");
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(detect_delimiter(first_line))
        .from_reader(text.as_bytes());
    let mut rows: Vec<Vec<String>> = Vec::new();
    // Line on which the next record starts when no empty line sits between.
    let mut next_line: u64 = 1;
    for result in rdr.records() {
        let record = result?;
        // The reader skips empty lines; keep them as blank rows so row
        // numbers match what the user sees in a spreadsheet. Quoted cells
        // may span several lines and still count as one row.
        if let Some(line) = record.position().map(|p| p.line()) {
            for _ in next_line..line {
                rows.push(Vec::new());
            }
            let embedded: u64 = record.iter().map(|f| f.matches('\n').count() as u64).sum();
            next_line = line + embedded + 1;
        }
        rows.push(record.iter().map(|f| f.trim().to_string()).collect());
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// XLSX / XLS
// ---------------------------------------------------------------------------

fn cell_to_string(cell: &calamine::Data) -> String {
    use calamine::Data;
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

fn parse_workbook(path: &Path) -> Result<Vec<Vec<String>>> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path)?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(Vec::new());
    };
    let range = range?;

    // The range starts at the first used cell; pad so row/column positions
    // match the sheet.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![String::new(); start_col as usize];
        cells.extend(row.iter().map(cell_to_string));
        rows.push(cells);
    }
    Ok(rows)
}

/// Minimal .xlsx writer for tests: inline strings, numbers, and numbers
/// styled as dates.
#[cfg(test)]
pub mod test_support {
    use std::io::Write;
    use std::path::Path;

    pub enum XlsxCell {
        Text(&'static str),
        Number(f64),
        Date(f64),
    }

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
</Types>"#;

    const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Feuil1" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    // Style 1 is the built-in short date format (numFmtId 14).
    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="1"><fill><patternFill patternType="none"/></fill></fills>
<borders count="1"><border/></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs>
</styleSheet>"#;

    fn column_name(idx: usize) -> char {
        (b'A' + idx as u8) as char
    }

    /// `rows` holds (1-based row number, first column index, cells).
    pub fn write_xlsx(path: &Path, rows: &[(usize, usize, Vec<XlsxCell>)]) {
        let mut sheet = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        for (row, first_col, cells) in rows {
            sheet.push_str(&format!(r#"<row r="{row}">"#));
            for (offset, cell) in cells.iter().enumerate() {
                let r = format!("{}{row}", column_name(first_col + offset));
                match cell {
                    XlsxCell::Text(t) => sheet.push_str(&format!(
                        r#"<c r="{r}" t="inlineStr"><is><t>{t}</t></is></c>"#
                    )),
                    XlsxCell::Number(n) => sheet.push_str(&format!(r#"<c r="{r}"><v>{n}</v></c>"#)),
                    XlsxCell::Date(n) => {
                        sheet.push_str(&format!(r#"<c r="{r}" s="1"><v>{n}</v></c>"#))
                    }
                }
            }
            sheet.push_str("</row>");
        }
        sheet.push_str("</sheetData></worksheet>");

        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, body) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", ROOT_RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            ("xl/styles.xml", STYLES),
            ("xl/worksheets/sheet1.xml", sheet.as_str()),
        ] {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
}
