//! Tabular Decoder — turns uploaded CSV or Excel bytes into header-keyed raw rows.
//!
//! Both formats go through the same row assembly: row 0 is the header row,
//! every later row is zipped positionally against it, and data rows are
//! numbered 0.. in the order they appear. Downstream code never sees which
//! format a row came from.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

const CSV_MIME: &str = "text/csv";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_MIME: &str = "application/vnd.ms-excel";
const UTF8_BOM: char = '\u{feff}';

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("file contains no data rows")]
    EmptyFile,

    #[error("excel parse error: {0}")]
    ExcelParse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Csv,
    Excel,
}

impl FileFormat {
    /// Picks the decoder from the MIME type or, failing that, the file extension.
    pub fn detect(file_name: Option<&str>, mime: Option<&str>) -> Result<Self, DecodeError> {
        let mime = mime.map(|m| m.trim().to_ascii_lowercase());
        let name = file_name.map(|n| n.trim().to_ascii_lowercase());
        let name = name.as_deref().unwrap_or("");

        if mime.as_deref() == Some(CSV_MIME) || name.ends_with(".csv") {
            return Ok(FileFormat::Csv);
        }
        if matches!(mime.as_deref(), Some(XLSX_MIME) | Some(XLS_MIME))
            || name.ends_with(".xlsx")
            || name.ends_with(".xls")
        {
            return Ok(FileFormat::Excel);
        }

        let described = match (file_name, mime.as_deref()) {
            (Some(n), _) if !n.trim().is_empty() => n.to_string(),
            (_, Some(m)) if !m.is_empty() => m.to_string(),
            _ => "unnamed upload".to_string(),
        };
        Err(DecodeError::UnsupportedFormat(described))
    }
}

/// One cell of a data row, keyed by the header it sits under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawCell {
    pub header: String,
    pub value: String,
}

/// One data row in column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRow {
    /// 0-based position among data rows. Skip reports are keyed by this.
    pub row_index: usize,
    /// 1-based line (CSV) or sheet row (Excel) the row was read from.
    pub source_line: usize,
    pub cells: Vec<RawCell>,
}

#[cfg(test)]
impl RawRow {
    /// First cell under exactly `header`, if any.
    pub fn value(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.header == header)
            .map(|c| c.value.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DecodedTable {
    pub format: FileFormat,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Decodes an uploaded file. Fails on unknown formats and on files without
/// at least one data row.
pub fn decode(
    bytes: &[u8],
    file_name: Option<&str>,
    mime: Option<&str>,
) -> Result<DecodedTable, DecodeError> {
    let format = FileFormat::detect(file_name, mime)?;
    let table = match format {
        FileFormat::Csv => decode_csv(&String::from_utf8_lossy(bytes))?,
        FileFormat::Excel => decode_excel(bytes)?,
    };
    info!(
        "Decoded {:?} upload: {} columns, {} data rows",
        table.format,
        table.headers.len(),
        table.rows.len()
    );
    Ok(table)
}

/// Splits on `\n` first, drops blank lines, then parses each line on its own.
/// A quoted field cannot span lines.
pub fn decode_csv(text: &str) -> Result<DecodedTable, DecodeError> {
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    let lines: Vec<(usize, Vec<String>)> = text
        .split('\n')
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, parse_csv_line(line)))
        .collect();

    assemble(FileFormat::Csv, lines)
}

/// Quote-aware split of a single CSV line.
///
/// `"` toggles quoting; inside quotes `""` is a literal quote. Commas split
/// fields only outside quotes. Cells are returned untrimmed.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    fields.push(current);
    fields
}

/// Reads the first worksheet only.
pub fn decode_excel(bytes: &[u8]) -> Result<DecodedTable, DecodeError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| DecodeError::ExcelParse(format!("failed to open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DecodeError::ExcelParse("workbook has no worksheets".to_string()))?
        .map_err(|e| DecodeError::ExcelParse(format!("failed to read first sheet: {e}")))?;

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let lines: Vec<(usize, Vec<String>)> = range
        .rows()
        .enumerate()
        .map(|(i, row)| (first_row + i + 1, row.iter().map(cell_text).collect::<Vec<_>>()))
        .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
        .collect();

    assemble(FileFormat::Excel, lines)
}

/// Renders a cell the way it reads in the sheet: whole floats without a
/// trailing `.0`, empty cells as `""`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Shared header/row zipping for both formats. `lines` holds the
/// `(source line, untrimmed cells)` of every non-blank row, header first.
fn assemble(
    format: FileFormat,
    lines: Vec<(usize, Vec<String>)>,
) -> Result<DecodedTable, DecodeError> {
    let mut lines = lines.into_iter();
    let (_, header_cells) = lines.next().ok_or(DecodeError::EmptyFile)?;
    let headers: Vec<String> = header_cells.iter().map(|h| h.trim().to_string()).collect();

    let rows: Vec<RawRow> = lines
        .enumerate()
        .map(|(row_index, (source_line, values))| RawRow {
            row_index,
            source_line,
            cells: headers
                .iter()
                .enumerate()
                .map(|(col, header)| RawCell {
                    header: header.clone(),
                    value: values
                        .get(col)
                        .map(|v| v.trim().to_string())
                        .unwrap_or_default(),
                })
                .collect(),
        })
        .collect();

    if rows.is_empty() {
        return Err(DecodeError::EmptyFile);
    }

    debug!("Assembled {} rows under headers {:?}", rows.len(), headers);
    Ok(DecodedTable {
        format,
        headers,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_field_with_comma_and_escaped_quotes() {
        let fields = parse_csv_line(r#"A1,"Software, Inc. ""East""",x"#);
        assert_eq!(fields, vec!["A1", r#"Software, Inc. "East""#, "x"]);
    }

    #[test]
    fn test_empty_quoted_field_is_empty() {
        assert_eq!(parse_csv_line(r#"a,"",b"#), vec!["a", "", "b"]);
    }

    #[test]
    fn test_trailing_comma_yields_empty_last_field() {
        assert_eq!(parse_csv_line("a,b,"), vec!["a", "b", ""]);
    }

    #[test]
    fn test_unterminated_quote_swallows_rest_of_line() {
        assert_eq!(parse_csv_line(r#"a,"b,c"#), vec!["a", "b,c"]);
    }

    #[test]
    fn test_decode_csv_zips_and_trims() {
        let table = decode_csv("csa_id , title\n U1 ,  Engineer \n").unwrap();
        assert_eq!(table.headers, vec!["csa_id", "title"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].value("csa_id"), Some("U1"));
        assert_eq!(table.rows[0].value("title"), Some("Engineer"));
    }

    #[test]
    fn test_decode_csv_handles_crlf() {
        let table = decode_csv("csa_id,title\r\nU1,\"Dev, Ops\"\r\n").unwrap();
        assert_eq!(table.headers, vec!["csa_id", "title"]);
        assert_eq!(table.rows[0].value("title"), Some("Dev, Ops"));
    }

    #[test]
    fn test_blank_lines_do_not_shift_row_index() {
        let table = decode_csv("csa_id\n\nU1\n   \nU2\n").unwrap();
        let indices: Vec<_> = table.rows.iter().map(|r| r.row_index).collect();
        let lines: Vec<_> = table.rows.iter().map(|r| r.source_line).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(lines, vec![3, 5]);
    }

    #[test]
    fn test_short_row_padded_and_long_row_truncated() {
        let table = decode_csv("a,b,c\n1\n1,2,3,4\n").unwrap();
        assert_eq!(table.rows[0].cells.len(), 3);
        assert_eq!(table.rows[0].value("c"), Some(""));
        assert_eq!(table.rows[1].cells.len(), 3);
        assert_eq!(table.rows[1].value("c"), Some("3"));
    }

    #[test]
    fn test_quoted_newline_is_not_supported() {
        // The quoted field is cut at the newline; the remainder becomes its own row.
        let table = decode_csv("id,description\n1,\"line one\nline two\"\n").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].value("description"), Some("line one"));
        assert_eq!(table.rows[1].value("id"), Some("line two"));
    }

    #[test]
    fn test_bom_is_stripped_from_first_header() {
        let table = decode_csv("\u{feff}csa_id,title\nU1,T\n").unwrap();
        assert_eq!(table.headers[0], "csa_id");
    }

    #[test]
    fn test_header_only_file_is_empty() {
        assert!(matches!(
            decode_csv("csa_id,title\n"),
            Err(DecodeError::EmptyFile)
        ));
    }

    #[test]
    fn test_blank_file_is_empty() {
        assert!(matches!(decode_csv("\n  \n"), Err(DecodeError::EmptyFile)));
    }

    #[test]
    fn test_detect_by_mime_and_extension() {
        assert_eq!(
            FileFormat::detect(Some("jobs.CSV"), None).unwrap(),
            FileFormat::Csv
        );
        assert_eq!(
            FileFormat::detect(None, Some("text/csv")).unwrap(),
            FileFormat::Csv
        );
        assert_eq!(
            FileFormat::detect(Some("jobs.xlsx"), Some("application/octet-stream")).unwrap(),
            FileFormat::Excel
        );
        assert_eq!(
            FileFormat::detect(Some("upload"), Some(XLS_MIME)).unwrap(),
            FileFormat::Excel
        );
    }

    #[test]
    fn test_detect_rejects_other_formats() {
        let err = FileFormat::detect(Some("resume.pdf"), Some("application/pdf")).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFormat(ref n) if n == "resume.pdf"));
    }

    #[test]
    fn test_garbage_excel_bytes_fail_to_parse() {
        let err = decode(b"not a workbook", Some("jobs.xlsx"), None).unwrap_err();
        assert!(matches!(err, DecodeError::ExcelParse(_)));
    }

    /// Two sheets; the first has its header on row 2, a short row on 4, a
    /// blank row 5 and a numeric band on row 6.
    const TWO_SHEET_WORKBOOK: &[u8] = include_bytes!("../../tests/fixtures/jobs_two_sheets.xlsx");

    #[test]
    fn test_excel_reads_first_sheet_only() {
        let table = decode(TWO_SHEET_WORKBOOK, Some("jobs.xlsx"), None).unwrap();
        assert_eq!(table.format, FileFormat::Excel);
        assert_eq!(table.headers, vec!["csa_id", "title", "description", "band"]);
        assert!(table.rows.iter().all(|r| r.value("note").is_none()));
        assert_eq!(table.rows.len(), 3);
    }

    #[test]
    fn test_excel_short_row_pads_and_lines_follow_sheet_rows() {
        let table = decode_excel(TWO_SHEET_WORKBOOK).unwrap();
        let lines: Vec<usize> = table.rows.iter().map(|r| r.source_line).collect();
        assert_eq!(lines, vec![3, 4, 6]);
        let indexes: Vec<usize> = table.rows.iter().map(|r| r.row_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);

        let short = &table.rows[1];
        assert_eq!(short.cells.len(), 4);
        assert_eq!(short.value("title"), Some("QA"));
        assert_eq!(short.value("description"), Some(""));
        assert_eq!(short.value("band"), Some(""));

        assert_eq!(table.rows[2].value("band"), Some("8"));
    }

    #[test]
    fn test_excel_rows_share_csv_assembly() {
        let lines = vec![
            (1, vec!["csa_id".to_string(), " Title ".to_string()]),
            (2, vec!["U1".to_string()]),
        ];
        let table = assemble(FileFormat::Excel, lines).unwrap();
        assert_eq!(table.headers, vec!["csa_id", "Title"]);
        assert_eq!(table.rows[0].value("Title"), Some(""));
        assert_eq!(table.rows[0].source_line, 2);
    }

    #[test]
    fn test_cell_text_formats_numbers_like_the_sheet() {
        assert_eq!(cell_text(&Data::Float(310.0)), "310");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Int(15)), "15");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
