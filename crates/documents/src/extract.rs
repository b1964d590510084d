//! Format-specific text extraction.
//!
//! The file kind is resolved once from the extension and mapped to a fixed
//! extractor. Unknown extensions are read as plain text, with invalid UTF-8
//! replaced rather than treated as an error.

use crate::chunker::Chunker;
use calamine::{open_workbook_auto, Data, Reader};
use kbchat_core::error::ExtractionError;
use kbchat_core::Chunk;
use std::path::Path;
use tracing::debug;

/// Extracted text for one file, or the reason it could not be read.
pub type ExtractResult = std::result::Result<String, ExtractionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Csv,
    Spreadsheet,
    PlainText,
}

impl FileKind {
    /// Resolve the kind from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Self::Pdf,
            "csv" => Self::Csv,
            "xlsx" | "xls" | "xlsm" | "ods" => Self::Spreadsheet,
            _ => Self::PlainText,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Csv => "csv",
            Self::Spreadsheet => "spreadsheet",
            Self::PlainText => "text",
        }
    }

    fn extractor(self) -> fn(&Path) -> ExtractResult {
        match self {
            Self::Pdf => extract_pdf,
            Self::Csv => extract_csv,
            Self::Spreadsheet => extract_spreadsheet,
            Self::PlainText => extract_plain_text,
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract raw text from a local file, dispatching on its extension.
pub fn extract(path: &Path) -> ExtractResult {
    let kind = FileKind::from_path(path);
    let text = (kind.extractor())(path)?;
    debug!(path = %path.display(), kind = %kind, chars = text.len(), "Extracted text");
    Ok(text)
}

/// Extract and chunk a local file.
pub fn process_document(
    path: &Path,
    chunker: &Chunker,
) -> std::result::Result<Vec<Chunk>, ExtractionError> {
    let text = extract(path)?;
    Ok(chunker.chunk(&text))
}

fn read_bytes(path: &Path) -> std::result::Result<Vec<u8>, ExtractionError> {
    std::fs::read(path).map_err(|e| ExtractionError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Every page's text followed by a blank line.
fn extract_pdf(path: &Path) -> ExtractResult {
    let bytes = read_bytes(path)?;
    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| {
        ExtractionError::Pdf {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    let mut out = String::new();
    for page in &pages {
        out.push_str(page.trim());
        out.push_str("\n\n");
    }
    Ok(out)
}

/// `Headers: a, b` then a blank line, then one `Row N: ...` line per record.
fn extract_csv(path: &Path) -> ExtractResult {
    let bytes = read_bytes(path)?;
    let csv_err = |e: csv::Error| ExtractionError::Csv {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes.as_slice());

    let mut records = reader.records();
    let mut text = String::new();

    if let Some(headers) = records.next() {
        let headers = headers.map_err(csv_err)?;
        text.push_str("Headers: ");
        text.push_str(&headers.iter().collect::<Vec<_>>().join(", "));
        text.push_str("\n\n");
    }

    for (i, record) in records.enumerate() {
        let record = record.map_err(csv_err)?;
        text.push_str(&format!(
            "Row {}: {}\n",
            i + 1,
            record.iter().collect::<Vec<_>>().join(", ")
        ));
    }

    Ok(text)
}

/// Each sheet as `Sheet: <name>` followed by its tab-separated rows.
fn extract_spreadsheet(path: &Path) -> ExtractResult {
    let spreadsheet_err = |reason: String| ExtractionError::Spreadsheet {
        path: path.to_path_buf(),
        reason,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_err(e.to_string()))?;
    let mut text = String::new();

    for sheet_name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| spreadsheet_err(e.to_string()))?;

        text.push_str(&format!("\n\nSheet: {sheet_name}\n"));
        let rows: Vec<String> = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>().join("\t"))
            .collect();
        text.push_str(&rows.join("\n"));
        text.push_str("\n\n");
    }

    Ok(text)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::String(s) => s.clone(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#{e:?}"),
        Data::Empty => String::new(),
    }
}

fn extract_plain_text(path: &Path) -> ExtractResult {
    let bytes = read_bytes(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
