
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::Result;

/// File extensions accepted for indexing.
pub const ALLOWED_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "csv", "pdf"];

/// A named text blob loaded from the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Display name, relative to the data dir. CSV rows carry a `#rowN`
    /// suffix.
    pub source: String,
    pub text: String,
    /// Atomic documents (CSV rows) are indexed as a single chunk and never
    /// re-chunked.
    pub atomic: bool,
}

/// Entry returned by [`list_data_files`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DataFile {
    pub path: String,
    pub bytes: u64,
}

/// Load every supported document under `data_dir`, recursively. Files with
/// unsupported extensions are skipped; files that yield no text are skipped
/// with a warning.
#[inline]
pub fn load_documents(data_dir: &Path) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    if data_dir.is_dir() {
        visit_dir(data_dir, data_dir, &mut documents)?;
    }
    debug!(
        "Loaded {} documents from {}",
        documents.len(),
        data_dir.display()
    );
    Ok(documents)
}

fn visit_dir(dir: &Path, data_dir: &Path, documents: &mut Vec<Document>) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            visit_dir(&path, data_dir, documents)?;
            continue;
        }

        let Some(extension) = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
        else {
            continue;
        };
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            continue;
        }

        let source = relative_name(&path, data_dir);
        match extension.as_str() {
            "pdf" => {
                let text = read_pdf(&path);
                push_if_nonempty(documents, source, text);
            }
            "csv" => {
                let content = fs::read_to_string(&path)?;
                documents.extend(read_csv_rows(&source, &content));
            }
            _ => {
                let text = fs::read_to_string(&path)?;
                push_if_nonempty(documents, source, text);
            }
        }
    }

    Ok(())
}

fn push_if_nonempty(documents: &mut Vec<Document>, source: String, text: String) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        warn!("Skipping {}: no text content", source);
        return;
    }
    documents.push(Document {
        source,
        text: trimmed.to_string(),
        atomic: false,
    });
}

fn relative_name(path: &Path, data_dir: &Path) -> String {
    path.strip_prefix(data_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Extract text from a PDF, page by page. Pages that fail to decode are
/// skipped with a warning; a PDF that yields nothing is reported as empty and
/// skipped by the caller.
fn read_pdf(path: &Path) -> String {
    let document = match lopdf::Document::load(path) {
        Ok(document) => document,
        Err(e) => {
            warn!("Failed to read PDF {}: {}", path.display(), e);
            return String::new();
        }
    };

    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                warn!(
                    "Failed to extract page {} of {}: {}",
                    page_number,
                    path.display(),
                    e
                );
            }
        }
    }
    text
}

/// Expand a CSV file into one atomic document per row, the row rendered as
/// `header:value; header:value; ...` so a row stays retrievable as a unit.
fn read_csv_rows(source: &str, content: &str) -> Vec<Document> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers = parse_csv_line(header_line);

    let mut documents = Vec::new();
    for (row_number, line) in lines.enumerate() {
        let fields = parse_csv_line(line);
        let row_text = headers
            .iter()
            .zip(fields.iter())
            .map(|(header, value)| format!("{header}:{value}"))
            .collect::<Vec<_>>()
            .join("; ");
        if row_text.is_empty() {
            continue;
        }
        documents.push(Document {
            source: format!("{source}#row{}", row_number + 1),
            text: row_text,
            atomic: true,
        });
    }
    documents
}

/// Minimal quote-aware CSV field splitter ("" escapes a quote inside a quoted
/// field). The data dir holds small hand-made files, not arbitrary exports.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// List files in the data directory for status reporting.
#[inline]
pub fn list_data_files(data_dir: &Path) -> Result<Vec<DataFile>> {
    let mut files = Vec::new();
    if data_dir.is_dir() {
        collect_files(data_dir, data_dir, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn collect_files(dir: &Path, data_dir: &Path, files: &mut Vec<DataFile>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, data_dir, files)?;
        } else {
            files.push(DataFile {
                path: relative_name(&path, data_dir),
                bytes: entry.metadata()?.len(),
            });
        }
    }
    Ok(())
}
