use anyhow::{anyhow, bail, Context, Result};
use lopdf::Document as PdfDocument;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};

static INLINE_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\u{00A0}]+").expect("valid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n(\s*\n)+").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    pub fn mime(self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Text => "text/plain",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub content: String,
    pub kind: FileKind,
    pub pages: Option<usize>,
}

pub struct DocumentParser;

impl DocumentParser {
    /// Parse an uploaded file. PDFs go through lopdf text extraction; scanned
    /// pages without a text layer yield nothing (no OCR).
    pub fn parse_bytes(file_name: &str, bytes: &[u8]) -> Result<ParsedDocument> {
        if bytes.is_empty() {
            bail!("File {} is empty", file_name);
        }

        let kind = Self::detect_kind(file_name, bytes)?;
        debug!("Parsing {} as {:?} ({} bytes)", file_name, kind, bytes.len());

        let (raw, pages) = match kind {
            FileKind::Pdf => Self::parse_pdf(bytes)?,
            FileKind::Text => (String::from_utf8_lossy(bytes).into_owned(), None),
        };

        let content = normalize_text(&raw);
        if content.is_empty() {
            bail!("No text content found in {}", file_name);
        }

        Ok(ParsedDocument { content, kind, pages })
    }

    /// Magic bytes first, extension second.
    pub fn detect_kind(file_name: &str, bytes: &[u8]) -> Result<FileKind> {
        if let Some(sniffed) = infer::get(bytes) {
            return match sniffed.mime_type() {
                "application/pdf" => Ok(FileKind::Pdf),
                mime if mime.starts_with("text/") => Ok(FileKind::Text),
                mime => Err(anyhow!("Unsupported file type {} for {}", mime, file_name)),
            };
        }

        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "txt" | "md" | "markdown" | "csv" | "text" | "" if !bytes.contains(&0) => {
                Ok(FileKind::Text)
            }
            _ => Err(anyhow!("Unsupported file type for {}", file_name)),
        }
    }

    fn parse_pdf(bytes: &[u8]) -> Result<(String, Option<usize>)> {
        let doc = PdfDocument::load_mem(bytes).context("Failed to load PDF file")?;
        let pages = doc.get_pages();
        let page_count = pages.len();

        let mut content = String::new();
        for page_num in pages.keys() {
            match doc.extract_text(&[*page_num]) {
                Ok(text) => {
                    content.push_str(&text);
                    content.push('\n');
                }
                Err(e) => warn!("Failed to extract text from page {}: {}", page_num, e),
            }
        }

        Ok((content, Some(page_count)))
    }
}

/// Collapse runs of inline whitespace and blank lines, trim the ends.
pub fn normalize_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = INLINE_WHITESPACE.replace_all(&unified, " ");
    let collapsed = BLANK_LINES.replace_all(&collapsed, "\n\n");
    collapsed
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
