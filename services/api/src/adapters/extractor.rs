//! services/api/src/adapters/extractor.rs
//!
//! Implements the `TextExtractionService` port for PDF (via `lopdf`), Word
//! `.docx` (via `zip`, reading `word/document.xml`) and plain `.txt` files.

use async_trait::async_trait;
use configmate_core::ports::{PortError, PortResult, TextExtractionService};
use regex::Regex;
use std::io::{Cursor, Read};
use tracing::{debug, warn};

/// Extensions this adapter can decode.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = [".pdf", ".docx", ".txt"];

#[derive(Clone, Default)]
pub struct DocumentTextExtractor;

impl DocumentTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractionService for DocumentTextExtractor {
    async fn extract_text(&self, data: &[u8], extension: &str) -> PortResult<String> {
        let data = data.to_vec();
        let extension = extension.to_lowercase();

        // Both decoders are CPU-bound; keep them off the async workers.
        tokio::task::spawn_blocking(move || match extension.as_str() {
            ".pdf" => extract_pdf(&data),
            ".docx" => extract_docx(&data),
            ".txt" => Ok(String::from_utf8_lossy(&data).into_owned()),
            other => Err(PortError::InvalidInput(format!(
                "Unsupported file type '{}'",
                other
            ))),
        })
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?
    }
}

/// Concatenates the text of every page, one page per line block.
fn extract_pdf(data: &[u8]) -> PortResult<String> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| PortError::InvalidInput(format!("Could not read PDF file: {}", e)))?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut text = String::new();
    for page_num in pages.keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) if !page_text.is_empty() => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Ok(_) => {}
            Err(e) => warn!(page = page_num, error = %e, "Failed to extract text from page, skipping"),
        }
    }
    Ok(text)
}

/// Reads `word/document.xml` and emits one line per paragraph.
fn extract_docx(data: &[u8]) -> PortResult<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| PortError::InvalidInput(format!("Could not read Word file: {}", e)))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| PortError::InvalidInput(format!("Could not read Word file: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| PortError::InvalidInput(format!("Could not read Word file: {}", e)))?;

    paragraphs_from_document_xml(&xml)
}

fn paragraphs_from_document_xml(xml: &str) -> PortResult<String> {
    let paragraph = Regex::new(r"(?s)<w:p[ >].*?</w:p>|<w:p/>")
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    let run = Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab/>|<w:br/>")
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

    let mut text = String::new();
    for para in paragraph.find_iter(xml) {
        for piece in run.captures_iter(para.as_str()) {
            match piece.get(1) {
                Some(t) => text.push_str(&unescape_xml(t.as_str())),
                None if piece[0].starts_with("<w:tab") => text.push('\t'),
                None => text.push('\n'),
            }
        }
        text.push('\n');
    }
    Ok(text)
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docx_paragraphs_become_lines() {
        let xml = r#"<w:document><w:body>
            <w:p w:rsidR="1"><w:r><w:t>Configure</w:t></w:r><w:r><w:t xml:space="preserve"> VLAN 10</w:t></w:r></w:p>
            <w:p/>
            <w:p><w:r><w:t>Tom &amp; Jerry</w:t><w:tab/><w:t>&lt;ok&gt;</w:t></w:r></w:p>
        </w:body></w:document>"#;

        let text = paragraphs_from_document_xml(xml).unwrap();
        assert_eq!(text, "Configure VLAN 10\n\nTom & Jerry\t<ok>\n");
    }

    #[test]
    fn paragraph_properties_are_not_mistaken_for_paragraphs() {
        let xml = "<w:p><w:pPr><w:jc/></w:pPr><w:r><w:t>centered</w:t></w:r></w:p>";
        assert_eq!(paragraphs_from_document_xml(xml).unwrap(), "centered\n");
    }

    #[tokio::test]
    async fn rejects_unknown_extensions() {
        let err = DocumentTextExtractor::new()
            .extract_text(b"hello", ".xlsx")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn reads_plain_text() {
        let text = DocumentTextExtractor::new()
            .extract_text("สวัสดี".as_bytes(), ".TXT")
            .await
            .unwrap();
        assert_eq!(text, "สวัสดี");
    }

    #[tokio::test]
    async fn corrupt_pdf_is_invalid_input() {
        let err = DocumentTextExtractor::new()
            .extract_text(b"not a pdf", ".pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
    }
}
