//! Read-back of produced PDFs, used to verify output independently of the
//! writer.

use lopdf::{Document as LoDocument, Object as LoObject};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfInspectErrorCode {
    PdfParseFailed,
    PdfTextUnavailable,
    PdfIoError,
}

impl PdfInspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfInspectErrorCode::PdfParseFailed => "PDF_PARSE_FAILED",
            PdfInspectErrorCode::PdfTextUnavailable => "PDF_TEXT_UNAVAILABLE",
            PdfInspectErrorCode::PdfIoError => "PDF_IO_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectError {
    pub code: PdfInspectErrorCode,
    pub message: String,
}

impl std::fmt::Display for PdfInspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for PdfInspectError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub file_size_bytes: usize,
    pub title: Option<String>,
    /// Extracted text per page, in page order.
    pub page_texts: Vec<String>,
}

impl PdfInspectReport {
    pub fn page_contains(&self, page_number: usize, needle: &str) -> bool {
        page_number
            .checked_sub(1)
            .and_then(|index| self.page_texts.get(index))
            .is_some_and(|text| text.contains(needle))
    }
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> Result<PdfInspectReport, PdfInspectError> {
    let pdf = LoDocument::load_mem(bytes).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfParseFailed,
        message: err.to_string(),
    })?;

    let page_numbers: Vec<u32> = pdf.get_pages().keys().copied().collect();
    let mut page_texts = Vec::with_capacity(page_numbers.len());
    for number in &page_numbers {
        let text = pdf.extract_text(&[*number]).map_err(|err| PdfInspectError {
            code: PdfInspectErrorCode::PdfTextUnavailable,
            message: format!("page {number}: {err}"),
        })?;
        page_texts.push(text);
    }

    Ok(PdfInspectReport {
        pdf_version: pdf.version.clone(),
        page_count: page_numbers.len(),
        file_size_bytes: bytes.len(),
        title: document_title(&pdf),
        page_texts,
    })
}

pub fn inspect_pdf_path(path: &Path) -> Result<PdfInspectReport, PdfInspectError> {
    let data = std::fs::read(path).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfIoError,
        message: err.to_string(),
    })?;
    inspect_pdf_bytes(&data)
}

fn document_title(pdf: &LoDocument) -> Option<String> {
    let info = match pdf.trailer.get(b"Info").ok()? {
        LoObject::Reference(id) => pdf.get_dictionary(*id).ok()?,
        LoObject::Dictionary(dict) => dict,
        _ => return None,
    };
    match info.get(b"Title").ok()? {
        LoObject::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

fn decode_text_string(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => bytes.iter().map(|byte| *byte as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::font::FontRegistry;
    use crate::pdf::{PdfOptions, document_to_pdf};
    use crate::types::{Pt, Size};

    fn pdf_bytes(title: &str, pages: &[&str]) -> Vec<u8> {
        let mut canvas = Canvas::new(Size::a4());
        for (index, text) in pages.iter().enumerate() {
            if index > 0 {
                canvas.show_page();
            }
            canvas.draw_string(Pt::from_f32(40.0), Pt::from_f32(40.0), *text);
        }
        let options = PdfOptions {
            title: Some(title.to_string()),
            ..PdfOptions::default()
        };
        document_to_pdf(&canvas.finish(), &FontRegistry::new(), &options).expect("pdf")
    }

    #[test]
    fn reads_pages_title_and_text() {
        let bytes = pdf_bytes("Polity Set", &["Answer Key", "(B)"]);
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert_eq!(report.page_count, 2);
        assert_eq!(report.file_size_bytes, bytes.len());
        assert_eq!(report.title.as_deref(), Some("Polity Set"));
        assert!(report.page_contains(1, "Answer Key"));
        assert!(report.page_contains(2, "(B)"));
        assert!(!report.page_contains(3, "(B)"));
        assert!(!report.page_contains(0, "(B)"));
    }

    #[test]
    fn unicode_titles_decode() {
        let bytes = pdf_bytes("सेट", &["x"]);
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert_eq!(report.title.as_deref(), Some("सेट"));
    }

    #[test]
    fn rejects_malformed_data() {
        let err = inspect_pdf_bytes(b"not a pdf").expect_err("invalid");
        assert_eq!(err.code, PdfInspectErrorCode::PdfParseFailed);
        assert!(err.to_string().starts_with("PDF_PARSE_FAILED"));
    }

    #[test]
    fn path_and_bytes_agree() {
        let bytes = pdf_bytes("Set", &["one"]);
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("one.pdf");
        std::fs::write(&path, &bytes).expect("write");
        assert_eq!(
            inspect_pdf_path(&path).expect("path"),
            inspect_pdf_bytes(&bytes).expect("bytes")
        );
        let err = inspect_pdf_path(&dir.path().join("missing.pdf")).expect_err("missing");
        assert_eq!(err.code, PdfInspectErrorCode::PdfIoError);
    }
}
