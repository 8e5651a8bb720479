use crate::canvas::{Command, Document};
use crate::types::Pt;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Default)]
pub struct PageMetrics {
    pub page_number: usize,
    pub render_ms: f64,
    pub command_count: usize,
    pub flowable_count: usize,
}

/// Where the flow controller put one flowable.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub flowable: String,
    pub page: usize,
    pub column: usize,
    pub y_offset: Pt,
    pub height: Pt,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    pub placements: Vec<Placement>,
    pub page_breaks: usize,
    pub total_render_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageStats {
    pub page_number: usize,
    pub line_count: usize,
    pub command_count: usize,
}

/// Layout summary of a finished document, independent of timing, so two
/// renders with equal inputs compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderStats {
    pub page_count: usize,
    pub line_count: usize,
    pub pages: Vec<PageStats>,
    /// Hex SHA-256 over the page command streams.
    pub layout_digest: String,
}

impl RenderStats {
    pub fn from_document(document: &Document) -> Self {
        let mut hasher = Sha256::new();
        let mut pages = Vec::with_capacity(document.pages.len());
        for (index, page) in document.pages.iter().enumerate() {
            hasher.update(format!("page {index}\n").as_bytes());
            for command in &page.commands {
                hasher.update(format!("{command:?}\n").as_bytes());
            }
            pages.push(PageStats {
                page_number: index + 1,
                line_count: page
                    .commands
                    .iter()
                    .filter(|cmd| matches!(cmd, Command::DrawString { .. }))
                    .count(),
                command_count: page.commands.len(),
            });
        }
        let layout_digest = hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect();
        Self {
            page_count: pages.len(),
            line_count: pages.iter().map(|page| page.line_count).sum(),
            pages,
            layout_digest,
        }
    }
}
