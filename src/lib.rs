mod answer_key;
mod assets;
mod badge;
mod block;
mod canvas;
mod config;
mod debug;
mod decorations;
mod doc_context;
mod doc_template;
mod error;
mod flowable;
mod font;
mod frame;
mod metrics;
mod page_template;
mod pdf;
mod pdfinspect;
mod question;
mod snapshot;
mod text;
mod types;

pub use answer_key::{
    ANSWER_KEY_TITLE, AnswerEntry, AnswerKeyRow, AnswerKeyTitle, BOXES_PER_ROW, answer_key_rows,
    answer_row_width,
};
pub use assets::{DecodedImage, decode_image, decode_image_bytes, image_resource_id};
pub use badge::{Badge, BadgeKind, CURRENT_AFFAIRS_SUBJECT, format_badge_date, select_badge};
pub use block::{
    BlockRenderer, DrawOp, OptionLayout, QuestionBlock, Row, SHORT_OPTION_THRESHOLD,
    choose_option_layout, heuristic_height,
};
pub use canvas::{Canvas, Command, Document, Page};
pub use config::{ColumnCount, HeightEstimate, Language, LayoutConfig};
use debug::DebugLogger;
pub use decorations::{Logo, PageDecorations};
pub use doc_context::DocContext;
pub use doc_template::{DocTemplate, LayoutCursor};
pub use error::{AssetError, QbankError};
pub use flowable::{BreakBefore, BreakInside, Flowable, Pagination, Spacer};
pub use font::{FontRegistry, FontWeight, HELVETICA, HELVETICA_BOLD};
pub use frame::{AddResult, Frame};
pub use metrics::{DocumentMetrics, PageMetrics, PageStats, Placement, RenderStats};
pub use page_template::{FrameSpec, PageTemplate};
pub use pdf::{PdfOptions, PdfWriteReport, document_to_pdf, document_to_writer};
pub use pdfinspect::{
    PdfInspectError, PdfInspectErrorCode, PdfInspectReport, inspect_pdf_bytes, inspect_pdf_path,
};
pub use question::{AnswerCode, OPTION_COUNT, OptionSlot, Question, QuestionSet};
pub use snapshot::{paginate_snapshot, snapshot_document, snapshot_page_count};
pub use text::{collapse_whitespace, strip_markup, wrap_text};
pub use types::{Color, Pt, Rect, Size};

use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Index of the answer-key template in the template list.
const ANSWER_KEY_TEMPLATE: usize = 1;
const PAGE_MARGIN_MM: f32 = 10.0;
const COLUMN_GUTTER_MM: f32 = 10.0;
const CONTENT_TOP_MM: f32 = 45.0;
const CONTENT_BOTTOM_MARGIN_MM: f32 = 20.0;

/// Question-set paginator. Cheap to clone; clones share fonts, the decoded
/// logo and the debug trace.
#[derive(Clone)]
pub struct QbankPdf {
    config: Arc<LayoutConfig>,
    fonts: Arc<FontRegistry>,
    logo: Option<Logo>,
    pdf_options: PdfOptions,
    debug: Option<Arc<DebugLogger>>,
}

#[derive(Clone)]
pub struct QbankPdfBuilder {
    config: LayoutConfig,
    font_file: Option<PathBuf>,
    font_bytes: Option<Vec<u8>>,
    debug_path: Option<PathBuf>,
    pdf_options: PdfOptions,
}

impl QbankPdf {
    pub fn builder() -> QbankPdfBuilder {
        QbankPdfBuilder::new()
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn fonts(&self) -> &FontRegistry {
        &self.fonts
    }

    /// Lays out `questions` without serializing: one `Page` of drawing
    /// commands per output page.
    pub fn render_to_document(
        &self,
        set: &QuestionSet,
        questions: &[Question],
    ) -> Result<Document, QbankError> {
        Ok(self.render_with_metrics(set, questions)?.0)
    }

    pub fn render_with_metrics(
        &self,
        set: &QuestionSet,
        questions: &[Question],
    ) -> Result<(Document, DocumentMetrics), QbankError> {
        let page_size = Size::a4();
        let templates = self.page_templates(page_size);
        let column_width = templates
            .first()
            .and_then(|template| template.frame_rects().next())
            .map(|rect| rect.width)
            .ok_or(QbankError::MissingPageTemplate)?;

        let mut doc = DocTemplate::new(templates);
        if let Some(debug) = &self.debug {
            doc = doc.with_debug(Arc::clone(debug), Some(set.name.clone()));
        }
        let renderer = BlockRenderer::new(&self.fonts, &self.config, column_width);
        for (index, question) in questions.iter().enumerate() {
            doc.add_flowable(Box::new(renderer.render(question, index + 1)));
        }
        if self.config.show_answer_widget {
            doc.add_flowable(Box::new(AnswerKeyTitle::new(
                Arc::clone(&self.fonts),
                ANSWER_KEY_TEMPLATE,
            )));
            for row in answer_key_rows(&self.fonts, questions) {
                doc.add_flowable(Box::new(row));
            }
        }
        let (document, metrics) = doc.build_with_metrics()?;
        log::debug!(
            "laid out {} question(s) of '{}' on {} page(s)",
            questions.len(),
            set.name,
            document.page_count()
        );
        Ok((document, metrics))
    }

    pub fn render_to_buffer(
        &self,
        set: &QuestionSet,
        questions: &[Question],
    ) -> Result<Vec<u8>, QbankError> {
        let document = self.render_to_document(set, questions)?;
        let mut out = Vec::new();
        self.write_pdf(set, &document, &mut out)?;
        self.emit_debug_summary("render_to_buffer");
        Ok(out)
    }

    /// PDF bytes plus a timing-free summary of the layout.
    pub fn render_with_stats(
        &self,
        set: &QuestionSet,
        questions: &[Question],
    ) -> Result<(Vec<u8>, RenderStats), QbankError> {
        let document = self.render_to_document(set, questions)?;
        let stats = RenderStats::from_document(&document);
        let mut out = Vec::new();
        self.write_pdf(set, &document, &mut out)?;
        self.emit_debug_summary("render_with_stats");
        Ok((out, stats))
    }

    /// Serializes into memory first; `writer` only sees a complete PDF, so a
    /// failed layout or serialization writes nothing.
    pub fn render_to_writer<W: Write>(
        &self,
        set: &QuestionSet,
        questions: &[Question],
        writer: &mut W,
    ) -> Result<usize, QbankError> {
        let document = self.render_to_document(set, questions)?;
        let mut out = Vec::new();
        self.write_pdf(set, &document, &mut out)?;
        self.emit_debug_summary("render_to_writer");
        writer.write_all(&out)?;
        writer.flush()?;
        Ok(out.len())
    }

    /// Renders fully in memory first, so a failed render leaves no file.
    pub fn render_to_file(
        &self,
        set: &QuestionSet,
        questions: &[Question],
        path: impl AsRef<Path>,
    ) -> Result<usize, QbankError> {
        let bytes = self.render_to_buffer(set, questions)?;
        std::fs::write(path, &bytes)?;
        Ok(bytes.len())
    }

    /// Runs `render_to_buffer` on the blocking pool.
    #[cfg(feature = "async")]
    pub async fn render_async(
        &self,
        set: QuestionSet,
        questions: Vec<Question>,
    ) -> Result<Vec<u8>, QbankError> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.render_to_buffer(&set, &questions))
            .await
            .map_err(|err| QbankError::Io(std::io::Error::other(err)))?
    }

    fn page_templates(&self, page_size: Size) -> Vec<PageTemplate> {
        let decorations = PageDecorations::new(
            Arc::clone(&self.config),
            Arc::clone(&self.fonts),
            self.logo.clone(),
        );
        let margin = Pt::from_mm(PAGE_MARGIN_MM);
        let gutter = Pt::from_mm(COLUMN_GUTTER_MM);
        let top = Pt::from_mm(CONTENT_TOP_MM);
        let bottom = page_size.height - Pt::from_mm(CONTENT_BOTTOM_MARGIN_MM);

        let question_decorations = decorations.clone();
        let questions = PageTemplate::with_columns(
            "questions",
            page_size,
            self.config.column_count(),
            margin,
            gutter,
            top,
            bottom,
        )
        .set_on_page(move |canvas, ctx| question_decorations.draw(canvas, ctx));
        let answer_key =
            PageTemplate::with_columns("answer_key", page_size, 1, margin, gutter, top, bottom)
                .set_on_page(move |canvas, ctx| decorations.draw(canvas, ctx));
        vec![questions, answer_key]
    }

    fn write_pdf<W: Write>(
        &self,
        set: &QuestionSet,
        document: &Document,
        writer: &mut W,
    ) -> Result<usize, QbankError> {
        let mut options = self.pdf_options.clone();
        if options.title.is_none() {
            options.title = Some(document_title(&self.config, set));
        }
        let report =
            pdf::write_document(document, &self.fonts, &options, self.debug.as_deref(), writer)?;
        Ok(report.bytes_written)
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
    }
}

impl Default for QbankPdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QbankPdfBuilder {
    pub fn new() -> Self {
        Self {
            config: LayoutConfig::default(),
            font_file: None,
            font_bytes: None,
            debug_path: None,
            pdf_options: PdfOptions::default(),
        }
    }

    pub fn config(mut self, config: LayoutConfig) -> Self {
        self.config = config;
        self
    }

    /// TrueType font used for text the standard fonts cannot encode.
    pub fn unicode_font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_file = Some(path.into());
        self
    }

    pub fn unicode_font_bytes(mut self, data: Vec<u8>) -> Self {
        self.font_bytes = Some(data);
        self
    }

    /// Writes a JSON-lines trace of layout decisions to `path`.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    /// Overrides the document title, which otherwise comes from the config
    /// or the set name.
    pub fn document_title(mut self, title: impl Into<String>) -> Self {
        self.pdf_options.title = Some(title.into());
        self
    }

    pub fn compress_streams(mut self, enabled: bool) -> Self {
        self.pdf_options.compress = enabled;
        self
    }

    pub fn build(self) -> Result<QbankPdf, QbankError> {
        self.config.validate()?;

        let mut fonts = FontRegistry::new();
        if let Some(path) = &self.font_file {
            fonts.register_file(path)?;
        }
        if let Some(data) = self.font_bytes {
            fonts.register_bytes(data, None)?;
        }

        let debug = match &self.debug_path {
            Some(path) => Some(Arc::new(DebugLogger::new(path)?)),
            None => None,
        };
        let logo = load_logo(&self.config.main_logo, debug.as_deref());

        Ok(QbankPdf {
            config: Arc::new(self.config),
            fonts: Arc::new(fonts),
            logo,
            pdf_options: self.pdf_options,
            debug,
        })
    }
}

/// Decodes the configured logo once. A logo that cannot be decoded is logged
/// and replaced by the built-in graphics.
fn load_logo(source: &str, debug: Option<&DebugLogger>) -> Option<Logo> {
    let source = source.trim();
    if source.is_empty() {
        return None;
    }
    match decode_image(source) {
        Ok(image) => Some(Logo {
            resource_id: image_resource_id(source),
            image: Arc::new(image),
        }),
        Err(err) => {
            log::warn!("logo could not be decoded, using the built-in emblem: {err}");
            if let Some(debug) = debug {
                debug.log_record(json!({
                    "type": "qbank.image_fallback",
                    "source": "mainLogo",
                    "error": err.to_string(),
                }));
                debug.increment("qbank.image_fallback", 1);
            }
            None
        }
    }
}

fn document_title(config: &LayoutConfig, set: &QuestionSet) -> String {
    if !config.document_title.trim().is_empty() {
        return config.document_title.clone();
    }
    if !set.name.trim().is_empty() {
        return set.name.clone();
    }
    config.custom_title.clone()
}

/// Download name for a set: whitespace runs become `_`.
pub fn suggested_filename(set: &QuestionSet) -> String {
    let stem = set.name.split_whitespace().collect::<Vec<_>>().join("_");
    if stem.is_empty() {
        "question_set.pdf".to_string()
    } else {
        format!("{stem}.pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_collapse_whitespace() {
        assert_eq!(
            suggested_filename(&QuestionSet::named("Modern  History\tSet 1")),
            "Modern_History_Set_1.pdf"
        );
        assert_eq!(suggested_filename(&QuestionSet::named("   ")), "question_set.pdf");
    }

    #[test]
    fn title_prefers_config_then_set_name() {
        let mut config = LayoutConfig::default();
        let set = QuestionSet::named("Polity");
        assert_eq!(document_title(&config, &set), "Polity");
        config.document_title = "Weekly Test".to_string();
        assert_eq!(document_title(&config, &set), "Weekly Test");
        config.document_title.clear();
        assert_eq!(document_title(&config, &QuestionSet::default()), "Practice Set");
    }

    #[test]
    fn bad_logo_falls_back_without_failing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let trace = dir.path().join("trace.jsonl");
        let mut config = LayoutConfig::default();
        config.main_logo = "data:image/png;base64,AAAA".to_string();
        let engine = QbankPdf::builder()
            .config(config)
            .debug_log(&trace)
            .build()
            .expect("build");
        assert!(engine.logo.is_none());
        let bytes = engine
            .render_to_buffer(&QuestionSet::named("Set"), &[])
            .expect("render");
        assert!(bytes.starts_with(b"%PDF"));
        let raw = std::fs::read_to_string(&trace).expect("trace");
        assert!(raw.contains("qbank.image_fallback"));
    }

    struct RejectingWriter;

    impl Write for RejectingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writer_receives_the_complete_document() {
        let engine = QbankPdf::builder().build().expect("build");
        let set = QuestionSet::named("Writer");
        let mut sink = Vec::new();
        let written = engine
            .render_to_writer(&set, &[], &mut sink)
            .expect("render");
        assert_eq!(written, sink.len());
        assert_eq!(sink, engine.render_to_buffer(&set, &[]).expect("buffer"));
        assert!(matches!(
            engine.render_to_writer(&set, &[], &mut RejectingWriter),
            Err(QbankError::Io(_))
        ));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let mut config = LayoutConfig::default();
        config.font_size = 0.0;
        assert!(matches!(
            QbankPdf::builder().config(config).build(),
            Err(QbankError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn font_bytes_must_be_truetype() {
        assert!(matches!(
            QbankPdf::builder()
                .unicode_font_bytes(b"not a font".to_vec())
                .build(),
            Err(QbankError::Asset(AssetError::Font(_)))
        ));
    }
}
