use crate::canvas::{Canvas, Document, META_PAGE_TEMPLATE_KEY};
use crate::debug::DebugLogger;
use crate::doc_context::DocContext;
use crate::error::QbankError;
use crate::flowable::{BreakBefore, Flowable};
use crate::frame::{AddResult, Frame};
use crate::metrics::{DocumentMetrics, PageMetrics, Placement};
use crate::page_template::PageTemplate;
use crate::types::Pt;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

/// Where the flow currently writes: 1-based page, 0-based column, and the
/// offset below the column top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutCursor {
    pub page: usize,
    pub column: usize,
    pub y_offset: Pt,
}

/// Flows a story of flowables through page templates. The first template
/// lays out page one and stays in effect until a flowable asks for another
/// through `BreakBefore::PageTemplate`.
pub struct DocTemplate {
    page_templates: Vec<PageTemplate>,
    story: Vec<Box<dyn Flowable>>,
    debug: Option<Arc<DebugLogger>>,
    debug_label: Option<String>,
}

impl DocTemplate {
    pub fn new(page_templates: Vec<PageTemplate>) -> Self {
        Self {
            page_templates,
            story: Vec::new(),
            debug: None,
            debug_label: None,
        }
    }

    pub(crate) fn with_debug(mut self, debug: Arc<DebugLogger>, label: Option<String>) -> Self {
        self.debug = Some(debug);
        self.debug_label = label;
        self
    }

    pub fn add_flowable(&mut self, flowable: Box<dyn Flowable>) {
        self.story.push(flowable);
    }

    pub fn build(self) -> Result<Document, QbankError> {
        Ok(self.build_with_metrics()?.0)
    }

    pub fn build_with_metrics(self) -> Result<(Document, DocumentMetrics), QbankError> {
        let Some(first) = self.page_templates.first() else {
            return Err(QbankError::MissingPageTemplate);
        };
        let mut flow = PageFlow {
            templates: &self.page_templates,
            canvas: Canvas::new(first.page_size),
            template_index: 0,
            frames: Vec::new(),
            cursor: LayoutCursor {
                page: 1,
                column: 0,
                y_offset: Pt::ZERO,
            },
            placed_on_page: false,
            page_flowables: 0,
            page_start: Instant::now(),
            metrics: DocumentMetrics::default(),
            debug: self.debug.as_deref(),
            debug_label: self.debug_label.as_deref(),
        };
        flow.begin_page();

        let mut story: VecDeque<Box<dyn Flowable>> = self.story.into_iter().collect();
        while let Some(flowable) = story.pop_front() {
            let mut current = flowable;
            let mut suppress_break_before = false;
            loop {
                let current_name = current.debug_name();
                let pagination = current.pagination();
                if !suppress_break_before {
                    match pagination.break_before {
                        BreakBefore::Auto => {}
                        BreakBefore::PageTemplate(index) => {
                            if index >= flow.templates.len() {
                                return Err(QbankError::MissingPageTemplate);
                            }
                            if index != flow.template_index
                                || flow.placed_on_page
                                || flow.cursor.column > 0
                            {
                                flow.next_page("break_before_page", current_name, Some(index));
                            }
                        }
                    }
                }

                if flow.cursor.column >= flow.frames.len() {
                    flow.next_page("frame_exhausted", current_name, None);
                }
                if flow.frames.is_empty() {
                    return Err(QbankError::MissingPageTemplate);
                }

                let column = flow.cursor.column;
                let is_last_frame = column + 1 >= flow.frames.len();
                let frame_rect = flow.frames[column].rect();
                let before = flow.frames[column].cursor_y();
                let debug_details = if !flow.placed_on_page && is_last_frame {
                    let size = current.wrap(frame_rect.width, frame_rect.height);
                    Some(format!(
                        "{} size={}x{}pt frame={}x{}pt",
                        current_name,
                        size.width.to_f32(),
                        size.height.to_f32(),
                        frame_rect.width.to_f32(),
                        frame_rect.height.to_f32(),
                    ))
                } else {
                    None
                };

                match flow.frames[column].add(current, &mut flow.canvas) {
                    AddResult::Placed => {
                        flow.record_placement(current_name, before);
                        break;
                    }
                    AddResult::Split(remaining) => {
                        flow.record_placement(current_name, before);
                        flow.log_page_break(
                            "flowable_split",
                            current_name,
                            flow.cursor.page + usize::from(is_last_frame),
                        );
                        suppress_break_before = true;
                        current = remaining;
                        flow.cursor.column += 1;
                    }
                    AddResult::Overflow(remaining) => {
                        flow.log_page_break(
                            "frame_overflow",
                            current_name,
                            flow.cursor.page + usize::from(is_last_frame),
                        );
                        if !flow.placed_on_page && is_last_frame {
                            let details = debug_details.unwrap_or_else(|| "unknown".to_string());
                            return Err(QbankError::UnplaceableFlowable(details));
                        }
                        current = remaining;
                        flow.cursor.column += 1;
                    }
                }
            }
        }

        if !flow.canvas.is_current_empty() || flow.metrics.pages.is_empty() {
            flow.finish_page();
        }
        let PageFlow {
            canvas, metrics, ..
        } = flow;
        Ok((canvas.finish_without_show(), metrics))
    }
}

struct PageFlow<'a> {
    templates: &'a [PageTemplate],
    canvas: Canvas,
    template_index: usize,
    frames: Vec<Frame>,
    cursor: LayoutCursor,
    placed_on_page: bool,
    page_flowables: usize,
    page_start: Instant,
    metrics: DocumentMetrics,
    debug: Option<&'a DebugLogger>,
    debug_label: Option<&'a str>,
}

impl PageFlow<'_> {
    fn template(&self) -> &PageTemplate {
        &self.templates[self.template_index.min(self.templates.len() - 1)]
    }

    /// Sets up the frames of a fresh page and draws its decorations.
    fn begin_page(&mut self) {
        let template = &self.templates[self.template_index.min(self.templates.len() - 1)];
        self.frames = template.instantiate_frames();
        self.cursor.column = 0;
        self.cursor.y_offset = Pt::ZERO;
        self.placed_on_page = false;
        if let Some(callback) = template.on_page() {
            let context = DocContext::new(
                self.cursor.page,
                template.name.clone(),
                template.frame_count(),
            );
            callback(&mut self.canvas, &context);
        }
        self.canvas
            .meta(META_PAGE_TEMPLATE_KEY, template.name.clone());
    }

    fn finish_page(&mut self) {
        if self.canvas.is_current_empty() {
            return;
        }
        let elapsed = self.page_start.elapsed().as_secs_f64() * 1000.0;
        self.metrics.total_render_ms += elapsed;
        self.metrics.pages.push(PageMetrics {
            page_number: self.cursor.page,
            render_ms: elapsed,
            command_count: self.canvas.current_command_count(),
            flowable_count: self.page_flowables,
        });
        self.canvas.show_page();
        self.page_flowables = 0;
        self.page_start = Instant::now();
    }

    fn next_page(&mut self, reason: &str, flowable: &str, template: Option<usize>) {
        self.log_page_break(reason, flowable, self.cursor.page + 1);
        self.metrics.page_breaks += 1;
        self.finish_page();
        self.cursor.page += 1;
        if let Some(index) = template {
            self.template_index = index;
        }
        log::debug!(
            "page {} started ({reason}, template '{}')",
            self.cursor.page,
            self.template().name
        );
        self.begin_page();
    }

    fn record_placement(&mut self, flowable: &str, before: Pt) {
        let column = self.cursor.column;
        let after = self.frames[column].cursor_y();
        self.placed_on_page = true;
        self.page_flowables += 1;
        self.cursor.y_offset = after;
        self.metrics.placements.push(Placement {
            flowable: flowable.to_string(),
            page: self.cursor.page,
            column,
            y_offset: before,
            height: after - before,
        });
    }

    fn log_page_break(&self, reason: &str, flowable: &str, to_page: usize) {
        let Some(logger) = self.debug else {
            return;
        };
        logger.log_record(json!({
            "type": "qbank.page_break",
            "doc": self.debug_label,
            "reason": reason,
            "from_page": self.cursor.page,
            "to_page": to_page,
            "column": self.cursor.column,
            "flowable": flowable,
        }));
        logger.increment(&format!("qbank.page_break.{reason}"), 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowable::{Pagination, Spacer};
    use crate::types::{Rect, Size};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn template(name: &str, columns: usize) -> PageTemplate {
        let mut template = PageTemplate::new(name, Size::a4());
        for column in 0..columns {
            template = template.with_frame(Rect {
                x: Pt::from_f32(20.0 + 300.0 * column as f32),
                y: Pt::from_f32(100.0),
                width: Pt::from_f32(250.0),
                height: Pt::from_f32(100.0),
            });
        }
        template
    }

    #[derive(Clone)]
    struct Opening;

    impl Flowable for Opening {
        fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> crate::types::Size {
            Size {
                width: avail_width,
                height: Pt::from_f32(10.0),
            }
        }

        fn split(&self, _w: Pt, _h: Pt) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
            None
        }

        fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, _w: Pt, _h: Pt) {
            canvas.draw_string(x, y, "appendix");
        }

        fn pagination(&self) -> Pagination {
            Pagination {
                break_before: BreakBefore::PageTemplate(1),
                ..Pagination::default()
            }
        }
    }

    #[test]
    fn fills_columns_before_pages() {
        let mut doc = DocTemplate::new(vec![template("questions", 2)]);
        for _ in 0..5 {
            doc.add_flowable(Box::new(Spacer::new(Pt::from_f32(60.0))));
        }
        let (document, metrics) = doc.build_with_metrics().expect("build");
        assert_eq!(document.page_count(), 3);
        let slots: Vec<(usize, usize)> = metrics
            .placements
            .iter()
            .map(|placement| (placement.page, placement.column))
            .collect();
        assert_eq!(slots, vec![(1, 0), (1, 1), (2, 0), (2, 1), (3, 0)]);
        assert_eq!(metrics.page_breaks, 2);
    }

    #[test]
    fn template_switch_starts_a_fresh_page_and_sticks() {
        let decorated = Arc::new(AtomicUsize::new(0));
        let counter = decorated.clone();
        let questions = template("questions", 2).set_on_page(move |canvas, ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            canvas.draw_string(Pt::ZERO, Pt::ZERO, format!("page {}", ctx.page_number));
        });
        let mut doc = DocTemplate::new(vec![questions, template("answer_key", 1)]);
        doc.add_flowable(Box::new(Spacer::new(Pt::from_f32(10.0))));
        doc.add_flowable(Box::new(Opening));
        for _ in 0..3 {
            doc.add_flowable(Box::new(Spacer::new(Pt::from_f32(45.0))));
        }
        let document = doc.build().expect("build");
        assert_eq!(document.page_count(), 3);
        assert_eq!(document.pages[0].template_name(), Some("questions"));
        assert_eq!(document.pages[1].template_name(), Some("answer_key"));
        assert_eq!(document.pages[2].template_name(), Some("answer_key"));
        assert_eq!(decorated.load(Ordering::SeqCst), 1);
        assert!(document.pages[1].texts().any(|text| text == "appendix"));
    }

    #[test]
    fn empty_story_still_yields_one_decorated_page() {
        let questions = template("questions", 2)
            .set_on_page(|canvas, _ctx| canvas.draw_string(Pt::ZERO, Pt::ZERO, "header"));
        let document = DocTemplate::new(vec![questions]).build().expect("build");
        assert_eq!(document.page_count(), 1);
    }

    #[test]
    fn missing_templates_are_an_error() {
        assert!(matches!(
            DocTemplate::new(Vec::new()).build(),
            Err(QbankError::MissingPageTemplate)
        ));
    }
}
