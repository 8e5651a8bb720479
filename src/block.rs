//! Layout of one question into a column.
//!
//! A question becomes a `QuestionBlock`: a list of rows, each an atomic strip
//! with a height and draw operations relative to the strip's top-left corner.
//! Rows are the only places a question may be split across columns.

use crate::badge::select_badge;
use crate::canvas::Canvas;
use crate::config::{HeightEstimate, Language, LayoutConfig};
use crate::flowable::{BreakInside, Flowable, Pagination};
use crate::font::{FontRegistry, FontWeight};
use crate::question::{OptionSlot, Question};
use crate::text::{collapse_whitespace, strip_markup, wrap_text};
use crate::types::{Color, Pt, Size};
use std::sync::Arc;

/// Options shorter than this (English plus Hindi characters, markup removed)
/// are laid out two per row.
pub const SHORT_OPTION_THRESHOLD: usize = 35;

const ANSWER_GREEN: (u8, u8, u8) = (22, 163, 74);
const EXPLANATION_RED: (u8, u8, u8) = (239, 68, 68);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionLayout {
    Grid,
    List,
}

/// Grid when every included option is short, list otherwise. Excluded slots
/// never influence the decision.
pub fn choose_option_layout(slots: &[OptionSlot]) -> OptionLayout {
    let all_short = slots
        .iter()
        .filter(|slot| slot.included)
        .all(|slot| slot.combined_chars() < SHORT_OPTION_THRESHOLD);
    if all_short {
        OptionLayout::Grid
    } else {
        OptionLayout::List
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        dx: Pt,
        dy: Pt,
        text: String,
        font: String,
        size: Pt,
        color: Color,
        opacity: f32,
        /// Measured advance, kept for extent checks.
        width: Pt,
    },
    FillRect {
        dx: Pt,
        dy: Pt,
        width: Pt,
        height: Pt,
        color: Color,
    },
    Line {
        x1: Pt,
        y1: Pt,
        x2: Pt,
        y2: Pt,
        color: Color,
        line_width: Pt,
    },
}

impl DrawOp {
    /// Horizontal extent relative to the block's left edge.
    pub fn horizontal_extent(&self) -> (Pt, Pt) {
        match self {
            DrawOp::Text { dx, width, .. } => (*dx, *dx + *width),
            DrawOp::FillRect { dx, width, .. } => (*dx, *dx + *width),
            DrawOp::Line {
                x1, x2, line_width, ..
            } => {
                let half = *line_width / 2;
                (x1.min(*x2) - half, x1.max(*x2) + half)
            }
        }
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt) {
        match self {
            DrawOp::Text {
                dx,
                dy,
                text,
                font,
                size,
                color,
                opacity,
                ..
            } => {
                let translucent = *opacity < 1.0;
                if translucent {
                    canvas.save_state();
                    canvas.set_opacity(*opacity, *opacity);
                }
                canvas.set_font_name(font);
                canvas.set_font_size(*size);
                canvas.set_fill_color(*color);
                canvas.draw_string(x + *dx, y + *dy, text.clone());
                if translucent {
                    canvas.restore_state();
                }
            }
            DrawOp::FillRect {
                dx,
                dy,
                width,
                height,
                color,
            } => {
                canvas.set_fill_color(*color);
                canvas.draw_rect(x + *dx, y + *dy, *width, *height);
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                color,
                line_width,
            } => {
                canvas.set_stroke_color(*color);
                canvas.set_line_width(*line_width);
                canvas.line(x + *x1, y + *y1, x + *x2, y + *y2);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub height: Pt,
    pub ops: Vec<DrawOp>,
}

/// A laid-out question, or the part of one that remains after a split.
#[derive(Debug, Clone)]
pub struct QuestionBlock {
    number: usize,
    width: Pt,
    rows: Arc<Vec<Row>>,
    start: usize,
    end: usize,
    estimate: Option<Pt>,
    option_layout: Option<OptionLayout>,
}

impl QuestionBlock {
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows[self.start..self.end]
    }

    pub fn height(&self) -> Pt {
        self.rows().iter().map(|row| row.height).sum()
    }

    pub fn width(&self) -> Pt {
        self.width
    }

    pub fn option_layout(&self) -> Option<OptionLayout> {
        self.option_layout
    }

    /// Leftmost and rightmost points drawn, relative to the block's left edge.
    pub fn horizontal_extent(&self) -> (Pt, Pt) {
        self.rows()
            .iter()
            .flat_map(|row| row.ops.iter())
            .map(DrawOp::horizontal_extent)
            .fold((Pt::ZERO, Pt::ZERO), |(lo, hi), (l, h)| (lo.min(l), hi.max(h)))
    }

    fn slice(&self, start: usize, end: usize) -> QuestionBlock {
        QuestionBlock {
            number: self.number,
            width: self.width,
            rows: Arc::clone(&self.rows),
            start,
            end,
            estimate: None,
            option_layout: self.option_layout,
        }
    }
}

impl Flowable for QuestionBlock {
    fn wrap(&self, _avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: self.width,
            height: self.height(),
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        let mut used = Pt::ZERO;
        let mut cut = self.start;
        for row in self.rows() {
            if used + row.height > avail_height {
                break;
            }
            used += row.height;
            cut += 1;
        }
        if cut == self.start || cut == self.end {
            return None;
        }
        Some((
            Box::new(self.slice(self.start, cut)),
            Box::new(self.slice(cut, self.end)),
        ))
    }

    fn split_leading(&self) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        if self.end - self.start < 2 {
            return None;
        }
        let cut = self.start + 1;
        Some((
            Box::new(self.slice(self.start, cut)),
            Box::new(self.slice(cut, self.end)),
        ))
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, _avail_width: Pt, _avail_height: Pt) {
        let mut top = y;
        for row in self.rows() {
            for op in &row.ops {
                op.draw(canvas, x, top);
            }
            top += row.height;
        }
    }

    fn fit_height(&self, _avail_width: Pt) -> Pt {
        self.estimate.unwrap_or_else(|| self.height())
    }

    fn pagination(&self) -> Pagination {
        Pagination {
            break_inside: BreakInside::Avoid,
            ..Pagination::default()
        }
    }

    fn debug_name(&self) -> &'static str {
        "QuestionBlock"
    }
}

/// Fixed per-section allowance (in mm) used by `HeightEstimate::Heuristic`.
pub fn heuristic_height(config: &LayoutConfig) -> Pt {
    let mut mm = 10.0;
    if config.language == Language::Both {
        mm += 20.0;
    }
    if config.show_solution {
        mm += 30.0;
    }
    mm += config.option_spacing * 5.0;
    Pt::from_mm(mm)
}

#[derive(Debug, Clone)]
struct TextStyle {
    weight: FontWeight,
    size: Pt,
    color: Color,
    opacity: f32,
}

#[derive(Default)]
struct RowsBuilder {
    rows: Vec<Row>,
}

impl RowsBuilder {
    fn push(&mut self, height: Pt, ops: Vec<DrawOp>) {
        self.rows.push(Row { height, ops });
    }

    /// Extends the last row by `gap`, so gaps never become split points.
    fn pad(&mut self, gap: Pt) {
        if gap <= Pt::ZERO {
            return;
        }
        match self.rows.last_mut() {
            Some(row) => row.height += gap,
            None => self.push(gap, Vec::new()),
        }
    }
}

/// Lays out questions for a column of fixed width.
pub struct BlockRenderer<'a> {
    fonts: &'a FontRegistry,
    config: &'a LayoutConfig,
    width: Pt,
}

impl<'a> BlockRenderer<'a> {
    pub fn new(fonts: &'a FontRegistry, config: &'a LayoutConfig, width: Pt) -> Self {
        Self {
            fonts,
            config,
            width,
        }
    }

    pub fn render(&self, question: &Question, number: usize) -> QuestionBlock {
        let mut rows = RowsBuilder::default();
        self.question_rows(&mut rows, question, number);
        self.badge_rows(&mut rows, question);
        let option_layout = if self.config.hide_option {
            None
        } else {
            Some(self.option_rows(&mut rows, question))
        };
        self.explanation_rows(&mut rows, question);
        rows.pad(Pt::from_f32(self.config.question_gap));

        let estimate = match self.config.height_estimate {
            HeightEstimate::Measured => None,
            HeightEstimate::Heuristic => Some(heuristic_height(self.config)),
        };
        let end = rows.rows.len();
        QuestionBlock {
            number,
            width: self.width,
            rows: Arc::new(rows.rows),
            start: 0,
            end,
            estimate,
            option_layout,
        }
    }

    fn line_height(&self, size: Pt) -> Pt {
        self.config.line_height(size)
    }

    fn base_size(&self) -> Pt {
        self.config.font_size_pt()
    }

    fn smaller_size(&self) -> Pt {
        (self.base_size() - Pt::from_f32(1.0)).max(Pt::from_f32(1.0))
    }

    fn plain(&self, raw: &str) -> String {
        collapse_whitespace(&strip_markup(raw))
    }

    fn text_op(&self, dx: Pt, dy: Pt, text: String, font: &str, style: &TextStyle) -> DrawOp {
        let width = self.fonts.measure_text_width(font, style.size, &text);
        DrawOp::Text {
            dx,
            dy,
            text,
            font: font.to_string(),
            size: style.size,
            color: style.color,
            opacity: style.opacity,
            width,
        }
    }

    /// Wraps `text` to `max_width` and returns one text op per line, stacked
    /// from `dy = 0` at `line_height` intervals.
    fn wrapped_ops(&self, text: &str, dx: Pt, max_width: Pt, style: &TextStyle) -> Vec<DrawOp> {
        if text.is_empty() {
            return Vec::new();
        }
        let font = self.fonts.font_for(style.weight, text).to_string();
        let line_height = self.line_height(style.size);
        wrap_text(self.fonts, &font, style.size, text, max_width)
            .into_iter()
            .enumerate()
            .map(|(index, line)| self.text_op(dx, line_height * index as i32, line, &font, style))
            .collect()
    }

    fn question_rows(&self, rows: &mut RowsBuilder, question: &Question, number: usize) {
        let config = self.config;
        let label_style = TextStyle {
            weight: FontWeight::Bold,
            size: self.base_size() + Pt::from_f32(2.0),
            color: config.question_number_rgb(),
            opacity: 1.0,
        };
        let label = format!("{number}.");
        let label_font = self.fonts.font_for(FontWeight::Bold, &label).to_string();
        let label_op = self.text_op(Pt::ZERO, Pt::ZERO, label, &label_font, &label_style);
        let (_, label_right) = label_op.horizontal_extent();
        let indent = Pt::from_mm(5.0).max(label_right + Pt::from_f32(1.5));
        let text_width = (self.width - indent).max(Pt::from_f32(1.0));

        let mut lines: Vec<(Pt, DrawOp)> = Vec::new();
        if !config.hide_question && config.shows_english() {
            let style = TextStyle {
                weight: FontWeight::from_boldness(config.question_boldness),
                size: self.base_size(),
                color: config.question_rgb(),
                opacity: config.question_opacity,
            };
            let height = self.line_height(style.size);
            let text = self.plain(&question.question_eng);
            for op in self.wrapped_ops(&text, indent, text_width, &style) {
                lines.push((height, op));
            }
        }
        if !config.hide_question && config.shows_hindi() {
            let style = TextStyle {
                weight: FontWeight::from_boldness(config.question_boldness),
                size: self.smaller_size(),
                color: Color::gray8(120),
                opacity: config.question_opacity,
            };
            let height = self.line_height(style.size);
            let text = self.plain(&question.question_hin);
            for op in self.wrapped_ops(&text, indent, text_width, &style) {
                lines.push((height, op));
            }
        }

        let label_height = self.line_height(label_style.size);
        let mut lines = lines.into_iter().map(|(height, op)| (height, rebase(op)));
        match lines.next() {
            Some((height, first)) => rows.push(label_height.max(height), vec![label_op, first]),
            None => rows.push(label_height, vec![label_op]),
        }
        for (height, op) in lines {
            rows.push(height, vec![op]);
        }
        rows.pad(Pt::from_f32(config.spacing));
    }

    fn badge_rows(&self, rows: &mut RowsBuilder, question: &Question) {
        let gap = Pt::from_f32(self.config.question_option_gap);
        let badge = if self.config.previous_year_tag {
            select_badge(question)
        } else {
            None
        };
        let Some(badge) = badge else {
            rows.pad(gap);
            return;
        };
        let size = Pt::from_f32(7.0);
        let pill_height = Pt::from_mm(5.0);
        let padding = Pt::from_mm(3.0);
        let right_margin = Pt::from_mm(2.0);
        let max_pill = (self.width - right_margin).max(Pt::ZERO);
        let font = self.fonts.font_for(FontWeight::Bold, &badge.text).to_string();
        let text = badge.fitted_text(
            self.fonts,
            &font,
            size,
            (max_pill - padding * 2).max(Pt::ZERO),
        );
        let text_width = self.fonts.measure_text_width(&font, size, &text);
        let pill_width = (text_width + padding * 2).min(max_pill);
        let pill_x = (self.width - right_margin - pill_width).max(Pt::ZERO);
        let style = TextStyle {
            weight: FontWeight::Bold,
            size,
            color: Color::WHITE,
            opacity: 1.0,
        };
        let ops = vec![
            DrawOp::FillRect {
                dx: pill_x,
                dy: Pt::ZERO,
                width: pill_width,
                height: pill_height,
                color: badge.color(),
            },
            self.text_op(
                pill_x + padding,
                (pill_height - size) / 2,
                text,
                &font,
                &style,
            ),
        ];
        rows.push(pill_height, ops);
        rows.pad(gap);
    }

    fn option_rows(&self, rows: &mut RowsBuilder, question: &Question) -> OptionLayout {
        let config = self.config;
        let slots: Vec<OptionSlot> = question
            .option_slots(config.show_5th_option)
            .into_iter()
            .filter(|slot| slot.included)
            .collect();
        let layout = choose_option_layout(&slots);
        let answer = question.answer_code().option_index();
        let spacing = Pt::from_f32(config.option_spacing);
        let line_height = self.line_height(self.base_size());
        let inset = Pt::from_mm(5.0);

        match layout {
            OptionLayout::Grid => {
                let cell_width = (self.width - inset) / 2;
                for pair in slots.chunks(2) {
                    let mut ops = Vec::new();
                    let mut height = line_height;
                    for (column, slot) in pair.iter().enumerate() {
                        let cell_x = inset + cell_width * column as i32;
                        let cell_height = self.option_cell(
                            &mut ops,
                            slot,
                            answer == Some(slot.index),
                            cell_x,
                            cell_width,
                        );
                        height = height.max(cell_height);
                    }
                    rows.push(height + spacing, ops);
                }
            }
            OptionLayout::List => {
                for slot in &slots {
                    let mut ops = Vec::new();
                    let height = self.option_cell(
                        &mut ops,
                        slot,
                        answer == Some(slot.index),
                        inset,
                        self.width - inset,
                    );
                    rows.push(height + spacing / 2, ops);
                }
            }
        }
        layout
    }

    /// Label plus wrapped option text inside `[x, x + width]`; returns the
    /// cell height.
    fn option_cell(
        &self,
        ops: &mut Vec<DrawOp>,
        slot: &OptionSlot,
        is_answer: bool,
        x: Pt,
        width: Pt,
    ) -> Pt {
        let config = self.config;
        let highlight = is_answer && config.answer_bold;
        let color = if highlight {
            let (r, g, b) = ANSWER_GREEN;
            Color::rgb8(r, g, b)
        } else {
            config.option_rgb()
        };
        let size = self.base_size();
        let line_height = self.line_height(size);
        let label_style = TextStyle {
            weight: FontWeight::Bold,
            size,
            color,
            opacity: config.option_opacity,
        };
        let label_font = self.fonts.font_for(FontWeight::Bold, slot.label).to_string();
        let label = self.text_op(x, Pt::ZERO, slot.label.to_string(), &label_font, &label_style);
        let (_, label_right) = label.horizontal_extent();
        ops.push(label);

        let text_x = (x + Pt::from_mm(7.0)).max(label_right + Pt::from_f32(2.0));
        let text_width = (x + width - text_x).max(Pt::from_f32(1.0));
        let weight = if highlight {
            FontWeight::Bold
        } else {
            FontWeight::from_boldness(config.option_boldness)
        };
        let mut lines = 0usize;
        let mut push_lines = |text: &str, color: Color, ops: &mut Vec<DrawOp>| {
            let style = TextStyle {
                weight,
                size,
                color,
                opacity: config.option_opacity,
            };
            for op in self.wrapped_ops(text, text_x, text_width, &style) {
                ops.push(offset(op, line_height * lines as i32));
                lines += 1;
            }
        };
        if slot.filler {
            push_lines(&self.plain(slot.filler_text(config.shows_hindi())), color, ops);
            return line_height * lines.max(1) as i32;
        }
        if config.shows_english() {
            push_lines(&self.plain(&slot.english), color, ops);
        }
        if config.shows_hindi() {
            let hindi_color = if highlight { color } else { Color::gray8(150) };
            push_lines(&self.plain(&slot.hindi), hindi_color, ops);
        }
        line_height * lines.max(1) as i32
    }

    fn explanation_rows(&self, rows: &mut RowsBuilder, question: &Question) {
        let config = self.config;
        if !config.show_solution {
            return;
        }
        let english = if config.shows_english() {
            self.plain(&question.solution_eng)
        } else {
            String::new()
        };
        let hindi = if config.shows_hindi() {
            self.plain(&question.solution_hin)
        } else {
            String::new()
        };
        if english.is_empty() && hindi.is_empty() {
            return;
        }

        let (r, g, b) = EXPLANATION_RED;
        let red = Color::rgb8(r, g, b);
        let boxed = !config.hide_box_explanation;
        let border = Pt::from_mm(0.2);
        let left = Pt::from_mm(5.0);
        let right = self.width - border / 2;
        let header_height = Pt::from_mm(8.0);
        let label_size = Pt::from_f32(9.0);
        let label_style = TextStyle {
            weight: FontWeight::Bold,
            size: label_size,
            color: if boxed { Color::WHITE } else { red },
            opacity: 1.0,
        };
        let label_font = self
            .fonts
            .font_for(FontWeight::Bold, "Explanation")
            .to_string();
        let label_width = self
            .fonts
            .measure_text_width(&label_font, label_size, "Explanation");
        let sides = |height: Pt| {
            vec![
                DrawOp::Line {
                    x1: left,
                    y1: Pt::ZERO,
                    x2: left,
                    y2: height,
                    color: red,
                    line_width: border,
                },
                DrawOp::Line {
                    x1: right,
                    y1: Pt::ZERO,
                    x2: right,
                    y2: height,
                    color: red,
                    line_width: border,
                },
            ]
        };

        rows.pad(Pt::from_mm(4.0));
        if boxed {
            let band_height = Pt::from_mm(6.0);
            let band_width = self.width - left;
            let mut ops = vec![
                DrawOp::FillRect {
                    dx: left,
                    dy: Pt::ZERO,
                    width: band_width,
                    height: band_height,
                    color: red,
                },
                DrawOp::Line {
                    x1: left,
                    y1: Pt::ZERO,
                    x2: right,
                    y2: Pt::ZERO,
                    color: red,
                    line_width: border,
                },
            ];
            ops.extend(sides(header_height));
            ops.push(self.text_op(
                left + ((band_width - label_width) / 2).max(Pt::ZERO),
                (band_height - label_size) / 2,
                "Explanation".to_string(),
                &label_font,
                &label_style,
            ));
            rows.push(header_height, ops);
        } else {
            let ops = vec![
                DrawOp::Line {
                    x1: left,
                    y1: Pt::ZERO,
                    x2: right,
                    y2: Pt::ZERO,
                    color: red,
                    line_width: border,
                },
                self.text_op(
                    left,
                    Pt::from_mm(2.0),
                    "Explanation".to_string(),
                    &label_font,
                    &label_style,
                ),
            ];
            rows.push(header_height, ops);
        }

        let text_x = Pt::from_mm(7.0);
        let text_width = (self.width - Pt::from_mm(10.0)).max(Pt::from_f32(1.0));
        let weight = FontWeight::from_boldness(config.solution_boldness);
        let size = self.smaller_size();
        let line_height = self.line_height(size);
        for (text, color) in [
            (english.as_str(), Color::rgb8(51, 65, 85)),
            (hindi.as_str(), Color::gray8(120)),
        ] {
            let style = TextStyle {
                weight,
                size,
                color,
                opacity: 1.0,
            };
            for op in self.wrapped_ops(text, text_x, text_width, &style) {
                let mut ops = if boxed { sides(line_height) } else { Vec::new() };
                ops.push(rebase(op));
                rows.push(line_height, ops);
            }
        }

        if boxed {
            let closing = Pt::from_mm(2.0);
            let mut ops = sides(closing);
            ops.push(DrawOp::Line {
                x1: left,
                y1: closing,
                x2: right,
                y2: closing,
                color: red,
                line_width: border,
            });
            rows.push(closing, ops);
        }
    }
}

/// Moves a stacked line op back to the top of its own row.
fn rebase(op: DrawOp) -> DrawOp {
    match op {
        DrawOp::Text {
            dx,
            text,
            font,
            size,
            color,
            opacity,
            width,
            ..
        } => DrawOp::Text {
            dx,
            dy: Pt::ZERO,
            text,
            font,
            size,
            color,
            opacity,
            width,
        },
        other => other,
    }
}

fn offset(op: DrawOp, dy_offset: Pt) -> DrawOp {
    match op {
        DrawOp::Text {
            dx,
            text,
            font,
            size,
            color,
            opacity,
            width,
            ..
        } => DrawOp::Text {
            dx,
            dy: dy_offset,
            text,
            font,
            size,
            color,
            opacity,
            width,
        },
        other => other,
    }
}
