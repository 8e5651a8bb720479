//! Answer-key appendix: a title followed by rows of numbered answer boxes.

use crate::canvas::Canvas;
use crate::flowable::{BreakBefore, Flowable, Pagination};
use crate::font::{FontRegistry, FontWeight};
use crate::question::Question;
use crate::types::{Color, Pt, Size};
use std::sync::Arc;

pub const BOXES_PER_ROW: usize = 8;
pub const ANSWER_KEY_TITLE: &str = "Answer Key";

const BOX_WIDTH_MM: f32 = 22.0;
const BOX_HEIGHT_MM: f32 = 8.0;
const BOX_GAP_MM: f32 = 2.0;
const ROW_GAP_MM: f32 = 4.0;
const TITLE_HEIGHT_MM: f32 = 20.0;

/// Opens the answer key on a fresh page laid out with `template_index`.
#[derive(Clone)]
pub struct AnswerKeyTitle {
    fonts: Arc<FontRegistry>,
    template_index: usize,
}

impl AnswerKeyTitle {
    pub fn new(fonts: Arc<FontRegistry>, template_index: usize) -> Self {
        Self {
            fonts,
            template_index,
        }
    }
}

impl Flowable for AnswerKeyTitle {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: Pt::from_mm(TITLE_HEIGHT_MM),
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let size = Pt::from_f32(14.0);
        let font = self.fonts.font_for(FontWeight::Bold, ANSWER_KEY_TITLE);
        let width = self.fonts.measure_text_width(font, size, ANSWER_KEY_TITLE);
        canvas.set_font_name(font);
        canvas.set_font_size(size);
        canvas.set_fill_color(Color::BLACK);
        // Baseline sits 5mm below the frame top.
        canvas.draw_string(
            x + ((avail_width - width) / 2).max(Pt::ZERO),
            y + Pt::from_mm(5.0) - size,
            ANSWER_KEY_TITLE,
        );
    }

    fn pagination(&self) -> Pagination {
        Pagination {
            break_before: BreakBefore::PageTemplate(self.template_index),
            ..Pagination::default()
        }
    }

    fn debug_name(&self) -> &'static str {
        "AnswerKeyTitle"
    }
}

/// One answer box: the 1-based question number and the displayed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerEntry {
    pub number: usize,
    pub answer: String,
}

impl AnswerEntry {
    pub fn label(&self) -> String {
        format!("({})", self.answer)
    }
}

/// Up to `BOXES_PER_ROW` boxes side by side.
#[derive(Clone)]
pub struct AnswerKeyRow {
    fonts: Arc<FontRegistry>,
    entries: Vec<AnswerEntry>,
}

impl AnswerKeyRow {
    pub fn entries(&self) -> &[AnswerEntry] {
        &self.entries
    }
}

impl Flowable for AnswerKeyRow {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: Pt::from_mm(BOX_HEIGHT_MM + ROW_GAP_MM),
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, _avail_width: Pt, _avail_height: Pt) {
        let box_width = Pt::from_mm(BOX_WIDTH_MM);
        let box_height = Pt::from_mm(BOX_HEIGHT_MM);
        let step = box_width + Pt::from_mm(BOX_GAP_MM);
        let size = Pt::from_f32(10.0);
        let text_y = y + Pt::from_mm(5.5) - size;

        canvas.set_stroke_color(Color::BLACK);
        canvas.set_line_width(Pt::from_mm(0.2));
        canvas.set_fill_color(Color::BLACK);
        canvas.set_font_size(size);
        for (slot, entry) in self.entries.iter().enumerate() {
            let left = x + step * slot as i32;
            canvas.stroke_rect(left, y, box_width, box_height);

            let number = entry.number.to_string();
            canvas.set_font_name(self.fonts.font_for(FontWeight::Bold, &number));
            canvas.draw_string(left + Pt::from_mm(2.0), text_y, number);

            let label = entry.label();
            let font = self.fonts.font_for(FontWeight::Regular, &label);
            let width = self.fonts.measure_text_width(font, size, &label);
            canvas.set_font_name(font);
            canvas.draw_string(left + box_width - Pt::from_mm(1.5) - width, text_y, label);
        }
    }

    fn debug_name(&self) -> &'static str {
        "AnswerKeyRow"
    }
}

/// Answer boxes for `questions`, numbered in order and grouped into rows.
pub fn answer_key_rows(fonts: &Arc<FontRegistry>, questions: &[Question]) -> Vec<AnswerKeyRow> {
    let entries: Vec<AnswerEntry> = questions
        .iter()
        .enumerate()
        .map(|(index, question)| AnswerEntry {
            number: index + 1,
            answer: question.answer_code().display(),
        })
        .collect();
    entries
        .chunks(BOXES_PER_ROW)
        .map(|chunk| AnswerKeyRow {
            fonts: Arc::clone(fonts),
            entries: chunk.to_vec(),
        })
        .collect()
}

/// Width the full row of boxes occupies.
pub fn answer_row_width() -> Pt {
    Pt::from_mm(BOX_WIDTH_MM * BOXES_PER_ROW as f32 + BOX_GAP_MM * (BOXES_PER_ROW as f32 - 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(count: usize) -> Vec<Question> {
        (0..count)
            .map(|index| Question {
                answer: ["a", "b", "3", "option4", ""][index % 5].to_string(),
                ..Question::default()
            })
            .collect()
    }

    #[test]
    fn rows_hold_eight_boxes() {
        let fonts = Arc::new(FontRegistry::new());
        let rows = answer_key_rows(&fonts, &questions(17));
        let sizes: Vec<usize> = rows.iter().map(|row| row.entries().len()).collect();
        assert_eq!(sizes, vec![8, 8, 1]);
        assert_eq!(rows[2].entries()[0].number, 17);
    }

    #[test]
    fn answers_are_normalized_for_display() {
        let fonts = Arc::new(FontRegistry::new());
        let rows = answer_key_rows(&fonts, &questions(5));
        let labels: Vec<String> = rows[0].entries().iter().map(AnswerEntry::label).collect();
        assert_eq!(labels, vec!["(A)", "(B)", "(C)", "(D)", "(-)"]);
    }

    #[test]
    fn a_full_row_fits_between_the_margins() {
        assert!((answer_row_width().to_mm() - 190.0).abs() < 0.01);
    }

    #[test]
    fn draws_number_and_answer_inside_each_box() {
        let fonts = Arc::new(FontRegistry::new());
        let rows = answer_key_rows(&fonts, &questions(2));
        let mut canvas = Canvas::new(Size::a4());
        rows[0].draw(&mut canvas, Pt::from_mm(10.0), Pt::from_mm(65.0), Pt::ZERO, Pt::ZERO);
        let document = canvas.finish();
        let texts: Vec<&str> = document.pages[0].texts().collect();
        assert_eq!(texts, vec!["1", "(A)", "2", "(B)"]);
    }
}
