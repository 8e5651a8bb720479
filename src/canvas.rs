use crate::assets::DecodedImage;
use crate::font::HELVETICA;
use crate::types::{Color, Pt, Rect, Size};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Key of the `Meta` record that carries the bounds of each placed block.
pub const META_BLOCK_BOUNDS_KEY: &str = "qbank.bbox";
/// Key of the `Meta` record naming the page template a page was laid out with.
pub const META_PAGE_TEMPLATE_KEY: &str = "qbank.page_template";

/// Drawing commands in top-left page coordinates. Text `y` is the top of the
/// line box; the writer places the baseline one font size below it.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SaveState,
    RestoreState,
    // Non-rendered metadata for page-aware reporting. Ignored by the PDF writer.
    Meta {
        key: String,
        value: String,
    },
    SetFillColor(Color),
    SetStrokeColor(Color),
    SetLineWidth(Pt),
    // Applies both fill and stroke alpha (ca/CA). Values outside 0..1 are clamped.
    SetOpacity {
        fill: f32,
        stroke: f32,
    },
    SetFontName(String),
    SetFontSize(Pt),
    ClipRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    MoveTo {
        x: Pt,
        y: Pt,
    },
    LineTo {
        x: Pt,
        y: Pt,
    },
    CurveTo {
        x1: Pt,
        y1: Pt,
        x2: Pt,
        y2: Pt,
        x: Pt,
        y: Pt,
    },
    // Appends a rectangle to the current path without painting it.
    RectPath {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    ClosePath,
    Fill,
    Stroke,
    DrawString {
        x: Pt,
        y: Pt,
        text: String,
    },
    DrawRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    DrawImage {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub commands: Vec<Command>,
}

impl Page {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Strings drawn on this page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::DrawString { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Bounds of the question blocks placed on this page.
    pub fn block_bounds(&self) -> Vec<Rect> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::Meta { key, value } if key == META_BLOCK_BOUNDS_KEY => {
                    parse_bounds(value)
                }
                _ => None,
            })
            .collect()
    }

    pub fn template_name(&self) -> Option<&str> {
        self.commands.iter().find_map(|cmd| match cmd {
            Command::Meta { key, value } if key == META_PAGE_TEMPLATE_KEY => Some(value.as_str()),
            _ => None,
        })
    }
}

fn parse_bounds(value: &str) -> Option<Rect> {
    let mut parts = value.split(',').map(|part| part.parse::<i64>().ok());
    let mut next = || parts.next().flatten().map(Pt::from_milli_i64);
    Some(Rect {
        x: next()?,
        y: next()?,
        width: next()?,
        height: next()?,
    })
}

/// A laid-out document: pages of commands plus the images they reference.
#[derive(Debug, Clone)]
pub struct Document {
    pub page_size: Size,
    pub pages: Vec<Page>,
    pub images: BTreeMap<String, Arc<DecodedImage>>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    fill_color: Color,
    stroke_color: Color,
    line_width: Pt,
    font_size: Pt,
    font_name: String,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            line_width: Pt::from_f32(1.0),
            font_size: Pt::from_f32(12.0),
            font_name: HELVETICA.to_string(),
        }
    }
}

pub struct Canvas {
    page_size: Size,
    pages: Vec<Page>,
    current: Page,
    state_stack: Vec<GraphicsState>,
    current_state: GraphicsState,
    images: BTreeMap<String, Arc<DecodedImage>>,
}

impl Canvas {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
            current: Page::new(),
            state_stack: Vec::new(),
            current_state: GraphicsState::default(),
            images: BTreeMap::new(),
        }
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    /// Makes `image` drawable under `resource_id`. Registering the same id
    /// twice keeps the first image.
    pub fn register_image(&mut self, resource_id: impl Into<String>, image: Arc<DecodedImage>) {
        self.images.entry(resource_id.into()).or_insert(image);
    }

    pub fn has_image(&self, resource_id: &str) -> bool {
        self.images.contains_key(resource_id)
    }

    pub fn save_state(&mut self) {
        self.state_stack.push(self.current_state.clone());
        self.current.commands.push(Command::SaveState);
    }

    pub fn restore_state(&mut self) {
        if let Some(state) = self.state_stack.pop() {
            self.current_state = state;
            self.current.commands.push(Command::RestoreState);
        }
    }

    pub fn record_block_bounds(&mut self, rect: Rect) {
        let value = format!(
            "{},{},{},{}",
            rect.x.to_milli_i64(),
            rect.y.to_milli_i64(),
            rect.width.to_milli_i64(),
            rect.height.to_milli_i64()
        );
        self.meta(META_BLOCK_BOUNDS_KEY, value);
    }

    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.current.commands.push(Command::Meta {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn set_fill_color(&mut self, color: Color) {
        if self.current_state.fill_color == color {
            return;
        }
        self.current_state.fill_color = color;
        self.current.commands.push(Command::SetFillColor(color));
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        if self.current_state.stroke_color == color {
            return;
        }
        self.current_state.stroke_color = color;
        self.current.commands.push(Command::SetStrokeColor(color));
    }

    pub fn set_line_width(&mut self, width: Pt) {
        let width = width.max(Pt::ZERO);
        if self.current_state.line_width == width {
            return;
        }
        self.current_state.line_width = width;
        self.current.commands.push(Command::SetLineWidth(width));
    }

    pub fn set_opacity(&mut self, fill: f32, stroke: f32) {
        self.current.commands.push(Command::SetOpacity {
            fill: fill.clamp(0.0, 1.0),
            stroke: stroke.clamp(0.0, 1.0),
        });
    }

    pub fn set_font_name(&mut self, name: &str) {
        if self.current_state.font_name == name {
            return;
        }
        self.current_state.font_name = name.to_string();
        self.current
            .commands
            .push(Command::SetFontName(self.current_state.font_name.clone()));
    }

    pub fn set_font_size(&mut self, size: Pt) {
        if self.current_state.font_size == size {
            return;
        }
        self.current_state.font_size = size;
        self.current.commands.push(Command::SetFontSize(size));
    }

    pub fn clip_rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.current.commands.push(Command::ClipRect {
            x,
            y,
            width,
            height,
        });
    }

    pub fn move_to(&mut self, x: Pt, y: Pt) {
        self.current.commands.push(Command::MoveTo { x, y });
    }

    pub fn line_to(&mut self, x: Pt, y: Pt) {
        self.current.commands.push(Command::LineTo { x, y });
    }

    pub fn curve_to(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt, x: Pt, y: Pt) {
        self.current.commands.push(Command::CurveTo {
            x1,
            y1,
            x2,
            y2,
            x,
            y,
        });
    }

    pub fn rect_path(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.current.commands.push(Command::RectPath {
            x,
            y,
            width,
            height,
        });
    }

    pub fn close_path(&mut self) {
        self.current.commands.push(Command::ClosePath);
    }

    pub fn fill(&mut self) {
        self.current.commands.push(Command::Fill);
    }

    pub fn stroke(&mut self) {
        self.current.commands.push(Command::Stroke);
    }

    /// Strokes a straight segment with the current stroke colour and width.
    pub fn line(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt) {
        self.move_to(x1, y1);
        self.line_to(x2, y2);
        self.stroke();
    }

    pub fn stroke_rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.rect_path(x, y, width, height);
        self.stroke();
    }

    /// Approximates a circle with four cubic segments.
    pub fn circle_path(&mut self, cx: Pt, cy: Pt, radius: Pt) {
        let k = radius * 0.552_284_8_f32;
        self.move_to(cx + radius, cy);
        self.curve_to(cx + radius, cy + k, cx + k, cy + radius, cx, cy + radius);
        self.curve_to(cx - k, cy + radius, cx - radius, cy + k, cx - radius, cy);
        self.curve_to(cx - radius, cy - k, cx - k, cy - radius, cx, cy - radius);
        self.curve_to(cx + k, cy - radius, cx + radius, cy - k, cx + radius, cy);
        self.close_path();
    }

    pub fn draw_string(&mut self, x: Pt, y: Pt, text: impl Into<String>) {
        self.current.commands.push(Command::DrawString {
            x,
            y,
            text: text.into(),
        });
    }

    pub fn draw_rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.current.commands.push(Command::DrawRect {
            x,
            y,
            width,
            height,
        });
    }

    pub fn draw_image(
        &mut self,
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: impl Into<String>,
    ) {
        self.current.commands.push(Command::DrawImage {
            x,
            y,
            width,
            height,
            resource_id: resource_id.into(),
        });
    }

    pub fn show_page(&mut self) {
        let current = std::mem::replace(&mut self.current, Page::new());
        self.pages.push(current);
        self.state_stack.clear();
        self.current_state = GraphicsState::default();
    }

    pub fn current_command_count(&self) -> usize {
        self.current.commands.len()
    }

    pub fn is_current_empty(&self) -> bool {
        self.current.commands.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn finish(mut self) -> Document {
        if !self.current.commands.is_empty() || self.pages.is_empty() {
            self.show_page();
        }
        self.finish_without_show()
    }

    pub fn finish_without_show(self) -> Document {
        Document {
            page_size: self.page_size,
            pages: self.pages,
            images: self.images,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redundant_state_changes_are_elided() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.set_fill_color(Color::BLACK);
        canvas.set_font_name(HELVETICA);
        canvas.set_line_width(Pt::from_f32(1.0));
        assert!(canvas.is_current_empty());
        canvas.set_fill_color(Color::WHITE);
        canvas.set_fill_color(Color::WHITE);
        assert_eq!(canvas.current_command_count(), 1);
    }

    #[test]
    fn restore_brings_back_saved_state() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.save_state();
        canvas.set_fill_color(Color::WHITE);
        canvas.restore_state();
        canvas.set_fill_color(Color::WHITE);
        let fills = canvas
            .finish()
            .pages
            .remove(0)
            .commands
            .into_iter()
            .filter(|cmd| matches!(cmd, Command::SetFillColor(_)))
            .count();
        assert_eq!(fills, 2);
    }

    #[test]
    fn block_bounds_survive_meta_encoding() {
        let mut canvas = Canvas::new(Size::a4());
        let rect = Rect {
            x: Pt::from_f32(28.346),
            y: Pt::from_f32(127.559),
            width: Pt::from_f32(255.0),
            height: Pt::from_f32(80.25),
        };
        canvas.record_block_bounds(rect);
        canvas.meta(META_PAGE_TEMPLATE_KEY, "questions");
        let doc = canvas.finish();
        assert_eq!(doc.pages[0].block_bounds(), vec![rect]);
        assert_eq!(doc.pages[0].template_name(), Some("questions"));
    }

    #[test]
    fn finish_always_yields_a_page() {
        let doc = Canvas::new(Size::a4()).finish();
        assert_eq!(doc.page_count(), 1);
    }
}
