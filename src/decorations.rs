//! Branding drawn on every page before any content.

use crate::assets::DecodedImage;
use crate::canvas::Canvas;
use crate::config::LayoutConfig;
use crate::doc_context::DocContext;
use crate::font::{FontRegistry, FontWeight};
use crate::types::{Color, Pt};
use std::sync::Arc;

const WATERMARK_OPACITY: f32 = 0.04;
const EMBLEM_GREEN: (u8, u8, u8) = (22, 163, 74);
const BRAND_DARK: (u8, u8, u8) = (30, 41, 59);
/// Bottom edge of the header area.
pub const HEADER_RULE_MM: f32 = 36.0;
pub const FOOTER_HEIGHT_MM: f32 = 12.0;

/// A decoded logo and the resource id it is drawn under.
#[derive(Clone)]
pub struct Logo {
    pub resource_id: String,
    pub image: Arc<DecodedImage>,
}

#[derive(Clone)]
pub struct PageDecorations {
    config: Arc<LayoutConfig>,
    fonts: Arc<FontRegistry>,
    logo: Option<Logo>,
}

impl PageDecorations {
    pub fn new(config: Arc<LayoutConfig>, fonts: Arc<FontRegistry>, logo: Option<Logo>) -> Self {
        Self {
            config,
            fonts,
            logo,
        }
    }

    pub fn draw(&self, canvas: &mut Canvas, ctx: &DocContext) {
        if let Some(logo) = self
            .logo
            .as_ref()
            .filter(|logo| !canvas.has_image(&logo.resource_id))
        {
            canvas.register_image(logo.resource_id.clone(), Arc::clone(&logo.image));
        }
        if self.config.show_watermark {
            self.draw_watermark(canvas);
        }
        if ctx.frame_count == 2 {
            self.draw_divider(canvas);
        }
        self.draw_header(canvas);
        self.draw_footer(canvas);
        if self.config.show_page_border {
            self.draw_border(canvas);
        }
    }

    fn centred_text(
        &self,
        canvas: &mut Canvas,
        text: &str,
        weight: FontWeight,
        size: Pt,
        color: Color,
        baseline: Pt,
    ) {
        if text.is_empty() {
            return;
        }
        let page_width = canvas.page_size().width;
        let font = self.fonts.font_for(weight, text);
        let width = self.fonts.measure_text_width(font, size, text);
        canvas.set_font_name(font);
        canvas.set_font_size(size);
        canvas.set_fill_color(color);
        canvas.draw_string((page_width - width) / 2, baseline - size, text);
    }

    fn draw_watermark(&self, canvas: &mut Canvas) {
        let page = canvas.page_size();
        let cx = page.width / 2;
        let cy = page.height / 2;
        canvas.save_state();
        canvas.set_opacity(WATERMARK_OPACITY, WATERMARK_OPACITY);
        match &self.logo {
            Some(logo) => {
                let side = Pt::from_mm(80.0);
                canvas.draw_image(
                    cx - side / 2,
                    cy - side / 2,
                    side,
                    side,
                    logo.resource_id.clone(),
                );
            }
            None => {
                let (r, g, b) = EMBLEM_GREEN;
                let green = Color::rgb8(r, g, b);
                canvas.set_stroke_color(green);
                canvas.set_line_width(Pt::from_mm(5.0));
                canvas.circle_path(cx, cy, Pt::from_mm(40.0));
                canvas.stroke();
                let size = Pt::from_f32(60.0);
                self.centred_text(
                    canvas,
                    &self.config.emblem_text,
                    FontWeight::Bold,
                    size,
                    green,
                    cy + size * 0.35,
                );
            }
        }
        canvas.restore_state();
    }

    fn draw_divider(&self, canvas: &mut Canvas) {
        let page = canvas.page_size();
        canvas.set_stroke_color(Color::gray8(220));
        canvas.set_line_width(Pt::from_mm(0.1));
        canvas.line(
            page.width / 2,
            Pt::from_mm(40.0),
            page.width / 2,
            page.height - Pt::from_mm(15.0),
        );
    }

    fn draw_header(&self, canvas: &mut Canvas) {
        let config = &self.config;
        let page = canvas.page_size();
        let band = config.header_bg();
        if !band.is_white() {
            canvas.set_fill_color(band);
            canvas.draw_rect(Pt::ZERO, Pt::ZERO, page.width, Pt::from_mm(HEADER_RULE_MM));
        }

        let corner = Pt::from_mm(10.0);
        let side = Pt::from_mm(20.0);
        match &self.logo {
            Some(logo) => canvas.draw_image(corner, corner, side, side, logo.resource_id.clone()),
            None => {
                let (r, g, b) = BRAND_DARK;
                canvas.set_fill_color(Color::rgb8(r, g, b));
                canvas.draw_rect(corner, corner, side, side);
            }
        }

        self.centred_text(
            canvas,
            &config.custom_title.to_uppercase(),
            FontWeight::Bold,
            Pt::from_f32(16.0),
            Color::BLACK,
            Pt::from_mm(18.0),
        );
        self.centred_text(
            canvas,
            &config.custom_tagline,
            FontWeight::Bold,
            Pt::from_f32(10.0),
            Color::gray8(80),
            Pt::from_mm(24.0),
        );
        let sub_header = format!(
            "{}  \u{2022}  {}  \u{2022}  {}",
            config.header_contact, config.header_teacher, config.header_exam
        );
        self.centred_text(
            canvas,
            &sub_header,
            FontWeight::Bold,
            Pt::from_f32(8.0),
            Color::gray8(80),
            Pt::from_mm(30.0),
        );

        canvas.set_stroke_color(Color::BLACK);
        canvas.set_line_width(Pt::from_mm(0.5));
        canvas.line(
            corner,
            Pt::from_mm(HEADER_RULE_MM),
            page.width - corner,
            Pt::from_mm(HEADER_RULE_MM),
        );
    }

    fn draw_footer(&self, canvas: &mut Canvas) {
        let page = canvas.page_size();
        let height = Pt::from_mm(FOOTER_HEIGHT_MM);
        canvas.set_fill_color(self.config.footer_bg());
        canvas.draw_rect(Pt::ZERO, page.height - height, page.width, height);
        self.centred_text(
            canvas,
            &self.config.custom_footer,
            FontWeight::Bold,
            Pt::from_f32(8.0),
            Color::WHITE,
            page.height - Pt::from_mm(5.0),
        );
    }

    fn draw_border(&self, canvas: &mut Canvas) {
        let page = canvas.page_size();
        let inset = Pt::from_mm(2.0);
        canvas.set_stroke_color(Color::BLACK);
        canvas.set_line_width(Pt::from_mm(0.5));
        canvas.stroke_rect(inset, inset, page.width - inset * 2, page.height - inset * 2);
    }
}
