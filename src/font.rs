use crate::error::{AssetError, QbankError};
use crate::types::Pt;
use rustybuzz::{Face as HbFace, UnicodeBuffer};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use ttf_parser::GlyphId;

pub const HELVETICA: &str = "Helvetica";
pub const HELVETICA_BOLD: &str = "Helvetica-Bold";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

impl FontWeight {
    pub fn from_boldness(weight: u16) -> Self {
        if weight >= crate::config::BOLD_WEIGHT {
            FontWeight::Bold
        } else {
            FontWeight::Regular
        }
    }

    pub fn base14_name(self) -> &'static str {
        match self {
            FontWeight::Regular => HELVETICA,
            FontWeight::Bold => HELVETICA_BOLD,
        }
    }
}

// Helvetica advance widths (1/1000 em) for WinAnsi 0x20..=0x7E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0x30
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 0x50
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 0x60
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 0x70
];

/// Maps a character to its WinAnsi (cp1252) byte, the encoding used for the
/// standard fonts.
pub(crate) fn winansi_byte(ch: char) -> Option<u8> {
    let byte = match ch {
        '\u{0020}'..='\u{007E}' => ch as u8,
        '\u{00A0}'..='\u{00FF}' => ch as u8,
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

pub(crate) fn is_winansi(text: &str) -> bool {
    text.chars().all(|ch| winansi_byte(ch).is_some())
}

fn base14_advance(bold: bool, ch: char) -> u16 {
    // Unencodable characters are written as '?'.
    let Some(byte) = winansi_byte(ch) else {
        return if bold { 611 } else { 556 };
    };
    if (0x20..=0x7E).contains(&byte) {
        let table = if bold {
            &HELVETICA_BOLD_WIDTHS
        } else {
            &HELVETICA_WIDTHS
        };
        return table[(byte - 0x20) as usize];
    }
    match byte {
        0x85 | 0x89 | 0x97 => 1000,
        0x95 => 350,
        0x91 | 0x92 => {
            if bold {
                278
            } else {
                222
            }
        }
        0x93 | 0x94 => {
            if bold {
                500
            } else {
                333
            }
        }
        0xA0 => 278,
        0xD7 => 584,
        _ => 556,
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct TextWidthKey {
    font: String,
    size_milli: i64,
    text: String,
}

#[derive(Debug)]
struct TextWidthCache {
    map: HashMap<TextWidthKey, Pt>,
    order: VecDeque<TextWidthKey>,
    max_entries: usize,
}

impl TextWidthCache {
    fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    fn get(&self, key: &TextWidthKey) -> Option<Pt> {
        self.map.get(key).copied()
    }

    fn insert(&mut self, key: TextWidthKey, value: Pt) {
        if self.map.contains_key(&key) {
            return;
        }
        self.map.insert(key.clone(), value);
        self.order.push_back(key);
        while self.map.len() > self.max_entries {
            let Some(old) = self.order.pop_front() else {
                break;
            };
            self.map.remove(&old);
        }
    }
}

/// A TrueType font embedded as a CID font for text the standard fonts cannot
/// encode (Devanagari in practice).
#[derive(Debug)]
pub(crate) struct RegisteredFont {
    pub(crate) name: String,
    pub(crate) data: Vec<u8>,
    pub(crate) ascent: i16,
    pub(crate) descent: i16,
    pub(crate) cap_height: i16,
    pub(crate) italic_angle: i16,
    pub(crate) bbox: (i16, i16, i16, i16),
    pub(crate) missing_width: u16,
}

/// One shaped glyph, advances in 1/1000 em.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ShapedGlyph {
    pub gid: u16,
    pub advance: i32,
    pub x_offset: i32,
    pub text: String,
}

#[derive(Debug)]
pub struct FontRegistry {
    unicode: Option<RegisteredFont>,
    text_width_cache: Mutex<TextWidthCache>,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        Self {
            unicode: None,
            text_width_cache: Mutex::new(TextWidthCache::new(20_000)),
        }
    }

    pub fn register_file(&mut self, path: impl AsRef<Path>) -> Result<String, QbankError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let source = path.file_stem().and_then(|v| v.to_str());
        Ok(self.register_bytes(data, source)?)
    }

    /// Registers the Unicode fallback font, replacing any previous one.
    pub fn register_bytes(
        &mut self,
        data: Vec<u8>,
        source_name: Option<&str>,
    ) -> Result<String, AssetError> {
        let source = source_name.unwrap_or("EmbeddedFont");
        let Ok(face) = ttf_parser::Face::parse(&data, 0) else {
            return Err(AssetError::Font(source.to_string()));
        };
        if face.tables().glyf.is_none() {
            return Err(AssetError::Font(format!(
                "{source} (only TrueType outlines can be embedded)"
            )));
        }
        let units_per_em = face.units_per_em().max(1);
        let scale = 1000.0 / units_per_em as f32;
        let ascent = scale_i16(face.ascender(), scale);
        let bbox = face.global_bounding_box();
        let missing_width = face
            .glyph_index(' ')
            .and_then(|gid| face.glyph_hor_advance(gid))
            .map(|adv| (adv as f32 * scale).round() as u16)
            .unwrap_or(500);
        let name = font_name(&face).unwrap_or_else(|| source.to_string());
        let font = RegisteredFont {
            name: sanitize_font_name(&name),
            ascent,
            descent: scale_i16(face.descender(), scale),
            cap_height: face
                .capital_height()
                .map(|value| scale_i16(value, scale))
                .unwrap_or(ascent),
            italic_angle: face.italic_angle().map(|v| v.round() as i16).unwrap_or(0),
            bbox: (
                scale_i16(bbox.x_min, scale),
                scale_i16(bbox.y_min, scale),
                scale_i16(bbox.x_max, scale),
                scale_i16(bbox.y_max, scale),
            ),
            missing_width,
            data,
        };
        log::debug!("registered unicode font '{}'", font.name);
        let registered = font.name.clone();
        self.unicode = Some(font);
        Ok(registered)
    }

    pub(crate) fn unicode_font(&self) -> Option<&RegisteredFont> {
        self.unicode.as_ref()
    }

    pub fn has_unicode_font(&self) -> bool {
        self.unicode.is_some()
    }

    /// Font to set `text` in: the requested standard face when every character
    /// is WinAnsi, the registered Unicode font otherwise (if any).
    pub fn font_for(&self, weight: FontWeight, text: &str) -> &str {
        match &self.unicode {
            Some(font) if !is_winansi(text) => &font.name,
            _ => weight.base14_name(),
        }
    }

    pub fn is_unicode_font(&self, name: &str) -> bool {
        self.unicode.as_ref().is_some_and(|font| font.name == name)
    }

    pub fn measure_text_width(&self, name: &str, font_size: Pt, text: &str) -> Pt {
        if text.is_empty() {
            return Pt::ZERO;
        }
        let key = TextWidthKey {
            font: name.to_string(),
            size_milli: font_size.to_milli_i64(),
            text: text.to_string(),
        };
        if let Ok(cache) = self.text_width_cache.lock() {
            if let Some(value) = cache.get(&key) {
                return value;
            }
        }
        let units: i32 = if self.is_unicode_font(name) {
            self.shape(text)
                .map(|glyphs| glyphs.iter().map(|g| g.advance).sum())
                .unwrap_or(0)
        } else {
            let bold = name == HELVETICA_BOLD;
            text.chars().map(|ch| base14_advance(bold, ch) as i32).sum()
        };
        let value = if units <= 0 {
            Pt::ZERO
        } else {
            font_size.mul_ratio(units, 1000)
        };
        if let Ok(mut cache) = self.text_width_cache.lock() {
            cache.insert(key, value);
        }
        value
    }

    /// Shapes `text` with the Unicode font. Clusters keep the source text so
    /// the PDF can carry a ToUnicode map.
    pub(crate) fn shape(&self, text: &str) -> Option<Vec<ShapedGlyph>> {
        let font = self.unicode.as_ref()?;
        let face = HbFace::from_slice(&font.data, 0)?;
        let units_per_em = face.units_per_em().max(1) as i64;
        let scale = |v: i32| (((v as i64) * 1000 + units_per_em / 2) / units_per_em) as i32;

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        let output = rustybuzz::shape(&face, &[], buffer);
        let infos = output.glyph_infos();
        let positions = output.glyph_positions();
        if infos.is_empty() || infos.len() != positions.len() {
            return None;
        }
        let mut bounds: Vec<usize> = infos.iter().map(|info| info.cluster as usize).collect();
        bounds.push(text.len());
        let mut glyphs = Vec::with_capacity(infos.len());
        for (idx, (info, pos)) in infos.iter().zip(positions).enumerate() {
            let start = bounds[idx].min(text.len());
            let end = bounds[idx + 1].min(text.len());
            let cluster = if start < end {
                text.get(start..end).unwrap_or_default().to_string()
            } else {
                String::new()
            };
            glyphs.push(ShapedGlyph {
                gid: info.glyph_id as u16,
                advance: scale(pos.x_advance),
                x_offset: scale(pos.x_offset),
                text: cluster,
            });
        }
        Some(glyphs)
    }

    /// Nominal advance of a glyph in 1/1000 em.
    pub(crate) fn glyph_advance(&self, gid: u16) -> u16 {
        let Some(font) = self.unicode.as_ref() else {
            return 0;
        };
        let Ok(face) = ttf_parser::Face::parse(&font.data, 0) else {
            return font.missing_width;
        };
        let advance = face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0) as i64;
        let units = face.units_per_em().max(1) as i64;
        (((advance * 1000) + units / 2) / units).clamp(0, u16::MAX as i64) as u16
    }
}

fn scale_i16(value: i16, scale: f32) -> i16 {
    let scaled = (value as f32 * scale).round() as i32;
    scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn font_name(face: &ttf_parser::Face<'_>) -> Option<String> {
    use ttf_parser::name::name_id;

    let mut family = None;
    let mut post = None;
    for entry in face.names() {
        let Some(name) = entry.to_string() else {
            continue;
        };
        match entry.name_id {
            name_id::POST_SCRIPT_NAME if post.is_none() => post = Some(name),
            name_id::FAMILY if family.is_none() => family = Some(name),
            _ => {}
        }
    }
    post.or(family)
}

pub(crate) fn sanitize_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-' || *ch == '_')
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_widths_match_afm() {
        let registry = FontRegistry::new();
        let size = Pt::from_f32(10.0);
        // "Hello" = 722 + 556 + 222 + 222 + 556 = 2278 units.
        assert_eq!(
            registry.measure_text_width(HELVETICA, size, "Hello").to_milli_i64(),
            22_780
        );
        // Bold "Hello" = 722 + 556 + 278 + 278 + 611 = 2445 units.
        assert_eq!(
            registry
                .measure_text_width(HELVETICA_BOLD, size, "Hello")
                .to_milli_i64(),
            24_450
        );
        assert_eq!(registry.measure_text_width(HELVETICA, size, ""), Pt::ZERO);
    }

    #[test]
    fn font_choice_falls_back_to_standard_faces() {
        let registry = FontRegistry::new();
        assert_eq!(registry.font_for(FontWeight::Bold, "abc"), HELVETICA_BOLD);
        assert_eq!(registry.font_for(FontWeight::Regular, "नमस्ते"), HELVETICA);
        assert!(!registry.has_unicode_font());
        assert!(registry.shape("नमस्ते").is_none());
    }

    #[test]
    fn winansi_detection() {
        assert!(is_winansi("Contact • Teacher – 2026 “quoted”"));
        assert!(!is_winansi("प्रश्न"));
        assert_eq!(winansi_byte('€'), Some(0x80));
    }

    #[test]
    fn rejects_garbage_font_bytes() {
        let mut registry = FontRegistry::new();
        let err = registry
            .register_bytes(vec![0, 1, 2, 3], Some("broken"))
            .expect_err("not a font");
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn weight_threshold() {
        assert_eq!(FontWeight::from_boldness(400), FontWeight::Regular);
        assert_eq!(FontWeight::from_boldness(600), FontWeight::Bold);
        assert_eq!(FontWeight::from_boldness(900), FontWeight::Bold);
    }
}
