//! PDF serialization of a laid-out `Document`.
//!
//! Standard fonts are written as Type1 with WinAnsi encoding. The registered
//! Unicode font is embedded as a Type0/CIDFontType2 font with Identity-H
//! encoding and a ToUnicode map so extracted text round-trips. Output is
//! deterministic: equal documents produce equal bytes.

use crate::assets::{DecodedImage, flate_compress};
use crate::canvas::{Command, Document, Page};
use crate::debug::DebugLogger;
use crate::font::{FontRegistry, HELVETICA, ShapedGlyph, sanitize_font_name, winansi_byte};
use crate::types::{Color, Pt};
use fixed::types::I32F32;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

#[derive(Debug, Clone)]
pub struct PdfOptions {
    /// Written to the document information dictionary.
    pub title: Option<String>,
    /// Flate-compress page content streams.
    pub compress: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            title: None,
            compress: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FontEncoding {
    WinAnsi,
    IdentityH,
}

#[derive(Debug, Clone)]
struct FontResource {
    resource: String,
    encoding: FontEncoding,
}

/// Totals gathered while encoding page content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfWriteReport {
    pub page_count: usize,
    pub bytes_written: usize,
    /// Characters drawn in a standard font that WinAnsi cannot encode.
    pub replaced_chars: usize,
}

pub fn document_to_pdf(
    document: &Document,
    fonts: &FontRegistry,
    options: &PdfOptions,
) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    write_document(document, fonts, options, None, &mut out)?;
    Ok(out)
}

pub fn document_to_writer<W: Write>(
    document: &Document,
    fonts: &FontRegistry,
    options: &PdfOptions,
    writer: &mut W,
) -> io::Result<PdfWriteReport> {
    write_document(document, fonts, options, None, writer)
}

pub(crate) fn write_document<W: Write>(
    document: &Document,
    fonts: &FontRegistry,
    options: &PdfOptions,
    debug: Option<&DebugLogger>,
    writer: &mut W,
) -> io::Result<PdfWriteReport> {
    let font_map = build_font_map(document, fonts);
    let image_ids = collect_image_ids(document);
    let gs_keys = collect_opacity_keys(document);
    let image_names: BTreeMap<String, String> = image_ids
        .iter()
        .enumerate()
        .map(|(index, id)| (id.clone(), format!("Im{}", index + 1)))
        .collect();
    let gs_names: BTreeMap<(u16, u16), String> = gs_keys
        .iter()
        .enumerate()
        .map(|(index, key)| (*key, format!("GS{}", index + 1)))
        .collect();

    // Content first: shaping fills the glyph map the embedded font needs.
    let mut encoder = ContentEncoder {
        fonts,
        font_map: &font_map,
        image_names: &image_names,
        gs_names: &gs_names,
        glyph_map: BTreeMap::new(),
        replaced: 0,
    };
    let page_height = document.page_size.height;
    let contents: Vec<String> = document
        .pages
        .iter()
        .map(|page| encoder.render_page(page, page_height))
        .collect();
    let ContentEncoder {
        glyph_map,
        replaced,
        ..
    } = encoder;

    if replaced > 0 {
        log::warn!(
            "{replaced} characters have no WinAnsi code and were written as '?'; \
             register a Unicode font to render them"
        );
        if let Some(debug) = debug {
            debug.log_record(json!({
                "type": "qbank.winansi_replacement",
                "count": replaced,
            }));
            debug.increment("qbank.winansi_replaced", replaced as u64);
        }
    }

    let mut pdf = PdfWriter::new(writer);
    pdf.write_header()?;

    let catalog_id = pdf.alloc();
    let pages_id = pdf.alloc();
    let info_id = pdf.alloc();
    let resources_id = pdf.alloc();

    let mut font_entries: Vec<(String, usize)> = Vec::new();
    for (name, font) in &font_map {
        let object_id = match font.encoding {
            FontEncoding::WinAnsi => {
                let id = pdf.alloc();
                pdf.write_object(id, base14_font_object(name).as_bytes())?;
                id
            }
            FontEncoding::IdentityH => write_cid_font(&mut pdf, fonts, &glyph_map)?,
        };
        font_entries.push((font.resource.clone(), object_id));
    }

    let mut image_entries: Vec<(String, usize)> = Vec::new();
    for id in &image_ids {
        let Some(image) = document.images.get(id) else {
            continue;
        };
        let smask_id = match &image.alpha {
            Some(alpha) => {
                let mask_id = pdf.alloc();
                let dict = format!(
                    "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode",
                    alpha.width, alpha.height
                );
                pdf.write_object(mask_id, &stream_object(&dict, &alpha.data))?;
                Some(mask_id)
            }
            None => None,
        };
        let image_id = pdf.alloc();
        pdf.write_object(image_id, &image_object(image, smask_id))?;
        if let Some(name) = image_names.get(id) {
            image_entries.push((name.clone(), image_id));
        }
    }

    let mut gs_entries: Vec<(String, usize)> = Vec::new();
    for (key, name) in &gs_names {
        let id = pdf.alloc();
        let body = format!(
            "<< /Type /ExtGState /ca {} /CA {} >>",
            format_milli(key.0 as i64),
            format_milli(key.1 as i64)
        );
        pdf.write_object(id, body.as_bytes())?;
        gs_entries.push((name.clone(), id));
    }

    let mut resources = format!("<< /Font {}", resource_dict(&font_entries));
    if !image_entries.is_empty() {
        resources.push_str(&format!(" /XObject {}", resource_dict(&image_entries)));
    }
    if !gs_entries.is_empty() {
        resources.push_str(&format!(" /ExtGState {}", resource_dict(&gs_entries)));
    }
    resources.push_str(" >>");
    pdf.write_object(resources_id, resources.as_bytes())?;

    let mut page_ids = Vec::with_capacity(contents.len());
    for content in &contents {
        let content_id = pdf.alloc();
        let body = if options.compress {
            stream_object("/Filter /FlateDecode", &flate_compress(content.as_bytes())?)
        } else {
            stream_object("", content.as_bytes())
        };
        pdf.write_object(content_id, &body)?;

        let page_id = pdf.alloc();
        let page = format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} 0 R /Contents {} 0 R >>",
            pages_id,
            fmt_pt(document.page_size.width),
            fmt_pt(document.page_size.height),
            resources_id,
            content_id
        );
        pdf.write_object(page_id, page.as_bytes())?;
        page_ids.push(page_id);
    }

    let kids = page_ids
        .iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");
    let pages = format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids,
        page_ids.len()
    );
    pdf.write_object(pages_id, pages.as_bytes())?;
    let catalog = format!("<< /Type /Catalog /Pages {pages_id} 0 R >>");
    pdf.write_object(catalog_id, catalog.as_bytes())?;
    pdf.write_object(info_id, info_object(options.title.as_deref()).as_bytes())?;

    let bytes_written = pdf.finish(catalog_id, info_id)?;
    Ok(PdfWriteReport {
        page_count: page_ids.len(),
        bytes_written,
        replaced_chars: replaced,
    })
}

/// Tracks byte offsets for the cross-reference table as objects are written.
struct PdfWriter<'a, W: Write> {
    writer: &'a mut W,
    offset: usize,
    offsets: Vec<usize>,
    next_id: usize,
}

impl<'a, W: Write> PdfWriter<'a, W> {
    fn new(writer: &'a mut W) -> Self {
        Self {
            writer,
            offset: 0,
            offsets: vec![0],
            next_id: 1,
        }
    }

    fn alloc(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        if self.offsets.len() <= id {
            self.offsets.resize(id + 1, 0);
        }
        id
    }

    fn write_header(&mut self) -> io::Result<()> {
        self.write_bytes(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n")
    }

    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)?;
        self.offset += data.len();
        Ok(())
    }

    fn write_object(&mut self, obj_id: usize, body: &[u8]) -> io::Result<()> {
        if let Some(slot) = self.offsets.get_mut(obj_id) {
            *slot = self.offset;
        }
        self.write_bytes(format!("{obj_id} 0 obj\n").as_bytes())?;
        self.write_bytes(body)?;
        self.write_bytes(b"\nendobj\n")
    }

    fn finish(mut self, catalog_id: usize, info_id: usize) -> io::Result<usize> {
        let xref_start = self.offset;
        let size = self.offsets.len();
        let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
        for offset in self.offsets.iter().skip(1) {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {size} /Root {catalog_id} 0 R /Info {info_id} 0 R >>\nstartxref\n{xref_start}\n%%EOF\n"
        ));
        self.write_bytes(xref.as_bytes())?;
        self.writer.flush()?;
        Ok(self.offset)
    }
}

struct ContentEncoder<'a> {
    fonts: &'a FontRegistry,
    font_map: &'a BTreeMap<String, FontResource>,
    image_names: &'a BTreeMap<String, String>,
    gs_names: &'a BTreeMap<(u16, u16), String>,
    glyph_map: BTreeMap<u16, String>,
    replaced: usize,
}

impl ContentEncoder<'_> {
    /// Translates page commands into a content stream, flipping the y axis.
    fn render_page(&mut self, page: &Page, page_height: Pt) -> String {
        let mut out = String::new();
        let mut font_name = HELVETICA.to_string();
        let mut font_size = Pt::from_f32(12.0);
        let flip = |y: Pt| page_height - y;

        for cmd in &page.commands {
            match cmd {
                Command::SaveState => out.push_str("q\n"),
                Command::RestoreState => out.push_str("Q\n"),
                Command::Meta { .. } => {}
                Command::SetFillColor(color) => out.push_str(&color_op(*color, "rg")),
                Command::SetStrokeColor(color) => out.push_str(&color_op(*color, "RG")),
                Command::SetLineWidth(width) => {
                    out.push_str(&format!("{} w\n", fmt_pt(*width)));
                }
                Command::SetOpacity { fill, stroke } => {
                    if let Some(name) = self.gs_names.get(&opacity_key(*fill, *stroke)) {
                        out.push_str(&format!("/{name} gs\n"));
                    }
                }
                Command::SetFontName(name) => font_name = name.clone(),
                Command::SetFontSize(size) => font_size = *size,
                Command::ClipRect {
                    x,
                    y,
                    width,
                    height,
                } => {
                    out.push_str(&format!(
                        "{} {} {} {} re\nW\nn\n",
                        fmt_pt(*x),
                        fmt_pt(flip(*y + *height)),
                        fmt_pt(*width),
                        fmt_pt(*height)
                    ));
                }
                Command::MoveTo { x, y } => {
                    out.push_str(&format!("{} {} m\n", fmt_pt(*x), fmt_pt(flip(*y))));
                }
                Command::LineTo { x, y } => {
                    out.push_str(&format!("{} {} l\n", fmt_pt(*x), fmt_pt(flip(*y))));
                }
                Command::CurveTo {
                    x1,
                    y1,
                    x2,
                    y2,
                    x,
                    y,
                } => {
                    out.push_str(&format!(
                        "{} {} {} {} {} {} c\n",
                        fmt_pt(*x1),
                        fmt_pt(flip(*y1)),
                        fmt_pt(*x2),
                        fmt_pt(flip(*y2)),
                        fmt_pt(*x),
                        fmt_pt(flip(*y)),
                    ));
                }
                Command::RectPath {
                    x,
                    y,
                    width,
                    height,
                } => {
                    out.push_str(&format!(
                        "{} {} {} {} re\n",
                        fmt_pt(*x),
                        fmt_pt(flip(*y + *height)),
                        fmt_pt(*width),
                        fmt_pt(*height)
                    ));
                }
                Command::ClosePath => out.push_str("h\n"),
                Command::Fill => out.push_str("f\n"),
                Command::Stroke => out.push_str("S\n"),
                Command::DrawString { x, y, text } => {
                    if text.is_empty() {
                        continue;
                    }
                    let font = self.font_map.get(&font_name);
                    let resource = font.map(|f| f.resource.as_str()).unwrap_or("F1");
                    out.push_str("BT\n");
                    out.push_str(&format!("/{} {} Tf\n", resource, fmt_pt(font_size)));
                    out.push_str(&format!(
                        "{} {} Td\n",
                        fmt_pt(*x),
                        fmt_pt(flip(*y + font_size))
                    ));
                    match font.map(|f| f.encoding).unwrap_or(FontEncoding::WinAnsi) {
                        FontEncoding::WinAnsi => {
                            let (encoded, replaced) = encode_winansi(text);
                            self.replaced += replaced;
                            out.push_str(&format!("({encoded}) Tj\n"));
                        }
                        FontEncoding::IdentityH => {
                            let glyphs = self.fonts.shape(text).unwrap_or_default();
                            out.push_str(&self.glyphs_to_tj(&glyphs));
                        }
                    }
                    out.push_str("ET\n");
                }
                Command::DrawRect {
                    x,
                    y,
                    width,
                    height,
                } => {
                    out.push_str(&format!(
                        "{} {} {} {} re\nf\n",
                        fmt_pt(*x),
                        fmt_pt(flip(*y + *height)),
                        fmt_pt(*width),
                        fmt_pt(*height)
                    ));
                }
                Command::DrawImage {
                    x,
                    y,
                    width,
                    height,
                    resource_id,
                } => {
                    if let Some(name) = self.image_names.get(resource_id) {
                        out.push_str(&format!(
                            "q\n{} 0 0 {} {} {} cm\n/{} Do\nQ\n",
                            fmt_pt(*width),
                            fmt_pt(*height),
                            fmt_pt(*x),
                            fmt_pt(flip(*y + *height)),
                            name
                        ));
                    }
                }
            }
        }
        out
    }

    /// Glyph ids with positioning adjustments, recording each glyph's source
    /// text for the ToUnicode map.
    fn glyphs_to_tj(&mut self, glyphs: &[ShapedGlyph]) -> String {
        let mut parts: Vec<String> = Vec::new();
        for glyph in glyphs {
            if glyph.gid != 0 && !glyph.text.is_empty() {
                self.glyph_map
                    .entry(glyph.gid)
                    .or_insert_with(|| glyph.text.clone());
            }
            if glyph.x_offset != 0 {
                parts.push((-glyph.x_offset).to_string());
            }
            parts.push(format!("<{:04X}>", glyph.gid));
            let nominal = self.fonts.glyph_advance(glyph.gid) as i32;
            let adjust = nominal - glyph.advance + glyph.x_offset;
            if adjust != 0 {
                parts.push(adjust.to_string());
            }
        }
        format!("[{}] TJ\n", parts.join(" "))
    }
}

fn build_font_map(document: &Document, fonts: &FontRegistry) -> BTreeMap<String, FontResource> {
    let mut names: BTreeSet<String> = BTreeSet::new();
    names.insert(HELVETICA.to_string());
    for page in &document.pages {
        for cmd in &page.commands {
            if let Command::SetFontName(name) = cmd {
                names.insert(name.clone());
            }
        }
    }
    names
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let encoding = if fonts.is_unicode_font(&name) {
                FontEncoding::IdentityH
            } else {
                FontEncoding::WinAnsi
            };
            let resource = FontResource {
                resource: format!("F{}", index + 1),
                encoding,
            };
            (name, resource)
        })
        .collect()
}

fn collect_image_ids(document: &Document) -> Vec<String> {
    let mut ids: BTreeSet<String> = BTreeSet::new();
    for page in &document.pages {
        for cmd in &page.commands {
            if let Command::DrawImage { resource_id, .. } = cmd {
                if document.images.contains_key(resource_id) {
                    ids.insert(resource_id.clone());
                }
            }
        }
    }
    ids.into_iter().collect()
}

fn opacity_key(fill: f32, stroke: f32) -> (u16, u16) {
    let quantize = |value: f32| ((value * 1000.0).round() as i32).clamp(0, 1000) as u16;
    (quantize(fill), quantize(stroke))
}

fn collect_opacity_keys(document: &Document) -> Vec<(u16, u16)> {
    let mut keys: BTreeSet<(u16, u16)> = BTreeSet::new();
    for page in &document.pages {
        for cmd in &page.commands {
            if let Command::SetOpacity { fill, stroke } = cmd {
                keys.insert(opacity_key(*fill, *stroke));
            }
        }
    }
    keys.into_iter().collect()
}

/// Writes font file, descriptor, CID font, ToUnicode and Type0 objects and
/// returns the id of the Type0 font.
fn write_cid_font<W: Write>(
    pdf: &mut PdfWriter<'_, W>,
    fonts: &FontRegistry,
    glyph_map: &BTreeMap<u16, String>,
) -> io::Result<usize> {
    let Some(font) = fonts.unicode_font() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "unicode font referenced but not registered",
        ));
    };
    let base = sanitize_font_name(&font.name);

    let file_id = pdf.alloc();
    let file_dict = format!("/Length1 {} /Filter /FlateDecode", font.data.len());
    pdf.write_object(file_id, &stream_object(&file_dict, &flate_compress(&font.data)?))?;

    let descriptor_id = pdf.alloc();
    let descriptor = format!(
        "<< /Type /FontDescriptor /FontName /{} /Flags 32 /FontBBox [{} {} {} {}] /ItalicAngle {} /Ascent {} /Descent {} /CapHeight {} /StemV 80 /MissingWidth {} /FontFile2 {} 0 R >>",
        base,
        font.bbox.0,
        font.bbox.1,
        font.bbox.2,
        font.bbox.3,
        font.italic_angle,
        font.ascent,
        font.descent,
        font.cap_height,
        font.missing_width,
        file_id
    );
    pdf.write_object(descriptor_id, descriptor.as_bytes())?;

    let widths = glyph_map
        .keys()
        .map(|gid| {
            let advance = fonts.glyph_advance(*gid);
            let width = if advance > 0 {
                advance
            } else {
                font.missing_width
            };
            format!("{gid} [{width}]")
        })
        .collect::<Vec<_>>()
        .join(" ");
    let cid_id = pdf.alloc();
    let cid_font = format!(
        "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> /FontDescriptor {} 0 R /DW {} /W [{}] /CIDToGIDMap /Identity >>",
        base, descriptor_id, font.missing_width, widths
    );
    pdf.write_object(cid_id, cid_font.as_bytes())?;

    let to_unicode_id = pdf.alloc();
    pdf.write_object(
        to_unicode_id,
        &stream_object("", to_unicode_cmap(glyph_map).as_bytes()),
    )?;

    let type0_id = pdf.alloc();
    let type0 = format!(
        "<< /Type /Font /Subtype /Type0 /BaseFont /{base} /Encoding /Identity-H /DescendantFonts [{cid_id} 0 R] /ToUnicode {to_unicode_id} 0 R >>"
    );
    pdf.write_object(type0_id, type0.as_bytes())?;
    Ok(type0_id)
}

fn base14_font_object(name: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        sanitize_font_name(name)
    )
}

fn image_object(image: &DecodedImage, smask_id: Option<usize>) -> Vec<u8> {
    let smask = smask_id
        .map(|id| format!(" /SMask {id} 0 R"))
        .unwrap_or_default();
    let dict = format!(
        "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent {} /Filter {}{}",
        image.width,
        image.height,
        image.color_space,
        image.bits_per_component,
        image.filter,
        smask
    );
    stream_object(&dict, &image.data)
}

fn stream_object(dict_entries: &str, data: &[u8]) -> Vec<u8> {
    let separator = if dict_entries.is_empty() { "" } else { " " };
    let mut out = format!(
        "<< /Length {}{}{} >>\nstream\n",
        data.len(),
        separator,
        dict_entries
    )
    .into_bytes();
    out.extend_from_slice(data);
    out.extend_from_slice(b"\nendstream");
    out
}

fn resource_dict(entries: &[(String, usize)]) -> String {
    let body = entries
        .iter()
        .map(|(name, id)| format!("/{name} {id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("<< {body} >>")
}

fn info_object(title: Option<&str>) -> String {
    let mut entries = vec!["/Producer (qbank-pdf)".to_string()];
    if let Some(title) = title.filter(|title| !title.trim().is_empty()) {
        entries.push(format!("/Title {}", pdf_text_string(title)));
    }
    format!("<< {} >>", entries.join(" "))
}

/// Literal string for ASCII text, UTF-16BE hex string otherwise.
fn pdf_text_string(input: &str) -> String {
    if input.is_ascii() {
        return format!("({})", escape_pdf_string(input));
    }
    let mut out = String::from("<FEFF");
    for unit in input.encode_utf16() {
        out.push_str(&format!("{unit:04X}"));
    }
    out.push('>');
    out
}

fn escape_pdf_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

/// Encodes `input` as a WinAnsi literal string body. Returns the body and the
/// number of characters replaced with `?`.
fn encode_winansi(input: &str) -> (String, usize) {
    let mut out = String::with_capacity(input.len());
    let mut replaced = 0usize;
    for ch in input.chars() {
        let byte = match winansi_byte(ch) {
            Some(byte) => byte,
            None => {
                replaced += 1;
                b'?'
            }
        };
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b if !(0x20..0x7f).contains(&b) => out.push_str(&format!("\\{b:03o}")),
            b => out.push(b as char),
        }
    }
    (out, replaced)
}

fn to_unicode_cmap(glyph_map: &BTreeMap<u16, String>) -> String {
    let entries: Vec<(&u16, &String)> = glyph_map.iter().collect();
    let mut out = String::new();
    out.push_str("/CIDInit /ProcSet findresource begin\n");
    out.push_str("12 dict begin\n");
    out.push_str("begincmap\n");
    out.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    out.push_str("/CMapName /Adobe-Identity-UCS def\n");
    out.push_str("/CMapType 2 def\n");
    out.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");
    for chunk in entries.chunks(100) {
        out.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, text) in chunk {
            let unicode: String = text
                .encode_utf16()
                .map(|unit| format!("{unit:04X}"))
                .collect();
            out.push_str(&format!("<{gid:04X}> <{unicode}>\n"));
        }
        out.push_str("endbfchar\n");
    }
    out.push_str("endcmap\n");
    out.push_str("CMapName currentdict /CMap defineresource pop\n");
    out.push_str("end\nend\n");
    out
}

fn color_op(color: Color, operator: &str) -> String {
    format!(
        "{} {} {} {}\n",
        fmt(color.r),
        fmt(color.g),
        fmt(color.b),
        operator
    )
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = I32F32::from_num(value);
    let milli: i64 = (fixed * I32F32::from_num(1000)).round().to_num();
    format_milli(milli)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        return format!("{sign}{int_part}");
    }
    let mut s = format!("{sign}{int_part}.{frac_part:03}");
    while s.ends_with('0') {
        s.pop();
    }
    s
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}
