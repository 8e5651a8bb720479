//! Pagination of a pre-rendered preview image: the image is scaled to the page
//! width and cut into page-height strips.

use crate::assets::{decode_image_bytes, image_resource_id};
use crate::canvas::{Canvas, Document};
use crate::error::QbankError;
use crate::font::FontRegistry;
use crate::pdf::{PdfOptions, document_to_pdf};
use crate::types::{Color, Pt, Size};
use std::sync::Arc;

/// Number of pages a strip of `image_height` needs, at least one.
pub fn snapshot_page_count(image_height: Pt, page_height: Pt) -> usize {
    if page_height <= Pt::ZERO || image_height <= Pt::ZERO {
        return 1;
    }
    let image = image_height.to_milli_i64();
    let page = page_height.to_milli_i64();
    ((image + page - 1) / page).max(1) as usize
}

/// Lays out `image_bytes` (PNG or JPEG) over as many A4 pages as its height
/// requires.
pub fn snapshot_document(image_bytes: &[u8]) -> Result<Document, QbankError> {
    let image = decode_image_bytes(image_bytes, None)?;
    let page = Size::a4();
    let width = page.width;
    let height = width * image.aspect();
    let pages = snapshot_page_count(height, page.height);
    let resource_id = image_resource_id(&format!("snapshot:{}x{}", image.width, image.height));
    log::debug!(
        "snapshot {}x{}px spans {pages} page(s)",
        image.width,
        image.height
    );

    let mut canvas = Canvas::new(page);
    canvas.register_image(resource_id.clone(), Arc::new(image));
    for index in 0..pages {
        if index > 0 {
            canvas.show_page();
        }
        canvas.set_fill_color(Color::WHITE);
        canvas.draw_rect(Pt::ZERO, Pt::ZERO, page.width, page.height);
        canvas.save_state();
        canvas.clip_rect(Pt::ZERO, Pt::ZERO, page.width, page.height);
        canvas.draw_image(
            Pt::ZERO,
            -(page.height * index as i32),
            width,
            height,
            resource_id.clone(),
        );
        canvas.restore_state();
    }
    Ok(canvas.finish())
}

pub fn paginate_snapshot(image_bytes: &[u8]) -> Result<Vec<u8>, QbankError> {
    let document = snapshot_document(image_bytes)?;
    Ok(document_to_pdf(
        &document,
        &FontRegistry::new(),
        &PdfOptions::default(),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::tests::png_bytes;
    use crate::canvas::Command;
    use crate::pdfinspect::inspect_pdf_bytes;

    #[test]
    fn page_count_rounds_up() {
        let page = Pt::from_f32(100.0);
        assert_eq!(snapshot_page_count(Pt::from_f32(100.0), page), 1);
        assert_eq!(snapshot_page_count(Pt::from_f32(100.5), page), 2);
        assert_eq!(snapshot_page_count(Pt::from_f32(250.0), page), 3);
        assert_eq!(snapshot_page_count(Pt::ZERO, page), 1);
    }

    #[test]
    fn tall_image_is_split_into_offset_strips() {
        // A4 is 1:1.414, so a 1:3 image needs three pages.
        let document = snapshot_document(&png_bytes(10, 30, 255)).expect("snapshot");
        assert_eq!(document.page_count(), 3);
        let offsets: Vec<Pt> = document
            .pages
            .iter()
            .filter_map(|page| {
                page.commands.iter().find_map(|cmd| match cmd {
                    Command::DrawImage { y, .. } => Some(*y),
                    _ => None,
                })
            })
            .collect();
        let page_height = Size::a4().height;
        assert_eq!(offsets, vec![Pt::ZERO, -page_height, -(page_height * 2)]);
    }

    #[test]
    fn produces_a_pdf() {
        let bytes = paginate_snapshot(&png_bytes(20, 10, 255)).expect("pdf");
        assert_eq!(inspect_pdf_bytes(&bytes).expect("inspect").page_count, 1);
    }

    #[test]
    fn undecodable_input_is_an_error() {
        assert!(matches!(
            paginate_snapshot(b"not an image"),
            Err(QbankError::Asset(_))
        ));
    }
}
