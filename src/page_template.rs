use crate::canvas::Canvas;
use crate::doc_context::DocContext;
use crate::frame::Frame;
use crate::types::{Pt, Rect, Size};
use std::sync::Arc;

#[derive(Clone, Copy)]
pub struct FrameSpec {
    pub rect: Rect,
}

pub type OnPageCallback = Arc<dyn Fn(&mut Canvas, &DocContext) + Send + Sync>;

#[derive(Clone)]
pub struct PageTemplate {
    pub name: String,
    pub page_size: Size,
    frames: Vec<FrameSpec>,
    on_page: Option<OnPageCallback>,
}

impl PageTemplate {
    pub fn new(name: impl Into<String>, page_size: Size) -> Self {
        Self {
            name: name.into(),
            page_size,
            frames: Vec::new(),
            on_page: None,
        }
    }

    /// Template with `columns` equal frames between the margins, separated by
    /// `gutter`, spanning `top..bottom` vertically.
    pub fn with_columns(
        name: impl Into<String>,
        page_size: Size,
        columns: usize,
        margin: Pt,
        gutter: Pt,
        top: Pt,
        bottom: Pt,
    ) -> Self {
        let columns = columns.max(1);
        let usable = page_size.width - margin * 2 - gutter * (columns as i32 - 1);
        let width = usable / columns as i32;
        let mut template = Self::new(name, page_size);
        for column in 0..columns {
            template = template.with_frame(Rect {
                x: margin + (width + gutter) * column as i32,
                y: top,
                width,
                height: bottom - top,
            });
        }
        template
    }

    pub fn with_frame(mut self, rect: Rect) -> Self {
        self.frames.push(FrameSpec { rect });
        self
    }

    pub fn set_on_page<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Canvas, &DocContext) + Send + Sync + 'static,
    {
        self.on_page = Some(Arc::new(callback));
        self
    }

    pub fn on_page(&self) -> Option<&OnPageCallback> {
        self.on_page.as_ref()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_rects(&self) -> impl Iterator<Item = Rect> + '_ {
        self.frames.iter().map(|spec| spec.rect)
    }

    pub fn instantiate_frames(&self) -> Vec<Frame> {
        self.frames
            .iter()
            .map(|spec| Frame::new(spec.rect))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_columns_share_the_width_evenly() {
        let template = PageTemplate::with_columns(
            "questions",
            Size::a4(),
            2,
            Pt::from_mm(10.0),
            Pt::from_mm(10.0),
            Pt::from_mm(45.0),
            Size::a4().height - Pt::from_mm(20.0),
        );
        let rects: Vec<Rect> = template.frame_rects().collect();
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0].width, rects[1].width);
        assert_eq!(rects[1].x - rects[0].right(), Pt::from_mm(10.0));
        assert!(rects[1].right() <= Size::a4().width - Pt::from_mm(10.0));
        assert!((rects[0].width.to_mm() - 90.0).abs() < 0.01);
    }
}
