use crate::canvas::Canvas;
use crate::flowable::{BreakInside, Flowable};
use crate::types::{Pt, Rect};

pub enum AddResult {
    Placed,
    Split(Box<dyn Flowable>),
    Overflow(Box<dyn Flowable>),
}

/// One column of a page. Flowables stack downwards from the top of `rect`.
pub struct Frame {
    rect: Rect,
    cursor_y: Pt,
}

impl Frame {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            cursor_y: Pt::ZERO,
        }
    }

    pub fn remaining_height(&self) -> Pt {
        (self.rect.height - self.cursor_y).max(Pt::ZERO)
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Offset of the next placement from the top of the frame.
    pub fn cursor_y(&self) -> Pt {
        self.cursor_y
    }

    pub fn is_empty(&self) -> bool {
        self.cursor_y <= Pt::ZERO
    }

    pub fn add(&mut self, flowable: Box<dyn Flowable>, canvas: &mut Canvas) -> AddResult {
        let avail_width = self.rect.width;
        let avail_height = self.remaining_height();
        if avail_height <= Pt::ZERO {
            return AddResult::Overflow(flowable);
        }

        let pagination = flowable.pagination();
        let size = flowable.wrap(avail_width, avail_height);
        let fit = flowable.fit_height(avail_width);

        // An estimate may admit a block whose real height exceeds the space
        // left; that is accepted unless it cannot fit any column at all.
        if fit <= avail_height && size.height <= self.rect.height {
            self.place(flowable.as_ref(), size.height, canvas);
            return AddResult::Placed;
        }

        if matches!(pagination.break_inside, BreakInside::Avoid)
            && fit <= self.rect.height
            && size.height <= self.rect.height
            && !self.is_empty()
        {
            return AddResult::Overflow(flowable);
        }

        if let Some((first, second)) = flowable.split(avail_width, avail_height) {
            let first_size = first.wrap(avail_width, avail_height);
            if first_size.height > Pt::ZERO && first_size.height <= avail_height {
                self.place(first.as_ref(), first_size.height, canvas);
                return AddResult::Split(second);
            }
        }

        // Nothing fits an empty frame: place the leading piece anyway so that
        // pagination keeps moving forward.
        if self.is_empty() {
            if let Some((first, second)) = flowable.split_leading() {
                let first_size = first.wrap(avail_width, avail_height);
                self.place(first.as_ref(), first_size.height, canvas);
                return AddResult::Split(second);
            }
            self.place(flowable.as_ref(), size.height, canvas);
            return AddResult::Placed;
        }

        AddResult::Overflow(flowable)
    }

    fn place(&mut self, flowable: &dyn Flowable, height: Pt, canvas: &mut Canvas) {
        let y = self.rect.y + self.cursor_y;
        flowable.draw(
            canvas,
            self.rect.x,
            y,
            self.rect.width,
            self.remaining_height(),
        );
        canvas.record_block_bounds(Rect {
            x: self.rect.x,
            y,
            width: self.rect.width,
            height,
        });
        self.cursor_y += height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowable::{Pagination, Spacer};
    use crate::types::Size;

    fn frame() -> Frame {
        Frame::new(Rect {
            x: Pt::from_f32(10.0),
            y: Pt::from_f32(20.0),
            width: Pt::from_f32(100.0),
            height: Pt::from_f32(100.0),
        })
    }

    #[derive(Clone)]
    struct Keep(Pt);

    impl Flowable for Keep {
        fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
            Size {
                width: avail_width,
                height: self.0,
            }
        }

        fn split(&self, _w: Pt, _h: Pt) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
            None
        }

        fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, _w: Pt, _h: Pt) {
            canvas.draw_rect(x, y, Pt::from_f32(1.0), self.0);
        }

        fn pagination(&self) -> Pagination {
            Pagination {
                break_inside: BreakInside::Avoid,
                ..Pagination::default()
            }
        }
    }

    #[test]
    fn stacks_until_full_then_overflows() {
        let mut canvas = Canvas::new(Size::a4());
        let mut frame = frame();
        assert!(matches!(
            frame.add(Box::new(Spacer::new(Pt::from_f32(60.0))), &mut canvas),
            AddResult::Placed
        ));
        assert_eq!(frame.cursor_y(), Pt::from_f32(60.0));
        assert!(matches!(
            frame.add(Box::new(Keep(Pt::from_f32(50.0))), &mut canvas),
            AddResult::Overflow(_)
        ));
        assert_eq!(frame.remaining_height(), Pt::from_f32(40.0));
    }

    #[test]
    fn oversized_block_is_placed_on_an_empty_frame() {
        let mut canvas = Canvas::new(Size::a4());
        let mut frame = frame();
        assert!(matches!(
            frame.add(Box::new(Keep(Pt::from_f32(150.0))), &mut canvas),
            AddResult::Placed
        ));
        assert!(frame.remaining_height() <= Pt::ZERO);
        let bounds = canvas.finish().pages[0].block_bounds();
        assert_eq!(bounds[0].y, Pt::from_f32(20.0));
    }
}
