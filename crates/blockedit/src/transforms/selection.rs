use doccore::{Point, Range};

use super::{Edge, Motion};
use crate::editor::Editor;
use crate::graphemes;

impl Editor {
    /// Sets the selection, clamped to existing text. Pending marks are dropped.
    pub fn select(&mut self, range: Range) {
        let anchor = self.clamp(range.anchor);
        let focus = self.clamp(range.focus);
        self.set_pending_marks(None);
        self.set_selection(match (anchor, focus) {
            (Some(anchor), Some(focus)) => Some(Range::new(anchor, focus)),
            _ => None,
        });
    }

    pub fn select_all(&mut self) {
        if let Some(range) = self.document_range() {
            self.select(range);
        }
    }

    pub fn collapse(&mut self, edge: Edge) {
        let Some(selection) = self.selection().cloned() else {
            return;
        };
        let point = match edge {
            Edge::Anchor => selection.anchor,
            Edge::Focus => selection.focus,
            Edge::Start => selection.start(),
            Edge::End => selection.end(),
        };
        self.select(Range::collapsed(point));
    }

    pub fn deselect(&mut self) {
        self.set_pending_marks(None);
        self.set_selection(None);
    }

    /// Moves the focus by `motion`; with `extend` the anchor stays put.
    pub fn move_selection(&mut self, motion: Motion, extend: bool) {
        let Some(selection) = self.selection().cloned() else {
            return;
        };

        if !extend && !selection.is_collapsed() {
            match motion {
                Motion::Left => return self.collapse(Edge::Start),
                Motion::Right => return self.collapse(Edge::End),
                _ => {}
            }
        }

        let Some(focus) = self.moved_point(&selection.focus, motion) else {
            return;
        };
        let range = if extend {
            Range::new(selection.anchor, focus)
        } else {
            Range::collapsed(focus)
        };
        self.select(range);
    }

    fn moved_point(&self, point: &Point, motion: Motion) -> Option<Point> {
        let block = self.text_block_at(point)?;
        let offset = self.block_offset(&block, point)?;
        let len = self.block_len(&block);

        match motion {
            Motion::Left if offset > 0 => {
                let line = self.line_string(&block);
                self.point_at_block_offset(&block, graphemes::prev_boundary(&line, offset))
            }
            Motion::Left => self
                .previous_text_block(&block)
                .and_then(|previous| self.block_end(&previous))
                .or_else(|| Some(point.clone())),
            Motion::Right if offset < len => {
                let line = self.line_string(&block);
                self.point_at_block_offset(&block, graphemes::next_boundary(&line, offset))
            }
            Motion::Right => self
                .next_text_block(&block)
                .and_then(|next| self.block_start(&next))
                .or_else(|| Some(point.clone())),
            Motion::Up => match self.previous_text_block(&block) {
                Some(previous) => self.point_at_block_offset(&previous, offset.min(self.block_len(&previous))),
                None => self.block_start(&block),
            },
            Motion::Down => match self.next_text_block(&block) {
                Some(next) => self.point_at_block_offset(&next, offset.min(self.block_len(&next))),
                None => self.block_end(&block),
            },
            Motion::LineStart => self.block_start(&block),
            Motion::LineEnd => self.block_end(&block),
            Motion::DocumentStart => self.document().first_point(),
            Motion::DocumentEnd => self.document().last_point(),
        }
    }

    fn clamp(&self, point: Point) -> Option<Point> {
        match self.document().text(&point.path) {
            Some(text) => {
                let offset = point.offset.min(text.len());
                Some(Point::new(point.path, offset))
            }
            None => self
                .document()
                .start(&point.path)
                .or_else(|| self.document().last_point()),
        }
    }
}
