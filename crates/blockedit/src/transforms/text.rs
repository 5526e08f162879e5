use doccore::{Affinity, Node, Operation, Path, Point, Range};

use crate::editor::Editor;
use crate::graphemes;

impl Editor {
    /// Removes the content of `range` and collapses the selection to its start.
    /// Lines cut by the range are joined; blocks left empty are removed.
    pub fn delete(&mut self, range: &Range) {
        if range.is_collapsed() {
            return;
        }
        self.without_normalizing(|editor| editor.delete_range(range));
    }

    fn delete_range(&mut self, range: &Range) {
        let (start, end) = range.edges();
        let (Some(start_text), Some(end_text)) = (
            self.document().text(&start.path).map(|t| t.text.clone()),
            self.document().text(&end.path).map(|t| t.text.clone()),
        ) else {
            log::debug!("delete range does not address text leaves");
            return;
        };

        if start.path == end.path {
            self.apply(Operation::RemoveText {
                path: start.path.clone(),
                offset: start.offset,
                text: graphemes::char_slice(&start_text, start.offset, end.offset),
            });
            self.set_selection(Some(Range::collapsed(start)));
            return;
        }

        let start_block = self.document().text_block(&start.path);
        let end_block = self.document().text_block(&end.path);
        let start_ref = self.point_ref(start.clone(), Affinity::Backward);
        let start_block_ref = start_block.map(|block| self.path_ref(block, Affinity::Backward));
        let end_block_ref = end_block.map(|block| self.path_ref(block, Affinity::Forward));

        // End first so the start leaf keeps its offsets
        self.apply(Operation::RemoveText {
            path: end.path.clone(),
            offset: 0,
            text: graphemes::char_slice(&end_text, 0, end.offset),
        });
        self.apply(Operation::RemoveText {
            path: start.path.clone(),
            offset: start.offset,
            text: graphemes::char_slice(&start_text, start.offset, graphemes::char_len(&start_text)),
        });

        for path in self.nodes_between(&start.path, &end.path).into_iter().rev() {
            self.apply(Operation::RemoveNode { path });
        }

        let start_block = start_block_ref.and_then(|r| self.unref_path(r));
        let end_block = end_block_ref.and_then(|r| self.unref_path(r));
        if let (Some(target), Some(source)) = (start_block, end_block) {
            if target != source {
                self.join_lines(&target, &source);
            }
        }

        let start = self.unref_point(start_ref);
        self.set_selection(start.map(Range::collapsed));
    }

    /// Highest nodes lying strictly between two leaves in document order.
    fn nodes_between(&self, start: &Path, end: &Path) -> Vec<Path> {
        let inside: Vec<Path> = self
            .document()
            .nodes()
            .into_iter()
            .map(|(path, _)| path)
            .filter(|path| path.is_after(start) && path.is_before(end))
            .collect();
        inside
            .iter()
            .filter(|path| {
                !inside
                    .iter()
                    .any(|other| other.is_ancestor_of(path))
            })
            .cloned()
            .collect()
    }

    /// Appends the line of `source` to the line of `target`, which precedes it.
    /// Ancestors emptied by the move are removed.
    pub(crate) fn join_lines(&mut self, target: &Path, source: &Path) {
        if source.previous().as_ref() == Some(target) {
            self.merge_nodes(source);
            return;
        }

        let inline_count = |editor: &Editor, block: &Path| {
            editor
                .document()
                .children_at(block)
                .map(|children| children.iter().filter(|child| child.is_inline()).count())
                .unwrap_or(0)
        };
        let insert_at = inline_count(self, target);
        let moving = inline_count(self, source);
        let source_ref = self.path_ref(source.clone(), Affinity::Forward);
        for index in 0..moving {
            let Some(source) = self.current_path(&source_ref) else {
                break;
            };
            self.apply(Operation::MoveNode {
                path: source.child(0),
                new_path: target.child(insert_at + index),
            });
        }

        let mut emptied = self.unref_path(source_ref);
        while let Some(path) = emptied.take() {
            if path.is_root() || !self.document().children_at(&path).is_some_and(<[Node]>::is_empty) {
                break;
            }
            self.apply(Operation::RemoveNode { path: path.clone() });
            emptied = path.parent();
        }
    }

    /// Deletes one grapheme before the cursor, or the expanded selection. At a
    /// line start the line is joined onto the previous one.
    pub fn delete_backward(&mut self) {
        let Some(selection) = self.selection().cloned() else {
            return;
        };
        if !selection.is_collapsed() {
            self.delete(&selection);
            return;
        }
        let point = selection.focus;
        let Some(block) = self.text_block_at(&point) else {
            return;
        };
        let Some(offset) = self.block_offset(&block, &point) else {
            return;
        };

        let start = if offset > 0 {
            let line = self.line_string(&block);
            self.point_at_block_offset(&block, graphemes::prev_boundary(&line, offset))
        } else {
            self.previous_text_block(&block)
                .and_then(|previous| self.block_end(&previous))
        };
        if let Some(start) = start {
            self.delete(&Range::new(start, point));
        }
    }

    /// Text of a block's own line.
    pub fn line_string(&self, block: &Path) -> String {
        self.document()
            .inline_texts(block)
            .iter()
            .filter_map(|path| self.document().text(path))
            .map(|text| text.text.as_str())
            .collect()
    }

    /// Types `text` at the selection using the pending marks, or the marks of
    /// the text around the cursor.
    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.without_normalizing(|editor| {
            let pending = editor.take_pending_marks();
            if let Some(selection) = editor.selection().cloned() {
                if !selection.is_collapsed() {
                    editor.delete(&selection);
                }
            }
            let Some(point) = editor.cursor() else {
                return;
            };
            let marks = pending.unwrap_or_else(|| editor.marks_at(&point));

            if editor.document().text(&point.path).map(|leaf| leaf.marks) == Some(marks) {
                editor.apply(Operation::InsertText {
                    path: point.path,
                    offset: point.offset,
                    text: text.to_string(),
                });
                return;
            }

            if point.offset == 0 {
                if let Some(previous) = point.path.previous() {
                    if let Some(leaf) = editor.document().text(&previous).filter(|leaf| leaf.marks == marks) {
                        let offset = leaf.len();
                        editor.apply(Operation::InsertText {
                            path: previous.clone(),
                            offset,
                            text: text.to_string(),
                        });
                        let end = Point::new(previous, offset + graphemes::char_len(text));
                        editor.set_selection(Some(Range::collapsed(end)));
                        return;
                    }
                }
            }

            editor.insert_nodes(vec![Node::marked(text, marks)], None, true);
        });
    }
}
