//! Editing commands built from operations. Each public transform defers
//! normalization until it returns.

mod node;
mod selection;
mod text;

use std::cmp::Ordering;

use doccore::{Affinity, Operation, Path, Range};
use serde::{Deserialize, Serialize};

use crate::editor::Editor;

/// Cursor movement for [`Editor::move_selection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    LineStart,
    LineEnd,
    DocumentStart,
    DocumentEnd,
}

/// Which end of the selection [`Editor::collapse`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Anchor,
    Focus,
    Start,
    End,
}

impl Editor {
    /// Every node touching `range`, ancestors of its edges included, in document order.
    pub fn nodes_in(&self, range: &Range) -> Vec<Path> {
        let (start, end) = range.edges();
        self.document()
            .nodes()
            .into_iter()
            .map(|(path, _)| path)
            .filter(|path| {
                path.compare(&start.path) != Ordering::Less
                    && path.compare(&end.path) != Ordering::Greater
            })
            .collect()
    }

    /// Text leaves with at least one character inside `range`.
    pub fn leaves_in(&self, range: &Range) -> Vec<Path> {
        let (start, end) = range.edges();
        self.document()
            .texts()
            .into_iter()
            .filter(|(path, text)| {
                if path.is_before(&start.path) || path.is_after(&end.path) {
                    return false;
                }
                let from = if *path == start.path { start.offset } else { 0 };
                let to = if *path == end.path { end.offset } else { text.len() };
                from < to
            })
            .map(|(path, _)| path)
            .collect()
    }

    /// Splits the leaves under both edges of `range` so it covers whole leaves.
    pub(crate) fn split_range_edges(&mut self, range: &Range) -> Option<Range> {
        let (start, end) = range.edges();
        let start_ref = self.point_ref(start, Affinity::Forward);
        let end_ref = self.point_ref(end.clone(), Affinity::Backward);

        self.split_leaf_at(&end.path, end.offset);
        if let Some(start) = self.current_point(&start_ref) {
            self.split_leaf_at(&start.path, start.offset);
        }

        let start = self.unref_point(start_ref);
        let end = self.unref_point(end_ref);
        Some(Range::new(start?, end?))
    }

    fn split_leaf_at(&mut self, path: &Path, offset: usize) -> bool {
        let Some(len) = self.document().text(path).map(|text| text.len()) else {
            return false;
        };
        if offset == 0 || offset >= len {
            return false;
        }
        self.apply(Operation::SplitNode {
            path: path.clone(),
            position: offset,
        })
    }

    /// Line preceding `block` in reading order; a nested item's owner precedes it.
    pub fn previous_text_block(&self, block: &Path) -> Option<Path> {
        let blocks = self.document().text_blocks();
        let position = blocks.iter().position(|candidate| candidate == block)?;
        position.checked_sub(1).map(|index| blocks[index].clone())
    }

    pub fn next_text_block(&self, block: &Path) -> Option<Path> {
        let blocks = self.document().text_blocks();
        let position = blocks.iter().position(|candidate| candidate == block)?;
        blocks.get(position + 1).cloned()
    }

    /// Range spanning the whole document.
    pub fn document_range(&self) -> Option<Range> {
        let start = self.document().first_point()?;
        let end = self.document().last_point()?;
        Some(Range::new(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{editor_at, editor_between, point};

    #[test]
    fn test_nodes_in_includes_edge_ancestors() {
        let editor = editor_at("<p>ab</p><p>cd</p><p>ef</p>", 0);
        let range = Range::new(point(&[0, 0], 1), point(&[1, 0], 1));
        let nodes = editor.nodes_in(&range);
        assert_eq!(
            nodes,
            vec![
                Path::new(vec![0]),
                Path::new(vec![0, 0]),
                Path::new(vec![1]),
                Path::new(vec![1, 0]),
            ]
        );
    }

    #[test]
    fn test_leaves_in_skips_empty_portions() {
        let editor = editor_at("<p>ab<strong>cd</strong>ef</p>", 0);
        let range = Range::new(point(&[0, 0], 2), point(&[0, 2], 0));
        assert_eq!(editor.leaves_in(&range), vec![Path::new(vec![0, 1])]);
    }

    #[test]
    fn test_split_range_edges() {
        let mut editor = editor_between("<p>abcdef</p>", 2, 4);
        let range = editor.selection().cloned().unwrap();
        let split = editor.split_range_edges(&range).unwrap();
        assert_eq!(editor.document().children[0].children().len(), 3);
        assert_eq!(split.start(), point(&[0, 1], 0));
        assert_eq!(split.end(), point(&[0, 1], 2));
    }

    #[test]
    fn test_previous_text_block_visits_owner_first() {
        let editor = editor_at("<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>", 0);
        let nested = Path::new(vec![0, 0, 1, 0]);
        assert_eq!(editor.previous_text_block(&nested), Some(Path::new(vec![0, 0])));
        assert_eq!(
            editor.previous_text_block(&Path::new(vec![0, 1])),
            Some(nested.clone())
        );
        assert_eq!(editor.next_text_block(&Path::new(vec![0, 0])), Some(nested));
    }
}
