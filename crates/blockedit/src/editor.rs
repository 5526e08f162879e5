use std::cmp::Ordering;

use doccore::normalize::MAX_NORMALIZE_ROUNDS;
use doccore::{next_fix, Affinity, Document, Marks, Node, Operation, Path, Point, Range};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Handle to a point that follows the document through later operations.
#[derive(Debug, PartialEq, Eq)]
pub struct PointRef(usize);

/// Handle to a path that follows the document through later operations.
#[derive(Debug, PartialEq, Eq)]
pub struct PathRef(usize);

#[derive(Debug, Clone)]
enum Tracked {
    Point(Option<Point>, Affinity),
    Path(Option<Path>, Affinity),
}

#[derive(Debug, Clone)]
struct EditorState {
    doc: Document,
    selection: Option<Range>,
}

/// One block's editing session: the tree, the selection, pending typing marks
/// and undo history. Every transform goes through [`Editor::apply`].
#[derive(Debug, Clone)]
pub struct Editor {
    doc: Document,
    selection: Option<Range>,
    pending_marks: Option<Marks>,
    // Operations applied since the last commit
    operations: Vec<Operation>,
    refs: Vec<Option<Tracked>>,
    normalize_depth: usize,
    // Undo/Redo support
    history: Vec<EditorState>,
    history_index: usize,
    history_limit: usize,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Document::default())
    }
}

impl Editor {
    pub fn new(doc: Document) -> Self {
        let doc = doc.normalized();
        let initial_state = EditorState {
            doc: doc.clone(),
            selection: None,
        };
        Self {
            doc,
            selection: None,
            pending_marks: None,
            operations: Vec::new(),
            refs: Vec::new(),
            normalize_depth: 0,
            history: vec![initial_state],
            history_index: 0,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn set_history_limit(&mut self, limit: usize) {
        self.history_limit = limit.max(1);
        while self.history.len() > self.history_limit {
            self.history.remove(0);
            self.history_index = self.history_index.saturating_sub(1);
        }
    }

    /// Replaces the whole document and resets selection and history.
    pub fn set_content(&mut self, doc: Document) {
        let limit = self.history_limit;
        *self = Self::new(doc);
        self.history_limit = limit;
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Option<&Range> {
        self.selection.as_ref()
    }

    pub(crate) fn set_selection(&mut self, selection: Option<Range>) {
        self.selection = selection;
    }

    pub fn is_collapsed(&self) -> bool {
        self.selection.as_ref().is_some_and(Range::is_collapsed)
    }

    /// Focus of a collapsed selection.
    pub fn cursor(&self) -> Option<Point> {
        self.selection
            .as_ref()
            .filter(|selection| selection.is_collapsed())
            .map(|selection| selection.focus.clone())
    }

    pub fn pending_marks(&self) -> Option<Marks> {
        self.pending_marks
    }

    pub(crate) fn set_pending_marks(&mut self, marks: Option<Marks>) {
        self.pending_marks = marks;
    }

    pub(crate) fn take_pending_marks(&mut self) -> Option<Marks> {
        self.pending_marks.take()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Applies one operation and moves the selection and live refs with it.
    /// A stale operation is skipped and reported as `false`.
    pub fn apply(&mut self, op: Operation) -> bool {
        if let Err(err) = self.doc.apply(&op) {
            log::debug!("skipping stale operation {:?}: {}", op, err);
            return false;
        }

        if let Some(selection) = self.selection.take() {
            self.selection = self.transform_selection(selection, &op);
        }
        for slot in self.refs.iter_mut().flatten() {
            match slot {
                Tracked::Point(point, affinity) => {
                    *point = point.as_ref().and_then(|p| p.transform(&op, *affinity));
                }
                Tracked::Path(path, affinity) => {
                    *path = path.as_ref().and_then(|p| p.transform(&op, *affinity));
                }
            }
        }

        self.pending_marks = None;
        self.operations.push(op);
        true
    }

    /// Applies a batch, stopping at the first stale operation.
    pub fn apply_all(&mut self, ops: Vec<Operation>) -> bool {
        ops.into_iter().all(|op| self.apply(op))
    }

    fn transform_selection(&self, selection: Range, op: &Operation) -> Option<Range> {
        let (anchor_affinity, focus_affinity) = selection.inward_affinities();
        let anchor = selection
            .anchor
            .transform(op, anchor_affinity)
            .or_else(|| self.relocate(op))?;
        let focus = selection
            .focus
            .transform(op, focus_affinity)
            .or_else(|| self.relocate(op))?;
        Some(Range::new(anchor, focus))
    }

    /// Nearest surviving text position after a removed node.
    fn relocate(&self, op: &Operation) -> Option<Point> {
        let Operation::RemoveNode { path } = op else {
            return None;
        };

        let mut prev: Option<(Path, usize)> = None;
        let mut next: Option<Path> = None;
        for (candidate, text) in self.doc.texts() {
            if candidate.compare(path) == Ordering::Less {
                prev = Some((candidate, text.len()));
            } else {
                next = Some(candidate);
                break;
            }
        }

        let prefer_next = match (&prev, &next) {
            (Some((prev_path, _)), Some(next_path)) => {
                if next_path == path {
                    path.index() == Some(0)
                } else {
                    prev_path.common(path).len() < next_path.common(path).len()
                }
            }
            _ => false,
        };

        match (prev, next) {
            (Some((path, offset)), _) if !prefer_next => Some(Point::new(path, offset)),
            (_, Some(path)) => Some(Point::new(path, 0)),
            _ => None,
        }
    }

    /// Runs `f` with normalization deferred; the outermost call normalizes once at the end.
    pub fn without_normalizing<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.normalize_depth += 1;
        let result = f(self);
        self.normalize_depth -= 1;
        if self.normalize_depth == 0 {
            self.normalize();
        }
        result
    }

    pub fn is_normalizing_deferred(&self) -> bool {
        self.normalize_depth > 0
    }

    pub fn normalize(&mut self) {
        for _ in 0..MAX_NORMALIZE_ROUNDS {
            let Some(ops) = next_fix(&self.doc) else {
                self.clamp_selection();
                return;
            };
            if !self.apply_all(ops) {
                log::warn!("normalization step could not be applied");
                self.clamp_selection();
                return;
            }
        }
        log::warn!(
            "normalization did not settle after {} rounds",
            MAX_NORMALIZE_ROUNDS
        );
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let Some(selection) = self.selection.take() else {
            return;
        };
        let anchor = self.clamp_point(selection.anchor);
        let focus = self.clamp_point(selection.focus);
        self.selection = match (anchor, focus) {
            (Some(anchor), Some(focus)) => Some(Range::new(anchor, focus)),
            _ => None,
        };
    }

    fn clamp_point(&self, point: Point) -> Option<Point> {
        match self.doc.get(&point.path) {
            Some(Node::Text(text)) => {
                let offset = point.offset.min(text.len());
                Some(Point::new(point.path, offset))
            }
            Some(Node::Element(_)) => self.doc.start(&point.path),
            None => self.doc.last_point(),
        }
    }

    pub fn point_ref(&mut self, point: Point, affinity: Affinity) -> PointRef {
        self.refs.push(Some(Tracked::Point(Some(point), affinity)));
        PointRef(self.refs.len() - 1)
    }

    pub fn current_point(&self, point_ref: &PointRef) -> Option<Point> {
        match self.refs.get(point_ref.0) {
            Some(Some(Tracked::Point(point, _))) => point.clone(),
            _ => None,
        }
    }

    pub fn unref_point(&mut self, point_ref: PointRef) -> Option<Point> {
        let point = self.current_point(&point_ref);
        self.release(point_ref.0);
        point
    }

    pub fn path_ref(&mut self, path: Path, affinity: Affinity) -> PathRef {
        self.refs.push(Some(Tracked::Path(Some(path), affinity)));
        PathRef(self.refs.len() - 1)
    }

    pub fn current_path(&self, path_ref: &PathRef) -> Option<Path> {
        match self.refs.get(path_ref.0) {
            Some(Some(Tracked::Path(path, _))) => path.clone(),
            _ => None,
        }
    }

    pub fn unref_path(&mut self, path_ref: PathRef) -> Option<Path> {
        let path = self.current_path(&path_ref);
        self.release(path_ref.0);
        path
    }

    fn release(&mut self, slot: usize) {
        if let Some(entry) = self.refs.get_mut(slot) {
            *entry = None;
        }
        while matches!(self.refs.last(), Some(None)) {
            self.refs.pop();
        }
    }

    /// Closes the current keystroke: records a history snapshot when the
    /// document changed. Returns whether it did.
    pub fn commit(&mut self) -> bool {
        self.operations.clear();
        let current_state = EditorState {
            doc: self.doc.clone(),
            selection: self.selection.clone(),
        };

        // Don't save if the content hasn't changed from current history state
        if let Some(last_state) = self.history.get_mut(self.history_index) {
            if last_state.doc == current_state.doc {
                last_state.selection = current_state.selection;
                return false;
            }
        }

        self.history.truncate(self.history_index + 1);
        self.history.push(current_state);
        self.history_index += 1;

        if self.history.len() > self.history_limit {
            self.history.remove(0);
            self.history_index -= 1;
        }
        true
    }

    pub fn undo(&mut self) -> bool {
        if self.history_index == 0 {
            return false;
        }
        self.history_index -= 1;
        self.restore_state();
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.history_index + 1 >= self.history.len() {
            return false;
        }
        self.history_index += 1;
        self.restore_state();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history_index > 0
    }

    fn restore_state(&mut self) {
        if let Some(state) = self.history.get(self.history_index) {
            self.doc = state.doc.clone();
            self.selection = state.selection.clone();
            self.pending_marks = None;
            self.operations.clear();
        }
    }

    /// Nearest paragraph, heading or list item holding `point`.
    pub fn text_block_at(&self, point: &Point) -> Option<Path> {
        self.doc.text_block(&point.path)
    }

    /// Character offset of `point` along the line of `block`.
    pub fn block_offset(&self, block: &Path, point: &Point) -> Option<usize> {
        let mut offset = 0;
        for path in self.doc.inline_texts(block) {
            if path == point.path {
                return Some(offset + point.offset);
            }
            offset += self.doc.text(&path)?.len();
        }
        None
    }

    pub fn block_len(&self, block: &Path) -> usize {
        self.doc
            .inline_texts(block)
            .iter()
            .filter_map(|path| self.doc.text(path))
            .map(|text| text.len())
            .sum()
    }

    /// Point at a line offset of `block`; boundaries resolve to the end of the earlier leaf.
    pub fn point_at_block_offset(&self, block: &Path, offset: usize) -> Option<Point> {
        let texts = self.doc.inline_texts(block);
        let mut remaining = offset;
        for path in &texts {
            let len = self.doc.text(path)?.len();
            if remaining <= len {
                return Some(Point::new(path.clone(), remaining));
            }
            remaining -= len;
        }
        let last = texts.last()?;
        let len = self.doc.text(last)?.len();
        Some(Point::new(last.clone(), len))
    }

    pub fn block_start(&self, block: &Path) -> Option<Point> {
        self.point_at_block_offset(block, 0)
    }

    pub fn block_end(&self, block: &Path) -> Option<Point> {
        self.point_at_block_offset(block, self.block_len(block))
    }

    pub fn is_block_start(&self, point: &Point) -> bool {
        self.text_block_at(point)
            .and_then(|block| self.block_offset(&block, point))
            == Some(0)
    }

    pub fn is_block_end(&self, point: &Point) -> bool {
        match self.text_block_at(point) {
            Some(block) => self.block_offset(&block, point) == Some(self.block_len(&block)),
            None => false,
        }
    }

    /// Point at a character offset counted across every text leaf of the document.
    pub fn point_from_offset(&self, offset: usize) -> Option<Point> {
        let mut remaining = offset;
        let texts = self.doc.texts();
        for (path, text) in &texts {
            if remaining <= text.len() {
                return Some(Point::new(path.clone(), remaining));
            }
            remaining -= text.len();
        }
        self.doc.last_point()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doccore::{deserialize, serialize};

    fn editor(markup: &str) -> Editor {
        Editor::new(deserialize(markup))
    }

    #[test]
    fn test_apply_transforms_selection() {
        let mut editor = editor("<p>hello</p>");
        let cursor = Point::new(Path::new(vec![0, 0]), 5);
        editor.set_selection(Some(Range::collapsed(cursor)));
        assert!(editor.apply(Operation::InsertText {
            path: Path::new(vec![0, 0]),
            offset: 0,
            text: ">> ".into(),
        }));
        assert_eq!(editor.cursor().map(|p| p.offset), Some(8));
        assert_eq!(editor.operations().len(), 1);
    }

    #[test]
    fn test_stale_operation_is_a_no_op() {
        let mut editor = editor("<p>hello</p>");
        let before = editor.document().clone();
        assert!(!editor.apply(Operation::RemoveNode {
            path: Path::new(vec![4]),
        }));
        assert_eq!(editor.document(), &before);
        assert!(editor.operations().is_empty());
    }

    #[test]
    fn test_removed_node_relocates_selection() {
        let mut editor = editor("<p>one</p><p>two</p><p>three</p>");
        editor.set_selection(Some(Range::collapsed(Point::new(Path::new(vec![1, 0]), 1))));
        assert!(editor.apply(Operation::RemoveNode {
            path: Path::new(vec![1]),
        }));
        // the following block shares a longer prefix with the removed one
        assert_eq!(
            editor.cursor(),
            Some(Point::new(Path::new(vec![1, 0]), 0))
        );

        editor.set_selection(Some(Range::collapsed(Point::new(Path::new(vec![0, 0]), 0))));
        assert!(editor.apply(Operation::RemoveNode {
            path: Path::new(vec![0]),
        }));
        assert_eq!(
            editor.cursor(),
            Some(Point::new(Path::new(vec![0, 0]), 0))
        );
    }

    #[test]
    fn test_refs_follow_operations() {
        let mut editor = editor("<p>ab</p>");
        let point = editor.point_ref(Point::new(Path::new(vec![0, 0]), 2), Affinity::Forward);
        let path = editor.path_ref(Path::new(vec![0]), Affinity::Forward);
        editor.apply(Operation::InsertNode {
            path: Path::new(vec![0]),
            node: Node::empty_paragraph(),
        });
        assert_eq!(editor.current_path(&path), Some(Path::new(vec![1])));
        assert_eq!(editor.unref_point(point), Some(Point::new(Path::new(vec![1, 0]), 2)));
        assert_eq!(editor.unref_path(path), Some(Path::new(vec![1])));
        assert!(editor.refs.is_empty());
    }

    #[test]
    fn test_without_normalizing_defers_until_outermost() {
        let mut editor = editor("<p>ab</p>");
        editor.without_normalizing(|ed| {
            ed.apply(Operation::SplitNode {
                path: Path::new(vec![0, 0]),
                position: 1,
            });
            ed.without_normalizing(|inner| {
                assert!(inner.is_normalizing_deferred());
            });
            assert_eq!(ed.document().children[0].children().len(), 2);
        });
        assert_eq!(editor.document().children[0].children().len(), 1);
    }

    #[test]
    fn test_history_undo_redo() {
        let mut editor = editor("<p>a</p>");
        editor.apply(Operation::InsertText {
            path: Path::new(vec![0, 0]),
            offset: 1,
            text: "b".into(),
        });
        assert!(editor.commit());
        assert!(!editor.commit());
        assert_eq!(serialize(editor.document()), "<p>ab</p>");

        assert!(editor.undo());
        assert_eq!(serialize(editor.document()), "<p>a</p>");
        assert!(!editor.undo());
        assert!(editor.redo());
        assert_eq!(serialize(editor.document()), "<p>ab</p>");
        assert!(!editor.redo());
    }

    #[test]
    fn test_history_limit() {
        let mut editor = editor("<p></p>");
        editor.set_history_limit(5);
        for i in 0..10 {
            editor.apply(Operation::InsertText {
                path: Path::new(vec![0, 0]),
                offset: i,
                text: "x".into(),
            });
            editor.commit();
        }
        assert_eq!(editor.history.len(), 5);
        let mut undone = 0;
        while editor.undo() {
            undone += 1;
        }
        assert_eq!(undone, 4);
        assert_eq!(editor.document().string(), "xxxxxx");
    }

    #[test]
    fn test_block_offsets() {
        let editor = editor("<p>ab<strong>cd</strong>e</p>");
        let block = Path::new(vec![0]);
        assert_eq!(editor.block_len(&block), 5);
        let point = Point::new(Path::new(vec![0, 1]), 1);
        assert_eq!(editor.block_offset(&block, &point), Some(3));
        assert_eq!(
            editor.point_at_block_offset(&block, 2),
            Some(Point::new(Path::new(vec![0, 0]), 2))
        );
        assert_eq!(editor.point_from_offset(4), Some(Point::new(Path::new(vec![0, 1]), 2)));
        assert!(editor.is_block_start(&Point::new(Path::new(vec![0, 0]), 0)));
        assert!(editor.is_block_end(&Point::new(Path::new(vec![0, 2]), 1)));
    }
}
