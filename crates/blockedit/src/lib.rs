// Blockedit library exports

pub mod adapter;
pub mod config;
pub mod editor;
pub mod graphemes;
pub mod keymap;
pub mod marks;
pub mod plugins;
pub mod router;
pub mod script;
pub mod transforms;

pub use adapter::{
    BlockAdapter, BlockAttributes, BlockKind, Collaborator, CollaboratorEvent, InitialPayload,
    InsertPosition, KeyResult, LinkAction, Recorder,
};
pub use config::Config;
pub use editor::{Editor, PathRef, PointRef};
pub use keymap::KeySpec;
pub use marks::MarkRegistry;
pub use plugins::{Intent, Outcome, Plugin, PluginManager};
pub use router::{KeyRouter, Route};
pub use transforms::{Edge, Motion};

#[cfg(test)]
pub(crate) mod test_support {
    use doccore::{deserialize, serialize, Path, Point, Range};

    use crate::editor::Editor;

    /// Editor over `markup` with a collapsed cursor at a document-wide character offset.
    pub fn editor_at(markup: &str, offset: usize) -> Editor {
        let mut editor = Editor::new(deserialize(markup));
        let point = editor.point_from_offset(offset);
        editor.set_selection(point.map(Range::collapsed));
        editor
    }

    /// Editor with an expanded selection between two document-wide character offsets.
    pub fn editor_between(markup: &str, anchor: usize, focus: usize) -> Editor {
        let mut editor = Editor::new(deserialize(markup));
        let anchor = editor.point_from_offset(anchor);
        let focus = editor.point_from_offset(focus);
        if let (Some(anchor), Some(focus)) = (anchor, focus) {
            editor.set_selection(Some(Range::new(anchor, focus)));
        }
        editor
    }

    pub fn markup(editor: &Editor) -> String {
        serialize(editor.document())
    }

    pub fn point(path: &[usize], offset: usize) -> Point {
        Point::new(Path::from(path), offset)
    }
}
