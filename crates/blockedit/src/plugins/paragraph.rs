use anyhow::Result;
use doccore::{ElementKind, Point, Properties, Range};

use super::{Intent, Plugin};
use crate::editor::Editor;

/// Enter splits the current paragraph or heading; Shift+Enter inserts a line
/// break when soft breaks are enabled.
pub struct ParagraphPlugin {
    soft_break: bool,
}

impl ParagraphPlugin {
    pub fn new(soft_break: bool) -> Self {
        Self { soft_break }
    }

    fn insert_break(&self, editor: &mut Editor) -> bool {
        let Some(selection) = editor.selection().cloned() else {
            return false;
        };
        if !selection.is_collapsed() {
            editor.delete(&selection);
        }
        let Some(point) = editor.cursor() else {
            return false;
        };
        let point = step_out_of_link(editor, point);
        let Some(block) = editor.text_block_at(&point) else {
            return false;
        };
        let kind = editor.document().element(&block).map(|el| el.kind.clone());
        let at_end = editor.is_block_end(&point);

        let Some(next) = editor.split_nodes(point, |el| el.kind.is_text_block()) else {
            return false;
        };
        // A heading continues as body text
        if let Some(ElementKind::Heading { align, .. }) = kind {
            if at_end {
                editor.set_nodes(&next, Properties::Element(ElementKind::Paragraph { align }));
            }
        }
        if let Some(start) = editor.block_start(&next) {
            editor.select(Range::collapsed(start));
        }
        true
    }
}

/// A cursor at the very start or end of a link moves to the text beside it,
/// so breaking the line does not leave an empty link behind.
fn step_out_of_link(editor: &Editor, point: Point) -> Point {
    let doc = editor.document();
    let Some(link) = doc.above(&point.path, |el| el.kind.is_link()) else {
        return point;
    };
    if doc.start(&link).as_ref() == Some(&point) {
        if let Some(before) = link.previous() {
            if let Some(text) = doc.text(&before) {
                return Point::new(before, text.len());
            }
        }
    }
    if doc.end(&link).as_ref() == Some(&point) {
        let after = link.next();
        if doc.text(&after).is_some() {
            return Point::new(after, 0);
        }
    }
    point
}

impl Plugin for ParagraphPlugin {
    fn name(&self) -> &str {
        "paragraph"
    }

    fn on_intent(&self, editor: &mut Editor, intent: &Intent) -> Result<bool> {
        Ok(match intent {
            Intent::InsertBreak => self.insert_break(editor),
            Intent::InsertSoftBreak if self.soft_break => {
                editor.insert_text("\n");
                true
            }
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::plugins::{Outcome, PluginManager};
    use crate::test_support::{editor_at, editor_between, markup, point};

    fn press(editor: &mut Editor, intent: Intent) -> Outcome {
        PluginManager::with_defaults(&EditorConfig::default())
            .handle(editor, &intent)
            .unwrap()
    }

    #[test]
    fn test_enter_splits_paragraph() {
        let mut editor = editor_at("<p style=\"text-align: right\">ab<strong>cd</strong></p>", 3);
        assert_eq!(press(&mut editor, Intent::InsertBreak), Outcome::Plugin);
        assert_eq!(
            markup(&editor),
            "<p style=\"text-align: right\">ab<strong>c</strong></p><p style=\"text-align: right\"><strong>d</strong></p>"
        );
        assert_eq!(editor.cursor(), Some(point(&[1, 0], 0)));
    }

    #[test]
    fn test_enter_at_end_of_heading_starts_paragraph() {
        let mut editor = editor_at("<h1 style=\"text-align: center\">Title</h1>", 5);
        press(&mut editor, Intent::InsertBreak);
        assert_eq!(
            markup(&editor),
            "<h1 style=\"text-align: center\">Title</h1><p style=\"text-align: center\"><br></p>"
        );
        let block = &editor.document().children[1];
        assert_eq!(block.children().len(), 1);
        assert_eq!(block.children()[0].as_text().map(|t| t.text.as_str()), Some(""));
    }

    #[test]
    fn test_enter_inside_heading_keeps_heading() {
        let mut editor = editor_at("<h3>abcd</h3>", 2);
        press(&mut editor, Intent::InsertBreak);
        assert_eq!(markup(&editor), "<h3>ab</h3><h3>cd</h3>");
    }

    #[test]
    fn test_enter_replaces_selection() {
        let mut editor = editor_between("<p>abcdef</p>", 2, 4);
        press(&mut editor, Intent::InsertBreak);
        assert_eq!(markup(&editor), "<p>ab</p><p>ef</p>");
    }

    #[test]
    fn test_enter_at_link_end_leaves_link_whole() {
        let mut editor = editor_at("<p>a<a href=\"https://x.io\">bc</a></p>", 3);
        assert_eq!(editor.cursor(), Some(point(&[0, 1, 0], 2)));
        press(&mut editor, Intent::InsertBreak);
        assert_eq!(
            markup(&editor),
            "<p>a<a href=\"https://x.io\">bc</a></p><p><br></p>"
        );
    }

    #[test]
    fn test_soft_break() {
        let mut editor = editor_at("<p>ab</p>", 1);
        assert_eq!(press(&mut editor, Intent::InsertSoftBreak), Outcome::Plugin);
        assert_eq!(markup(&editor), "<p>a<br>b</p>");

        let manager = PluginManager::with_defaults(&EditorConfig {
            soft_break: false,
            ..EditorConfig::default()
        });
        let outcome = manager.handle(&mut editor, &Intent::InsertSoftBreak).unwrap();
        assert_eq!(outcome, Outcome::Ignored);
    }
}
