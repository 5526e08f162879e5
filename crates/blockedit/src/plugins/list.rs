//! List behavior: breaking, leaving, indenting and outdenting list items.

use anyhow::Result;
use doccore::{Affinity, Document, ElementKind, ListKind, Node, Path, Point, Range};

use super::{Intent, Plugin};
use crate::editor::Editor;

pub struct ListPlugin {
    max_depth: usize,
}

impl ListPlugin {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Enter inside an item: split it, or leave the list from an empty item.
    fn insert_break(&self, editor: &mut Editor) -> bool {
        let Some(selection) = editor.selection().cloned() else {
            return false;
        };
        if current_item(editor, &selection.start()).is_none() {
            return false;
        }
        if !selection.is_collapsed() {
            editor.delete(&selection);
        }
        let Some(point) = editor.cursor() else {
            return true;
        };
        let Some(item) = current_item(editor, &point) else {
            return true;
        };

        if !is_empty_item(editor.document(), &item) {
            if let Some(next) = editor.split_nodes(point, |el| el.kind.is_list_item()) {
                if let Some(start) = editor.block_start(&next) {
                    editor.select(Range::collapsed(start));
                }
            }
            return true;
        }

        if owner_item(editor.document(), &item).is_some() {
            return self.outdent_item(editor, &item);
        }

        let Some(list) = item.parent() else {
            return true;
        };
        let paragraph_at = if sibling_count(editor.document(), &item) == 1 {
            editor.remove_nodes(&list);
            list
        } else {
            editor.remove_nodes(&item);
            list.next()
        };
        editor.insert_nodes(vec![Node::empty_paragraph()], Some(paragraph_at.clone()), false);
        if let Some(start) = editor.document().start(&paragraph_at) {
            editor.select(Range::collapsed(start));
        }
        true
    }

    /// Backspace at the start of an item.
    fn delete_backward(&self, editor: &mut Editor) -> bool {
        let Some(point) = editor.cursor() else {
            return false;
        };
        let Some(item) = current_item(editor, &point) else {
            return false;
        };
        if !editor.is_block_start(&point) {
            return false;
        }

        if !is_empty_item(editor.document(), &item) {
            return self.outdent_item(editor, &item);
        }

        let Some(list) = item.parent() else {
            return false;
        };
        if sibling_count(editor.document(), &item) == 1 {
            match owner_item(editor.document(), &item) {
                Some(owner) => {
                    editor.remove_nodes(&list);
                    if let Some(end) = editor.block_end(&owner) {
                        editor.select(Range::collapsed(end));
                    }
                }
                None => {
                    editor.remove_nodes(&list);
                    editor.insert_nodes(vec![Node::empty_paragraph()], Some(list.clone()), false);
                    if let Some(start) = editor.document().start(&list) {
                        editor.select(Range::collapsed(start));
                    }
                }
            }
            return true;
        }

        let target = editor
            .previous_text_block(&item)
            .and_then(|previous| editor.block_end(&previous))
            .map(|end| editor.point_ref(end, Affinity::Backward));
        editor.remove_nodes(&item);
        if let Some(target) = target.and_then(|target| editor.unref_point(target)) {
            editor.select(Range::collapsed(target));
        }
        true
    }

    fn indent(&self, editor: &mut Editor) -> bool {
        let Some(point) = editor.selection().map(|selection| selection.start()) else {
            return false;
        };
        let Some(item) = current_item(editor, &point) else {
            return false;
        };
        let Some(previous) = item.previous() else {
            // The first item has nothing to nest under
            return true;
        };

        let doc = editor.document();
        let depth = list_depth(doc, &item) + 1 + nested_depth(doc, &item);
        if depth > self.max_depth {
            log::debug!("refusing to indent {} past depth {}", item, self.max_depth);
            return true;
        }
        let Some(kind) = item.parent().and_then(|list| list_kind(doc, &list)) else {
            return true;
        };

        match nested_list(doc, &previous) {
            Some(nested) => {
                let len = child_count(doc, &nested);
                editor.move_nodes(&item, &nested.child(len));
            }
            None => {
                let len = child_count(doc, &previous);
                let nested = previous.child(len);
                editor.insert_nodes(
                    vec![Node::element(ElementKind::list(kind), Vec::new())],
                    Some(nested.clone()),
                    false,
                );
                editor.move_nodes(&item, &nested.child(0));
            }
        }
        true
    }

    fn outdent(&self, editor: &mut Editor) -> bool {
        let Some(point) = editor.selection().map(|selection| selection.start()) else {
            return false;
        };
        let Some(item) = current_item(editor, &point) else {
            return false;
        };
        self.outdent_item(editor, &item);
        true
    }

    /// Moves a nested item after its owner; later siblings become its children.
    /// Top-level items are left alone and reported as unhandled.
    fn outdent_item(&self, editor: &mut Editor, item: &Path) -> bool {
        let doc = editor.document();
        let Some(owner) = owner_item(doc, item) else {
            return false;
        };
        let (Some(list), Some(index)) = (item.parent(), item.index()) else {
            return false;
        };
        let following = child_count(doc, &list).saturating_sub(index + 1);

        if following > 0 {
            let nested = match nested_list(doc, item) {
                Some(nested) => nested,
                None => {
                    let kind = list_kind(doc, &list).unwrap_or(ListKind::Unordered);
                    let nested = item.child(child_count(doc, item));
                    editor.insert_nodes(
                        vec![Node::element(ElementKind::list(kind), Vec::new())],
                        Some(nested.clone()),
                        false,
                    );
                    nested
                }
            };
            let base = child_count(editor.document(), &nested);
            for offset in 0..following {
                editor.move_nodes(&list.child(index + 1), &nested.child(base + offset));
            }
        }

        editor.move_nodes(item, &owner.next());
        if child_count(editor.document(), &list) == 0 {
            editor.remove_nodes(&list);
        }
        true
    }
}

impl Plugin for ListPlugin {
    fn name(&self) -> &str {
        "list"
    }

    fn on_intent(&self, editor: &mut Editor, intent: &Intent) -> Result<bool> {
        Ok(match intent {
            Intent::InsertBreak => self.insert_break(editor),
            Intent::DeleteBackward => self.delete_backward(editor),
            Intent::Indent => self.indent(editor),
            Intent::Outdent => self.outdent(editor),
            Intent::InsertSoftBreak | Intent::InsertText(_) => false,
        })
    }
}

/// The list item whose line holds `point`.
fn current_item(editor: &Editor, point: &Point) -> Option<Path> {
    let block = editor.text_block_at(point)?;
    editor
        .document()
        .element(&block)
        .is_some_and(|element| element.kind.is_list_item())
        .then_some(block)
}

fn child_count(doc: &Document, path: &Path) -> usize {
    doc.children_at(path).map_or(0, <[Node]>::len)
}

fn sibling_count(doc: &Document, path: &Path) -> usize {
    path.parent().map_or(0, |parent| child_count(doc, &parent))
}

fn list_kind(doc: &Document, list: &Path) -> Option<ListKind> {
    match doc.element(list)?.kind {
        ElementKind::List { kind, .. } => Some(kind),
        _ => None,
    }
}

/// An item with no text on its own line and no nested list.
fn is_empty_item(doc: &Document, item: &Path) -> bool {
    doc.get(item)
        .is_some_and(|node| node.inline_string().is_empty() && nested_list(doc, item).is_none())
}

/// The item's nested list, kept as its last child.
fn nested_list(doc: &Document, item: &Path) -> Option<Path> {
    let children = doc.children_at(item)?;
    let last = children.len().checked_sub(1)?;
    children[last]
        .kind()
        .is_some_and(ElementKind::is_list)
        .then(|| item.child(last))
}

/// The item owning the list that contains `item`, when it is nested.
fn owner_item(doc: &Document, item: &Path) -> Option<Path> {
    let owner = item.parent()?.parent()?;
    doc.element(&owner)
        .is_some_and(|element| element.kind.is_list_item())
        .then_some(owner)
}

/// Number of lists enclosing `path`.
fn list_depth(doc: &Document, path: &Path) -> usize {
    (1..path.len())
        .filter(|depth| {
            doc.element(&path[..*depth])
                .is_some_and(|element| element.kind.is_list())
        })
        .count()
}

/// Levels of nesting below `item`.
fn nested_depth(doc: &Document, item: &Path) -> usize {
    doc.nodes()
        .into_iter()
        .filter(|(path, node)| item.is_ancestor_of(path) && node.kind().is_some_and(ElementKind::is_list))
        .map(|(path, _)| list_depth(doc, &path.child(0)) - list_depth(doc, item))
        .max()
        .unwrap_or(0)
}
