//! Atomic tree edits. Every structural change to a document is one of these.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

use crate::node::{Document, Element, ElementKind, Marks, Node, Text};
use crate::path::{Affinity, Path};

/// Replacement attributes for `SetNode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Properties {
    Element(ElementKind),
    Text(Marks),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    InsertNode { path: Path, node: Node },
    RemoveNode { path: Path },
    InsertText { path: Path, offset: usize, text: String },
    RemoveText { path: Path, offset: usize, text: String },
    /// Merge the node at `path` into its previous sibling; `position` is the
    /// previous sibling's length (characters or children) before the merge.
    MergeNode { path: Path, position: usize },
    /// Split the node at `path` so that its content from `position` on moves into a new next sibling.
    SplitNode { path: Path, position: usize },
    /// `new_path` is interpreted the way `Path::transform` moves the node.
    MoveNode { path: Path, new_path: Path },
    SetNode { path: Path, properties: Properties },
}

impl Operation {
    pub fn path(&self) -> &Path {
        match self {
            Operation::InsertNode { path, .. }
            | Operation::RemoveNode { path }
            | Operation::InsertText { path, .. }
            | Operation::RemoveText { path, .. }
            | Operation::MergeNode { path, .. }
            | Operation::SplitNode { path, .. }
            | Operation::MoveNode { path, .. }
            | Operation::SetNode { path, .. } => path,
        }
    }
}

/// Operations that wrap `count` siblings starting at `parent[start]` in a new element.
pub fn wrap_siblings(parent: &Path, start: usize, count: usize, kind: ElementKind) -> Vec<Operation> {
    let wrapper = parent.child(start);
    let mut ops = vec![Operation::InsertNode {
        path: wrapper.clone(),
        node: Node::element(kind, Vec::new()),
    }];
    for index in 0..count {
        ops.push(Operation::MoveNode {
            path: parent.child(start + 1),
            new_path: wrapper.child(index),
        });
    }
    ops
}

/// Operations that replace the element at `path` (holding `count` children) by its children.
pub fn unwrap_element(path: &Path, count: usize) -> Vec<Operation> {
    let Some(parent) = path.parent() else {
        return Vec::new();
    };
    let Some(index) = path.index() else {
        return Vec::new();
    };
    let mut ops: Vec<Operation> = (0..count)
        .map(|offset| Operation::MoveNode {
            path: parent.child(index + offset).child(0),
            new_path: parent.child(index + offset),
        })
        .collect();
    ops.push(Operation::RemoveNode {
        path: parent.child(index + count),
    });
    ops
}

fn byte_offset(text: &str, chars: usize) -> Option<usize> {
    text.char_indices()
        .map(|(index, _)| index)
        .chain(std::iter::once(text.len()))
        .nth(chars)
}

fn split_index(path: &Path) -> Result<(Path, usize)> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("operation addressed the document root"))?;
    let index = path.index().unwrap_or_default();
    Ok((parent, index))
}

impl Document {
    /// Applies one operation. A stale or missing path leaves the tree untouched and returns an error.
    pub fn apply(&mut self, op: &Operation) -> Result<()> {
        match op {
            Operation::InsertNode { path, node } => {
                let (parent, index) = split_index(path)?;
                let children = self
                    .children_at_mut(&parent)
                    .ok_or_else(|| anyhow!("no element at {}", parent))?;
                if index > children.len() {
                    bail!("insert index {} out of bounds at {}", index, parent);
                }
                children.insert(index, node.clone());
            }
            Operation::RemoveNode { path } => {
                let (parent, index) = split_index(path)?;
                let children = self
                    .children_at_mut(&parent)
                    .ok_or_else(|| anyhow!("no element at {}", parent))?;
                if index >= children.len() {
                    bail!("no node to remove at {}", path);
                }
                children.remove(index);
            }
            Operation::InsertText { path, offset, text } => {
                let leaf = self.text_mut(path)?;
                let at = byte_offset(&leaf.text, *offset)
                    .ok_or_else(|| anyhow!("offset {} past the end of {}", offset, path))?;
                leaf.text.insert_str(at, text);
            }
            Operation::RemoveText { path, offset, text } => {
                let leaf = self.text_mut(path)?;
                let start = byte_offset(&leaf.text, *offset)
                    .ok_or_else(|| anyhow!("offset {} past the end of {}", offset, path))?;
                let end = byte_offset(&leaf.text, offset + text.chars().count())
                    .ok_or_else(|| anyhow!("removal past the end of {}", path))?;
                leaf.text.replace_range(start..end, "");
            }
            Operation::MergeNode { path, .. } => {
                let (parent, index) = split_index(path)?;
                if index == 0 {
                    bail!("node at {} has no previous sibling to merge into", path);
                }
                let children = self
                    .children_at_mut(&parent)
                    .ok_or_else(|| anyhow!("no element at {}", parent))?;
                if index >= children.len() {
                    bail!("no node to merge at {}", path);
                }
                match (&children[index - 1], &children[index]) {
                    (Node::Text(_), Node::Text(_)) | (Node::Element(_), Node::Element(_)) => {}
                    _ => bail!("cannot merge a text with an element at {}", path),
                }
                let node = children.remove(index);
                match (&mut children[index - 1], node) {
                    (Node::Text(prev), Node::Text(text)) => prev.text.push_str(&text.text),
                    (Node::Element(prev), Node::Element(element)) => {
                        prev.children.extend(element.children)
                    }
                    _ => unreachable!("merge pair checked above"),
                }
            }
            Operation::SplitNode { path, position } => {
                let (parent, index) = split_index(path)?;
                let children = self
                    .children_at_mut(&parent)
                    .ok_or_else(|| anyhow!("no element at {}", parent))?;
                let node = children
                    .get_mut(index)
                    .ok_or_else(|| anyhow!("no node to split at {}", path))?;
                let tail = match node {
                    Node::Text(text) => {
                        let at = byte_offset(&text.text, *position)
                            .ok_or_else(|| anyhow!("split offset {} past the end of {}", position, path))?;
                        Node::Text(Text::with_marks(text.text.split_off(at), text.marks))
                    }
                    Node::Element(element) => {
                        if *position > element.children.len() {
                            bail!("split position {} out of bounds at {}", position, path);
                        }
                        let rest = element.children.split_off(*position);
                        Node::Element(Element::new(element.kind.clone(), rest))
                    }
                };
                children.insert(index + 1, tail);
            }
            Operation::MoveNode { path, new_path } => {
                if path == new_path {
                    return Ok(());
                }
                if path.is_ancestor_of(new_path) {
                    bail!("cannot move {} inside itself to {}", path, new_path);
                }
                let target = path
                    .transform(op, Affinity::Forward)
                    .ok_or_else(|| anyhow!("move of {} has no destination", path))?;
                let (from_parent, from_index) = split_index(path)?;
                let (to_parent, to_index) = split_index(&target)?;

                let children = self
                    .children_at_mut(&from_parent)
                    .ok_or_else(|| anyhow!("no element at {}", from_parent))?;
                if from_index >= children.len() {
                    bail!("no node to move at {}", path);
                }
                let node = children.remove(from_index);

                let fits = matches!(self.children_at(&to_parent), Some(dest) if to_index <= dest.len());
                if !fits {
                    if let Some(children) = self.children_at_mut(&from_parent) {
                        children.insert(from_index, node);
                    }
                    bail!("move destination {} does not exist", new_path);
                }
                if let Some(dest) = self.children_at_mut(&to_parent) {
                    dest.insert(to_index, node);
                }
            }
            Operation::SetNode { path, properties } => {
                let node = self
                    .get_mut(path)
                    .ok_or_else(|| anyhow!("no node at {}", path))?;
                match (node, properties) {
                    (Node::Element(element), Properties::Element(kind)) => element.kind = kind.clone(),
                    (Node::Text(text), Properties::Text(marks)) => text.marks = *marks,
                    _ => bail!("properties do not match the node at {}", path),
                }
            }
        }
        Ok(())
    }

    fn text_mut(&mut self, path: &Path) -> Result<&mut Text> {
        match self.get_mut(path) {
            Some(Node::Text(text)) => Ok(text),
            Some(Node::Element(_)) => bail!("expected a text leaf at {}", path),
            None => bail!("no node at {}", path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ListKind;

    fn doc() -> Document {
        Document::new(vec![
            Node::paragraph(vec![Node::text("hello")]),
            Node::paragraph(vec![Node::text("world")]),
        ])
    }

    #[test]
    fn test_text_edits_count_characters() {
        let mut doc = Document::new(vec![Node::paragraph(vec![Node::text("héllo")])]);
        let path = Path::new(vec![0, 0]);
        doc.apply(&Operation::InsertText {
            path: path.clone(),
            offset: 2,
            text: "ß".into(),
        })
        .unwrap();
        assert_eq!(doc.string(), "héßllo");
        doc.apply(&Operation::RemoveText {
            path,
            offset: 1,
            text: "éß".into(),
        })
        .unwrap();
        assert_eq!(doc.string(), "hllo");
    }

    #[test]
    fn test_split_and_merge_restore_text() {
        let mut doc = doc();
        doc.apply(&Operation::SplitNode {
            path: Path::new(vec![0, 0]),
            position: 2,
        })
        .unwrap();
        doc.apply(&Operation::SplitNode {
            path: Path::new(vec![0]),
            position: 1,
        })
        .unwrap();
        assert_eq!(doc.children.len(), 3);
        assert_eq!(doc.children[1].string(), "llo");

        doc.apply(&Operation::MergeNode {
            path: Path::new(vec![1]),
            position: 1,
        })
        .unwrap();
        doc.apply(&Operation::MergeNode {
            path: Path::new(vec![0, 1]),
            position: 2,
        })
        .unwrap();
        assert_eq!(doc, self::doc());
    }

    #[test]
    fn test_stale_paths_leave_tree_untouched() {
        let mut doc = doc();
        let before = doc.clone();
        assert!(doc.apply(&Operation::RemoveNode { path: Path::new(vec![7]) }).is_err());
        assert!(doc
            .apply(&Operation::InsertText {
                path: Path::new(vec![0]),
                offset: 0,
                text: "x".into()
            })
            .is_err());
        assert!(doc
            .apply(&Operation::MergeNode {
                path: Path::new(vec![0, 0]),
                position: 0
            })
            .is_err());
        assert!(doc
            .apply(&Operation::MoveNode {
                path: Path::new(vec![0]),
                new_path: Path::new(vec![5, 0])
            })
            .is_err());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_wrap_and_unwrap_sequences() {
        let mut doc = doc();
        for op in wrap_siblings(&Path::root(), 0, 2, ElementKind::list(ListKind::Ordered)) {
            doc.apply(&op).unwrap();
        }
        assert_eq!(doc.children.len(), 1);
        assert_eq!(doc.children[0].children().len(), 2);

        for op in unwrap_element(&Path::new(vec![0]), 2) {
            doc.apply(&op).unwrap();
        }
        assert_eq!(doc, self::doc());
    }

    #[test]
    fn test_set_node_checks_variant() {
        let mut doc = doc();
        let ok = doc.apply(&Operation::SetNode {
            path: Path::new(vec![0]),
            properties: Properties::Element(ElementKind::heading(2)),
        });
        assert!(ok.is_ok());
        assert_eq!(doc.children[0].kind(), Some(&ElementKind::heading(2)));

        let mismatch = doc.apply(&Operation::SetNode {
            path: Path::new(vec![0]),
            properties: Properties::Text(Marks::default()),
        });
        assert!(mismatch.is_err());
    }
}
