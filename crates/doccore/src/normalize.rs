//! Structural repair rules. Each call to [`next_fix`] finds the first violation
//! in document order and returns the operations that repair it.

use crate::node::{Document, Element, ElementKind, ListKind, Node};
use crate::operation::{unwrap_element, wrap_siblings, Operation, Properties};
use crate::path::Path;

/// Upper bound on repair rounds for a single normalization pass.
pub const MAX_NORMALIZE_ROUNDS: usize = 10_000;

pub fn next_fix(doc: &Document) -> Option<Vec<Operation>> {
    if doc.children.is_empty() {
        return Some(vec![Operation::InsertNode {
            path: Path::new(vec![0]),
            node: Node::empty_paragraph(),
        }]);
    }

    for (index, child) in doc.children.iter().enumerate() {
        let path = Path::new(vec![index]);
        match child {
            Node::Text(_) => {
                return Some(wrap_siblings(&Path::root(), index, 1, ElementKind::paragraph()))
            }
            Node::Element(element) => match element.kind {
                ElementKind::Link { .. } => {
                    return Some(wrap_siblings(&Path::root(), index, 1, ElementKind::paragraph()))
                }
                ElementKind::ListItem => {
                    return Some(wrap_siblings(
                        &Path::root(),
                        index,
                        1,
                        ElementKind::list(ListKind::Unordered),
                    ))
                }
                _ => {
                    if let Some(ops) = fix_element(element, &path) {
                        return Some(ops);
                    }
                }
            },
        }
    }
    None
}

fn fix_element(element: &Element, path: &Path) -> Option<Vec<Operation>> {
    if element.children.is_empty() {
        let placeholder = match element.kind {
            ElementKind::List { .. } => Node::element(ElementKind::ListItem, vec![Node::text("")]),
            _ => Node::text(""),
        };
        return Some(vec![Operation::InsertNode {
            path: path.child(0),
            node: placeholder,
        }]);
    }

    if let Some(kind) = repaired_kind(&element.kind) {
        return Some(vec![Operation::SetNode {
            path: path.clone(),
            properties: Properties::Element(kind),
        }]);
    }

    let structural = match element.kind {
        ElementKind::Paragraph { .. } | ElementKind::Heading { .. } => fix_inline_container(element, path, false),
        ElementKind::Link { .. } => fix_inline_container(element, path, true),
        ElementKind::List { .. } => fix_list(element, path),
        ElementKind::ListItem => fix_list_item(element, path),
    };
    if structural.is_some() {
        return structural;
    }

    if matches!(
        element.kind,
        ElementKind::Paragraph { .. } | ElementKind::Heading { .. } | ElementKind::Link { .. } | ElementKind::ListItem
    ) {
        if let Some(ops) = fix_inline_run(element, path) {
            return Some(ops);
        }
    }

    element
        .children
        .iter()
        .enumerate()
        .find_map(|(index, child)| match child {
            Node::Element(inner) => fix_element(inner, &path.child(index)),
            Node::Text(_) => None,
        })
}

fn repaired_kind(kind: &ElementKind) -> Option<ElementKind> {
    match kind {
        ElementKind::Heading { level, align } if !(1..=6).contains(level) => Some(ElementKind::Heading {
            level: (*level).clamp(1, 6),
            align: *align,
        }),
        ElementKind::List {
            kind: ListKind::Unordered,
            start: Some(_),
        } => Some(ElementKind::list(ListKind::Unordered)),
        _ => None,
    }
}

/// Paragraphs, headings and links hold inline content only; links never nest.
fn fix_inline_container(element: &Element, path: &Path, in_link: bool) -> Option<Vec<Operation>> {
    element.children.iter().enumerate().find_map(|(index, child)| {
        let Node::Element(inner) = child else {
            return None;
        };
        if inner.kind.is_block() || (in_link && inner.kind.is_link()) {
            Some(unwrap_element(&path.child(index), inner.children.len()))
        } else {
            None
        }
    })
}

fn fix_list(element: &Element, path: &Path) -> Option<Vec<Operation>> {
    element.children.iter().enumerate().find_map(|(index, child)| {
        if matches!(child.kind(), Some(ElementKind::ListItem)) {
            None
        } else {
            Some(wrap_siblings(path, index, 1, ElementKind::ListItem))
        }
    })
}

fn fix_list_item(element: &Element, path: &Path) -> Option<Vec<Operation>> {
    for (index, child) in element.children.iter().enumerate() {
        if let Node::Element(inner) = child {
            if matches!(
                inner.kind,
                ElementKind::Paragraph { .. } | ElementKind::Heading { .. } | ElementKind::ListItem
            ) {
                return Some(unwrap_element(&path.child(index), inner.children.len()));
            }
        }
    }

    let lists: Vec<usize> = element
        .children
        .iter()
        .enumerate()
        .filter(|(_, child)| matches!(child.kind(), Some(kind) if kind.is_list()))
        .map(|(index, _)| index)
        .collect();

    if let [first, second, ..] = lists[..] {
        let first_len = element.children[first].children().len();
        let moved = element.children[second].children().len();
        let mut ops: Vec<Operation> = (0..moved)
            .map(|offset| Operation::MoveNode {
                path: path.child(second).child(0),
                new_path: path.child(first).child(first_len + offset),
            })
            .collect();
        ops.push(Operation::RemoveNode {
            path: path.child(second),
        });
        return Some(ops);
    }

    if let [only] = lists[..] {
        let last = element.children.len() - 1;
        if only != last {
            return Some(vec![Operation::MoveNode {
                path: path.child(only),
                new_path: path.child(last),
            }]);
        }
        if only == 0 {
            return Some(vec![Operation::InsertNode {
                path: path.child(0),
                node: Node::text(""),
            }]);
        }
    }
    None
}

/// Text/link sequencing: links are fenced by texts, empty links vanish,
/// and adjacent texts are merged or pruned.
fn fix_inline_run(element: &Element, path: &Path) -> Option<Vec<Operation>> {
    let children = &element.children;

    for (index, child) in children.iter().enumerate() {
        if !matches!(child.kind(), Some(kind) if kind.is_link()) {
            continue;
        }
        if child.string().is_empty() {
            return Some(vec![Operation::RemoveNode {
                path: path.child(index),
            }]);
        }
        if index == 0 || !children[index - 1].is_text() {
            return Some(vec![Operation::InsertNode {
                path: path.child(index),
                node: Node::text(""),
            }]);
        }
        if !children.get(index + 1).is_some_and(Node::is_text) {
            return Some(vec![Operation::InsertNode {
                path: path.child(index + 1),
                node: Node::text(""),
            }]);
        }
    }

    for index in 1..children.len() {
        let (Node::Text(prev), Node::Text(current)) = (&children[index - 1], &children[index]) else {
            continue;
        };
        if prev.marks == current.marks {
            return Some(vec![Operation::MergeNode {
                path: path.child(index),
                position: prev.len(),
            }]);
        }
        if prev.is_empty() {
            return Some(vec![Operation::RemoveNode {
                path: path.child(index - 1),
            }]);
        }
        if current.is_empty() {
            return Some(vec![Operation::RemoveNode {
                path: path.child(index),
            }]);
        }
    }
    None
}

impl Document {
    /// Repairs the tree in place until every structural invariant holds.
    pub fn normalize(&mut self) {
        for _ in 0..MAX_NORMALIZE_ROUNDS {
            let Some(ops) = next_fix(self) else {
                return;
            };
            for op in ops {
                if let Err(err) = self.apply(&op) {
                    log::warn!("normalization step failed: {}", err);
                    return;
                }
            }
        }
        log::warn!(
            "normalization did not settle after {} rounds",
            MAX_NORMALIZE_ROUNDS
        );
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Mark, Marks};

    fn item(children: Vec<Node>) -> Node {
        Node::element(ElementKind::ListItem, children)
    }

    fn list(kind: ListKind, items: Vec<Node>) -> Node {
        Node::element(ElementKind::list(kind), items)
    }

    #[test]
    fn test_empty_document_gets_a_paragraph() {
        let doc = Document::new(Vec::new()).normalized();
        assert_eq!(doc, Document::default());
    }

    #[test]
    fn test_root_inlines_are_wrapped() {
        let doc = Document::new(vec![Node::text("a"), item(vec![Node::text("b")])]).normalized();
        assert_eq!(doc.children[0].kind(), Some(&ElementKind::paragraph()));
        assert_eq!(doc.children[1].kind(), Some(&ElementKind::list(ListKind::Unordered)));
        assert_eq!(doc.children[1].children()[0].kind(), Some(&ElementKind::ListItem));
    }

    #[test]
    fn test_empty_elements_get_placeholders() {
        let doc = Document::new(vec![
            Node::paragraph(Vec::new()),
            list(ListKind::Ordered, Vec::new()),
        ])
        .normalized();
        assert_eq!(doc.children[0], Node::empty_paragraph());
        assert_eq!(doc.children[1].children(), &[item(vec![Node::text("")])]);
    }

    #[test]
    fn test_adjacent_texts_merge_or_prune() {
        let bold = Marks::default().with(Mark::Bold, true);
        let doc = Document::new(vec![Node::paragraph(vec![
            Node::text("a"),
            Node::text("b"),
            Node::marked("", bold),
            Node::marked("c", bold),
        ])])
        .normalized();
        assert_eq!(
            doc.children[0].children(),
            &[Node::text("ab"), Node::marked("c", bold)]
        );
    }

    #[test]
    fn test_links_are_fenced_and_never_nest() {
        let inner = Node::element(ElementKind::link("https://b.io"), vec![Node::text("b")]);
        let outer = Node::element(ElementKind::link("https://a.io"), vec![Node::text("a"), inner]);
        let doc = Document::new(vec![Node::paragraph(vec![outer])]).normalized();
        let children = doc.children[0].children();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0], Node::text(""));
        assert_eq!(children[1].children(), &[Node::text("ab")]);
        assert_eq!(children[2], Node::text(""));
    }

    #[test]
    fn test_empty_link_is_removed() {
        let link = Node::element(ElementKind::link("https://a.io"), vec![Node::text("")]);
        let doc = Document::new(vec![Node::paragraph(vec![Node::text("x"), link])]).normalized();
        assert_eq!(doc.children[0].children(), &[Node::text("x")]);
    }

    #[test]
    fn test_list_item_structure() {
        let nested_a = list(ListKind::Unordered, vec![item(vec![Node::text("a")])]);
        let nested_b = list(ListKind::Unordered, vec![item(vec![Node::text("b")])]);
        let doc = Document::new(vec![list(
            ListKind::Unordered,
            vec![
                item(vec![nested_a, Node::paragraph(vec![Node::text("top")]), nested_b]),
                Node::paragraph(vec![Node::text("stray")]),
            ],
        )])
        .normalized();

        let first = &doc.children[0].children()[0];
        assert_eq!(first.children().len(), 2);
        assert_eq!(first.children()[0], Node::text("top"));
        assert_eq!(first.children()[1].children().len(), 2);
        assert_eq!(first.inline_string(), "top");

        let second = &doc.children[0].children()[1];
        assert_eq!(second, &item(vec![Node::text("stray")]));
    }

    #[test]
    fn test_leading_nested_list_gets_text_before_it() {
        let nested = list(ListKind::Ordered, vec![item(vec![Node::text("x")])]);
        let doc = Document::new(vec![list(ListKind::Ordered, vec![item(vec![nested])])]).normalized();
        let owner = &doc.children[0].children()[0];
        assert_eq!(owner.children()[0], Node::text(""));
        assert!(owner.children()[1].kind().is_some_and(ElementKind::is_list));
    }

    #[test]
    fn test_kind_repairs() {
        let doc = Document::new(vec![
            Node::element(ElementKind::heading(9), vec![Node::text("h")]),
            Node::element(
                ElementKind::List {
                    kind: ListKind::Unordered,
                    start: Some(3),
                },
                vec![item(vec![Node::text("i")])],
            ),
        ])
        .normalized();
        assert_eq!(doc.children[0].kind(), Some(&ElementKind::heading(6)));
        assert_eq!(doc.children[1].kind(), Some(&ElementKind::list(ListKind::Unordered)));
    }

    #[test]
    fn test_blocks_inside_paragraph_are_unwrapped() {
        let doc = Document::new(vec![Node::paragraph(vec![
            Node::text("a"),
            Node::paragraph(vec![Node::text("b")]),
        ])])
        .normalized();
        assert_eq!(doc.children, vec![Node::paragraph(vec![Node::text("ab")])]);
    }
}
