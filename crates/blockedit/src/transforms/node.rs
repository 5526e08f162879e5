use doccore::operation::{unwrap_element, wrap_siblings};
use doccore::{Element, ElementKind, Node, Operation, Path, Point, Properties, Range};

use crate::editor::Editor;

impl Editor {
    /// Splits the leaf at `at` and every ancestor up to the nearest one matching
    /// `pred`. Returns the path of the new right half of that ancestor.
    pub fn split_nodes(&mut self, at: Point, pred: impl Fn(&Element) -> bool) -> Option<Path> {
        self.document().text(&at.path)?;
        let highest = self.document().above(&at.path, &pred)?;

        let mut ops = vec![Operation::SplitNode {
            path: at.path.clone(),
            position: at.offset,
        }];
        for depth in (highest.len()..at.path.len()).rev() {
            ops.push(Operation::SplitNode {
                path: Path::from(&at.path[..depth]),
                position: at.path[depth] + 1,
            });
        }

        self.without_normalizing(|editor| {
            if editor.apply_all(ops) {
                Some(highest.next())
            } else {
                None
            }
        })
    }

    /// Merges the node at `at` into its previous sibling.
    pub fn merge_nodes(&mut self, at: &Path) -> bool {
        let Some(previous) = at.previous() else {
            log::debug!("{} has no previous sibling to merge into", at);
            return false;
        };
        let position = match (self.document().get(&previous), self.document().get(at)) {
            (Some(Node::Text(prev)), Some(Node::Text(_))) => prev.len(),
            (Some(Node::Element(prev)), Some(Node::Element(_))) => prev.children.len(),
            _ => {
                log::debug!("cannot merge {} into {}", at, previous);
                return false;
            }
        };
        self.without_normalizing(|editor| {
            editor.apply(Operation::MergeNode {
                path: at.clone(),
                position,
            })
        })
    }

    pub fn set_nodes(&mut self, at: &Path, properties: Properties) -> bool {
        self.without_normalizing(|editor| {
            editor.apply(Operation::SetNode {
                path: at.clone(),
                properties,
            })
        })
    }

    /// Rewrites the kind of every element in `range` matching `pred`; returns how many changed.
    pub fn set_nodes_in(
        &mut self,
        range: &Range,
        pred: impl Fn(&Element) -> bool,
        patch: impl Fn(&ElementKind) -> ElementKind,
    ) -> usize {
        let targets: Vec<(Path, ElementKind)> = self
            .nodes_in(range)
            .into_iter()
            .filter_map(|path| {
                let element = self.document().element(&path)?;
                if !pred(element) {
                    return None;
                }
                let kind = patch(&element.kind);
                (kind != element.kind).then_some((path, kind))
            })
            .collect();

        self.without_normalizing(|editor| {
            targets
                .into_iter()
                .filter(|(path, kind)| editor.set_nodes(path, Properties::Element(kind.clone())))
                .count()
        })
    }

    /// Wraps the content of `range` in a new element of `wrapper`. Inline
    /// wrappers enclose leaves of the start block; block wrappers enclose whole
    /// blocks. With `split`, leaves are first cut at the range edges.
    pub fn wrap_nodes(&mut self, wrapper: ElementKind, range: &Range, split: bool) -> Option<Path> {
        self.without_normalizing(|editor| {
            let range = if split && !range.is_collapsed() {
                editor.split_range_edges(range)?
            } else {
                range.clone()
            };
            let (start, end) = range.edges();
            let start_block = editor.document().text_block(&start.path)?;

            if wrapper.is_inline() {
                let line = editor.document().inline_texts(&start_block);
                let depth = start_block.len();
                let leaves: Vec<Path> = editor
                    .leaves_in(&range)
                    .into_iter()
                    .filter(|leaf| line.contains(leaf))
                    .collect();
                let first = leaves.first()?[depth];
                let last = leaves.last()?[depth];
                let ops = wrap_siblings(&start_block, first, last - first + 1, wrapper);
                editor
                    .apply_all(ops)
                    .then(|| start_block.child(first))
            } else {
                let end_block = editor.document().text_block(&end.path)?;
                let (parent, first, last) = if start_block == end_block {
                    let index = start_block.index()?;
                    (start_block.parent()?, index, index)
                } else {
                    let common = start_block.common(&end_block);
                    let depth = common.len();
                    match (start_block.get(depth), end_block.get(depth)) {
                        (Some(&first), Some(&last)) => (common, first, last),
                        // One block holds the other; the outer one is wrapped whole
                        _ => {
                            let outer = if start_block.len() <= end_block.len() {
                                &start_block
                            } else {
                                &end_block
                            };
                            let index = outer.index()?;
                            (outer.parent()?, index, index)
                        }
                    }
                };
                let ops = wrap_siblings(&parent, first, last - first + 1, wrapper);
                editor.apply_all(ops).then(|| parent.child(first))
            }
        })
    }

    /// Replaces the element at `at` by its children.
    pub fn unwrap_nodes(&mut self, at: &Path) -> bool {
        let Some(count) = self.document().element(at).map(|element| element.children.len()) else {
            return false;
        };
        let ops = unwrap_element(at, count);
        self.without_normalizing(|editor| editor.apply_all(ops))
    }

    /// Unwraps every element in `range` matching `pred`, deepest and last first.
    pub fn unwrap_nodes_in(&mut self, range: &Range, pred: impl Fn(&Element) -> bool) -> usize {
        let targets: Vec<Path> = self
            .nodes_in(range)
            .into_iter()
            .filter(|path| self.document().element(path).is_some_and(&pred))
            .collect();
        self.without_normalizing(|editor| {
            targets
                .into_iter()
                .rev()
                .filter(|path| editor.unwrap_nodes(path))
                .count()
        })
    }

    /// Inserts `nodes` at `at`, or at the selection when `at` is `None`: inline
    /// nodes go into the current line, blocks after the current block. Returns
    /// the path of the last inserted node.
    pub fn insert_nodes(&mut self, nodes: Vec<Node>, at: Option<Path>, select: bool) -> Option<Path> {
        let inline = nodes.first()?.is_inline();
        self.without_normalizing(|editor| {
            let mut path = match at {
                Some(path) => path,
                None => editor.insertion_path(inline)?,
            };
            let mut last = None;
            for node in nodes {
                if !editor.apply(Operation::InsertNode {
                    path: path.clone(),
                    node,
                }) {
                    break;
                }
                last = Some(path.clone());
                path = path.next();
            }
            let last = last?;
            if select {
                if let Some(end) = editor.document().end(&last) {
                    editor.set_selection(Some(Range::collapsed(end)));
                }
            }
            Some(last)
        })
    }

    fn insertion_path(&mut self, inline: bool) -> Option<Path> {
        if let Some(selection) = self.selection().cloned() {
            if !selection.is_collapsed() {
                self.delete(&selection);
            }
        }
        let point = self.cursor()?;
        if !inline {
            return self.document().text_block(&point.path).map(|block| block.next());
        }
        let len = self.document().text(&point.path)?.len();
        if point.offset == 0 {
            Some(point.path)
        } else if point.offset >= len {
            Some(point.path.next())
        } else {
            self.apply(Operation::SplitNode {
                path: point.path.clone(),
                position: point.offset,
            })
            .then(|| point.path.next())
        }
    }

    pub fn remove_nodes(&mut self, at: &Path) -> bool {
        self.without_normalizing(|editor| editor.apply(Operation::RemoveNode { path: at.clone() }))
    }

    /// Moves the node at `at` to `to`; `to` follows the same rules as `Path::transform`.
    pub fn move_nodes(&mut self, at: &Path, to: &Path) -> bool {
        self.without_normalizing(|editor| {
            editor.apply(Operation::MoveNode {
                path: at.clone(),
                new_path: to.clone(),
            })
        })
    }
}
