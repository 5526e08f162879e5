//! Addresses into the document tree and how they move when operations apply.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::operation::Operation;

/// Sequence of child indices from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

impl Deref for Path {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Path(indices)
    }
}

impl From<&[usize]> for Path {
    fn from(indices: &[usize]) -> Self {
        Path(indices.to_vec())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Path {
    pub fn new(indices: Vec<usize>) -> Self {
        Path(indices)
    }

    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parent(&self) -> Option<Path> {
        let (_, parent) = self.0.split_last()?;
        Some(Path(parent.to_vec()))
    }

    pub fn child(&self, index: usize) -> Path {
        let mut indices = self.0.clone();
        indices.push(index);
        Path(indices)
    }

    /// Index of this node within its parent.
    pub fn index(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn next(&self) -> Path {
        let mut indices = self.0.clone();
        if let Some(last) = indices.last_mut() {
            *last += 1;
        }
        Path(indices)
    }

    pub fn previous(&self) -> Option<Path> {
        let mut indices = self.0.clone();
        let last = indices.last_mut()?;
        *last = last.checked_sub(1)?;
        Some(Path(indices))
    }

    pub fn extend(&self, rest: &[usize]) -> Path {
        let mut indices = self.0.clone();
        indices.extend_from_slice(rest);
        Path(indices)
    }

    pub fn is_ancestor_of(&self, other: &[usize]) -> bool {
        self.len() < other.len() && other.starts_with(&self.0)
    }

    /// True when `other` is this path or lies inside its subtree.
    pub fn encloses(&self, other: &[usize]) -> bool {
        other.starts_with(&self.0)
    }

    pub fn is_sibling_of(&self, other: &[usize]) -> bool {
        match (self.0.split_last(), other.split_last()) {
            (Some((a, pa)), Some((b, pb))) => pa == pb && a != b,
            _ => false,
        }
    }

    /// True when this path ends at a sibling that precedes the same-level ancestor of `other`.
    pub fn ends_before(&self, other: &[usize]) -> bool {
        let Some((last, prefix)) = self.0.split_last() else {
            return false;
        };
        let depth = prefix.len();
        other.len() > depth && other[..depth] == *prefix && *last < other[depth]
    }

    /// Document-order comparison; ancestors compare equal to their descendants.
    pub fn compare(&self, other: &[usize]) -> Ordering {
        for (a, b) in self.0.iter().zip(other.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }

    pub fn is_before(&self, other: &[usize]) -> bool {
        self.compare(other) == Ordering::Less
    }

    pub fn is_after(&self, other: &[usize]) -> bool {
        self.compare(other) == Ordering::Greater
    }

    pub fn common(&self, other: &[usize]) -> Path {
        let shared = self
            .0
            .iter()
            .zip(other.iter())
            .take_while(|(a, b)| a == b)
            .count();
        Path(self.0[..shared].to_vec())
    }

    /// Where this path points after `op` has been applied, or `None` if the node is gone.
    pub fn transform(&self, op: &Operation, affinity: Affinity) -> Option<Path> {
        if self.is_root() {
            return Some(self.clone());
        }
        let mut p = self.0.clone();

        match op {
            Operation::InsertNode { path: at, .. } => {
                if at == self || at.ends_before(self) || at.is_ancestor_of(self) {
                    p[at.len() - 1] += 1;
                }
            }
            Operation::RemoveNode { path: at } => {
                if at.encloses(self) {
                    return None;
                }
                if at.ends_before(self) {
                    p[at.len() - 1] -= 1;
                }
            }
            Operation::MergeNode { path: at, position } => {
                if at == self || at.ends_before(self) {
                    p[at.len() - 1] -= 1;
                } else if at.is_ancestor_of(self) {
                    p[at.len() - 1] -= 1;
                    p[at.len()] += position;
                }
            }
            Operation::SplitNode { path: at, position } => {
                if at == self {
                    if affinity == Affinity::Forward {
                        let last = p.len() - 1;
                        p[last] += 1;
                    }
                } else if at.ends_before(self) {
                    p[at.len() - 1] += 1;
                } else if at.is_ancestor_of(self) && self[at.len()] >= *position {
                    p[at.len() - 1] += 1;
                    p[at.len()] -= position;
                }
            }
            Operation::MoveNode { path: at, new_path } => {
                if at == new_path {
                    return Some(self.clone());
                }
                if at.encloses(self) {
                    let mut moved = new_path.0.clone();
                    if at.ends_before(new_path) && at.len() < new_path.len() {
                        moved[at.len() - 1] -= 1;
                    }
                    moved.extend_from_slice(&self[at.len()..]);
                    return Some(Path(moved));
                } else if at.is_sibling_of(new_path) && new_path.encloses(self) {
                    if at.ends_before(self) {
                        p[at.len() - 1] -= 1;
                    } else {
                        p[at.len() - 1] += 1;
                    }
                } else if new_path.ends_before(self) || new_path.encloses(self) {
                    if at.ends_before(self) {
                        p[at.len() - 1] -= 1;
                    }
                    p[new_path.len() - 1] += 1;
                } else if at.ends_before(self) {
                    if new_path == self {
                        p[new_path.len() - 1] += 1;
                    }
                    p[at.len() - 1] -= 1;
                }
            }
            Operation::InsertText { .. }
            | Operation::RemoveText { .. }
            | Operation::SetNode { .. } => {}
        }

        Some(Path(p))
    }
}

/// Which side a position sticks to when content is inserted or split exactly at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Forward,
    Backward,
}

/// A text leaf and a character offset inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }

    pub fn compare(&self, other: &Point) -> Ordering {
        match self.path.compare(&other.path) {
            Ordering::Equal => self.offset.cmp(&other.offset),
            unequal => unequal,
        }
    }

    pub fn is_before(&self, other: &Point) -> bool {
        self.compare(other) == Ordering::Less
    }

    pub fn is_after(&self, other: &Point) -> bool {
        self.compare(other) == Ordering::Greater
    }

    pub fn transform(&self, op: &Operation, affinity: Affinity) -> Option<Point> {
        let mut point = self.clone();
        match op {
            Operation::InsertNode { .. } | Operation::MoveNode { .. } => {
                point.path = self.path.transform(op, affinity)?;
            }
            Operation::InsertText { path, offset, text } => {
                if *path == self.path
                    && (*offset < self.offset
                        || (*offset == self.offset && affinity == Affinity::Forward))
                {
                    point.offset += text.chars().count();
                }
            }
            Operation::RemoveText { path, offset, text } => {
                if *path == self.path && *offset <= self.offset {
                    point.offset -= (self.offset - offset).min(text.chars().count());
                }
            }
            Operation::MergeNode { path, position } => {
                if *path == self.path {
                    point.offset += position;
                }
                point.path = self.path.transform(op, affinity)?;
            }
            Operation::RemoveNode { path } => {
                if path.encloses(&self.path) {
                    return None;
                }
                point.path = self.path.transform(op, affinity)?;
            }
            Operation::SplitNode { path, position } => {
                if *path == self.path {
                    if *position < self.offset
                        || (*position == self.offset && affinity == Affinity::Forward)
                    {
                        point.offset -= position;
                        point.path = self.path.transform(op, Affinity::Forward)?;
                    }
                } else {
                    point.path = self.path.transform(op, affinity)?;
                }
            }
            Operation::SetNode { .. } => {}
        }
        Some(point)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Point,
    pub focus: Point,
}

impl Range {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_backward(&self) -> bool {
        self.anchor.is_after(&self.focus)
    }

    /// Start and end in document order.
    pub fn edges(&self) -> (Point, Point) {
        if self.is_backward() {
            (self.focus.clone(), self.anchor.clone())
        } else {
            (self.anchor.clone(), self.focus.clone())
        }
    }

    pub fn start(&self) -> Point {
        self.edges().0
    }

    pub fn end(&self) -> Point {
        self.edges().1
    }

    /// Affinities that keep the range from growing over content inserted at its edges.
    pub fn inward_affinities(&self) -> (Affinity, Affinity) {
        if self.is_collapsed() {
            (Affinity::Forward, Affinity::Forward)
        } else if self.is_backward() {
            (Affinity::Backward, Affinity::Forward)
        } else {
            (Affinity::Forward, Affinity::Backward)
        }
    }

    pub fn transform(&self, op: &Operation) -> Option<Range> {
        let (anchor_affinity, focus_affinity) = self.inward_affinities();
        Some(Range {
            anchor: self.anchor.transform(op, anchor_affinity)?,
            focus: self.focus.transform(op, focus_affinity)?,
        })
    }
}
