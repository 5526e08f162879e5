//! Document tree: block and inline elements over formatted text leaves.

use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::path::{Path, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
    Justify,
}

impl Align {
    pub fn as_str(&self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
            Align::Justify => "justify",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Align::Left),
            "center" => Some(Align::Center),
            "right" => Some(Align::Right),
            "justify" => Some(Align::Justify),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ListKind::Ordered => "ol",
            ListKind::Unordered => "ul",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ElementKind {
    Paragraph {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        align: Option<Align>,
    },
    Heading {
        level: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        align: Option<Align>,
    },
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
    List {
        kind: ListKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<u32>,
    },
    ListItem,
}

impl ElementKind {
    pub fn paragraph() -> Self {
        ElementKind::Paragraph { align: None }
    }

    pub fn heading(level: u8) -> Self {
        ElementKind::Heading { level, align: None }
    }

    pub fn link(url: impl Into<String>) -> Self {
        ElementKind::Link {
            url: url.into(),
            target: None,
        }
    }

    pub fn list(kind: ListKind) -> Self {
        ElementKind::List { kind, start: None }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, ElementKind::Link { .. })
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    /// Paragraphs, headings and list items carry the editable lines of a document.
    pub fn is_text_block(&self) -> bool {
        matches!(
            self,
            ElementKind::Paragraph { .. } | ElementKind::Heading { .. } | ElementKind::ListItem
        )
    }

    pub fn is_list(&self) -> bool {
        matches!(self, ElementKind::List { .. })
    }

    pub fn is_list_item(&self) -> bool {
        matches!(self, ElementKind::ListItem)
    }

    pub fn is_link(&self) -> bool {
        matches!(self, ElementKind::Link { .. })
    }

    pub fn align(&self) -> Option<Align> {
        match self {
            ElementKind::Paragraph { align } | ElementKind::Heading { align, .. } => *align,
            _ => None,
        }
    }

    /// Copy of this kind with `align` replaced; kinds without alignment are returned as is.
    pub fn with_align(&self, align: Option<Align>) -> Self {
        match self {
            ElementKind::Paragraph { .. } => ElementKind::Paragraph { align },
            ElementKind::Heading { level, .. } => ElementKind::Heading {
                level: *level,
                align,
            },
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
}

impl Mark {
    /// Wrapping order used by the serializer, innermost first.
    pub const ALL: [Mark; 5] = [
        Mark::Code,
        Mark::Bold,
        Mark::Italic,
        Mark::Underline,
        Mark::Strikethrough,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Mark::Code => "code",
            Mark::Bold => "strong",
            Mark::Italic => "em",
            Mark::Underline => "u",
            Mark::Strikethrough => "s",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Mark> {
        match tag {
            "strong" | "b" => Some(Mark::Bold),
            "em" | "i" => Some(Mark::Italic),
            "u" => Some(Mark::Underline),
            "s" | "strike" | "del" => Some(Mark::Strikethrough),
            "code" => Some(Mark::Code),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Underline => "underline",
            Mark::Strikethrough => "strikethrough",
            Mark::Code => "code",
        }
    }
}

impl FromStr for Mark {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mark::ALL
            .into_iter()
            .find(|mark| mark.name() == s)
            .ok_or_else(|| anyhow!("unknown mark: {}", s))
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marks {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
}

impl Marks {
    pub fn has(&self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
            Mark::Underline => self.underline,
            Mark::Strikethrough => self.strikethrough,
            Mark::Code => self.code,
        }
    }

    pub fn set(&mut self, mark: Mark, on: bool) {
        match mark {
            Mark::Bold => self.bold = on,
            Mark::Italic => self.italic = on,
            Mark::Underline => self.underline = on,
            Mark::Strikethrough => self.strikethrough = on,
            Mark::Code => self.code = on,
        }
    }

    pub fn with(mut self, mark: Mark, on: bool) -> Self {
        self.set(mark, on);
        self
    }

    pub fn is_empty(&self) -> bool {
        Mark::ALL.iter().all(|mark| !self.has(*mark))
    }

    pub fn iter(&self) -> impl Iterator<Item = Mark> + '_ {
        Mark::ALL.into_iter().filter(move |mark| self.has(*mark))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(flatten)]
    pub marks: Marks,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn with_marks(text: impl Into<String>, marks: Marks) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    /// Length in characters; every offset in the tree counts characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(kind: ElementKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(Element),
    Text(Text),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(Text::new(text))
    }

    pub fn marked(text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(Text::with_marks(text, marks))
    }

    pub fn element(kind: ElementKind, children: Vec<Node>) -> Self {
        Node::Element(Element::new(kind, children))
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::element(ElementKind::paragraph(), children)
    }

    pub fn empty_paragraph() -> Self {
        Node::paragraph(vec![Node::text("")])
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn kind(&self) -> Option<&ElementKind> {
        self.as_element().map(|element| &element.kind)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn is_inline(&self) -> bool {
        match self {
            Node::Text(_) => true,
            Node::Element(element) => element.kind.is_inline(),
        }
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(element) => &element.children,
            Node::Text(_) => &[],
        }
    }

    pub fn string(&self) -> String {
        match self {
            Node::Text(text) => text.text.clone(),
            Node::Element(element) => element.children.iter().map(Node::string).collect(),
        }
    }

    /// Text of this node excluding nested lists, i.e. the visible line of a list item.
    pub fn inline_string(&self) -> String {
        match self {
            Node::Text(text) => text.text.clone(),
            Node::Element(element) => element
                .children
                .iter()
                .filter(|child| !matches!(child.kind(), Some(kind) if kind.is_list()))
                .map(Node::inline_string)
                .collect(),
        }
    }
}

/// Root of the tree: an ordered sequence of top-level blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub children: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            children: vec![Node::empty_paragraph()],
        }
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn get(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for index in rest {
            node = node.children().get(*index)?;
        }
        Some(node)
    }

    pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get_mut(*first)?;
        for index in rest {
            node = match node {
                Node::Element(element) => element.children.get_mut(*index)?,
                Node::Text(_) => return None,
            };
        }
        Some(node)
    }

    /// Children of the element at `path`, or the top-level blocks for the root path.
    pub fn children_at(&self, path: &[usize]) -> Option<&[Node]> {
        if path.is_empty() {
            return Some(&self.children);
        }
        match self.get(path)? {
            Node::Element(element) => Some(&element.children),
            Node::Text(_) => None,
        }
    }

    pub fn children_at_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Node>> {
        if path.is_empty() {
            return Some(&mut self.children);
        }
        match self.get_mut(path)? {
            Node::Element(element) => Some(&mut element.children),
            Node::Text(_) => None,
        }
    }

    pub fn element(&self, path: &[usize]) -> Option<&Element> {
        self.get(path).and_then(Node::as_element)
    }

    pub fn text(&self, path: &[usize]) -> Option<&Text> {
        self.get(path).and_then(Node::as_text)
    }

    /// Every node in document order, parents before their children.
    pub fn nodes(&self) -> Vec<(Path, &Node)> {
        let mut out = Vec::new();
        collect_nodes(&self.children, &mut Vec::new(), &mut out);
        out
    }

    pub fn texts(&self) -> Vec<(Path, &Text)> {
        self.nodes()
            .into_iter()
            .filter_map(|(path, node)| node.as_text().map(|text| (path, text)))
            .collect()
    }

    /// Text leaves inside the subtree at `at` (the leaf itself when `at` is a text).
    pub fn texts_within(&self, at: &Path) -> Vec<(Path, &Text)> {
        self.texts()
            .into_iter()
            .filter(|(path, _)| at.encloses(path))
            .collect()
    }

    /// Text leaves of a block that belong to its own line, skipping nested lists.
    pub fn inline_texts(&self, block: &Path) -> Vec<Path> {
        self.texts_within(block)
            .into_iter()
            .filter(|(path, _)| {
                (block.len() + 1..path.len()).all(|depth| {
                    !matches!(self.get(&path[..depth]).and_then(Node::kind), Some(kind) if kind.is_list())
                })
            })
            .map(|(path, _)| path)
            .collect()
    }

    pub fn string(&self) -> String {
        self.children.iter().map(Node::string).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.texts().iter().all(|(_, text)| text.is_empty())
    }

    pub fn first_text(&self, at: &Path) -> Option<Path> {
        self.texts_within(at).into_iter().next().map(|(path, _)| path)
    }

    pub fn last_text(&self, at: &Path) -> Option<Path> {
        self.texts_within(at).into_iter().last().map(|(path, _)| path)
    }

    pub fn start(&self, at: &Path) -> Option<Point> {
        self.first_text(at).map(|path| Point::new(path, 0))
    }

    pub fn end(&self, at: &Path) -> Option<Point> {
        let path = self.last_text(at)?;
        let offset = self.text(&path)?.len();
        Some(Point::new(path, offset))
    }

    /// Start of the whole document.
    pub fn first_point(&self) -> Option<Point> {
        self.texts().first().map(|(path, _)| Point::new(path.clone(), 0))
    }

    /// End of the whole document.
    pub fn last_point(&self) -> Option<Point> {
        self.texts()
            .last()
            .map(|(path, text)| Point::new(path.clone(), text.len()))
    }

    pub fn previous_text(&self, path: &Path) -> Option<Path> {
        self.texts()
            .into_iter()
            .filter(|(candidate, _)| candidate.is_before(path))
            .last()
            .map(|(candidate, _)| candidate)
    }

    pub fn next_text(&self, path: &Path) -> Option<Path> {
        self.texts()
            .into_iter()
            .find(|(candidate, _)| candidate.is_after(path))
            .map(|(candidate, _)| candidate)
    }

    /// Nearest strict ancestor of `path` whose element satisfies `pred`.
    pub fn above(&self, path: &Path, pred: impl Fn(&Element) -> bool) -> Option<Path> {
        (1..path.len()).rev().find_map(|depth| {
            let ancestor = &path[..depth];
            match self.element(ancestor) {
                Some(element) if pred(element) => Some(Path::from(ancestor)),
                _ => None,
            }
        })
    }

    /// Nearest paragraph, heading or list item containing `path`.
    pub fn text_block(&self, path: &Path) -> Option<Path> {
        self.above(path, |element| element.kind.is_text_block())
    }

    /// Paragraphs, headings and list items in document order.
    pub fn text_blocks(&self) -> Vec<Path> {
        self.nodes()
            .into_iter()
            .filter(|(_, node)| matches!(node.kind(), Some(kind) if kind.is_text_block()))
            .map(|(path, _)| path)
            .collect()
    }
}

fn collect_nodes<'a>(nodes: &'a [Node], prefix: &mut Vec<usize>, out: &mut Vec<(Path, &'a Node)>) {
    for (index, node) in nodes.iter().enumerate() {
        prefix.push(index);
        out.push((Path::new(prefix.clone()), node));
        collect_nodes(node.children(), prefix, out);
        prefix.pop();
    }
}
