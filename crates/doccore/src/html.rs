//! Codec between the document tree and the constrained HTML subset
//! `p, h1..h6, a, ul, ol, li, strong, em, u, s, code, br`.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Node as HtmlNode};

use crate::node::{Align, Document, Element, ElementKind, ListKind, Mark, Marks, Node, Text};
use crate::sanitize::sanitize_markup;

lazy_static! {
    static ref TEXT_ALIGN: Regex =
        Regex::new(r"(?i)text-align\s*:\s*(left|center|right|justify)")
            .expect("Invalid TEXT_ALIGN regex pattern");
}

const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "div", "blockquote", "pre",
    "section", "article", "header", "footer", "table",
];

/// How markup without tags, or with none at all, is shaped into a document.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Block used for plain-text input and empty input.
    pub shape: ElementKind,
    /// Run tagged input through the sanitizer before parsing.
    pub sanitize: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            shape: ElementKind::paragraph(),
            sanitize: true,
        }
    }
}

pub fn serialize(doc: &Document) -> String {
    doc.children.iter().map(serialize_node).collect()
}

pub fn serialize_node(node: &Node) -> String {
    match node {
        Node::Text(text) => serialize_text(text),
        Node::Element(element) => serialize_element(element),
    }
}

fn serialize_text(text: &Text) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut out = escape(&text.text).replace('\n', "<br>");
    for mark in text.marks.iter() {
        out = format!("<{tag}>{out}</{tag}>", tag = mark.tag());
    }
    out
}

fn serialize_element(element: &Element) -> String {
    let split = element
        .children
        .iter()
        .position(Node::is_block)
        .unwrap_or(element.children.len());
    let (inlines, blocks) = element.children.split_at(split);
    let mut inner: String = inlines.iter().map(serialize_node).collect();
    // A trailing `<br>` does not render a line; the extra one keeps it visible.
    if ends_with_line_break(inlines) {
        inner.push_str("<br>");
    }
    inner.extend(blocks.iter().map(serialize_node));
    if inner.is_empty() {
        inner.push_str("<br>");
    }

    match &element.kind {
        ElementKind::Paragraph { align } => format!("<p{}>{}</p>", align_attr(*align), inner),
        ElementKind::Heading { level, align } => {
            format!("<h{level}{}>{}</h{level}>", align_attr(*align), inner)
        }
        ElementKind::Link { url, target } => match target {
            Some(target) => format!(
                r#"<a href="{}" target="{}" rel="noopener noreferrer">{}</a>"#,
                escape(url),
                escape(target),
                inner
            ),
            None => format!(r#"<a href="{}">{}</a>"#, escape(url), inner),
        },
        ElementKind::List { kind, start } => {
            let start = match (kind, start) {
                (ListKind::Ordered, Some(start)) => format!(r#" start="{}""#, start),
                _ => String::new(),
            };
            format!("<{tag}{start}>{inner}</{tag}>", tag = kind.tag())
        }
        ElementKind::ListItem => format!("<li>{}</li>", inner),
    }
}

fn ends_with_line_break(inlines: &[Node]) -> bool {
    let last = inlines
        .iter()
        .rev()
        .find(|node| !matches!(node, Node::Text(text) if text.is_empty()));
    matches!(last, Some(Node::Text(text)) if text.text.ends_with('\n'))
}

fn align_attr(align: Option<Align>) -> String {
    align
        .map(|align| format!(r#" style="text-align: {}""#, align.as_str()))
        .unwrap_or_default()
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn deserialize(markup: &str) -> Document {
    deserialize_with(markup, &DecodeOptions::default())
}

pub fn deserialize_with(markup: &str, options: &DecodeOptions) -> Document {
    let trimmed = markup.trim_start();
    if trimmed.is_empty() {
        return Document::new(vec![shaped(&options.shape, Vec::new())]).normalized();
    }
    if !trimmed.starts_with('<') {
        return Document::new(vec![shaped(&options.shape, vec![Node::text(markup)])]).normalized();
    }

    let cleaned;
    let source = if options.sanitize {
        cleaned = sanitize_markup(markup);
        cleaned.as_str()
    } else {
        markup
    };

    let fragment = Html::parse_fragment(source);
    let nodes = convert_children(fragment.root_element(), Marks::default());
    let mut doc = Document::new(group_inline_runs(nodes));
    doc.normalize();
    doc
}

fn shaped(shape: &ElementKind, inlines: Vec<Node>) -> Node {
    match shape {
        ElementKind::List { .. } => Node::element(
            shape.clone(),
            vec![Node::element(ElementKind::ListItem, inlines)],
        ),
        ElementKind::Paragraph { .. } | ElementKind::Heading { .. } => {
            Node::element(shape.clone(), inlines)
        }
        ElementKind::Link { .. } | ElementKind::ListItem => Node::paragraph(inlines),
    }
}

/// Root-level inline content is collected into paragraphs.
fn group_inline_runs(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::new();
    let mut run: Vec<Node> = Vec::new();
    for node in nodes {
        if node.is_inline() {
            run.push(node);
            continue;
        }
        if !run.is_empty() {
            out.push(Node::paragraph(std::mem::take(&mut run)));
        }
        out.push(node);
    }
    if !run.is_empty() {
        out.push(Node::paragraph(run));
    }
    out
}

fn is_block_tag(name: &str) -> bool {
    BLOCK_TAGS.contains(&name)
}

fn is_text_block_tag(name: &str) -> bool {
    matches!(name, "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li")
}

fn convert_children(parent: ElementRef<'_>, marks: Marks) -> Vec<Node> {
    convert_children_skipping(parent, marks, None)
}

/// Converts the children of `parent`, leaving out the child at `skip`.
///
/// Whitespace-only text is source formatting, not content, when it sits
/// directly in the root or a list, or next to a block. Inside a line of text
/// only whitespace carrying a newline counts as formatting, since serialized
/// line breaks are always `<br>`.
fn convert_children_skipping(parent: ElementRef<'_>, marks: Marks, skip: Option<usize>) -> Vec<Node> {
    let name = parent.value().name();
    let container = matches!(name, "html" | "ul" | "ol");
    let text_block = is_text_block_tag(name);
    let mut out = Vec::new();
    for (index, child) in parent.children().enumerate() {
        if skip == Some(index) {
            continue;
        }
        match child.value() {
            HtmlNode::Text(text) => {
                if text.trim().is_empty() {
                    let touches_block = [child.prev_sibling(), child.next_sibling()]
                        .into_iter()
                        .flatten()
                        .filter_map(ElementRef::wrap)
                        .any(|sibling| is_block_tag(sibling.value().name()));
                    if container || (touches_block && (!text_block || text.contains('\n'))) {
                        continue;
                    }
                }
                out.push(Node::marked(&**text, marks));
            }
            HtmlNode::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    out.extend(convert_element(element, marks));
                }
            }
            _ => {}
        }
    }
    out
}

fn convert_element(element: ElementRef<'_>, marks: Marks) -> Vec<Node> {
    let name = element.value().name();
    if let Some(mark) = Mark::from_tag(name) {
        return convert_children(element, marks.with(mark, true));
    }

    match name {
        "br" => vec![Node::marked("\n", marks)],
        "span" => convert_children(element, marks),
        "p" => vec![Node::element(
            ElementKind::Paragraph {
                align: alignment(element),
            },
            block_content(element, marks),
        )],
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse().unwrap_or(1);
            vec![Node::element(
                ElementKind::Heading {
                    level,
                    align: alignment(element),
                },
                block_content(element, marks),
            )]
        }
        "ul" | "ol" => {
            let kind = if name == "ol" {
                ListKind::Ordered
            } else {
                ListKind::Unordered
            };
            let start = match kind {
                ListKind::Ordered => element
                    .value()
                    .attr("start")
                    .and_then(|start| start.trim().parse().ok()),
                ListKind::Unordered => None,
            };
            let mut items = convert_children(element, marks);
            if items.is_empty() {
                items.push(Node::element(ElementKind::ListItem, vec![Node::text("")]));
            }
            vec![Node::element(ElementKind::List { kind, start }, items)]
        }
        "li" => vec![Node::element(ElementKind::ListItem, block_content(element, marks))],
        "a" => match element.value().attr("href") {
            Some(href) => vec![Node::element(
                ElementKind::Link {
                    url: href.to_string(),
                    target: element.value().attr("target").map(str::to_string),
                },
                if is_lone_break(element) {
                    Vec::new()
                } else {
                    convert_children(element, marks)
                },
            )],
            None => convert_children(element, marks),
        },
        _ => {
            let children = convert_children(element, marks);
            if children.is_empty() || children.iter().any(Node::is_block) {
                children
            } else {
                vec![Node::element(
                    ElementKind::Paragraph {
                        align: alignment(element),
                    },
                    children,
                )]
            }
        }
    }
}

/// Content of a text block. A lone `<br>` is the empty placeholder, and the
/// `<br>` ending a line is dropped since it never renders.
fn block_content(element: ElementRef<'_>, marks: Marks) -> Vec<Node> {
    if is_lone_break(element) {
        return Vec::new();
    }
    convert_children_skipping(element, marks, trailing_break(element))
}

/// Index of a `<br>` child that ends the element's own line of text.
fn trailing_break(element: ElementRef<'_>) -> Option<usize> {
    let (index, last) = element
        .children()
        .enumerate()
        .take_while(|(_, child)| {
            !ElementRef::wrap(*child).is_some_and(|el| is_block_tag(el.value().name()))
        })
        .filter(|(_, child)| match child.value() {
            HtmlNode::Text(text) => !text.trim().is_empty(),
            HtmlNode::Element(_) => true,
            _ => false,
        })
        .last()?;
    match last.value() {
        HtmlNode::Element(el) if el.name() == "br" => Some(index),
        _ => None,
    }
}

fn is_lone_break(element: ElementRef<'_>) -> bool {
    let mut meaningful = element.children().filter(|child| match child.value() {
        HtmlNode::Text(text) => !text.trim().is_empty(),
        HtmlNode::Element(_) => true,
        _ => false,
    });
    let first_is_break = matches!(
        meaningful.next().map(|child| child.value()),
        Some(HtmlNode::Element(el)) if el.name() == "br"
    );
    first_is_break && meaningful.next().is_none()
}

fn alignment(element: ElementRef<'_>) -> Option<Align> {
    let style = element.value().attr("style")?;
    let captures = TEXT_ALIGN.captures(style)?;
    Align::parse(captures.get(1)?.as_str())
}
