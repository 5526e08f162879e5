//! Binds one editing session to a block of a host document. The host owns
//! block ordering; the adapter reports changes and structural requests to it
//! through a [`Collaborator`].

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use crossterm::event::KeyEvent;
use doccore::{
    deserialize_with, serialize, serialize_node, Align, DecodeOptions, Document, Element,
    ElementKind, ListKind, Node, Range,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::editor::Editor;
use crate::plugins::{Intent, Outcome, PluginManager};
use crate::router::{KeyRouter, Route};

/// The block type an adapter is mounted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    List(ListKind),
    RichText,
    /// Placeholder after the last block; typing into it asks for a real block.
    TrailingInsert,
}

impl BlockKind {
    /// Shape that plain or empty markup takes for this block.
    pub fn shape(&self) -> ElementKind {
        match self {
            BlockKind::Heading(level) => ElementKind::heading(*level),
            BlockKind::List(kind) => ElementKind::list(*kind),
            BlockKind::Paragraph | BlockKind::RichText | BlockKind::TrailingInsert => {
                ElementKind::paragraph()
            }
        }
    }

    /// Blocks holding a single line; Enter creates a sibling block instead.
    fn is_single_line(&self) -> bool {
        matches!(self, BlockKind::Paragraph | BlockKind::Heading(_))
    }
}

impl FromStr for BlockKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };
        match (name, arg) {
            ("paragraph", None) => Ok(BlockKind::Paragraph),
            ("heading", None) => Ok(BlockKind::Heading(2)),
            ("heading", Some(level)) => {
                let level: u8 = level.parse()?;
                if !(1..=6).contains(&level) {
                    return Err(anyhow!("heading level out of range: {}", level));
                }
                Ok(BlockKind::Heading(level))
            }
            ("list", None | Some("unordered")) => Ok(BlockKind::List(ListKind::Unordered)),
            ("list", Some("ordered")) => Ok(BlockKind::List(ListKind::Ordered)),
            ("richtext" | "rich-text", None) => Ok(BlockKind::RichText),
            ("trailing" | "trailing-insert", None) => Ok(BlockKind::TrailingInsert),
            _ => Err(anyhow!("unknown block kind: {}", s)),
        }
    }
}

/// Presentation attributes the host stores next to the markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl BlockAttributes {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    Before,
    After,
}

/// Initial content for a block the host is asked to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialPayload {
    pub text: String,
}

/// The host side of a block.
pub trait Collaborator {
    fn on_change(&mut self, markup: &str, attributes: Option<&BlockAttributes>);
    fn on_delete(&mut self);
    fn on_add_block(
        &mut self,
        position: InsertPosition,
        kind: Option<BlockKind>,
        payload: Option<InitialPayload>,
    );
    fn on_select(&mut self);
}

/// Collaborator callbacks as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CollaboratorEvent {
    Change {
        markup: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<BlockAttributes>,
    },
    Delete,
    AddBlock {
        position: InsertPosition,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<BlockKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<InitialPayload>,
    },
    Select,
}

/// Collaborator that records every callback into a shared log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Rc<RefCell<Vec<CollaboratorEvent>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the events recorded so far.
    pub fn drain(&self) -> Vec<CollaboratorEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    pub fn events(&self) -> Vec<CollaboratorEvent> {
        self.events.borrow().clone()
    }
}

impl Collaborator for Recorder {
    fn on_change(&mut self, markup: &str, attributes: Option<&BlockAttributes>) {
        self.events.borrow_mut().push(CollaboratorEvent::Change {
            markup: markup.to_string(),
            attributes: attributes.cloned(),
        });
    }

    fn on_delete(&mut self) {
        self.events.borrow_mut().push(CollaboratorEvent::Delete);
    }

    fn on_add_block(
        &mut self,
        position: InsertPosition,
        kind: Option<BlockKind>,
        payload: Option<InitialPayload>,
    ) {
        self.events.borrow_mut().push(CollaboratorEvent::AddBlock {
            position,
            kind,
            payload,
        });
    }

    fn on_select(&mut self) {
        self.events.borrow_mut().push(CollaboratorEvent::Select);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyResult {
    /// The adapter consumed the key; the host's default handling must not run.
    pub prevent_default: bool,
    /// An `on_change` was emitted while handling the key.
    pub changed: bool,
}

/// Answer of the link prompt shown for the link shortcut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    Wrap { url: String, target: Option<String> },
    Unwrap,
    Cancel,
}

/// Called with the active link's URL, if any.
pub type LinkToggle = Box<dyn FnMut(Option<&str>) -> LinkAction>;

pub struct BlockAdapter {
    kind: BlockKind,
    editor: Editor,
    attributes: BlockAttributes,
    collaborator: Box<dyn Collaborator>,
    router: KeyRouter,
    plugins: PluginManager,
    link_toggle: Option<LinkToggle>,
    last_markup: String,
    changes: usize,
}

impl BlockAdapter {
    pub fn mount(
        kind: BlockKind,
        markup: Option<&str>,
        mut attributes: BlockAttributes,
        config: &Config,
        collaborator: Box<dyn Collaborator>,
    ) -> Result<Self> {
        let options = DecodeOptions {
            shape: kind.shape(),
            sanitize: config.codec.sanitize_input,
        };
        let doc = deserialize_with(markup.unwrap_or_default(), &options);
        let mut editor = Editor::new(doc);
        editor.set_history_limit(config.editor.history_limit);
        if let BlockKind::Heading(level) = kind {
            attributes.level = Some(level);
        }

        let last_markup = serialize(editor.document());
        log::debug!("mounted {:?} block: {}", kind, last_markup);
        Ok(Self {
            kind,
            editor,
            attributes,
            collaborator,
            router: KeyRouter::from_config(&config.keybindings)?,
            plugins: PluginManager::with_defaults(&config.editor),
            link_toggle: None,
            last_markup,
            changes: 0,
        })
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn markup(&self) -> String {
        serialize(self.editor.document())
    }

    pub fn attributes(&self) -> &BlockAttributes {
        &self.attributes
    }

    pub fn set_link_toggle(&mut self, toggle: LinkToggle) {
        self.link_toggle = Some(toggle);
    }

    /// Gives the block focus; the cursor goes to the end when nothing is selected.
    pub fn focus(&mut self) {
        self.ensure_selection();
        self.collaborator.on_select();
    }

    pub fn select(&mut self, range: Range) {
        self.editor.select(range);
    }

    /// Routes one key press. Emits `on_change` once when the markup changed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> KeyResult {
        let route = self.router.route(key);
        log::debug!("{:?} block: {:?} -> {:?}", self.kind, key.code, route);
        let changes_before = self.changes;
        self.ensure_selection();

        let prevent_default = if self.kind == BlockKind::TrailingInsert {
            self.trailing_key(&route)
        } else {
            self.editing_key(route)
        };

        self.flush();
        KeyResult {
            prevent_default,
            changed: self.changes > changes_before,
        }
    }

    fn editing_key(&mut self, route: Route) -> bool {
        match route {
            Route::ToggleMark(mark) => {
                self.editor.toggle_mark(mark);
                true
            }
            Route::ToggleLink => self.toggle_link(),
            Route::Enter => self.enter(),
            Route::SoftBreak => self.consume(Intent::InsertSoftBreak),
            Route::Backspace => self.backspace(),
            Route::Indent => self.consume(Intent::Indent),
            Route::Outdent => self.consume(Intent::Outdent),
            Route::Undo => self.editor.undo(),
            Route::Redo => self.editor.redo(),
            Route::Move { motion, extend } => {
                self.editor.move_selection(motion, extend);
                true
            }
            Route::Insert(c) => self.consume(Intent::InsertText(c.to_string())),
            Route::Unhandled => false,
        }
    }

    /// The trailing placeholder never edits itself; it asks for a paragraph before it.
    fn trailing_key(&mut self, route: &Route) -> bool {
        match route {
            Route::Backspace => true,
            Route::Enter => {
                self.collaborator
                    .on_add_block(InsertPosition::Before, Some(BlockKind::Paragraph), None);
                true
            }
            Route::Insert(c) => {
                self.request_paragraph_before(&c.to_string());
                true
            }
            _ => false,
        }
    }

    fn request_paragraph_before(&mut self, text: &str) {
        self.collaborator.on_add_block(
            InsertPosition::Before,
            Some(BlockKind::Paragraph),
            Some(InitialPayload {
                text: text.to_string(),
            }),
        );
    }

    /// Runs `intent`; the key counts as consumed when anything acted on it,
    /// the default edit included.
    fn consume(&mut self, intent: Intent) -> bool {
        self.run(intent) != Outcome::Ignored
    }

    fn run(&mut self, intent: Intent) -> Outcome {
        match self.plugins.handle(&mut self.editor, &intent) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("{:?} failed: {}", intent, e);
                Outcome::Ignored
            }
        }
    }

    fn ensure_selection(&mut self) {
        if self.editor.selection().is_none() {
            if let Some(end) = self.editor.document().last_point() {
                self.editor.select(Range::collapsed(end));
            }
        }
    }

    fn toggle_link(&mut self) -> bool {
        let Some(toggle) = self.link_toggle.as_mut() else {
            return false;
        };
        let active = self.editor.active_link();
        match toggle(active.as_deref()) {
            LinkAction::Wrap { url, target } => self.editor.wrap_link(&url, target.as_deref()),
            LinkAction::Unwrap => {
                self.editor.unwrap_link();
            }
            LinkAction::Cancel => {}
        }
        true
    }

    fn enter(&mut self) -> bool {
        if !self.kind.is_single_line() {
            self.run(Intent::InsertBreak);
            return true;
        }

        if let Some(selection) = self.editor.selection().cloned() {
            if !selection.is_collapsed() {
                self.editor.delete(&selection);
            }
        }
        let Some(point) = self.editor.cursor() else {
            return true;
        };
        let last_block = self.editor.document().text_blocks().last().cloned();
        let at_end = self.editor.is_block_end(&point) && self.editor.text_block_at(&point) == last_block;

        if at_end {
            self.flush();
            let kind = match self.kind {
                BlockKind::Heading(_) => Some(BlockKind::Paragraph),
                _ => None,
            };
            self.collaborator.on_add_block(InsertPosition::After, kind, None);
            return true;
        }

        // The text after the cursor moves into a new paragraph block
        let Some(tail) = self
            .editor
            .split_nodes(point, |el| el.kind.is_text_block())
        else {
            return true;
        };
        let moved = self.editor.document().element(&tail).cloned();
        self.editor.remove_nodes(&tail);
        if let Some(end) = tail.previous().and_then(|block| self.editor.block_end(&block)) {
            self.editor.select(Range::collapsed(end));
        }
        self.flush();
        let payload = moved.map(|element| InitialPayload {
            text: paragraph_markup(element),
        });
        self.collaborator
            .on_add_block(InsertPosition::After, Some(BlockKind::Paragraph), payload);
        true
    }

    fn backspace(&mut self) -> bool {
        if self.is_deletable() {
            self.collaborator.on_delete();
            return true;
        }
        self.consume(Intent::DeleteBackward)
    }

    /// An empty block asks the host to remove it instead of editing.
    fn is_deletable(&self) -> bool {
        let doc = self.editor.document();
        match self.kind {
            BlockKind::Paragraph | BlockKind::Heading(_) => doc.string().trim().is_empty(),
            BlockKind::List(_) | BlockKind::RichText => {
                doc.children.len() == 1
                    && matches!(doc.children[0].kind(), Some(ElementKind::Paragraph { .. }))
                    && doc.string().is_empty()
            }
            BlockKind::TrailingInsert => false,
        }
    }

    /// Typed or pasted text outside of key handling.
    pub fn insert_text(&mut self, text: &str) -> bool {
        if self.kind == BlockKind::TrailingInsert {
            self.request_paragraph_before(text);
            return false;
        }
        self.ensure_selection();
        self.run(Intent::InsertText(text.to_string()));
        self.flush()
    }

    pub fn set_alignment(&mut self, align: Option<Align>) -> bool {
        if let Some(range) = self.command_range() {
            self.editor.set_nodes_in(
                &range,
                |el| matches!(el.kind, ElementKind::Paragraph { .. } | ElementKind::Heading { .. }),
                |kind| kind.with_align(align),
            );
        }
        self.attributes.align = align;
        self.flush_with_attributes()
    }

    pub fn set_heading_level(&mut self, level: u8) -> bool {
        let level = level.clamp(1, 6);
        if !matches!(self.kind, BlockKind::Heading(_)) {
            return false;
        }
        self.kind = BlockKind::Heading(level);
        if let Some(range) = self.editor.document_range() {
            self.editor.set_nodes_in(
                &range,
                |el| matches!(el.kind, ElementKind::Heading { .. }),
                |kind| ElementKind::Heading {
                    level,
                    align: kind.align(),
                },
            );
        }
        self.attributes.level = Some(level);
        self.flush_with_attributes()
    }

    pub fn set_list_kind(&mut self, list_kind: ListKind) -> bool {
        if !matches!(self.kind, BlockKind::List(_)) {
            return false;
        }
        self.kind = BlockKind::List(list_kind);
        let top_level: Vec<_> = self
            .editor
            .document()
            .children
            .iter()
            .enumerate()
            .filter(|(_, node)| node.kind().is_some_and(ElementKind::is_list))
            .map(|(index, _)| doccore::Path::new(vec![index]))
            .collect();
        for path in top_level {
            let start = match self.editor.document().element(&path).map(|el| &el.kind) {
                Some(ElementKind::List { start, .. }) if list_kind == ListKind::Ordered => *start,
                _ => None,
            };
            self.editor.set_nodes(
                &path,
                doccore::Properties::Element(ElementKind::List {
                    kind: list_kind,
                    start,
                }),
            );
        }
        self.flush_with_attributes()
    }

    pub fn set_color(&mut self, color: Option<String>) -> bool {
        self.attributes.color = color;
        self.flush_with_attributes()
    }

    pub fn set_size(&mut self, size: Option<String>) -> bool {
        self.attributes.size = size;
        self.flush_with_attributes()
    }

    pub fn wrap_link(&mut self, url: &str, target: Option<&str>) -> bool {
        self.ensure_selection();
        self.editor.wrap_link(url, target);
        self.flush()
    }

    pub fn unwrap_link(&mut self) -> bool {
        self.editor.unwrap_link();
        self.flush()
    }

    /// Final flush; returns the markup the host should keep.
    pub fn unmount(mut self) -> String {
        self.flush();
        log::debug!("unmounted {:?} block", self.kind);
        self.last_markup
    }

    /// Single-line blocks format as a whole; others follow the selection.
    fn command_range(&self) -> Option<Range> {
        if self.kind.is_single_line() {
            return self.editor.document_range();
        }
        self.editor
            .selection()
            .cloned()
            .or_else(|| self.editor.document_range())
    }

    /// Commits the keystroke and reports changed markup.
    fn flush(&mut self) -> bool {
        self.editor.commit();
        let markup = self.markup();
        if markup == self.last_markup {
            return false;
        }
        self.emit(markup);
        true
    }

    /// Attribute commands always report, since attributes live outside the markup.
    fn flush_with_attributes(&mut self) -> bool {
        self.editor.commit();
        let markup = self.markup();
        self.emit(markup);
        true
    }

    fn emit(&mut self, markup: String) {
        let attributes = (!self.attributes.is_empty()).then_some(&self.attributes);
        self.collaborator.on_change(&markup, attributes);
        self.last_markup = markup;
        self.changes += 1;
    }
}

/// Markup of a split-off block, re-shaped as a normalized paragraph.
fn paragraph_markup(element: Element) -> String {
    let align = element.kind.align();
    let doc = Document::new(vec![Node::element(
        ElementKind::Paragraph { align },
        element.children,
    )])
    .normalized();
    match doc.children.first() {
        Some(block) => serialize_node(block),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyModifiers};
    use doccore::Mark;

    use super::*;

    fn mount(kind: BlockKind, markup: &str) -> (BlockAdapter, Recorder) {
        let recorder = Recorder::new();
        let adapter = BlockAdapter::mount(
            kind,
            Some(markup),
            BlockAttributes::default(),
            &Config::default(),
            Box::new(recorder.clone()),
        )
        .unwrap();
        (adapter, recorder)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn change(markup: &str) -> CollaboratorEvent {
        CollaboratorEvent::Change {
            markup: markup.to_string(),
            attributes: None,
        }
    }

    #[test]
    fn test_block_kind_parsing() {
        assert_eq!("heading:3".parse::<BlockKind>().unwrap(), BlockKind::Heading(3));
        assert_eq!(
            "list:ordered".parse::<BlockKind>().unwrap(),
            BlockKind::List(ListKind::Ordered)
        );
        assert_eq!("richtext".parse::<BlockKind>().unwrap(), BlockKind::RichText);
        assert!("heading:9".parse::<BlockKind>().is_err());
        assert!("table".parse::<BlockKind>().is_err());
    }

    #[test]
    fn test_typing_emits_one_change() {
        let (mut adapter, recorder) = mount(BlockKind::Paragraph, "<p>ab</p>");
        adapter.focus();
        let result = adapter.handle_key(&key(KeyCode::Char('c')));
        assert!(result.changed);
        assert!(result.prevent_default);
        assert_eq!(
            recorder.drain(),
            vec![CollaboratorEvent::Select, change("<p>abc</p>")]
        );
    }

    #[test]
    fn test_default_edits_prevent_host_handling() {
        let (mut adapter, recorder) = mount(BlockKind::Paragraph, "<p>ab</p>");
        let result = adapter.handle_key(&key(KeyCode::Backspace));
        assert!(result.prevent_default);
        assert!(result.changed);
        assert_eq!(recorder.drain(), vec![change("<p>a</p>")]);

        let result = adapter.handle_key(&key(KeyCode::Tab));
        assert!(!result.prevent_default);
        assert!(!result.changed);
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_selection_only_key_emits_nothing() {
        let (mut adapter, recorder) = mount(BlockKind::Paragraph, "<p>ab</p>");
        let result = adapter.handle_key(&key(KeyCode::Left));
        assert!(result.prevent_default);
        assert!(!result.changed);
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_enter_at_end_of_heading_requests_paragraph() {
        let (mut adapter, recorder) = mount(BlockKind::Heading(2), "Title");
        assert_eq!(adapter.markup(), "<h2>Title</h2>");
        let result = adapter.handle_key(&key(KeyCode::Enter));
        assert!(result.prevent_default);
        assert_eq!(
            recorder.drain(),
            vec![CollaboratorEvent::AddBlock {
                position: InsertPosition::After,
                kind: Some(BlockKind::Paragraph),
                payload: None,
            }]
        );
        assert_eq!(adapter.markup(), "<h2>Title</h2>");
    }

    #[test]
    fn test_enter_at_end_of_paragraph_keeps_kind_open() {
        let (mut adapter, recorder) = mount(BlockKind::Paragraph, "<p>done</p>");
        adapter.handle_key(&key(KeyCode::Enter));
        assert_eq!(
            recorder.drain(),
            vec![CollaboratorEvent::AddBlock {
                position: InsertPosition::After,
                kind: None,
                payload: None,
            }]
        );
    }

    #[test]
    fn test_enter_mid_paragraph_hands_over_tail() {
        let (mut adapter, recorder) = mount(BlockKind::Paragraph, "<p>ab<strong>cd</strong></p>");
        let point = adapter.editor().point_from_offset(3).unwrap();
        adapter.select(Range::collapsed(point));
        adapter.handle_key(&key(KeyCode::Enter));
        assert_eq!(
            recorder.drain(),
            vec![
                change("<p>ab<strong>c</strong></p>"),
                CollaboratorEvent::AddBlock {
                    position: InsertPosition::After,
                    kind: Some(BlockKind::Paragraph),
                    payload: Some(InitialPayload {
                        text: "<p><strong>d</strong></p>".to_string()
                    }),
                },
            ]
        );
    }

    #[test]
    fn test_backspace_on_empty_block_requests_delete() {
        let (mut adapter, recorder) = mount(BlockKind::Paragraph, "");
        let before = adapter.editor().document().clone();
        let result = adapter.handle_key(&key(KeyCode::Backspace));
        assert!(result.prevent_default);
        assert_eq!(recorder.drain(), vec![CollaboratorEvent::Delete]);
        assert_eq!(adapter.editor().document(), &before);

        let (mut adapter, recorder) = mount(BlockKind::Heading(1), "<h1>  </h1>");
        adapter.handle_key(&key(KeyCode::Backspace));
        assert_eq!(recorder.drain(), vec![CollaboratorEvent::Delete]);
    }

    #[test]
    fn test_backspace_in_rich_text_edits() {
        let (mut adapter, recorder) = mount(BlockKind::RichText, "<p>a</p><p>b</p>");
        adapter.handle_key(&key(KeyCode::Backspace));
        assert_eq!(recorder.drain(), vec![change("<p>a</p><p><br></p>")]);
        adapter.handle_key(&key(KeyCode::Backspace));
        assert_eq!(recorder.drain(), vec![change("<p>a</p>")]);
    }

    #[test]
    fn test_list_block_enter_stays_inside() {
        let (mut adapter, recorder) = mount(BlockKind::List(ListKind::Unordered), "one");
        assert_eq!(adapter.markup(), "<ul><li>one</li></ul>");
        adapter.handle_key(&key(KeyCode::Enter));
        adapter.handle_key(&key(KeyCode::Char('t')));
        assert_eq!(adapter.markup(), "<ul><li>one</li><li>t</li></ul>");
        let events = recorder.drain();
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|event| matches!(event, CollaboratorEvent::Change { .. })));
    }

    #[test]
    fn test_trailing_insert() {
        let (mut adapter, recorder) = mount(BlockKind::TrailingInsert, "");
        let result = adapter.handle_key(&key(KeyCode::Backspace));
        assert!(result.prevent_default);
        assert!(recorder.events().is_empty());

        adapter.handle_key(&key(KeyCode::Char('h')));
        adapter.handle_key(&key(KeyCode::Enter));
        assert_eq!(
            recorder.drain(),
            vec![
                CollaboratorEvent::AddBlock {
                    position: InsertPosition::Before,
                    kind: Some(BlockKind::Paragraph),
                    payload: Some(InitialPayload {
                        text: "h".to_string()
                    }),
                },
                CollaboratorEvent::AddBlock {
                    position: InsertPosition::Before,
                    kind: Some(BlockKind::Paragraph),
                    payload: None,
                },
            ]
        );
        assert_eq!(adapter.markup(), "<p><br></p>");
    }

    #[test]
    fn test_mark_shortcut_and_undo() {
        let (mut adapter, recorder) = mount(BlockKind::Paragraph, "<p>hi</p>");
        let all = adapter.editor().document_range().unwrap();
        adapter.select(all);
        let bold = KeyEvent::new(KeyCode::Char('b'), KeyModifiers::CONTROL);
        assert!(adapter.handle_key(&bold).changed);
        assert_eq!(recorder.drain(), vec![change("<p><strong>hi</strong></p>")]);

        let undo = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::CONTROL);
        adapter.handle_key(&undo);
        assert_eq!(recorder.drain(), vec![change("<p>hi</p>")]);
        assert!(!adapter.editor().is_mark_active(Mark::Bold));
    }

    #[test]
    fn test_link_shortcut_uses_prompt() {
        let (mut adapter, recorder) = mount(BlockKind::Paragraph, "<p>docs</p>");
        let link = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::CONTROL);
        assert!(!adapter.handle_key(&link).prevent_default);

        let all = adapter.editor().document_range().unwrap();
        adapter.select(all);
        adapter.set_link_toggle(Box::new(|active| match active {
            Some(_) => LinkAction::Unwrap,
            None => LinkAction::Wrap {
                url: "https://docs.rs".to_string(),
                target: None,
            },
        }));
        assert!(adapter.handle_key(&link).prevent_default);
        assert_eq!(
            recorder.drain(),
            vec![change("<p><a href=\"https://docs.rs\">docs</a></p>")]
        );
    }

    #[test]
    fn test_attribute_commands_report_attributes() {
        let (mut adapter, recorder) = mount(BlockKind::Heading(2), "<h2>T</h2>");
        adapter.set_alignment(Some(Align::Center));
        adapter.set_heading_level(3);
        adapter.set_color(Some("#ff0000".to_string()));
        let events = recorder.drain();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[2],
            CollaboratorEvent::Change {
                markup: "<h3 style=\"text-align: center\">T</h3>".to_string(),
                attributes: Some(BlockAttributes {
                    level: Some(3),
                    align: Some(Align::Center),
                    color: Some("#ff0000".to_string()),
                    size: None,
                }),
            }
        );
        assert_eq!(adapter.kind(), BlockKind::Heading(3));
    }

    #[test]
    fn test_set_list_kind() {
        let (mut adapter, _recorder) = mount(BlockKind::List(ListKind::Unordered), "<ul><li>a</li></ul>");
        assert!(adapter.set_list_kind(ListKind::Ordered));
        assert_eq!(adapter.markup(), "<ol><li>a</li></ol>");
        let (mut paragraph, _) = mount(BlockKind::Paragraph, "<p>a</p>");
        assert!(!paragraph.set_list_kind(ListKind::Ordered));
    }

    #[test]
    fn test_unmount_flushes() {
        let (mut adapter, recorder) = mount(BlockKind::Paragraph, "<p>a</p>");
        adapter.ensure_selection();
        adapter.editor.insert_text("b");
        assert_eq!(adapter.unmount(), "<p>ab</p>");
        assert_eq!(recorder.drain(), vec![change("<p>ab</p>")]);
    }

    #[test]
    fn test_untrusted_markup_is_sanitized() {
        let (adapter, _) = mount(
            BlockKind::Paragraph,
            "<p onclick=\"x()\">hi<script>alert(1)</script></p>",
        );
        assert_eq!(adapter.markup(), "<p>hi</p>");
    }
}
