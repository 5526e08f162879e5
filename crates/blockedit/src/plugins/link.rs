//! Links: wrapping and unwrapping the selection, and turning typed URLs into links.

use anyhow::Result;
use doccore::{ElementKind, Node, Path, Point, Range};
use lazy_static::lazy_static;
use regex::Regex;

use super::{Intent, Plugin};
use crate::editor::Editor;

lazy_static! {
    static ref ABSOLUTE_URL: Regex =
        Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("url pattern compiles");
}

pub fn is_url(text: &str) -> bool {
    ABSOLUTE_URL.is_match(text)
}

pub struct LinkPlugin {
    auto_link: bool,
}

impl LinkPlugin {
    pub fn new(auto_link: bool) -> Self {
        Self { auto_link }
    }
}

impl Plugin for LinkPlugin {
    fn name(&self) -> &str {
        "link"
    }

    fn on_intent(&self, editor: &mut Editor, intent: &Intent) -> Result<bool> {
        let Intent::InsertText(text) = intent else {
            return Ok(false);
        };
        let url = text.trim();
        if !self.auto_link || !is_url(url) || editor.active_link().is_some() {
            return Ok(false);
        }
        editor.wrap_link(url, None);
        Ok(true)
    }
}

impl Editor {
    /// URL of the link holding the selection focus.
    pub fn active_link(&self) -> Option<String> {
        let focus = &self.selection()?.focus;
        let link = self.document().above(&focus.path, |el| el.kind.is_link())?;
        match &self.document().element(&link)?.kind {
            ElementKind::Link { url, .. } => Some(url.clone()),
            _ => None,
        }
    }

    /// Links the selection to `url`; a collapsed cursor inserts the URL itself
    /// as link text. Links already in the selection are replaced. The cursor
    /// ends up just after the new link.
    pub fn wrap_link(&mut self, url: &str, target: Option<&str>) {
        let kind = ElementKind::Link {
            url: url.to_string(),
            target: target.map(str::to_string),
        };
        self.without_normalizing(|editor| {
            editor.unwrap_link();
            let Some(selection) = editor.selection().cloned() else {
                return;
            };
            let link = if selection.is_collapsed() {
                let node = Node::element(kind, vec![Node::text(url)]);
                editor.insert_nodes(vec![node], None, false)
            } else {
                editor.wrap_nodes(kind, &selection, true)
            };
            if let Some(link) = link {
                editor.select_after_inline(&link);
            }
        });
    }

    /// Removes every link touching the selection, keeping its text.
    pub fn unwrap_link(&mut self) -> bool {
        let Some(selection) = self.selection().cloned() else {
            return false;
        };
        self.unwrap_nodes_in(&selection, |el| el.kind.is_link()) > 0
    }

    fn select_after_inline(&mut self, inline: &Path) {
        let after = inline.next();
        if !self.document().get(&after).is_some_and(Node::is_text) {
            self.apply(doccore::Operation::InsertNode {
                path: after.clone(),
                node: Node::text(""),
            });
        }
        self.select(Range::collapsed(Point::new(after, 0)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::plugins::{Outcome, PluginManager};
    use crate::test_support::{editor_at, editor_between, markup, point};

    #[test]
    fn test_url_detection() {
        assert!(is_url("https://example.com/a?b=1"));
        assert!(is_url("http://x.io"));
        assert!(!is_url("example.com"));
        assert!(!is_url("https://exa mple.com"));
        assert!(!is_url("ftp://x.io"));
    }

    #[test]
    fn test_wrap_link_on_collapsed_cursor_inserts_url() {
        let mut editor = editor_at("<p>see </p>", 4);
        editor.wrap_link("https://x.io", None);
        assert_eq!(markup(&editor), "<p>see <a href=\"https://x.io\">https://x.io</a></p>");
        let link = &editor.document().children[0].children()[1];
        assert_eq!(link.children().len(), 1);
        assert_eq!(link.children()[0].as_text().map(|t| t.text.as_str()), Some("https://x.io"));
        assert_eq!(editor.cursor(), Some(point(&[0, 2], 0)));
        assert_eq!(editor.active_link(), None);
    }

    #[test]
    fn test_wrap_link_on_selection_with_target() {
        let mut editor = editor_between("<p>read the docs</p>", 9, 13);
        editor.wrap_link("https://docs.rs", Some("_blank"));
        assert_eq!(
            markup(&editor),
            "<p>read the <a href=\"https://docs.rs\" target=\"_blank\" rel=\"noopener noreferrer\">docs</a></p>"
        );
    }

    #[test]
    fn test_rewrap_replaces_existing_link() {
        let mut editor = editor_between("<p><a href=\"https://old.io\">text</a></p>", 0, 4);
        assert_eq!(editor.active_link().as_deref(), Some("https://old.io"));
        editor.wrap_link("https://new.io", None);
        assert_eq!(markup(&editor), "<p><a href=\"https://new.io\">text</a></p>");
    }

    #[test]
    fn test_unwrap_link_keeps_text() {
        let mut editor = editor_at("<p>a <a href=\"https://x.io\">link</a> b</p>", 4);
        assert!(editor.active_link().is_some());
        assert!(editor.unwrap_link());
        assert_eq!(markup(&editor), "<p>a link b</p>");
        assert!(!editor.unwrap_link());
    }

    #[test]
    fn test_typed_url_becomes_link() {
        let manager = PluginManager::with_defaults(&EditorConfig::default());
        let mut editor = editor_at("<p>go </p>", 3);
        let outcome = manager
            .handle(&mut editor, &Intent::InsertText("https://x.io".into()))
            .unwrap();
        assert_eq!(outcome, Outcome::Plugin);
        assert_eq!(markup(&editor), "<p>go <a href=\"https://x.io\">https://x.io</a></p>");

        let plain = PluginManager::with_defaults(&EditorConfig {
            auto_link: false,
            ..EditorConfig::default()
        });
        let mut editor = editor_at("<p>go </p>", 3);
        plain
            .handle(&mut editor, &Intent::InsertText("https://x.io".into()))
            .unwrap();
        assert_eq!(markup(&editor), "<p>go https://x.io</p>");
    }
}
