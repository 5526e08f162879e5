//! Behavior plugins. Each editing intent is offered to the plugins in
//! priority order; the first one that handles it stops the chain, and the
//! editor's default action runs when none does.

pub mod delete_merge;
pub mod link;
pub mod list;
pub mod paragraph;

use anyhow::Result;

use crate::config::EditorConfig;
use crate::editor::Editor;

pub use delete_merge::DeleteMergePlugin;
pub use link::LinkPlugin;
pub use list::ListPlugin;
pub use paragraph::ParagraphPlugin;

/// What a key or input event asks the document to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    InsertBreak,
    InsertSoftBreak,
    DeleteBackward,
    Indent,
    Outdent,
    InsertText(String),
}

/// Who dealt with an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Plugin,
    Default,
    Ignored,
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }
    /// Returns `Ok(true)` when the intent was handled and the chain should stop.
    fn on_intent(&self, editor: &mut Editor, intent: &Intent) -> Result<bool>;
}

pub struct PluginManager {
    plugins: Vec<Box<dyn Plugin>>,
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// The standard chain: list behavior, then links, then block merging,
    /// then paragraph breaks.
    pub fn with_defaults(config: &EditorConfig) -> Self {
        let mut manager = Self::new();
        manager.load_plugin(Box::new(ListPlugin::new(config.max_list_depth)));
        manager.load_plugin(Box::new(LinkPlugin::new(config.auto_link)));
        manager.load_plugin(Box::new(DeleteMergePlugin));
        manager.load_plugin(Box::new(ParagraphPlugin::new(config.soft_break)));
        manager
    }

    pub fn load_plugin(&mut self, plugin: Box<dyn Plugin>) {
        log::debug!("loaded plugin {} {}", plugin.name(), plugin.version());
        self.plugins.push(plugin);
    }

    /// Runs `intent` as one normalized step.
    pub fn handle(&self, editor: &mut Editor, intent: &Intent) -> Result<Outcome> {
        editor.without_normalizing(|editor| {
            for plugin in &self.plugins {
                if plugin.on_intent(editor, intent)? {
                    log::debug!("{} handled {:?}", plugin.name(), intent);
                    return Ok(Outcome::Plugin);
                }
            }
            Ok(if default_action(editor, intent) {
                Outcome::Default
            } else {
                Outcome::Ignored
            })
        })
    }

    pub fn list_plugins(&self) -> Vec<(&str, &str)> {
        self.plugins.iter().map(|p| (p.name(), p.version())).collect()
    }
}

fn default_action(editor: &mut Editor, intent: &Intent) -> bool {
    match intent {
        Intent::InsertText(text) => {
            editor.insert_text(text);
            true
        }
        Intent::DeleteBackward => {
            editor.delete_backward();
            true
        }
        Intent::InsertBreak | Intent::InsertSoftBreak | Intent::Indent | Intent::Outdent => false,
    }
}
