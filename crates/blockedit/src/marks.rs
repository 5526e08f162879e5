//! Inline formatting: effective marks at the selection, toggling, and the
//! shortcut table that maps keys to marks.

use anyhow::Result;
use crossterm::event::KeyEvent;
use doccore::{Mark, Marks, Point, Properties};

use crate::config::KeybindingsConfig;
use crate::editor::Editor;
use crate::keymap::KeySpec;

impl Editor {
    /// Marks typing at `point` would continue, ignoring pending marks. At the
    /// start of a leaf the preceding leaf of the same line wins.
    pub fn marks_at(&self, point: &Point) -> Marks {
        if point.offset == 0 {
            if let Some(block) = self.text_block_at(point) {
                let line = self.document().inline_texts(&block);
                let previous = line
                    .iter()
                    .position(|path| *path == point.path)
                    .and_then(|index| index.checked_sub(1))
                    .and_then(|index| self.document().text(&line[index]));
                if let Some(previous) = previous {
                    return previous.marks;
                }
            }
        }
        self.document()
            .text(&point.path)
            .map(|text| text.marks)
            .unwrap_or_default()
    }

    /// Effective marks: pending marks at a collapsed cursor, otherwise the
    /// marks shared by every leaf in the selection.
    pub fn marks(&self) -> Marks {
        let Some(selection) = self.selection() else {
            return Marks::default();
        };
        if selection.is_collapsed() {
            return self
                .pending_marks()
                .unwrap_or_else(|| self.marks_at(&selection.focus));
        }
        let leaves = self.leaves_in(selection);
        if leaves.is_empty() {
            return self.marks_at(&selection.start());
        }
        let mut shared = Marks::default();
        for mark in Mark::ALL {
            let everywhere = leaves
                .iter()
                .all(|path| self.document().text(path).is_some_and(|text| text.marks.has(mark)));
            shared.set(mark, everywhere);
        }
        shared
    }

    pub fn is_mark_active(&self, mark: Mark) -> bool {
        self.marks().has(mark)
    }

    pub fn toggle_mark(&mut self, mark: Mark) {
        let on = !self.is_mark_active(mark);
        self.set_mark(mark, on);
    }

    pub fn add_mark(&mut self, mark: Mark) {
        self.set_mark(mark, true);
    }

    pub fn remove_mark(&mut self, mark: Mark) {
        self.set_mark(mark, false);
    }

    /// A collapsed cursor records the change as pending marks for the next
    /// typed text; an expanded selection rewrites the covered leaves.
    fn set_mark(&mut self, mark: Mark, on: bool) {
        let Some(selection) = self.selection().cloned() else {
            return;
        };
        if selection.is_collapsed() {
            let marks = self.marks().with(mark, on);
            self.set_pending_marks(Some(marks));
            return;
        }

        self.without_normalizing(|editor| {
            let Some(range) = editor.split_range_edges(&selection) else {
                return;
            };
            for path in editor.leaves_in(&range) {
                let Some(marks) = editor.document().text(&path).map(|text| text.marks) else {
                    continue;
                };
                if marks.has(mark) != on {
                    editor.set_nodes(&path, Properties::Text(marks.with(mark, on)));
                }
            }
        });
    }
}

/// Keyboard shortcuts for the five marks.
#[derive(Debug, Clone)]
pub struct MarkRegistry {
    shortcuts: Vec<(KeySpec, Mark)>,
}

impl Default for MarkRegistry {
    fn default() -> Self {
        Self {
            shortcuts: vec![
                (KeySpec::primary('b'), Mark::Bold),
                (KeySpec::primary('i'), Mark::Italic),
                (KeySpec::primary('u'), Mark::Underline),
                (KeySpec::primary('x').with_shift(), Mark::Strikethrough),
                (KeySpec::primary('e'), Mark::Code),
            ],
        }
    }
}

impl MarkRegistry {
    pub fn from_config(config: &KeybindingsConfig) -> Result<Self> {
        let shortcuts = vec![
            (config.bold.parse()?, Mark::Bold),
            (config.italic.parse()?, Mark::Italic),
            (config.underline.parse()?, Mark::Underline),
            (config.strikethrough.parse()?, Mark::Strikethrough),
            (config.code.parse()?, Mark::Code),
        ];
        Ok(Self { shortcuts })
    }

    pub fn mark_for(&self, key: &KeyEvent) -> Option<Mark> {
        self.shortcuts
            .iter()
            .find(|(spec, _)| spec.matches(key))
            .map(|(_, mark)| *mark)
    }

    pub fn shortcut(&self, mark: Mark) -> Option<&KeySpec> {
        self.shortcuts
            .iter()
            .find(|(_, candidate)| *candidate == mark)
            .map(|(spec, _)| spec)
    }

    pub fn shortcuts(&self) -> &[(KeySpec, Mark)] {
        &self.shortcuts
    }
}
