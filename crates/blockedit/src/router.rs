use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use doccore::Mark;

use crate::config::KeybindingsConfig;
use crate::keymap::{is_shifted, KeySpec};
use crate::marks::MarkRegistry;
use crate::transforms::Motion;

/// What a key press means to a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    ToggleMark(Mark),
    ToggleLink,
    Enter,
    SoftBreak,
    Backspace,
    Indent,
    Outdent,
    Undo,
    Redo,
    Move { motion: Motion, extend: bool },
    Insert(char),
    Unhandled,
}

#[derive(Debug, Clone)]
pub struct KeyRouter {
    marks: MarkRegistry,
    link: KeySpec,
}

impl Default for KeyRouter {
    fn default() -> Self {
        Self {
            marks: MarkRegistry::default(),
            link: KeySpec::primary('k'),
        }
    }
}

impl KeyRouter {
    pub fn from_config(config: &KeybindingsConfig) -> Result<Self> {
        Ok(Self {
            marks: MarkRegistry::from_config(config)?,
            link: config.link.parse()?,
        })
    }

    pub fn marks(&self) -> &MarkRegistry {
        &self.marks
    }

    pub fn route(&self, key: &KeyEvent) -> Route {
        if key.kind == KeyEventKind::Release {
            return Route::Unhandled;
        }
        if let Some(mark) = self.marks.mark_for(key) {
            return Route::ToggleMark(mark);
        }
        if self.link.matches(key) {
            return Route::ToggleLink;
        }

        let primary = key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let shift = is_shifted(key);

        match key.code {
            KeyCode::Enter if shift => Route::SoftBreak,
            KeyCode::Enter => Route::Enter,
            KeyCode::Backspace => Route::Backspace,
            KeyCode::BackTab => Route::Outdent,
            KeyCode::Tab if shift => Route::Outdent,
            KeyCode::Tab => Route::Indent,
            KeyCode::Char(c) if primary && c.eq_ignore_ascii_case(&'z') => {
                if shift {
                    Route::Redo
                } else {
                    Route::Undo
                }
            }
            KeyCode::Char(c) if primary && c.eq_ignore_ascii_case(&'y') => Route::Redo,
            KeyCode::Left => movement(Motion::Left, shift),
            KeyCode::Right => movement(Motion::Right, shift),
            KeyCode::Up => movement(Motion::Up, shift),
            KeyCode::Down => movement(Motion::Down, shift),
            KeyCode::Home if primary => movement(Motion::DocumentStart, shift),
            KeyCode::End if primary => movement(Motion::DocumentEnd, shift),
            KeyCode::Home => movement(Motion::LineStart, shift),
            KeyCode::End => movement(Motion::LineEnd, shift),
            KeyCode::Char(c) if !primary && !alt => Route::Insert(c),
            _ => Route::Unhandled,
        }
    }
}

fn movement(motion: Motion, extend: bool) -> Route {
    Route::Move { motion, extend }
}
