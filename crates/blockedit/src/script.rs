//! Line-oriented replay scripts for driving a mounted block without a host.
//!
//! ```text
//! # comment
//! focus
//! select 0 4
//! key mod+b
//! type hello
//! link https://example.com _blank
//! ```

use anyhow::{anyhow, Result};
use doccore::{Align, ListKind, Range};

use crate::adapter::BlockAdapter;
use crate::keymap::KeySpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Focus,
    Key(KeySpec),
    Type(String),
    /// Document-wide character offsets of anchor and focus.
    Select(usize, usize),
    Link { url: String, target: Option<String> },
    Unlink,
    Align(Option<Align>),
    Level(u8),
    List(ListKind),
    Color(Option<String>),
    Size(Option<String>),
}

pub fn parse_script(source: &str) -> Result<Vec<Command>> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            parse_command(line.trim()).map_err(|e| anyhow!("line {}: {}", index + 1, e))
        })
        .collect()
}

fn parse_command(line: &str) -> Result<Command> {
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let parts: Vec<&str> = rest.split_whitespace().collect();

    match name {
        "focus" => Ok(Command::Focus),
        "key" => Ok(Command::Key(rest.parse()?)),
        // Everything after the command name, spaces included
        "type" => Ok(Command::Type(rest.to_string())),
        "select" => match parts.as_slice() {
            [at] => {
                let at = at.parse()?;
                Ok(Command::Select(at, at))
            }
            [anchor, focus] => Ok(Command::Select(anchor.parse()?, focus.parse()?)),
            _ => Err(anyhow!("select takes one or two offsets")),
        },
        "link" => match parts.as_slice() {
            [url] => Ok(Command::Link {
                url: url.to_string(),
                target: None,
            }),
            [url, target] => Ok(Command::Link {
                url: url.to_string(),
                target: Some(target.to_string()),
            }),
            _ => Err(anyhow!("link takes a url and an optional target")),
        },
        "unlink" => Ok(Command::Unlink),
        "align" => match rest {
            "none" => Ok(Command::Align(None)),
            value => Align::parse(value)
                .map(|align| Command::Align(Some(align)))
                .ok_or_else(|| anyhow!("unknown alignment: {}", value)),
        },
        "level" => Ok(Command::Level(rest.parse()?)),
        "list" => match rest {
            "ordered" => Ok(Command::List(ListKind::Ordered)),
            "unordered" => Ok(Command::List(ListKind::Unordered)),
            value => Err(anyhow!("unknown list kind: {}", value)),
        },
        "color" => Ok(Command::Color(optional(rest))),
        "size" => Ok(Command::Size(optional(rest))),
        _ => Err(anyhow!("unknown command: {}", name)),
    }
}

fn optional(value: &str) -> Option<String> {
    match value {
        "" | "none" => None,
        value => Some(value.to_string()),
    }
}

/// Runs one command; the returned line describes what happened.
pub fn execute(adapter: &mut BlockAdapter, command: &Command) -> Result<String> {
    match command {
        Command::Focus => {
            adapter.focus();
            Ok("focused".to_string())
        }
        Command::Key(spec) => {
            let result = adapter.handle_key(&spec.to_event());
            Ok(format!(
                "key {}: prevent_default={} changed={}",
                spec, result.prevent_default, result.changed
            ))
        }
        Command::Type(text) => {
            let changed = adapter.insert_text(text);
            Ok(format!("typed {:?}: changed={}", text, changed))
        }
        Command::Select(anchor, focus) => {
            let editor = adapter.editor();
            let anchor_point = editor
                .point_from_offset(*anchor)
                .ok_or_else(|| anyhow!("offset {} is outside the block", anchor))?;
            let focus_point = editor
                .point_from_offset(*focus)
                .ok_or_else(|| anyhow!("offset {} is outside the block", focus))?;
            adapter.select(Range::new(anchor_point, focus_point));
            Ok(format!("selected {}..{}", anchor, focus))
        }
        Command::Link { url, target } => {
            let changed = adapter.wrap_link(url, target.as_deref());
            Ok(format!("linked {}: changed={}", url, changed))
        }
        Command::Unlink => Ok(format!("unlinked: changed={}", adapter.unwrap_link())),
        Command::Align(align) => {
            adapter.set_alignment(*align);
            Ok(format!("aligned {:?}", align))
        }
        Command::Level(level) => {
            if !adapter.set_heading_level(*level) {
                return Err(anyhow!("{:?} block has no heading level", adapter.kind()));
            }
            Ok(format!("level {}", level))
        }
        Command::List(kind) => {
            if !adapter.set_list_kind(*kind) {
                return Err(anyhow!("{:?} block is not a list", adapter.kind()));
            }
            Ok(format!("list {}", kind.tag()))
        }
        Command::Color(color) => {
            adapter.set_color(color.clone());
            Ok(format!("color {:?}", color))
        }
        Command::Size(size) => {
            adapter.set_size(size.clone());
            Ok(format!("size {:?}", size))
        }
    }
}

/// Runs every command in order, logging failures and carrying on.
pub fn run(adapter: &mut BlockAdapter, commands: &[Command]) -> usize {
    let mut failures = 0;
    for command in commands {
        match execute(adapter, command) {
            Ok(message) => log::debug!("{}", message),
            Err(e) => {
                log::warn!("{:?} failed: {}", command, e);
                failures += 1;
            }
        }
    }
    failures
}
