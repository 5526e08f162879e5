use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// A shortcut such as `mod+shift+x`. `mod` is Control, or Command where the
/// terminal reports it as Super.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    pub code: KeyCode,
    pub primary: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeySpec {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            primary: false,
            shift: false,
            alt: false,
        }
    }

    /// `mod+<c>`
    pub fn primary(c: char) -> Self {
        Self {
            primary: true,
            ..Self::new(KeyCode::Char(c))
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn matches(&self, key: &KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }
        let primary = key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        primary == self.primary
            && alt == self.alt
            && is_shifted(key) == self.shift
            && canonical(key.code) == canonical(self.code)
    }

    /// The event a terminal would report for this shortcut.
    pub fn to_event(&self) -> KeyEvent {
        let mut modifiers = KeyModifiers::NONE;
        if self.primary {
            modifiers |= KeyModifiers::CONTROL;
        }
        if self.shift {
            modifiers |= KeyModifiers::SHIFT;
        }
        if self.alt {
            modifiers |= KeyModifiers::ALT;
        }
        let code = match self.code {
            KeyCode::Tab if self.shift => KeyCode::BackTab,
            other => other,
        };
        KeyEvent::new(code, modifiers)
    }
}

/// Whether shift was held; some terminals only report it through the character case.
pub fn is_shifted(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::SHIFT)
        || matches!(key.code, KeyCode::BackTab)
        || matches!(key.code, KeyCode::Char(c) if c.is_ascii_uppercase())
}

fn canonical(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        KeyCode::BackTab => KeyCode::Tab,
        other => other,
    }
}

fn key_name(code: KeyCode) -> Option<String> {
    let name = match code {
        KeyCode::Enter => "enter",
        KeyCode::Backspace => "backspace",
        KeyCode::Delete => "delete",
        KeyCode::Tab | KeyCode::BackTab => "tab",
        KeyCode::Esc => "esc",
        KeyCode::Left => "left",
        KeyCode::Right => "right",
        KeyCode::Up => "up",
        KeyCode::Down => "down",
        KeyCode::Home => "home",
        KeyCode::End => "end",
        KeyCode::Char(' ') => "space",
        KeyCode::Char(c) => return Some(c.to_string()),
        _ => return None,
    };
    Some(name.to_string())
}

fn parse_key(name: &str) -> Result<KeyCode> {
    let code = match name {
        "enter" | "return" => KeyCode::Enter,
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "tab" => KeyCode::Tab,
        "esc" | "escape" => KeyCode::Esc,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "space" => KeyCode::Char(' '),
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => bail!("unknown key: {}", name),
            }
        }
    };
    Ok(code)
}

impl FromStr for KeySpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        let mut parts: Vec<&str> = lowered.split('+').collect();
        // "mod++" binds the plus key itself
        if lowered.ends_with("++") {
            parts.truncate(parts.len() - 2);
            parts.push("+");
        }
        let key = parts
            .pop()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("empty key binding: {:?}", s))?;

        let mut spec = KeySpec::new(parse_key(key)?);
        for modifier in parts {
            match modifier {
                "mod" | "ctrl" | "control" | "cmd" | "super" | "meta" => spec.primary = true,
                "shift" => spec.shift = true,
                "alt" | "option" => spec.alt = true,
                other => bail!("unknown modifier {:?} in {:?}", other, s),
            }
        }
        Ok(spec)
    }
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.primary {
            write!(f, "mod+")?;
        }
        if self.alt {
            write!(f, "alt+")?;
        }
        if self.shift {
            write!(f, "shift+")?;
        }
        match key_name(canonical(self.code)) {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{:?}", self.code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shortcuts() {
        let spec: KeySpec = "mod+shift+X".parse().unwrap();
        assert_eq!(spec, KeySpec::primary('x').with_shift());
        assert_eq!(spec.to_string(), "mod+shift+x");

        let enter: KeySpec = "shift+enter".parse().unwrap();
        assert_eq!(enter.code, KeyCode::Enter);
        assert!(enter.shift && !enter.primary);

        let plus: KeySpec = "mod++".parse().unwrap();
        assert_eq!(plus, KeySpec::primary('+'));
    }

    #[test]
    fn test_parse_errors() {
        assert!("mod+".parse::<KeySpec>().is_err());
        assert!("hyper+b".parse::<KeySpec>().is_err());
        assert!("mod+banana".parse::<KeySpec>().is_err());
    }

    #[test]
    fn test_matches_control_and_super() {
        let bold = KeySpec::primary('b');
        assert!(bold.matches(&KeyEvent::new(KeyCode::Char('b'), KeyModifiers::CONTROL)));
        assert!(bold.matches(&KeyEvent::new(KeyCode::Char('b'), KeyModifiers::SUPER)));
        assert!(!bold.matches(&KeyEvent::new(KeyCode::Char('b'), KeyModifiers::NONE)));
        assert!(!bold.matches(&KeyEvent::new(
            KeyCode::Char('b'),
            KeyModifiers::CONTROL | KeyModifiers::SHIFT
        )));
    }

    #[test]
    fn test_uppercase_char_counts_as_shift() {
        let strike = KeySpec::primary('x').with_shift();
        assert!(strike.matches(&KeyEvent::new(KeyCode::Char('X'), KeyModifiers::CONTROL)));
        assert!(strike.matches(&strike.to_event()));
    }

    #[test]
    fn test_shift_tab_event() {
        let spec: KeySpec = "shift+tab".parse().unwrap();
        let event = spec.to_event();
        assert_eq!(event.code, KeyCode::BackTab);
        assert!(spec.matches(&event));
    }
}
