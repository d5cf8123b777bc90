use crate::internal::ui::app::Command;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

/// Where a key press happens, for context-specific bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyBindingContext {
    Global,
    List,
    Categories,
    Detail,
}

/// Maps key events to commands
#[derive(Debug, Clone, Default)]
pub struct KeyBindingMap {
    global: HashMap<KeyEvent, Command>,
    list: HashMap<KeyEvent, Command>,
    categories: HashMap<KeyEvent, Command>,
    detail: HashMap<KeyEvent, Command>,
}

impl KeyBindingMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, context: KeyBindingContext) -> &HashMap<KeyEvent, Command> {
        match context {
            KeyBindingContext::Global => &self.global,
            KeyBindingContext::List => &self.list,
            KeyBindingContext::Categories => &self.categories,
            KeyBindingContext::Detail => &self.detail,
        }
    }

    /// Context-specific bindings first, then global.
    pub fn get_command(&self, key: &KeyEvent, context: KeyBindingContext) -> Option<Command> {
        let key = normalize(key);
        self.map(context)
            .get(&key)
            .or_else(|| self.global.get(&key))
            .copied()
    }

    pub fn add_binding(&mut self, context: KeyBindingContext, key: KeyEvent, command: Command) {
        let map = match context {
            KeyBindingContext::Global => &mut self.global,
            KeyBindingContext::List => &mut self.list,
            KeyBindingContext::Categories => &mut self.categories,
            KeyBindingContext::Detail => &mut self.detail,
        };
        map.insert(normalize(&key), command);
    }

    /// Merge custom keybindings from configuration
    pub fn merge_config(&mut self, config: &crate::config::KeyBindingConfig) {
        let mut merge = |ctx: KeyBindingContext, bindings: &HashMap<String, Command>| {
            for (key_str, command) in bindings {
                match parse_key_str(key_str) {
                    Some(key_event) => self.add_binding(ctx, key_event, *command),
                    None => tracing::warn!("Invalid key string in config: {}", key_str),
                }
            }
        };

        merge(KeyBindingContext::Global, &config.global);
        merge(KeyBindingContext::List, &config.list);
        merge(KeyBindingContext::Categories, &config.categories);
        merge(KeyBindingContext::Detail, &config.detail);
    }
}

/// Terminals report uppercase letters with SHIFT set; the character already
/// carries the case, so SHIFT is dropped for `Char` keys.
fn normalize(key: &KeyEvent) -> KeyEvent {
    let mut modifiers = key.modifiers;
    if let KeyCode::Char(_) = key.code {
        modifiers.remove(KeyModifiers::SHIFT);
    }
    KeyEvent::new(key.code, modifiers)
}

/// Parse a key string into a KeyEvent
/// Supported formats:
/// - Single char: "j", "k", "1"
/// - Special keys: "Enter", "Tab", "Esc", "Up", "Down", "Left", "Right"
/// - With modifiers: "Ctrl+c", "Shift+Tab"
pub fn parse_key_str(key_str: &str) -> Option<KeyEvent> {
    let parts: Vec<&str> = key_str.split('+').collect();
    let (key_part, modifier_parts) = parts.split_last()?;

    let mut modifiers = KeyModifiers::empty();
    for modifier in modifier_parts {
        match modifier.to_lowercase().as_str() {
            "ctrl" => modifiers |= KeyModifiers::CONTROL,
            "shift" => modifiers |= KeyModifiers::SHIFT,
            "alt" => modifiers |= KeyModifiers::ALT,
            _ => return None,
        }
    }

    let code = match *key_part {
        "Enter" => KeyCode::Enter,
        "Tab" => KeyCode::Tab,
        "Esc" => KeyCode::Esc,
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "Backspace" => KeyCode::Backspace,
        "Home" => KeyCode::Home,
        "End" => KeyCode::End,
        "PageUp" => KeyCode::PageUp,
        "PageDown" => KeyCode::PageDown,
        s => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return None,
            }
        }
    };

    Some(KeyEvent::new(code, modifiers))
}
