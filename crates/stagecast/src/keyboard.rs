//! Presenter keyboard bindings.

/// A key as seen by the binding table, independent of the windowing toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowRight,
    ArrowLeft,
    Space,
    Escape,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    /// A text field owns keyboard focus; global hotkeys must stay quiet.
    pub text_input_focused: bool,
}

impl KeyPress {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            text_input_focused: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Next,
    Prev,
    ToggleFullscreen,
    CycleTransition,
    ToggleCameraOverlay,
    ToggleAudience,
    ToggleTheme,
    DismissJoke,
    TriggerJoke(String),
}

/// Map a key press to a presenter action. Reserved letters match in either
/// case and take precedence over joke hotkeys bound to the same character.
pub fn action_for(press: &KeyPress) -> Option<Action> {
    if press.text_input_focused {
        return None;
    }
    let action = match press.key {
        Key::ArrowRight | Key::Space | Key::Char(' ') => Action::Next,
        Key::ArrowLeft => Action::Prev,
        Key::Escape => Action::DismissJoke,
        Key::Char('f' | 'F') => Action::ToggleFullscreen,
        Key::Char('s' | 'S') => Action::CycleTransition,
        Key::Char('c' | 'C') => Action::ToggleCameraOverlay,
        Key::Char('p' | 'P') => Action::ToggleAudience,
        Key::Char('d' | 'D') => Action::ToggleTheme,
        Key::Char(ch) if !ch.is_control() && !ch.is_whitespace() => Action::TriggerJoke(ch.to_string()),
        Key::Char(_) => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_keys() {
        assert_eq!(action_for(&KeyPress::new(Key::ArrowRight)), Some(Action::Next));
        assert_eq!(action_for(&KeyPress::new(Key::Space)), Some(Action::Next));
        assert_eq!(action_for(&KeyPress::new(Key::ArrowLeft)), Some(Action::Prev));
    }

    #[test]
    fn test_reserved_letters_win() {
        assert_eq!(action_for(&KeyPress::new(Key::Char('p'))), Some(Action::ToggleAudience));
        assert_eq!(action_for(&KeyPress::new(Key::Char('c'))), Some(Action::ToggleCameraOverlay));
        assert_eq!(action_for(&KeyPress::new(Key::Char('f'))), Some(Action::ToggleFullscreen));
        assert_eq!(action_for(&KeyPress::new(Key::Char('s'))), Some(Action::CycleTransition));
        assert_eq!(action_for(&KeyPress::new(Key::Char('d'))), Some(Action::ToggleTheme));
        assert_eq!(action_for(&KeyPress::new(Key::Char('P'))), Some(Action::ToggleAudience));
    }

    #[test]
    fn test_other_characters_trigger_jokes() {
        assert_eq!(
            action_for(&KeyPress::new(Key::Char('1'))),
            Some(Action::TriggerJoke("1".to_string()))
        );
        assert_eq!(
            action_for(&KeyPress::new(Key::Char('X'))),
            Some(Action::TriggerJoke("X".to_string()))
        );
        assert_eq!(action_for(&KeyPress::new(Key::Char('\t'))), None);
    }

    #[test]
    fn test_suppressed_while_typing() {
        for key in [Key::ArrowRight, Key::Char('1'), Key::Char('p'), Key::Escape] {
            let press = KeyPress {
                key,
                text_input_focused: true,
            };
            assert_eq!(action_for(&press), None);
        }
    }
}
