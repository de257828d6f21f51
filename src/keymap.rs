//! Keyboard bindings for the capture session.
//!
//! One table maps keys to actions; the dispatcher and the help screen
//! both read it, so the two can never disagree.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::camera::{DrcStrength, WhiteBalanceMode};

/// Everything a key press can ask the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave the program cleanly
    Quit,
    /// Capture a frame (low-resolution plus full-resolution still)
    CaptureFrame,
    /// Drop the most recent frame from the counter
    DeleteLastFrame,
    /// Render the frame sequence to video and exit
    ExportVideo,
    /// Toggle the live preview between half-transparent and opaque
    ToggleAlpha,
    /// Return to the intro/help screen
    ShowIntro,
    /// Play the captured frames back in order
    PlayAnimation,
    /// Lock auto white balance at its current gains
    FreezeWhiteBalance,
    /// Switch to a white balance preset
    SetWhiteBalance(WhiteBalanceMode),
    /// Set the sensor ISO (0 = auto)
    SetIso(u32),
    /// Set dynamic-range-compression strength
    SetDrc(DrcStrength),
    /// Set color saturation
    SetSaturation(i32),
    /// Move exposure compensation by the given step
    NudgeExposure(i32),
}

/// One key binding: the key, what it does, and the help-screen wording.
#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub key: KeyCode,
    pub action: Action,
    pub help: &'static str,
}

/// The full binding table, in help-screen order.
pub const BINDINGS: &[Binding] = &[
    Binding {
        key: KeyCode::Esc,
        action: Action::Quit,
        help: "quit",
    },
    Binding {
        key: KeyCode::Char(' '),
        action: Action::CaptureFrame,
        help: "capture a frame",
    },
    Binding {
        key: KeyCode::Backspace,
        action: Action::DeleteLastFrame,
        help: "delete the last frame",
    },
    Binding {
        key: KeyCode::Enter,
        action: Action::ExportVideo,
        help: "render video and exit",
    },
    Binding {
        key: KeyCode::Tab,
        action: Action::ToggleAlpha,
        help: "toggle preview transparency",
    },
    Binding {
        key: KeyCode::F(1),
        action: Action::ShowIntro,
        help: "show this help screen",
    },
    Binding {
        key: KeyCode::Char('p'),
        action: Action::PlayAnimation,
        help: "play the animation so far",
    },
    Binding {
        key: KeyCode::Char('w'),
        action: Action::FreezeWhiteBalance,
        help: "freeze white balance",
    },
    Binding {
        key: KeyCode::Char('a'),
        action: Action::SetWhiteBalance(WhiteBalanceMode::Auto),
        help: "white balance: auto",
    },
    Binding {
        key: KeyCode::Char('t'),
        action: Action::SetWhiteBalance(WhiteBalanceMode::Tungsten),
        help: "white balance: tungsten",
    },
    Binding {
        key: KeyCode::Char('f'),
        action: Action::SetWhiteBalance(WhiteBalanceMode::Fluorescent),
        help: "white balance: fluorescent",
    },
    Binding {
        key: KeyCode::Char('s'),
        action: Action::SetWhiteBalance(WhiteBalanceMode::Sunlight),
        help: "white balance: sunlight",
    },
    Binding {
        key: KeyCode::Char('0'),
        action: Action::SetIso(0),
        help: "ISO auto",
    },
    Binding {
        key: KeyCode::Char('1'),
        action: Action::SetIso(100),
        help: "ISO 100",
    },
    Binding {
        key: KeyCode::Char('2'),
        action: Action::SetIso(200),
        help: "ISO 200",
    },
    Binding {
        key: KeyCode::Char('3'),
        action: Action::SetIso(320),
        help: "ISO 320",
    },
    Binding {
        key: KeyCode::Char('4'),
        action: Action::SetIso(400),
        help: "ISO 400",
    },
    Binding {
        key: KeyCode::Char('5'),
        action: Action::SetIso(500),
        help: "ISO 500",
    },
    Binding {
        key: KeyCode::Char('6'),
        action: Action::SetIso(640),
        help: "ISO 640",
    },
    Binding {
        key: KeyCode::Char('8'),
        action: Action::SetIso(800),
        help: "ISO 800",
    },
    Binding {
        key: KeyCode::Char('z'),
        action: Action::SetDrc(DrcStrength::Off),
        help: "DRC off",
    },
    Binding {
        key: KeyCode::Char('x'),
        action: Action::SetDrc(DrcStrength::Low),
        help: "DRC low",
    },
    Binding {
        key: KeyCode::Char('c'),
        action: Action::SetDrc(DrcStrength::Medium),
        help: "DRC medium",
    },
    Binding {
        key: KeyCode::Char('v'),
        action: Action::SetDrc(DrcStrength::High),
        help: "DRC high",
    },
    Binding {
        key: KeyCode::Char(','),
        action: Action::SetSaturation(0),
        help: "saturation 0",
    },
    Binding {
        key: KeyCode::Char('.'),
        action: Action::SetSaturation(25),
        help: "saturation 25",
    },
    Binding {
        key: KeyCode::Left,
        action: Action::NudgeExposure(-1),
        help: "exposure compensation down",
    },
    Binding {
        key: KeyCode::Right,
        action: Action::NudgeExposure(1),
        help: "exposure compensation up",
    },
];

/// Resolve a key event to an action, if it is bound.
///
/// Letter keys match regardless of shift state. Ctrl+C quits; any other
/// modified key is unbound so control sequences never trigger the
/// plain-letter bindings.
pub fn action_for(event: &KeyEvent) -> Option<Action> {
    if event.kind != KeyEventKind::Press {
        return None;
    }

    if event
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return match (event.modifiers, event.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(Action::Quit),
            _ => None,
        };
    }

    let code = normalize(event.code);
    BINDINGS.iter().find(|b| b.key == code).map(|b| b.action)
}

/// Human-readable label for a bound key, used by the help screen.
pub fn key_label(key: KeyCode) -> String {
    match key {
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_ascii_uppercase().to_string(),
        other => format!("{:?}", other),
    }
}

fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_core_bindings() {
        assert_eq!(action_for(&press(KeyCode::Esc)), Some(Action::Quit));
        assert_eq!(
            action_for(&press(KeyCode::Char(' '))),
            Some(Action::CaptureFrame)
        );
        assert_eq!(
            action_for(&press(KeyCode::Backspace)),
            Some(Action::DeleteLastFrame)
        );
        assert_eq!(action_for(&press(KeyCode::Enter)), Some(Action::ExportVideo));
        assert_eq!(action_for(&press(KeyCode::Tab)), Some(Action::ToggleAlpha));
        assert_eq!(action_for(&press(KeyCode::F(1))), Some(Action::ShowIntro));
        assert_eq!(
            action_for(&press(KeyCode::Char('p'))),
            Some(Action::PlayAnimation)
        );
    }

    #[test]
    fn test_white_balance_bindings() {
        assert_eq!(
            action_for(&press(KeyCode::Char('w'))),
            Some(Action::FreezeWhiteBalance)
        );
        assert_eq!(
            action_for(&press(KeyCode::Char('a'))),
            Some(Action::SetWhiteBalance(WhiteBalanceMode::Auto))
        );
        assert_eq!(
            action_for(&press(KeyCode::Char('t'))),
            Some(Action::SetWhiteBalance(WhiteBalanceMode::Tungsten))
        );
        assert_eq!(
            action_for(&press(KeyCode::Char('f'))),
            Some(Action::SetWhiteBalance(WhiteBalanceMode::Fluorescent))
        );
        assert_eq!(
            action_for(&press(KeyCode::Char('s'))),
            Some(Action::SetWhiteBalance(WhiteBalanceMode::Sunlight))
        );
    }

    #[test]
    fn test_iso_bindings() {
        let expected = [
            ('0', 0),
            ('1', 100),
            ('2', 200),
            ('3', 320),
            ('4', 400),
            ('5', 500),
            ('6', 640),
            ('8', 800),
        ];
        for (key, iso) in expected {
            assert_eq!(
                action_for(&press(KeyCode::Char(key))),
                Some(Action::SetIso(iso)),
                "key {}",
                key
            );
        }
    }

    #[test]
    fn test_iso_gaps_are_unbound() {
        // 7 and 9 have no ISO step
        assert_eq!(action_for(&press(KeyCode::Char('7'))), None);
        assert_eq!(action_for(&press(KeyCode::Char('9'))), None);
    }

    #[test]
    fn test_drc_bindings() {
        assert_eq!(
            action_for(&press(KeyCode::Char('z'))),
            Some(Action::SetDrc(DrcStrength::Off))
        );
        assert_eq!(
            action_for(&press(KeyCode::Char('x'))),
            Some(Action::SetDrc(DrcStrength::Low))
        );
        assert_eq!(
            action_for(&press(KeyCode::Char('c'))),
            Some(Action::SetDrc(DrcStrength::Medium))
        );
        assert_eq!(
            action_for(&press(KeyCode::Char('v'))),
            Some(Action::SetDrc(DrcStrength::High))
        );
    }

    #[test]
    fn test_saturation_and_exposure_bindings() {
        assert_eq!(
            action_for(&press(KeyCode::Char(','))),
            Some(Action::SetSaturation(0))
        );
        assert_eq!(
            action_for(&press(KeyCode::Char('.'))),
            Some(Action::SetSaturation(25))
        );
        assert_eq!(
            action_for(&press(KeyCode::Left)),
            Some(Action::NudgeExposure(-1))
        );
        assert_eq!(
            action_for(&press(KeyCode::Right)),
            Some(Action::NudgeExposure(1))
        );
    }

    #[test]
    fn test_letters_match_with_shift() {
        let event = KeyEvent::new(KeyCode::Char('P'), KeyModifiers::SHIFT);
        assert_eq!(action_for(&event), Some(Action::PlayAnimation));
    }

    #[test]
    fn test_ctrl_c_quits() {
        let event = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(action_for(&event), Some(Action::Quit));
    }

    #[test]
    fn test_other_control_chords_are_unbound() {
        // Ctrl+V must not reach the plain 'v' DRC binding
        let event = KeyEvent::new(KeyCode::Char('v'), KeyModifiers::CONTROL);
        assert_eq!(action_for(&event), None);
    }

    #[test]
    fn test_release_events_are_ignored() {
        let mut event = KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE);
        event.kind = KeyEventKind::Release;
        assert_eq!(action_for(&event), None);
    }

    #[test]
    fn test_key_labels() {
        assert_eq!(key_label(KeyCode::Esc), "Esc");
        assert_eq!(key_label(KeyCode::Char(' ')), "Space");
        assert_eq!(key_label(KeyCode::Char('p')), "P");
        assert_eq!(key_label(KeyCode::F(1)), "F1");
        assert_eq!(key_label(KeyCode::Char(',')), ",");
    }

    #[test]
    fn test_every_binding_has_help_text() {
        for binding in BINDINGS {
            assert!(!binding.help.is_empty(), "{:?}", binding.key);
        }
    }
}
