use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::trace;

use super::{Editor, SourceEditor};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    InsertLineBreak,
    InsertLockedSpace,
}

/// What should happen to a key event after the editor looked at it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Not ours; the host's default handling applies.
    PassThrough,
    /// Swallowed without doing anything (the release of a handled key).
    Consume,
    Perform(KeyAction),
}

impl KeyDisposition {
    pub fn prevents_default(self) -> bool {
        !matches!(self, KeyDisposition::PassThrough)
    }
}

/// Control, Super (Cmd) and Meta all count as the accelerator modifier.
pub fn has_accelerator(modifiers: KeyModifiers) -> bool {
    modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER | KeyModifiers::META)
}

pub fn classify_key_event(event: &KeyEvent) -> KeyDisposition {
    if has_accelerator(event.modifiers) {
        match event.code {
            KeyCode::Char(' ') => on_kind(event.kind, KeyAction::InsertLockedSpace),
            _ => KeyDisposition::PassThrough,
        }
    } else {
        match event.code {
            KeyCode::Enter => on_kind(event.kind, KeyAction::InsertLineBreak),
            _ => KeyDisposition::PassThrough,
        }
    }
}

fn on_kind(kind: KeyEventKind, action: KeyAction) -> KeyDisposition {
    match kind {
        KeyEventKind::Press | KeyEventKind::Repeat => KeyDisposition::Perform(action),
        KeyEventKind::Release => KeyDisposition::Consume,
    }
}

impl<S: SourceEditor> Editor<S> {
    /// Handles a key event in visual mode. Returns `true` when the host
    /// should skip its own handling of the event.
    pub fn on_key_event(&mut self, event: &KeyEvent) -> bool {
        if !self.is_visual() {
            return false;
        }
        let disposition = classify_key_event(event);
        trace!(target: "pure_rte::keys", code = ?event.code, ?disposition, "key event");
        match disposition {
            KeyDisposition::PassThrough => false,
            KeyDisposition::Consume => true,
            KeyDisposition::Perform(action) => {
                self.perform_key_action(action);
                true
            }
        }
    }

    pub fn perform_key_action(&mut self, action: KeyAction) -> bool {
        match action {
            KeyAction::InsertLineBreak => self.insert_line_break(),
            KeyAction::InsertLockedSpace => self.insert_locked_space(),
        }
    }
}
