//! Debouncing input handler for terminal environments.
//!
//! Moves are turn-based: one key press is one move. Terminals report held keys
//! as a stream of repeat events, and a collaborator may still be animating the
//! previous move, so the handler drops repeats and any press that arrives
//! within the settle window of the last accepted move.

use crossterm::event::{KeyEvent, KeyEventKind};

use crate::map::handle_key_event;
use crate::types::GameAction;

/// Default settle window between two accepted moves.
pub const DEFAULT_SETTLE_MS: u32 = 110;

/// Tracks the settle window for move actions.
#[derive(Debug, Clone)]
pub struct InputHandler {
    settle_ms: u32,
    /// Time since the last accepted move; starts settled.
    since_move_ms: u32,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::with_settle_ms(DEFAULT_SETTLE_MS)
    }

    pub fn with_settle_ms(settle_ms: u32) -> Self {
        Self {
            settle_ms,
            since_move_ms: settle_ms,
        }
    }

    /// Whether a move would be accepted right now
    pub fn settled(&self) -> bool {
        self.since_move_ms >= self.settle_ms
    }

    /// Advance time by `elapsed_ms`.
    pub fn update(&mut self, elapsed_ms: u32) {
        self.since_move_ms = self.since_move_ms.saturating_add(elapsed_ms);
    }

    /// Map a key event, applying the repeat filter and the settle window.
    ///
    /// Non-move actions (undo, restart, mode toggle) are never delayed.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<GameAction> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        let action = handle_key_event(key)?;
        if action.direction().is_none() {
            return Some(action);
        }

        if !self.settled() {
            return None;
        }
        self.since_move_ms = 0;
        Some(action)
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}
