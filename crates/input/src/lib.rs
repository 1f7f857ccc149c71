//! Terminal input module (engine-facing).
//!
//! This module is intentionally independent of any UI framework. It maps
//! `crossterm` key events into [`crate::types::GameAction`] and provides a
//! debouncing handler so a held key or an in-flight animation never queues a
//! second move before the first one settled.

pub mod handler;
pub mod map;

pub use tui_2048_types as types;

pub use handler::InputHandler;
pub use map::{handle_key_event, should_quit};
