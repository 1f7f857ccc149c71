//! TUI 2048 (workspace facade crate).
//!
//! Re-exports the workspace crates under `tui_2048::{core,adapter,input,types}`
//! and adds the environment configuration shared by the binaries.

pub mod config;

pub use tui_2048_adapter as adapter;
pub use tui_2048_core as core;
pub use tui_2048_input as input;
pub use tui_2048_types as types;

pub use config::GameConfig;
