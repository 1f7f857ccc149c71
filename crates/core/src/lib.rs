//! Core game logic module - pure, deterministic, and testable
//!
//! This module contains all the game rules, state management, and the session
//! policies built on top of them. It has **no dependencies** on UI, networking,
//! or I/O, making it:
//!
//! - **Deterministic**: Same seed and moves produce identical games
//! - **Testable**: Exact positions can be built with [`Board::from_rows`]
//! - **Portable**: Can run in any environment (terminal, GUI, headless)
//! - **Allocation-free on the move path**: tiles live in an inline `ArrayVec`
//!
//! # Module Structure
//!
//! - [`board`]: N x N tile engine with two-phase slide/merge, spawn and terminal detection
//! - [`game_state`]: Session with undo budget, best score and time-attack countdown
//! - [`rng`]: Seeded LCG used for tile spawns
//! - [`snapshot`]: Opaque undo token and the observation snapshot for collaborators
//!
//! # Game Rules
//!
//! - **Slide**: every tile travels as far as it can in the move direction
//! - **Merge**: two equal tiles meeting merge into one of double value; the
//!   merged value is added to the score
//! - **Merge once**: a tile that absorbed a merge cannot absorb another in the
//!   same move (`[2,2,2,2]` left gives `[4,4,0,0]`)
//! - **Spawn**: after every move that changed the board, a 2 (90%) or 4 (10%)
//!   appears in a random empty cell
//! - **Game over**: no empty cell and no two adjacent equal tiles
//!
//! # Example
//!
//! ```
//! use tui_2048_core::Board;
//! use tui_2048_types::Direction;
//!
//! let mut board = Board::from_rows(&[&[2, 2, 0, 0], &[0; 4], &[0; 4], &[0; 4]], 42).unwrap();
//! assert!(board.apply_move(Direction::Left));
//! assert_eq!(board.value_at(0, 0), Some(4));
//! assert_eq!(board.score(), 4);
//! // One new tile was spawned next to the merged one.
//! assert_eq!(board.tiles().len(), 2);
//! ```

pub mod board;
pub mod game_state;
pub mod rng;
pub mod snapshot;

pub use tui_2048_types as types;

// Re-export commonly used types for convenience
pub use board::{Board, SlideResult, Tile};
pub use game_state::GameState;
pub use rng::SimpleRng;
pub use snapshot::{GameSnapshot, Snapshot};
