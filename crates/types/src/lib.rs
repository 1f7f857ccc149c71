//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the workspace.
//! All types are plain data with no external dependencies, so they can be used
//! by the engine, the input mapper and the JSON adapter alike.
//!
//! # Grid Dimensions
//!
//! The standard game is played on a 4x4 grid. The engine accepts any square
//! grid from [`MIN_GRID_SIZE`] to [`MAX_GRID_SIZE`]; tile storage is sized for
//! the largest grid so the hot path never allocates.
//!
//! # Rule Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `DEFAULT_GRID_SIZE` | 4 | Standard play |
//! | `INITIAL_TILES` | 2 | Tiles spawned by a new game |
//! | `SPAWN_FOUR_PERCENT` | 10 | Chance a spawned tile is a 4 |
//! | `UNDO_BUDGET` | 1 | Undos available per game |
//! | `TIME_ATTACK_MS` | 60000 | Countdown for time-attack mode |
//!
//! # Examples
//!
//! ```
//! use tui_2048_types::{Direction, GameAction, GameMode};
//!
//! let dir = Direction::from_str("LEFT").unwrap();
//! assert_eq!(dir, Direction::Left);
//! assert_eq!(dir.delta(), (0, -1));
//!
//! let action = GameAction::from_str("undo").unwrap();
//! assert_eq!(action, GameAction::Undo);
//! assert_eq!(GameAction::MoveUp.direction(), Some(Direction::Up));
//!
//! assert_eq!(GameMode::from_str("time-attack"), Some(GameMode::TimeAttack));
//! ```

/// Standard grid dimension (4x4)
pub const DEFAULT_GRID_SIZE: u8 = 4;

/// Smallest accepted grid dimension
pub const MIN_GRID_SIZE: u8 = 2;

/// Largest accepted grid dimension
pub const MAX_GRID_SIZE: u8 = 8;

/// Capacity of the inline tile storage (MAX_GRID_SIZE squared)
pub const MAX_CELLS: usize = (MAX_GRID_SIZE as usize) * (MAX_GRID_SIZE as usize);

/// Number of tiles spawned when a new game starts
pub const INITIAL_TILES: usize = 2;

/// Largest tile value; two tiles of this value never merge
pub const MAX_TILE_VALUE: u32 = 1 << 31;

/// Value of a regular spawned tile
pub const SPAWN_LOW_VALUE: u32 = 2;

/// Value of a rare spawned tile
pub const SPAWN_HIGH_VALUE: u32 = 4;

/// Percent chance that a spawned tile is [`SPAWN_HIGH_VALUE`] (0.1 probability)
pub const SPAWN_FOUR_PERCENT: u32 = 10;

/// Undos granted per game
pub const UNDO_BUDGET: u8 = 1;

/// Countdown for time-attack mode in milliseconds (60 seconds)
pub const TIME_ATTACK_MS: u32 = 60_000;

/// Fixed timestep of the host loop in milliseconds
pub const TICK_MS: u32 = 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_defaults() {
        assert_eq!(DEFAULT_GRID_SIZE, 4);
        assert_eq!(MAX_CELLS, 64);
        assert_eq!(INITIAL_TILES, 2);
        assert_eq!(SPAWN_FOUR_PERCENT, 10);
        assert_eq!(UNDO_BUDGET, 1);
        assert_eq!(TIME_ATTACK_MS, 60_000);
    }

    #[test]
    fn direction_roundtrip_and_deltas() {
        for dir in Direction::ALL {
            assert_eq!(Direction::from_str(dir.as_str()), Some(dir));
        }
        assert_eq!(Direction::Up.delta(), (-1, 0));
        assert_eq!(Direction::Down.delta(), (1, 0));
        assert_eq!(Direction::Left.delta(), (0, -1));
        assert_eq!(Direction::Right.delta(), (0, 1));
        assert_eq!(Direction::from_str("sideways"), None);
    }

    #[test]
    fn action_parsing_accepts_aliases() {
        assert_eq!(GameAction::from_str("moveLeft"), Some(GameAction::MoveLeft));
        assert_eq!(GameAction::from_str("left"), Some(GameAction::MoveLeft));
        assert_eq!(GameAction::from_str("Restart"), Some(GameAction::Restart));
        assert_eq!(GameAction::from_str("newGame"), Some(GameAction::Restart));
        assert_eq!(GameAction::from_str("hardDrop"), None);
    }

    #[test]
    fn action_direction_mapping() {
        for dir in Direction::ALL {
            assert_eq!(GameAction::from(dir).direction(), Some(dir));
        }
        assert_eq!(GameAction::Undo.direction(), None);
    }
}

/// The four directions a move can slide tiles in
///
/// Rows grow downwards and columns grow to the right, so `Up` moves tiles
/// towards row 0 and `Left` towards column 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Direction {
    /// All directions in index order
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Parse direction from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use tui_2048_types::Direction;
    ///
    /// assert_eq!(Direction::from_str("up"), Some(Direction::Up));
    /// assert_eq!(Direction::from_str("R"), Some(Direction::Right));
    /// assert_eq!(Direction::from_str("north"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "up" | "u" => Some(Direction::Up),
            "down" | "d" => Some(Direction::Down),
            "left" | "l" => Some(Direction::Left),
            "right" | "r" => Some(Direction::Right),
            _ => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Position in [`Direction::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Row/column step for one cell of travel: `(d_row, d_col)`
    pub fn delta(&self) -> (i8, i8) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// Actions a collaborator can apply to a game session
///
/// These are shared by keyboard input and the JSON adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameAction {
    /// Slide all tiles up
    MoveUp,
    /// Slide all tiles down
    MoveDown,
    /// Slide all tiles left
    MoveLeft,
    /// Slide all tiles right
    MoveRight,
    /// Restore the state before the last successful move (budgeted)
    Undo,
    /// Start a new game in the current mode
    Restart,
    /// Switch between normal and time-attack mode (starts a new game)
    ToggleMode,
}

impl GameAction {
    /// Parse action from string (for the AI protocol)
    ///
    /// Accepts the camelCase protocol names as well as bare direction names.
    ///
    /// # Examples
    ///
    /// ```
    /// use tui_2048_types::GameAction;
    ///
    /// assert_eq!(GameAction::from_str("moveUp"), Some(GameAction::MoveUp));
    /// assert_eq!(GameAction::from_str("down"), Some(GameAction::MoveDown));
    /// assert_eq!(GameAction::from_str("undo"), Some(GameAction::Undo));
    /// assert_eq!(GameAction::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moveup" | "up" => Some(GameAction::MoveUp),
            "movedown" | "down" => Some(GameAction::MoveDown),
            "moveleft" | "left" => Some(GameAction::MoveLeft),
            "moveright" | "right" => Some(GameAction::MoveRight),
            "undo" => Some(GameAction::Undo),
            "restart" | "newgame" => Some(GameAction::Restart),
            "togglemode" => Some(GameAction::ToggleMode),
            _ => None,
        }
    }

    /// Convert to camelCase string for the AI protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::MoveUp => "moveUp",
            GameAction::MoveDown => "moveDown",
            GameAction::MoveLeft => "moveLeft",
            GameAction::MoveRight => "moveRight",
            GameAction::Undo => "undo",
            GameAction::Restart => "restart",
            GameAction::ToggleMode => "toggleMode",
        }
    }

    /// The slide direction, for move actions
    pub fn direction(&self) -> Option<Direction> {
        match self {
            GameAction::MoveUp => Some(Direction::Up),
            GameAction::MoveDown => Some(Direction::Down),
            GameAction::MoveLeft => Some(Direction::Left),
            GameAction::MoveRight => Some(Direction::Right),
            _ => None,
        }
    }
}

impl From<Direction> for GameAction {
    fn from(value: Direction) -> Self {
        match value {
            Direction::Up => GameAction::MoveUp,
            Direction::Down => GameAction::MoveDown,
            Direction::Left => GameAction::MoveLeft,
            Direction::Right => GameAction::MoveRight,
        }
    }
}

/// Game mode selected by the player
///
/// - **Normal**: play until no move is possible
/// - **TimeAttack**: additionally ends when the countdown reaches zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameMode {
    #[default]
    Normal,
    TimeAttack,
}

impl GameMode {
    /// Parse mode from string (case-insensitive, `-`/`_` optional)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "normal" => Some(GameMode::Normal),
            "timeattack" => Some(GameMode::TimeAttack),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Normal => "normal",
            GameMode::TimeAttack => "time-attack",
        }
    }

    /// The other mode
    pub fn toggled(&self) -> Self {
        match self {
            GameMode::Normal => GameMode::TimeAttack,
            GameMode::TimeAttack => GameMode::Normal,
        }
    }
}

/// Stable identity of a tile within one engine instance.
///
/// Ids increase monotonically and are never reused by the engine that issued
/// them, so renderers can key persistent visual elements on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u32);

/// Core-side summary of one applied move.
///
/// Engine-internal; the adapter maps it to its protocol `last_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub direction: Direction,
    /// Whether any tile changed cell or merged
    pub moved: bool,
    /// Number of merges performed
    pub merges: u32,
    /// Score gained by this move
    pub reward: u64,
    /// Tile spawned after the move, if any
    pub spawned: Option<TileId>,
    /// Board is terminal after the move
    pub terminal: bool,
}

impl MoveOutcome {
    /// Outcome of a move that changed nothing
    pub fn rejected(direction: Direction, terminal: bool) -> Self {
        Self {
            direction,
            moved: false,
            merges: 0,
            reward: 0,
            spawned: None,
            terminal,
        }
    }
}
