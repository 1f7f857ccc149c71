use arrayvec::ArrayVec;

use crate::types::{GameMode, MAX_CELLS, MAX_GRID_SIZE};

/// Value and position of one tile inside an undo [`Snapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SavedTile {
    pub(crate) value: u32,
    pub(crate) row: u8,
    pub(crate) col: u8,
}

/// Opaque undo token produced by [`Board::snapshot`](crate::Board::snapshot).
///
/// Only the board that produced it (and only during the same game) will
/// accept it back in [`Board::restore`](crate::Board::restore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub(crate) instance: u32,
    pub(crate) episode_id: u32,
    pub(crate) size: u8,
    pub(crate) tiles: ArrayVec<SavedTile, MAX_CELLS>,
    pub(crate) score: u64,
}

impl Snapshot {
    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Tile values as sorted `(row, col, value)` triples
    pub fn cells(&self) -> Vec<(u8, u8, u32)> {
        let mut cells: Vec<_> = self.tiles.iter().map(|t| (t.row, t.col, t.value)).collect();
        cells.sort_unstable();
        cells
    }
}

/// Observation of a game session for collaborators (renderers, adapters).
///
/// Plain `Copy` data; filling one never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameSnapshot {
    /// Row-major values, only the top-left `size` x `size` block is used
    pub board: [[u32; MAX_GRID_SIZE as usize]; MAX_GRID_SIZE as usize],
    /// FNV-1a over the used block of `board`
    pub board_hash: u64,
    pub size: u8,
    pub tile_count: u8,
    pub score: u64,
    pub best_score: u64,
    pub game_over: bool,
    pub mode: GameMode,
    pub undo_remaining: u8,
    pub time_left_ms: Option<u32>,
    pub legal_moves: [bool; 4],
    pub episode_id: u32,
    pub move_count: u32,
    pub seed: u32,
}

impl GameSnapshot {
    pub fn clear(&mut self) {
        self.board = [[0u32; MAX_GRID_SIZE as usize]; MAX_GRID_SIZE as usize];
        self.board_hash = board_hash(&self.board, 0);
        self.size = 0;
        self.tile_count = 0;
        self.score = 0;
        self.best_score = 0;
        self.game_over = false;
        self.mode = GameMode::Normal;
        self.undo_remaining = 0;
        self.time_left_ms = None;
        self.legal_moves = [false; 4];
        self.episode_id = 0;
        self.move_count = 0;
        self.seed = 0;
    }

    pub fn playable(&self) -> bool {
        !self.game_over
    }

    /// Largest tile on the board
    pub fn max_tile(&self) -> u32 {
        let n = self.size as usize;
        self.board[..n]
            .iter()
            .flat_map(|row| row[..n].iter().copied())
            .max()
            .unwrap_or(0)
    }
}

impl Default for GameSnapshot {
    fn default() -> Self {
        let mut s = Self {
            board: [[0u32; MAX_GRID_SIZE as usize]; MAX_GRID_SIZE as usize],
            board_hash: 0,
            size: 0,
            tile_count: 0,
            score: 0,
            best_score: 0,
            game_over: false,
            mode: GameMode::Normal,
            undo_remaining: 0,
            time_left_ms: None,
            legal_moves: [false; 4],
            episode_id: 0,
            move_count: 0,
            seed: 0,
        };
        s.clear();
        s
    }
}

/// FNV-1a 64-bit over the little-endian bytes of the used `size` x `size` block.
pub fn board_hash(board: &[[u32; MAX_GRID_SIZE as usize]; MAX_GRID_SIZE as usize], size: u8) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    let n = size as usize;
    let mut h = OFFSET_BASIS;
    for row in &board[..n] {
        for value in &row[..n] {
            for b in value.to_le_bytes() {
                h ^= b as u64;
                h = h.wrapping_mul(PRIME);
            }
        }
    }
    h
}
