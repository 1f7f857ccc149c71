//! Board module - the tile engine
//!
//! The board is an N x N grid (N = 4 for standard play) holding numbered tiles.
//! Tiles are value-typed records stored inline in an `ArrayVec`, each with a
//! stable [`TileId`] so callers can track persistent entities across moves.
//! Coordinates: (row, col) where row grows downwards and col grows to the right.
//!
//! A move is applied in two phases:
//!
//! 1. [`Board::plan`] walks the tiles against an immutable view of the current
//!    state and records where every tile ends up and which tile it merges into.
//! 2. [`Board::commit`] applies all position changes, value doublings and
//!    removals at once.
//!
//! After a successful move one tile is spawned and the terminal flag is
//! recomputed.

use arrayvec::ArrayVec;
use log::debug;

use crate::rng::SimpleRng;
use crate::snapshot::{SavedTile, Snapshot};
use crate::types::{
    Direction, MoveOutcome, TileId, DEFAULT_GRID_SIZE, INITIAL_TILES, MAX_CELLS, MAX_GRID_SIZE,
    MAX_TILE_VALUE, MIN_GRID_SIZE,
};

/// A numbered tile on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub id: TileId,
    /// Power of two, at least 2
    pub value: u32,
    pub row: u8,
    pub col: u8,
    /// Absorbed a merge during the last move
    pub merged: bool,
}

/// Result of sliding the tiles without spawning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlideResult {
    pub moved: bool,
    pub merges: u32,
    pub reward: u64,
}

/// Planned destination of one tile
#[derive(Debug, Clone, Copy)]
struct Step {
    row: u8,
    col: u8,
    /// Slot of the tile this one merges into
    merge_into: Option<usize>,
}

/// Phase-one output: per-slot destinations plus totals
#[derive(Debug, Clone)]
struct MovePlan {
    steps: ArrayVec<Step, MAX_CELLS>,
    moved: bool,
    merges: u32,
    reward: u64,
}

/// The game board - an N x N grid of tiles plus score and terminal state
#[derive(Debug, Clone)]
pub struct Board {
    size: u8,
    tiles: ArrayVec<Tile, MAX_CELLS>,
    score: u64,
    terminal: bool,
    next_id: u32,
    /// Increments on every new game; snapshots from older games are rejected
    episode_id: u32,
    /// Tag stamped on snapshots so tokens from other boards are rejected
    instance: u32,
    rng: SimpleRng,
}

impl Board {
    /// Create an empty standard-size board with the given RNG seed.
    ///
    /// Call [`Board::new_game`] to place the starting tiles.
    pub fn new(seed: u32) -> Self {
        let mut rng = SimpleRng::new(seed);
        let instance = rng.next_u32();
        Self {
            size: DEFAULT_GRID_SIZE,
            tiles: ArrayVec::new(),
            score: 0,
            terminal: false,
            next_id: 0,
            episode_id: 0,
            instance,
            rng,
        }
    }

    /// Build a board holding an exact position.
    ///
    /// `rows` is a square row-major grid where 0 marks an empty cell. Returns
    /// `None` for a non-square grid, a size outside the supported range, or a
    /// value that is not a power of two of at least 2. The terminal flag is
    /// computed from the position.
    pub fn from_rows(rows: &[&[u32]], seed: u32) -> Option<Self> {
        let size = u8::try_from(rows.len()).ok()?;
        if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&size) {
            return None;
        }

        let mut board = Self::new(seed);
        board.size = size;
        for (row, values) in rows.iter().enumerate() {
            if values.len() != size as usize {
                return None;
            }
            for (col, &value) in values.iter().enumerate() {
                if value == 0 {
                    continue;
                }
                if value < 2 || !value.is_power_of_two() {
                    return None;
                }
                board.push_tile(value, row as u8, col as u8);
            }
        }
        board.refresh_terminal();
        Some(board)
    }

    /// Start a new game on an `size` x `size` grid.
    ///
    /// Clears all tiles, resets score and terminal state, and spawns two
    /// tiles. Returns false (and changes nothing) if the size is unsupported.
    pub fn new_game(&mut self, size: u8) -> bool {
        if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&size) {
            return false;
        }

        self.size = size;
        self.tiles.clear();
        self.score = 0;
        self.terminal = false;
        self.episode_id = self.episode_id.wrapping_add(1);

        for _ in 0..INITIAL_TILES {
            self.spawn_tile();
        }
        self.refresh_terminal();

        debug!(
            "new game: episode {} on {}x{} grid",
            self.episode_id, size, size
        );
        true
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn episode_id(&self) -> u32 {
        self.episode_id
    }

    /// Current RNG state
    pub fn seed(&self) -> u32 {
        self.rng.seed()
    }

    /// Read-only view of the tiles (storage order, not grid order)
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Look up a tile by identity
    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id == id)
    }

    /// Calculate flat index from (row, col) coordinates
    #[inline(always)]
    fn index(&self, row: i8, col: i8) -> Option<usize> {
        let size = self.size as i8;
        if row < 0 || row >= size || col < 0 || col >= size {
            return None;
        }
        Some((row as usize) * (self.size as usize) + (col as usize))
    }

    /// Get cell at (row, col)
    /// Returns None if out of bounds, Some(None) if empty
    pub fn get(&self, row: i8, col: i8) -> Option<Option<u32>> {
        self.index(row, col)?;
        Some(
            self.tiles
                .iter()
                .find(|t| t.row as i8 == row && t.col as i8 == col)
                .map(|t| t.value),
        )
    }

    /// Tile value at (row, col), None if empty or out of bounds
    pub fn value_at(&self, row: u8, col: u8) -> Option<u32> {
        self.get(row as i8, col as i8).flatten()
    }

    /// Map of cell index -> tile slot
    fn occupancy(&self) -> [Option<u8>; MAX_CELLS] {
        let mut grid = [None; MAX_CELLS];
        for (slot, tile) in self.tiles.iter().enumerate() {
            grid[tile.row as usize * self.size as usize + tile.col as usize] = Some(slot as u8);
        }
        grid
    }

    /// Row-major cell values (0 = empty), `size` cells per row
    pub fn values(&self) -> [u32; MAX_CELLS] {
        let mut cells = [0u32; MAX_CELLS];
        for tile in &self.tiles {
            cells[tile.row as usize * self.size as usize + tile.col as usize] = tile.value;
        }
        cells
    }

    /// Cell values as nested rows (0 = empty)
    pub fn to_rows(&self) -> Vec<Vec<u32>> {
        let size = self.size as usize;
        let cells = self.values();
        (0..size)
            .map(|row| cells[row * size..(row + 1) * size].to_vec())
            .collect()
    }

    /// Number of empty cells
    pub fn empty_cells(&self) -> usize {
        (self.size as usize * self.size as usize).saturating_sub(self.tiles.len())
    }

    /// Whether any move is possible: an empty cell or two adjacent equal tiles
    /// below [`MAX_TILE_VALUE`]
    pub fn has_moves(&self) -> bool {
        if self.empty_cells() > 0 {
            return true;
        }

        let size = self.size as usize;
        let cells = self.values();
        for row in 0..size {
            for col in 0..size {
                let v = cells[row * size + col];
                if v == MAX_TILE_VALUE {
                    continue;
                }
                if col + 1 < size && cells[row * size + col + 1] == v {
                    return true;
                }
                if row + 1 < size && cells[(row + 1) * size + col] == v {
                    return true;
                }
            }
        }
        false
    }

    /// Which directions would change the board, indexed like [`Direction::ALL`]
    pub fn legal_moves(&self) -> [bool; 4] {
        if self.terminal {
            return [false; 4];
        }
        Direction::ALL.map(|dir| self.plan(dir).moved)
    }

    fn refresh_terminal(&mut self) {
        self.terminal = !self.has_moves();
    }

    /// Force the board into the terminal state (e.g. when a countdown expires)
    pub fn force_terminal(&mut self) {
        if !self.terminal {
            debug!("episode {} forced terminal", self.episode_id);
        }
        self.terminal = true;
    }

    fn push_tile(&mut self, value: u32, row: u8, col: u8) -> TileId {
        let id = TileId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.tiles.push(Tile {
            id,
            value,
            row,
            col,
            merged: false,
        });
        id
    }

    /// Spawn one tile in a uniformly chosen empty cell.
    ///
    /// Value is 2 with probability 0.9 and 4 with probability 0.1. Returns
    /// None without drawing from the RNG when the board is full.
    pub fn spawn_tile(&mut self) -> Option<TileId> {
        let grid = self.occupancy();
        let size = self.size;
        let empty: ArrayVec<(u8, u8), MAX_CELLS> = (0..size)
            .flat_map(|row| (0..size).map(move |col| (row, col)))
            .filter(|&(row, col)| grid[row as usize * size as usize + col as usize].is_none())
            .collect();

        if empty.is_empty() {
            return None;
        }

        let (row, col) = empty[self.rng.next_range(empty.len() as u32) as usize];
        let value = self.rng.spawn_value();
        Some(self.push_tile(value, row, col))
    }

    /// Phase one: decide every tile's destination against the current state.
    ///
    /// Tiles nearest the destination edge are processed first so no tile jumps
    /// over one that has not moved yet. A tile stops at the first occupied
    /// cell; it merges into that tile only if the values match and the blocker
    /// has not already absorbed a merge during this move.
    fn plan(&self, direction: Direction) -> MovePlan {
        let last = self.size - 1;
        let mut order: ArrayVec<usize, MAX_CELLS> = (0..self.tiles.len()).collect();
        order.sort_by_key(|&slot| {
            let tile = &self.tiles[slot];
            match direction {
                Direction::Right => last - tile.col,
                Direction::Left => tile.col,
                Direction::Down => last - tile.row,
                Direction::Up => tile.row,
            }
        });

        let mut grid = self.occupancy();
        let mut absorbed = [false; MAX_CELLS];
        let mut plan = MovePlan {
            steps: self
                .tiles
                .iter()
                .map(|t| Step {
                    row: t.row,
                    col: t.col,
                    merge_into: None,
                })
                .collect(),
            moved: false,
            merges: 0,
            reward: 0,
        };

        let (d_row, d_col) = direction.delta();
        for &slot in &order {
            let tile = self.tiles[slot];
            let origin = tile.row as usize * self.size as usize + tile.col as usize;
            let (mut row, mut col) = (tile.row as i8, tile.col as i8);

            let blocker = loop {
                match self.index(row + d_row, col + d_col) {
                    None => break None,
                    Some(next) => match grid[next] {
                        Some(other) => break Some(other as usize),
                        None => {
                            row += d_row;
                            col += d_col;
                        }
                    },
                }
            };

            if let Some(other) = blocker {
                if self.tiles[other].value == tile.value
                    && tile.value < MAX_TILE_VALUE
                    && !absorbed[other]
                {
                    absorbed[other] = true;
                    grid[origin] = None;
                    let target = plan.steps[other];
                    plan.steps[slot] = Step {
                        row: target.row,
                        col: target.col,
                        merge_into: Some(other),
                    };
                    plan.moved = true;
                    plan.merges += 1;
                    plan.reward += u64::from(tile.value) * 2;
                    continue;
                }
            }

            if row != tile.row as i8 || col != tile.col as i8 {
                grid[origin] = None;
                grid[row as usize * self.size as usize + col as usize] = Some(slot as u8);
                plan.steps[slot].row = row as u8;
                plan.steps[slot].col = col as u8;
                plan.moved = true;
            }
        }

        plan
    }

    /// Phase two: apply a plan atomically.
    fn commit(&mut self, plan: &MovePlan) {
        for tile in self.tiles.iter_mut() {
            tile.merged = false;
        }

        for (slot, step) in plan.steps.iter().enumerate() {
            self.tiles[slot].row = step.row;
            self.tiles[slot].col = step.col;
            if let Some(target) = step.merge_into {
                self.tiles[target].value *= 2;
                self.tiles[target].merged = true;
            }
        }

        self.tiles = self
            .tiles
            .iter()
            .zip(plan.steps.iter())
            .filter(|(_, step)| step.merge_into.is_none())
            .map(|(tile, _)| *tile)
            .collect();

        self.score += plan.reward;
    }

    /// Slide and merge tiles without spawning.
    ///
    /// A move that changes nothing (or any move on a terminal board) leaves the
    /// board untouched, including the merge flags of the previous move.
    pub fn slide(&mut self, direction: Direction) -> SlideResult {
        if self.terminal {
            return SlideResult::default();
        }

        let plan = self.plan(direction);
        if !plan.moved {
            return SlideResult::default();
        }

        self.commit(&plan);
        SlideResult {
            moved: true,
            merges: plan.merges,
            reward: plan.reward,
        }
    }

    /// Apply a full move: slide, spawn one tile, recompute terminal state.
    pub fn step(&mut self, direction: Direction) -> MoveOutcome {
        let slid = self.slide(direction);
        if !slid.moved {
            return MoveOutcome::rejected(direction, self.terminal);
        }

        let spawned = self.spawn_tile();
        self.refresh_terminal();
        if self.terminal {
            debug!(
                "episode {} reached terminal state with score {}",
                self.episode_id, self.score
            );
        }

        MoveOutcome {
            direction,
            moved: true,
            merges: slid.merges,
            reward: slid.reward,
            spawned,
            terminal: self.terminal,
        }
    }

    /// Apply a full move, returning whether anything moved or merged
    pub fn apply_move(&mut self, direction: Direction) -> bool {
        self.step(direction).moved
    }

    /// Capture tile values/positions and score for a later [`Board::restore`]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            instance: self.instance,
            episode_id: self.episode_id,
            size: self.size,
            tiles: self
                .tiles
                .iter()
                .map(|t| SavedTile {
                    value: t.value,
                    row: t.row,
                    col: t.col,
                })
                .collect(),
            score: self.score,
        }
    }

    /// Replace tiles and score with a snapshot taken earlier in this game.
    ///
    /// Restored tiles receive fresh ids. Returns false (and changes nothing)
    /// for a snapshot from another board or another game, or when the board
    /// is terminal.
    pub fn restore(&mut self, snapshot: &Snapshot) -> bool {
        if self.terminal
            || snapshot.instance != self.instance
            || snapshot.episode_id != self.episode_id
            || snapshot.size != self.size
        {
            return false;
        }

        self.tiles.clear();
        for saved in &snapshot.tiles {
            self.push_tile(saved.value, saved.row, saved.col);
        }
        self.score = snapshot.score;
        debug!(
            "episode {} restored {} tiles, score {}",
            self.episode_id,
            self.tiles.len(),
            self.score
        );
        true
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(1)
    }
}
