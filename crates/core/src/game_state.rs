//! Game state module - one play session on top of the board engine
//!
//! The board knows the rules; the session adds the policies around them:
//! the single-step undo slot and its per-game budget, the best score, the
//! selected mode and the time-attack countdown. Everything is owned here,
//! there is no process-wide state.

use log::{debug, warn};

use crate::{Board, GameSnapshot, Snapshot};
use crate::snapshot::board_hash;
use crate::types::*;

/// Complete session state
#[derive(Debug, Clone)]
pub struct GameState {
    board: Board,
    size: u8,
    mode: GameMode,
    /// State before the last successful move
    undo: Option<Snapshot>,
    undo_remaining: u8,
    best_score: u64,
    /// Countdown, only meaningful in time-attack mode
    time_left_ms: u32,
    /// Successful moves in the current game
    move_count: u32,
    /// Last applied move (consumed by observers)
    last_event: Option<MoveOutcome>,
    started: bool,
}

impl GameState {
    /// Create a session on the standard grid with the given RNG seed
    pub fn new(seed: u32) -> Self {
        Self {
            board: Board::new(seed),
            size: DEFAULT_GRID_SIZE,
            mode: GameMode::Normal,
            undo: None,
            undo_remaining: UNDO_BUDGET,
            best_score: 0,
            time_left_ms: 0,
            move_count: 0,
            last_event: None,
            started: false,
        }
    }

    /// Use a different grid size for the games of this session.
    ///
    /// Unsupported sizes fall back to the standard grid.
    pub fn with_grid_size(mut self, size: u8) -> Self {
        if (MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&size) {
            self.size = size;
        } else {
            warn!(
                "grid size {} outside {}..={}, using {}",
                size, MIN_GRID_SIZE, MAX_GRID_SIZE, DEFAULT_GRID_SIZE
            );
            self.size = DEFAULT_GRID_SIZE;
        }
        self
    }

    /// Seed the best score, e.g. from a value a collaborator persisted
    pub fn with_best_score(mut self, best_score: u64) -> Self {
        self.best_score = best_score;
        self
    }

    pub fn with_mode(mut self, mode: GameMode) -> Self {
        self.mode = mode;
        self
    }

    /// Start the first game
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.restart();
    }

    /// Discard the current game and start a new one in the current mode
    pub fn restart(&mut self) {
        self.started = true;
        if !self.board.new_game(self.size) {
            warn!("board rejected grid size {}", self.size);
        }
        self.undo = None;
        self.undo_remaining = UNDO_BUDGET;
        self.move_count = 0;
        self.last_event = None;
        self.time_left_ms = match self.mode {
            GameMode::Normal => 0,
            GameMode::TimeAttack => TIME_ATTACK_MS,
        };
    }

    /// Switch mode and start a new game
    pub fn select_mode(&mut self, mode: GameMode) {
        debug!("mode {} selected", mode.as_str());
        self.mode = mode;
        self.restart();
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn game_over(&self) -> bool {
        self.board.is_terminal()
    }

    pub fn score(&self) -> u64 {
        self.board.score()
    }

    pub fn best_score(&self) -> u64 {
        self.best_score
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn undo_remaining(&self) -> u8 {
        self.undo_remaining
    }

    /// Whether [`GameState::undo`] would currently succeed
    pub fn can_undo(&self) -> bool {
        self.started && !self.game_over() && self.undo_remaining > 0 && self.undo.is_some()
    }

    /// Remaining countdown in time-attack mode
    pub fn time_left_ms(&self) -> Option<u32> {
        match self.mode {
            GameMode::Normal => None,
            GameMode::TimeAttack => Some(self.time_left_ms),
        }
    }

    pub fn episode_id(&self) -> u32 {
        self.board.episode_id()
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    #[cfg(test)]
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Take and clear the last applied move.
    pub fn take_last_event(&mut self) -> Option<MoveOutcome> {
        self.last_event.take()
    }

    pub fn snapshot_into(&self, out: &mut GameSnapshot) {
        out.clear();
        for tile in self.board.tiles() {
            out.board[tile.row as usize][tile.col as usize] = tile.value;
        }
        out.size = self.board.size();
        out.board_hash = board_hash(&out.board, out.size);
        out.tile_count = self.board.tiles().len() as u8;
        out.score = self.board.score();
        out.best_score = self.best_score;
        out.game_over = self.game_over();
        out.mode = self.mode;
        out.undo_remaining = self.undo_remaining;
        out.time_left_ms = self.time_left_ms();
        out.legal_moves = self.board.legal_moves();
        out.episode_id = self.board.episode_id();
        out.move_count = self.move_count;
        out.seed = self.board.seed();
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let mut s = GameSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }

    /// Apply a move, keeping the pre-move state in the undo slot.
    ///
    /// The slot is only overwritten when the move actually changed the board.
    pub fn try_move(&mut self, direction: Direction) -> bool {
        if !self.started || self.game_over() {
            return false;
        }

        let before = self.board.snapshot();
        let outcome = self.board.step(direction);
        if !outcome.moved {
            return false;
        }

        self.undo = Some(before);
        self.move_count = self.move_count.wrapping_add(1);
        self.last_event = Some(outcome);
        self.update_best_score();
        true
    }

    /// Restore the state before the last successful move.
    ///
    /// Fails once the game is over, when the per-game budget is spent, or
    /// when no move has been made since the last undo.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        let Some(snapshot) = self.undo.take() else {
            return false;
        };

        if !self.board.restore(&snapshot) {
            return false;
        }
        self.undo_remaining -= 1;
        self.last_event = None;
        debug!(
            "undo applied, {} remaining this game",
            self.undo_remaining
        );
        true
    }

    /// Advance the time-attack countdown.
    ///
    /// Returns true when the countdown expired during this call, which forces
    /// the board terminal. Does nothing in normal mode or after game over.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if !self.started || self.mode != GameMode::TimeAttack || self.game_over() {
            return false;
        }

        self.time_left_ms = self.time_left_ms.saturating_sub(elapsed_ms);
        if self.time_left_ms == 0 {
            self.board.force_terminal();
            self.update_best_score();
            debug!("time attack expired with score {}", self.board.score());
            return true;
        }
        false
    }

    /// Force the current game over (external deadline)
    pub fn force_game_over(&mut self) {
        self.board.force_terminal();
        self.update_best_score();
    }

    fn update_best_score(&mut self) {
        if self.board.score() > self.best_score {
            self.best_score = self.board.score();
        }
    }

    /// Apply a game action
    pub fn apply_action(&mut self, action: GameAction) -> bool {
        match action {
            GameAction::MoveUp
            | GameAction::MoveDown
            | GameAction::MoveLeft
            | GameAction::MoveRight => match action.direction() {
                Some(dir) => self.try_move(dir),
                None => false,
            },
            GameAction::Undo => self.undo(),
            GameAction::Restart => {
                self.restart();
                true
            }
            GameAction::ToggleMode => {
                self.select_mode(self.mode.toggled());
                true
            }
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(seed: u32) -> GameState {
        let mut state = GameState::new(seed);
        state.start();
        state
    }

    /// Play any legal move, returning false if none exists
    fn play_any(state: &mut GameState) -> bool {
        Direction::ALL.iter().any(|&dir| state.try_move(dir))
    }

    #[test]
    fn test_default_game_state() {
        let state = GameState::default();
        assert!(!state.started());
        assert_eq!(state.score(), 0);
        assert!(state.board().tiles().is_empty());
    }

    #[test]
    fn test_start_places_two_tiles() {
        let state = started(12345);
        assert!(state.started());
        assert_eq!(state.board().tiles().len(), 2);
        assert!(!state.game_over());
        assert_eq!(state.undo_remaining(), UNDO_BUDGET);
        assert!(!state.can_undo());
    }

    #[test]
    fn test_moves_before_start_are_ignored() {
        let mut state = GameState::new(1);
        for dir in Direction::ALL {
            assert!(!state.try_move(dir));
        }
    }

    #[test]
    fn test_undo_restores_previous_position() {
        let mut state = started(7);
        let rows = state.board().to_rows();
        let score = state.score();

        assert!(play_any(&mut state));
        assert!(state.can_undo());
        assert!(state.undo());

        assert_eq!(state.board().to_rows(), rows);
        assert_eq!(state.score(), score);
        assert_eq!(state.undo_remaining(), 0);
    }

    #[test]
    fn test_undo_budget_is_one_per_game() {
        let mut state = started(7);
        assert!(play_any(&mut state));
        assert!(state.undo());
        assert!(play_any(&mut state));
        assert!(!state.undo());

        state.restart();
        assert!(play_any(&mut state));
        assert!(state.undo());
    }

    #[test]
    fn test_noop_move_keeps_undo_slot() {
        let mut state = GameState::new(3);
        state.start();
        assert!(play_any(&mut state));
        let rows_before_noop = state.board().to_rows();

        // Find a direction that does nothing, if any, and apply it.
        let legal = state.board().legal_moves();
        if let Some(dir) = Direction::ALL.iter().find(|d| !legal[d.index()]) {
            assert!(!state.try_move(*dir));
            assert_eq!(state.board().to_rows(), rows_before_noop);
        }
        assert!(state.can_undo());
    }

    #[test]
    fn test_undo_refused_after_game_over() {
        let mut state = started(5);
        assert!(play_any(&mut state));
        state.force_game_over();
        assert!(state.game_over());
        assert!(!state.undo());
        for dir in Direction::ALL {
            assert!(!state.try_move(dir));
        }
    }

    #[test]
    fn test_best_score_tracks_maximum_across_restarts() {
        let mut state = started(11);
        let mut guard = 0;
        while state.score() == 0 && guard < 500 {
            if !play_any(&mut state) {
                state.restart();
            }
            guard += 1;
        }
        let best = state.best_score();
        assert!(best > 0);
        assert_eq!(best, state.score());

        state.restart();
        assert_eq!(state.score(), 0);
        assert_eq!(state.best_score(), best);
    }

    #[test]
    fn test_best_score_seed() {
        let state = GameState::new(1).with_best_score(4096);
        assert_eq!(state.best_score(), 4096);
    }

    #[test]
    fn test_time_attack_countdown_forces_game_over() {
        let mut state = GameState::new(9).with_mode(GameMode::TimeAttack);
        state.start();
        assert_eq!(state.time_left_ms(), Some(TIME_ATTACK_MS));

        assert!(!state.tick(TIME_ATTACK_MS - 1));
        assert!(!state.game_over());
        assert!(state.tick(1));
        assert!(state.game_over());
        assert!(!state.tick(1));
    }

    #[test]
    fn test_normal_mode_ignores_ticks() {
        let mut state = started(9);
        assert_eq!(state.time_left_ms(), None);
        assert!(!state.tick(TIME_ATTACK_MS * 2));
        assert!(!state.game_over());
    }

    #[test]
    fn test_toggle_mode_starts_new_game() {
        let mut state = started(9);
        let episode = state.episode_id();
        assert!(play_any(&mut state));

        assert!(state.apply_action(GameAction::ToggleMode));
        assert_eq!(state.mode(), GameMode::TimeAttack);
        assert_eq!(state.episode_id(), episode + 1);
        assert_eq!(state.move_count(), 0);
        assert_eq!(state.time_left_ms(), Some(TIME_ATTACK_MS));
    }

    #[test]
    fn test_apply_action_restart() {
        let mut state = started(12345);
        for _ in 0..10 {
            play_any(&mut state);
        }

        assert!(state.apply_action(GameAction::Restart));
        assert!(!state.game_over());
        assert_eq!(state.score(), 0);
        assert_eq!(state.board().tiles().len(), 2);
        assert_eq!(state.undo_remaining(), UNDO_BUDGET);
    }

    #[test]
    fn test_last_event_reports_move() {
        let mut state = started(2);
        assert!(state.take_last_event().is_none());
        assert!(play_any(&mut state));
        let event = state.take_last_event().expect("move event");
        assert!(event.moved);
        assert!(event.spawned.is_some());
        assert!(state.take_last_event().is_none());
    }

    #[test]
    fn test_snapshot_reflects_board() {
        let mut state = started(4);
        let snap = state.snapshot();
        assert_eq!(snap.size, 4);
        assert_eq!(snap.tile_count, 2);
        for tile in state.board().tiles() {
            assert_eq!(snap.board[tile.row as usize][tile.col as usize], tile.value);
        }
        assert_eq!(snap.legal_moves, state.board().legal_moves());

        state.board_mut().force_terminal();
        assert!(state.snapshot().game_over);
    }

    #[test]
    fn test_grid_size_fallback() {
        let mut state = GameState::new(1).with_grid_size(1);
        state.start();
        assert_eq!(state.board().size(), DEFAULT_GRID_SIZE);

        let mut state = GameState::new(1).with_grid_size(6);
        state.start();
        assert_eq!(state.board().size(), 6);
    }

    #[test]
    fn test_restart_always_deals_a_fresh_game() {
        for size in MIN_GRID_SIZE..=MAX_GRID_SIZE {
            let mut state = GameState::new(size as u32).with_grid_size(size);
            state.start();
            state.board_mut().force_terminal();
            state.restart();
            assert_eq!(state.board().size(), size);
            assert_eq!(state.board().tiles().len(), INITIAL_TILES);
            assert!(!state.game_over());
        }
    }
}
