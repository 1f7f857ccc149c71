//! Integration tests for the game session and the key bindings driving it

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

use tui_2048::core::GameState;
use tui_2048::input::{should_quit, InputHandler};
use tui_2048::types::{Direction, GameAction, GameMode, TIME_ATTACK_MS, TICK_MS, UNDO_BUDGET};

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    }
}

/// Make one successful move, trying every direction.
fn any_move(state: &mut GameState) -> bool {
    Direction::ALL.iter().any(|d| state.try_move(*d))
}

#[test]
fn test_game_lifecycle() {
    let mut state = GameState::new(12345);
    assert!(!state.started());
    assert!(!state.apply_action(GameAction::MoveLeft));

    state.start();
    assert!(state.started());
    assert!(!state.game_over());
    assert_eq!(state.score(), 0);
    assert_eq!(state.board().tiles().len(), 2);
    assert_eq!(state.undo_remaining(), UNDO_BUDGET);
    assert_eq!(state.mode(), GameMode::Normal);
    assert_eq!(state.time_left_ms(), None);
}

#[test]
fn test_undo_once_per_game() {
    let mut state = GameState::new(99);
    state.start();
    assert!(!state.can_undo(), "nothing to undo before the first move");

    let before = state.board().to_rows();
    assert!(any_move(&mut state));
    assert!(state.apply_action(GameAction::Undo));
    assert_eq!(state.board().to_rows(), before);
    assert_eq!(state.undo_remaining(), 0);

    assert!(any_move(&mut state));
    assert!(!state.apply_action(GameAction::Undo), "budget is spent");

    state.apply_action(GameAction::Restart);
    assert_eq!(state.undo_remaining(), UNDO_BUDGET);
    assert!(!state.can_undo(), "undo does not reach into the previous game");
}

#[test]
fn test_undo_keeps_best_score() {
    let mut state = GameState::new(4);
    state.start();
    let mut moves = 0;
    while state.score() == 0 && moves < 500 {
        // Restart if stuck so the loop always makes progress.
        if !any_move(&mut state) {
            state.restart();
        }
        moves += 1;
    }
    assert!(state.score() > 0);
    let best = state.best_score();
    assert_eq!(best, state.score());

    assert!(state.undo());
    assert!(state.score() < best);
    assert_eq!(state.best_score(), best);
}

#[test]
fn test_best_score_survives_restart() {
    let mut state = GameState::new(8).with_best_score(500);
    state.start();
    assert_eq!(state.best_score(), 500);
    for _ in 0..50 {
        any_move(&mut state);
    }
    state.restart();
    assert_eq!(state.score(), 0);
    assert!(state.best_score() >= 500);
}

#[test]
fn test_play_until_game_over() {
    let mut state = GameState::new(2);
    state.start();
    let mut steps = 0;
    while !state.game_over() && steps < 100_000 {
        assert!(any_move(&mut state), "legal move must exist while playable");
        steps += 1;
    }
    assert!(state.game_over());
    assert_eq!(state.snapshot().legal_moves, [false; 4]);
    assert!(!state.undo(), "no undo once the game is over");
    assert!(state.best_score() >= state.score());
}

#[test]
fn test_time_attack_countdown() {
    let mut state = GameState::new(3);
    state.start();
    assert!(state.apply_action(GameAction::ToggleMode));
    assert_eq!(state.mode(), GameMode::TimeAttack);
    assert_eq!(state.time_left_ms(), Some(TIME_ATTACK_MS));

    let mut ticks = 0u32;
    while !state.tick(TICK_MS) {
        ticks += 1;
        assert!(ticks <= TIME_ATTACK_MS / TICK_MS + 1);
    }
    assert!(state.game_over());
    assert!(!any_move(&mut state));

    state.restart();
    assert_eq!(state.time_left_ms(), Some(TIME_ATTACK_MS));
    assert!(!state.game_over());

    state.select_mode(GameMode::Normal);
    assert_eq!(state.time_left_ms(), None);
    assert!(!state.tick(TIME_ATTACK_MS));
}

#[test]
fn test_keys_drive_the_session() {
    let mut state = GameState::new(77);
    state.start();
    let mut input = InputHandler::new();

    let mut moved = false;
    for code in [KeyCode::Left, KeyCode::Char('w'), KeyCode::Char('l'), KeyCode::Down] {
        // Let the settle window pass between presses.
        input.update(1_000);
        if let Some(action) = input.handle_key(press(code)) {
            moved |= state.apply_action(action);
        }
    }
    assert!(moved);
    assert!(state.move_count() >= 1);

    let restart = input.handle_key(press(KeyCode::Char('r')));
    assert_eq!(restart, Some(GameAction::Restart));
    state.apply_action(GameAction::Restart);
    assert_eq!(state.move_count(), 0);

    assert!(should_quit(press(KeyCode::Char('q'))));
    assert!(!should_quit(press(KeyCode::Char('u'))));
}
