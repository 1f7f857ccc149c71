//! Keyboard diagnostic.
//!
//! Prints every key event with the action it maps to and plays it on a local
//! board, so key bindings can be checked without a renderer or an AI client.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event};
use crossterm::terminal;

use tui_2048::core::GameState;
use tui_2048::input::{should_quit, InputHandler};
use tui_2048::types::TICK_MS;
use tui_2048::GameConfig;

fn main() -> Result<()> {
    env_logger::init();

    terminal::enable_raw_mode()?;
    let result = run(GameConfig::from_env().game_state());
    let _ = terminal::disable_raw_mode();
    result
}

fn run(mut game: GameState) -> Result<()> {
    game.start();
    let mut out = io::stdout();
    let mut input = InputHandler::new();
    let tick = Duration::from_millis(TICK_MS as u64);
    let mut last_tick = Instant::now();

    write!(out, "arrows/wasd/hjkl move, u undo, r restart, t mode, q quit\r\n")?;
    print_board(&mut out, &game)?;

    loop {
        let timeout = tick.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if should_quit(key) {
                    return Ok(());
                }

                let action = input.handle_key(key);
                write!(out, "{:?} {:?} {:?} -> {:?}\r\n", key.code, key.modifiers, key.kind, action)?;
                if let Some(action) = action {
                    let changed = game.apply_action(action);
                    write!(out, "{} {}\r\n", action.as_str(), if changed { "applied" } else { "ignored" })?;
                    print_board(&mut out, &game)?;
                }
                out.flush()?;
            }
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick {
            last_tick = Instant::now();
            let elapsed_ms = elapsed.as_millis() as u32;
            input.update(elapsed_ms);
            if game.tick(elapsed_ms) {
                write!(out, "time is up\r\n")?;
                print_board(&mut out, &game)?;
                out.flush()?;
            }
        }
    }
}

fn print_board(out: &mut impl Write, game: &GameState) -> io::Result<()> {
    for row in game.board().to_rows() {
        for value in row {
            if value == 0 {
                write!(out, "{:>6}", ".")?;
            } else {
                write!(out, "{:>6}", value)?;
            }
        }
        write!(out, "\r\n")?;
    }
    write!(
        out,
        "score {} best {} undo {} mode {}{}{}\r\n",
        game.score(),
        game.best_score(),
        game.undo_remaining(),
        game.mode().as_str(),
        game.time_left_ms()
            .map(|ms| format!(" {}s left", ms / 1000))
            .unwrap_or_default(),
        if game.game_over() { " GAME OVER" } else { "" }
    )
}
