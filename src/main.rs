//! Headless 2048 host (default binary).
//!
//! Runs one game session and serves it to AI clients over the TCP adapter.
//! The session is configured from `TWENTY48_*` and the adapter from
//! `TWENTY48_AI_*` environment variables.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use env_logger::Env;
use log::info;

use tui_2048::adapter::{Adapter, Session};
use tui_2048::types::TICK_MS;
use tui_2048::GameConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = GameConfig::from_env();
    info!(
        "starting {}x{} game in {} mode (seed {})",
        config.grid_size,
        config.grid_size,
        config.mode.as_str(),
        config.seed
    );

    let Some(mut adapter) = Adapter::start_from_env()? else {
        info!("nothing to serve, exiting");
        return Ok(());
    };

    run(&mut adapter, Session::new(config.game_state()))
}

fn run(adapter: &mut Adapter, mut session: Session) -> Result<()> {
    let tick_duration = Duration::from_millis(TICK_MS as u64);
    let mut last_tick = Instant::now();

    loop {
        while let Some(inbound) = adapter.try_recv() {
            for msg in session.handle(inbound) {
                adapter.send(msg);
            }
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_duration {
            last_tick = Instant::now();
            if let Some(msg) = session.tick(elapsed.as_millis() as u32) {
                info!(
                    "time attack over, score {} (best {})",
                    session.game().score(),
                    session.game().best_score()
                );
                adapter.send(msg);
            }
        } else {
            thread::sleep(tick_duration - elapsed);
        }
    }
}
