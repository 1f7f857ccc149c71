//! Game configuration from `TWENTY48_*` environment variables.

use std::env;
use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;

use crate::core::GameState;
use crate::types::{GameMode, DEFAULT_GRID_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameConfig {
    pub grid_size: u8,
    pub seed: u32,
    pub mode: GameMode,
    pub best_score: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            seed: clock_seed(),
            mode: GameMode::Normal,
            best_score: 0,
        }
    }
}

impl GameConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; invalid values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("TWENTY48_GRID_SIZE") {
            match v.trim().parse() {
                Ok(n) => config.grid_size = n,
                Err(_) => warn!("ignoring invalid TWENTY48_GRID_SIZE={:?}", v),
            }
        }
        if let Some(v) = lookup("TWENTY48_SEED") {
            match v.trim().parse() {
                Ok(n) => config.seed = n,
                Err(_) => warn!("ignoring invalid TWENTY48_SEED={:?}", v),
            }
        }
        if let Some(v) = lookup("TWENTY48_MODE") {
            match GameMode::from_str(v.trim()) {
                Some(mode) => config.mode = mode,
                None => warn!("ignoring unknown TWENTY48_MODE={:?}", v),
            }
        }
        if let Some(v) = lookup("TWENTY48_BEST_SCORE") {
            match v.trim().parse() {
                Ok(n) => config.best_score = n,
                Err(_) => warn!("ignoring invalid TWENTY48_BEST_SCORE={:?}", v),
            }
        }

        config
    }

    /// A session that has not been started yet
    pub fn game_state(&self) -> GameState {
        GameState::new(self.seed)
            .with_grid_size(self.grid_size)
            .with_mode(self.mode)
            .with_best_score(self.best_score)
    }
}

fn clock_seed() -> u32 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(1);
    (nanos as u32) ^ ((nanos >> 32) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_all_keys() {
        let config = GameConfig::from_lookup(lookup(&[
            ("TWENTY48_GRID_SIZE", "5"),
            ("TWENTY48_SEED", "99"),
            ("TWENTY48_MODE", "time-attack"),
            ("TWENTY48_BEST_SCORE", " 2048 "),
        ]));
        assert_eq!(config.grid_size, 5);
        assert_eq!(config.seed, 99);
        assert_eq!(config.mode, GameMode::TimeAttack);
        assert_eq!(config.best_score, 2048);

        let mut gs = config.game_state();
        gs.start();
        assert_eq!(gs.board().size(), 5);
        assert_eq!(gs.best_score(), 2048);
        assert_eq!(gs.time_left_ms(), Some(crate::types::TIME_ATTACK_MS));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = GameConfig::from_lookup(lookup(&[
            ("TWENTY48_GRID_SIZE", "big"),
            ("TWENTY48_MODE", "zen"),
            ("TWENTY48_BEST_SCORE", "-1"),
        ]));
        assert_eq!(config.grid_size, DEFAULT_GRID_SIZE);
        assert_eq!(config.mode, GameMode::Normal);
        assert_eq!(config.best_score, 0);
    }

    #[test]
    fn unsupported_grid_size_uses_standard_grid() {
        let config = GameConfig::from_lookup(lookup(&[("TWENTY48_GRID_SIZE", "12")]));
        let mut gs = config.game_state();
        gs.start();
        assert_eq!(gs.board().size(), DEFAULT_GRID_SIZE);
    }
}
