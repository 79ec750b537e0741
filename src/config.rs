use std::time::Duration;

use anyhow::{ensure, Result};

pub const INITIAL_SNAKE_LENGTH: usize = 3;
pub const DEFAULT_TICK_MS: u64 = 200;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameConfig {
    pub width: i32,
    pub height: i32,
    pub tick_interval: Duration,
    /// Fixed seed for food placement; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            width: 20,
            height: 20,
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn new(width: i32, height: i32) -> Self {
        GameConfig { width, height, ..Default::default() }
    }

    pub fn area(&self) -> usize {
        self.width.max(0) as usize * self.height.max(0) as usize
    }

    /// The starting snake sits at the board centre with its body trailing to
    /// the left, so it needs `INITIAL_SNAKE_LENGTH - 1` columns left of
    /// centre, plus at least one free cell for food.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.width > 0 && self.height > 0,
            "board must be at least 1x1, got {}x{}", self.width, self.height);
        ensure!(self.width / 2 >= INITIAL_SNAKE_LENGTH as i32 - 1,
            "board width {} is too narrow for a snake of length {}", self.width, INITIAL_SNAKE_LENGTH);
        ensure!(self.area() > INITIAL_SNAKE_LENGTH,
            "board area {} leaves no room for food", self.area());
        ensure!(!self.tick_interval.is_zero(), "tick interval must be non-zero");
        Ok(())
    }
}
