use std::time::{Duration, Instant};

use anyhow::{ensure, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::info;

use crate::config::GameConfig;
use crate::engine::{Cell, GameEngine, GameStatus, TickOutcome};
use crate::snake::Direction::{self, *};
use crate::term::TermManager;

const SNAKE_BODY_CHAR: char = '█';
const FOOD_CHAR: char = 'O';
const DEAD_SNAKE_CHAR: char = 'X';

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Turn(Direction),
    Pause,
    Reset,
    Quit,
}

/// How a round ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    Again,
    Quit,
}

/// Terminal host around the engine: reads keys, drives the tick timer and
/// draws whatever the engine reports.
pub struct SnakeGame {
    engine: GameEngine,
    term: TermManager,
    tick_interval: Duration,
    paused: bool,
}

impl SnakeGame {
    pub fn new(config: GameConfig, term: TermManager) -> Result<Self> {
        let (max_w, max_h) = term.max_board();
        ensure!(config.width <= max_w && config.height <= max_h,
            "a {}x{} board does not fit in the terminal (max {}x{})",
            config.width, config.height, max_w, max_h);

        let engine = GameEngine::new(&config)?;
        Ok(SnakeGame { engine, term, tick_interval: config.tick_interval, paused: false })
    }

    pub fn initialize(&mut self) -> Result<()> {
        self.term.setup()
    }

    pub fn shutdown(&mut self) -> Result<()> {
        self.term.restore()
    }

    pub fn show_intro(&mut self) -> Result<Flow> {
        let lines = &[
            "Arrow keys or WASD to move",
            "Esc to pause, R to restart",
            "Q or CTRL+C to quit",
            "",
            "Press any key to begin"
        ];

        self.term.show_message(lines)?;

        if command_for_key(&self.term.read_key_blocking()?) == Some(Command::Quit) {
            return Ok(Flow::Quit);
        }

        self.term.hide_message()?;
        Ok(Flow::Again)
    }

    /// Plays one round from a fresh engine state until the snake dies, the
    /// board fills up or the player quits.
    pub fn play(&mut self) -> Result<Flow> {
        self.engine.reset();
        self.paused = false;
        self.redraw()?;

        let mut next_tick = Instant::now() + self.tick_interval;

        loop {
            let timeout = next_tick.saturating_duration_since(Instant::now());

            for key in self.term.read_keys(timeout)? {
                match command_for_key(&key) {
                    Some(Command::Quit) => return Ok(Flow::Quit),
                    Some(Command::Turn(dir)) if !self.paused => self.engine.queue_direction(dir),
                    Some(Command::Pause) => self.toggle_pause()?,
                    Some(Command::Reset) => {
                        self.engine.reset();
                        self.paused = false;
                        self.redraw()?;
                        next_tick = Instant::now() + self.tick_interval;
                    }
                    _ => {}
                }
            }

            if Instant::now() < next_tick {
                continue;
            }
            next_tick = next_deadline(next_tick, self.tick_interval, Instant::now());

            if self.paused { continue; }

            let outcome = self.engine.tick();
            self.print_update(&outcome)?;

            if self.engine.status() == GameStatus::Over {
                break;
            }
        }

        self.game_over()?;

        match command_for_key(&self.term.read_key_blocking()?) {
            Some(Command::Quit) => Ok(Flow::Quit),
            _ => Ok(Flow::Again),
        }
    }

    ///////////////////////////////////////////////////////////////////////////

    fn game_over(&mut self) -> Result<()> {
        let won = self.engine.is_board_full();
        let score = self.engine.score();
        info!("round finished, won: {}, score: {}", won, score);

        if !won {
            for &pos in self.engine.snake() {
                self.term.print_cell(pos, DEAD_SNAKE_CHAR)?;
            }
        }

        let s = if won {"You won!"} else {"Game over!"};
        self.term.show_message(&[
            s,
            &*format!("Score: {}", score),
            "",
            "Press any key to play again,",
            "or Q to quit."
        ])
    }

    /// Full repaint from a snapshot, used at round start and on reset.
    fn redraw(&mut self) -> Result<()> {
        self.engine.ensure_food();

        self.term.clear()?;
        self.term.draw_borders(self.engine.board())?;

        let head_ch = head_char(self.engine.current_direction());
        let snapshot = self.engine.snapshot();
        let head = snapshot.snake[0];

        for y in 0..snapshot.height {
            for x in 0..snapshot.width {
                let ch = match snapshot.cell_at((x, y)) {
                    Cell::Snake if (x, y) == head => head_ch,
                    Cell::Snake => SNAKE_BODY_CHAR,
                    Cell::Food => FOOD_CHAR,
                    Cell::Empty => ' ',
                };
                self.term.print_cell((x, y), ch)?;
            }
        }

        self.term.flush()
    }

    fn print_update(&mut self, outcome: &TickOutcome) -> Result<()> {
        if let TickOutcome::Moved { new_head, old_head, old_tail, ate } = *outcome {
            if let Some(old_tail_pos) = old_tail {
                self.term.print_cell(old_tail_pos, ' ')?;
            }
            self.term.print_cell(old_head, SNAKE_BODY_CHAR)?;
            self.term.print_cell(new_head, head_char(self.engine.current_direction()))?;

            if ate {
                if let Some(food) = self.engine.ensure_food() {
                    self.term.print_cell(food, FOOD_CHAR)?;
                }
            }

            self.term.flush()?;
        }

        Ok(())
    }

    fn toggle_pause(&mut self) -> Result<()> {
        if self.engine.status() == GameStatus::Over {
            return Ok(());
        }

        if !self.paused {
            self.term.show_message(&["Paused", "Press Esc to resume", "or Q to quit"])?;
        } else {
            self.term.hide_message()?;
        }

        self.paused = !self.paused;
        Ok(())
    }
}

/// After a stall, missed ticks are skipped rather than replayed back to back.
fn next_deadline(deadline: Instant, interval: Duration, now: Instant) -> Instant {
    let next = deadline + interval;
    if next <= now { now + interval } else { next }
}

fn head_char(direction: Direction) -> char {
    match direction {
        Up => '^',
        Down => 'v',
        Left => '<',
        Right => '>',
    }
}

/// Keys that mean nothing to the game map to `None` and are dropped.
pub fn command_for_key(ev: &KeyEvent) -> Option<Command> {
    if ev.code == KeyCode::Char('c') && ev.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Command::Quit);
    }

    match ev.code {
        KeyCode::Char('w') | KeyCode::Char('W') | KeyCode::Up => Some(Command::Turn(Up)),
        KeyCode::Char('a') | KeyCode::Char('A') | KeyCode::Left => Some(Command::Turn(Left)),
        KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Down => Some(Command::Turn(Down)),
        KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Right => Some(Command::Turn(Right)),
        KeyCode::Esc => Some(Command::Pause),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Command::Reset),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(Command::Quit),
        _ => None,
    }
}
