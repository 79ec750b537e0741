mod config;
mod engine;
mod game;
mod term;
mod snake;

use std::{fs::File, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use simplelog::WriteLogger;

use config::{GameConfig, DEFAULT_TICK_MS};
use game::{Flow, SnakeGame};
use term::TermManager;

pub type TermInt = u16;
pub type Coords = (i32, i32);

#[derive(Parser)]
#[command(name = "snake", version, about = "Snake in the terminal")]
struct Cli {
    /// Board width in cells (defaults to the terminal width)
    #[arg(long)]
    width: Option<i32>,

    /// Board height in cells (defaults to the terminal height)
    #[arg(long)]
    height: Option<i32>,

    /// Milliseconds between snake moves
    #[arg(long, default_value_t = DEFAULT_TICK_MS)]
    tick_ms: u64,

    /// Seed for food placement
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value = "snake.log")]
    log_file: PathBuf,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The terminal is the game screen, so logs go to a file.
    let log_file = File::create(&cli.log_file)
        .with_context(|| format!("creating log file {}", cli.log_file.display()))?;
    WriteLogger::init(cli.log_level, simplelog::Config::default(), log_file)
        .context("initializing logger")?;

    let term = TermManager::new()?;
    let (max_w, max_h) = term.max_board();
    let config = GameConfig {
        width: cli.width.unwrap_or(max_w),
        height: cli.height.unwrap_or(max_h),
        tick_interval: Duration::from_millis(cli.tick_ms),
        seed: cli.seed,
    };
    info!("starting with {:?}", config);

    let mut game = SnakeGame::new(config, term)?;
    // Restore the terminal even when setup fails halfway through.
    let res = game.initialize().and_then(|()| run(&mut game));
    game.shutdown()?;

    if let Err(e) = &res {
        error!("{:#}", e);
    }
    res
}

fn run(game: &mut SnakeGame) -> Result<()> {
    if game.show_intro()? == Flow::Quit {
        return Ok(());
    }

    // Each round resets the engine; the loop ends when the player quits.
    while game.play()? == Flow::Again {}

    info!("quitting");
    Ok(())
}
