use anyhow::Result;
use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::Coords;
use crate::config::{GameConfig, INITIAL_SNAKE_LENGTH};
use crate::snake::{Snake, Direction::{self, *}};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Running,
    Over,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Collision {
    Wall,
    Body,
}

/// What a single tick did, so a renderer can redraw only the touched cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The game was already over; nothing changed.
    Idle,
    Moved { new_head: Coords, old_head: Coords, old_tail: Option<Coords>, ate: bool },
    Crashed(Collision),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Snake,
    Food,
}

/// Read-only view of the engine for renderers.
#[derive(Clone, Debug)]
pub struct Snapshot<'a> {
    pub width: i32,
    pub height: i32,
    pub snake: &'a [Coords],
    pub food: Option<Coords>,
    pub score: u32,
    pub status: GameStatus,
}

impl Snapshot<'_> {
    pub fn cell_at(&self, pos: Coords) -> Cell {
        if self.snake.contains(&pos) {
            Cell::Snake
        } else if self.food == Some(pos) {
            Cell::Food
        } else {
            Cell::Empty
        }
    }
}

pub struct GameEngine {
    width: i32,
    height: i32,
    snake: Snake,
    pending: Option<Direction>,
    food: Option<Coords>,
    score: u32,
    status: GameStatus,
    rng: StdRng,
}

impl GameEngine {
    /// Fails if the board cannot hold the starting snake plus one food cell,
    /// which is what keeps `ensure_food` from ever spinning on a full board
    /// at game start.
    pub fn new(config: &GameConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut engine = GameEngine {
            width: config.width,
            height: config.height,
            snake: Self::starting_snake(config.width, config.height),
            pending: None,
            food: None,
            score: 0,
            status: GameStatus::Running,
            rng,
        };
        engine.reset();
        Ok(engine)
    }

    fn starting_snake(width: i32, height: i32) -> Snake {
        Snake::new((width / 2, height / 2), INITIAL_SNAKE_LENGTH, Right)
    }

    pub fn reset(&mut self) {
        self.snake = Self::starting_snake(self.width, self.height);
        self.pending = None;
        self.food = None;
        self.score = 0;
        self.status = GameStatus::Running;
        info!("new game on a {}x{} board", self.width, self.height);
    }

    /// Buffers a turn for the next tick. Only the latest press survives;
    /// whether it is a legal turn is decided when the tick applies it.
    pub fn queue_direction(&mut self, direction: Direction) {
        if self.status == GameStatus::Over {
            return;
        }
        self.pending = Some(direction);
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.status == GameStatus::Over {
            return TickOutcome::Idle;
        }

        let effective = self.snake.heading();
        let direction = match self.pending.take() {
            Some(wanted) if !wanted.is_opposite(effective) => {
                self.snake.set_direction(wanted);
                wanted
            }
            // A reversal is dropped rather than kept around for later.
            _ => effective,
        };

        let old_head = self.snake.head();
        let new_head = direction.step(old_head);

        // The tail still counts: it only moves out of the way after the head
        // has moved in.
        let collision = if !self.in_bounds(new_head) {
            Some(Collision::Wall)
        } else if self.snake.contains(new_head) {
            Some(Collision::Body)
        } else {
            None
        };

        if let Some(collision) = collision {
            self.status = GameStatus::Over;
            info!("game over ({:?} heading {}), score {}", collision, direction, self.score);
            return TickOutcome::Crashed(collision);
        }

        let ate = self.food == Some(new_head);
        let old_tail = self.snake.advance(new_head, ate);

        if ate {
            self.score += 1;
            self.food = None;
            if self.is_board_full() {
                self.status = GameStatus::Over;
                info!("board filled, score {}", self.score);
            }
        }

        TickOutcome::Moved { new_head, old_head, old_tail, ate }
    }

    /// Places food on a random free cell if there is none. Relies on the
    /// snake never covering the whole board while the game runs: once it does
    /// the game is over and no food is placed.
    pub fn ensure_food(&mut self) -> Option<Coords> {
        if self.food.is_some() || self.status == GameStatus::Over {
            return self.food;
        }

        if self.is_board_full() {
            self.status = GameStatus::Over;
            return None;
        }

        loop {
            let pos = (self.rng.gen_range(0..self.width), self.rng.gen_range(0..self.height));

            if !self.snake.contains(pos) {
                debug!("food placed at {:?}", pos);
                self.food = Some(pos);
                return self.food;
            }
        }
    }

    pub fn in_bounds(&self, pos: Coords) -> bool {
        pos.0 >= 0 && pos.1 >= 0 && pos.0 < self.width && pos.1 < self.height
    }

    pub fn is_board_full(&self) -> bool {
        self.snake.len() >= self.width as usize * self.height as usize
    }

    ///////////////////////////////////////////////////////////////////////////

    pub fn board(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn snake(&self) -> &[Coords] {
        self.snake.body()
    }

    pub fn food(&self) -> Option<Coords> {
        self.food
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn current_direction(&self) -> Direction {
        self.snake.heading()
    }

    pub fn pending_direction(&self) -> Option<Direction> {
        self.pending
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            width: self.width,
            height: self.height,
            snake: self.snake.body(),
            food: self.food,
            score: self.score,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn seeded(width: i32, height: i32, seed: u64) -> GameEngine {
        let config = GameConfig { seed: Some(seed), ..GameConfig::new(width, height) };
        GameEngine::new(&config).unwrap()
    }

    fn with_snake(engine: &mut GameEngine, body: Vec<Coords>, direction: Direction) {
        engine.snake = Snake::from_body(body, direction);
    }

    /// Boustrophedon walk over the board, used to fill it to a given length.
    fn serpentine(width: i32, height: i32, len: usize) -> Vec<Coords> {
        let mut cells = vec![];
        for y in 0..height {
            for i in 0..width {
                let x = if y % 2 == 0 { i } else { width - 1 - i };
                cells.push((x, y));
            }
        }
        cells.truncate(len);
        cells.reverse();
        cells
    }

    #[test]
    fn starts_with_canonical_snake() {
        let engine = seeded(10, 10, 1);
        assert_eq!(engine.snake(), &[(5, 5), (4, 5), (3, 5)]);
        assert_eq!(engine.current_direction(), Right);
        assert_eq!(engine.pending_direction(), None);
        assert_eq!(engine.food(), None);
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.status(), GameStatus::Running);
        assert_eq!(engine.board(), (10, 10));
    }

    #[test]
    fn rejects_board_too_small() {
        assert!(GameEngine::new(&GameConfig::new(3, 3)).is_err());
        assert!(GameEngine::new(&GameConfig::new(4, 0)).is_err());
    }

    #[test]
    fn eating_grows_and_scores() {
        let mut engine = seeded(10, 10, 1);
        engine.food = Some((6, 5));

        let outcome = engine.tick();

        assert_eq!(
            outcome,
            TickOutcome::Moved { new_head: (6, 5), old_head: (5, 5), old_tail: None, ate: true }
        );
        assert_eq!(engine.snake(), &[(6, 5), (5, 5), (4, 5), (3, 5)]);
        assert_eq!(engine.score(), 1);
        assert_eq!(engine.food(), None);
    }

    #[test]
    fn plain_move_keeps_length() {
        let mut engine = seeded(10, 10, 1);
        engine.food = Some((0, 0));

        let outcome = engine.tick();

        assert_eq!(
            outcome,
            TickOutcome::Moved { new_head: (6, 5), old_head: (5, 5), old_tail: Some((3, 5)), ate: false }
        );
        assert_eq!(engine.snake(), &[(6, 5), (5, 5), (4, 5)]);
        assert_eq!(engine.food(), Some((0, 0)));
    }

    #[test]
    fn reversal_is_ignored() {
        let mut engine = seeded(10, 10, 1);
        engine.food = Some((0, 0));

        engine.queue_direction(Left);
        engine.tick();

        assert_eq!(engine.snake()[0], (6, 5));
        assert_eq!(engine.current_direction(), Right);
        assert_eq!(engine.pending_direction(), None);
        assert_eq!(engine.status(), GameStatus::Running);
    }

    #[test]
    fn perpendicular_turns_apply() {
        let mut engine = seeded(10, 10, 1);
        engine.food = Some((0, 0));

        engine.queue_direction(Up);
        engine.tick();
        assert_eq!(engine.snake()[0], (5, 4));
        assert_eq!(engine.current_direction(), Up);

        engine.queue_direction(Right);
        engine.tick();
        assert_eq!(engine.snake()[0], (6, 4));

        engine.queue_direction(Down);
        engine.tick();
        assert_eq!(engine.snake()[0], (6, 5));
        assert_eq!(engine.current_direction(), Down);
    }

    #[test]
    fn last_press_before_tick_wins() {
        let mut engine = seeded(10, 10, 1);
        engine.food = Some((0, 0));

        engine.queue_direction(Up);
        engine.queue_direction(Down);
        assert_eq!(engine.pending_direction(), Some(Down));
        engine.tick();
        assert_eq!(engine.snake()[0], (5, 6));

        // A legal turn overwritten by a reversal is lost.
        engine.queue_direction(Left);
        engine.queue_direction(Up);
        engine.tick();
        assert_eq!(engine.snake()[0], (5, 7));
        assert_eq!(engine.current_direction(), Down);
    }

    #[test]
    fn heading_is_recomputed_from_body() {
        let mut engine = seeded(10, 10, 1);
        engine.food = Some((0, 0));
        // Stored direction disagrees with the body: the body wins, so Left
        // counts as a reversal of the actual Right heading.
        engine.snake.set_direction(Up);
        engine.queue_direction(Left);
        engine.tick();
        assert_eq!(engine.snake()[0], (6, 5));
    }

    #[test]
    fn wall_collision_leaves_snake_in_place() {
        let mut engine = seeded(10, 10, 1);
        engine.food = Some((0, 0));
        with_snake(&mut engine, vec![(9, 4)], Right);

        assert_eq!(engine.tick(), TickOutcome::Crashed(Collision::Wall));
        assert_eq!(engine.status(), GameStatus::Over);
        assert_eq!(engine.snake(), &[(9, 4)]);
    }

    #[test]
    fn walls_on_every_side() {
        for (head, direction) in [((0, 3), Left), ((3, 0), Up), ((3, 9), Down), ((9, 3), Right)] {
            let mut engine = seeded(10, 10, 1);
            engine.food = Some((5, 5));
            with_snake(&mut engine, vec![head], direction);
            assert_eq!(engine.tick(), TickOutcome::Crashed(Collision::Wall));
        }
    }

    #[test]
    fn self_collision_ends_game() {
        let mut engine = seeded(10, 10, 1);
        engine.food = Some((0, 0));
        with_snake(&mut engine, vec![(5, 5), (5, 6), (4, 6), (4, 5), (4, 4)], Up);
        let before = engine.snake().to_vec();

        engine.queue_direction(Left);

        assert_eq!(engine.tick(), TickOutcome::Crashed(Collision::Body));
        assert_eq!(engine.status(), GameStatus::Over);
        assert_eq!(engine.snake(), &before[..]);
        assert_eq!(engine.score(), 0);
    }

    #[test]
    fn tail_cell_still_blocks() {
        let mut engine = seeded(10, 10, 1);
        engine.food = Some((0, 0));
        with_snake(&mut engine, vec![(5, 5), (5, 6), (4, 6), (4, 5)], Up);

        engine.queue_direction(Left);

        assert_eq!(engine.tick(), TickOutcome::Crashed(Collision::Body));
    }

    #[test]
    fn game_over_ignores_input_and_ticks() {
        let mut engine = seeded(10, 10, 1);
        with_snake(&mut engine, vec![(9, 4)], Right);
        engine.food = Some((0, 0));
        engine.tick();
        assert_eq!(engine.status(), GameStatus::Over);

        engine.queue_direction(Up);
        assert_eq!(engine.pending_direction(), None);
        assert_eq!(engine.tick(), TickOutcome::Idle);
        assert_eq!(engine.snake(), &[(9, 4)]);
    }

    #[test]
    fn food_avoids_snake_at_every_occupancy() {
        let (width, height) = (4, 3);
        let area = (width * height) as usize;

        for len in 1..area {
            for seed in 0..20 {
                let mut engine = seeded(width, height, seed);
                let body = serpentine(width, height, len);
                with_snake(&mut engine, body.clone(), Right);

                let food = engine.ensure_food().unwrap();
                assert!(engine.in_bounds(food));
                assert!(!body.contains(&food), "food {:?} on snake of length {}", food, len);
            }
        }
    }

    #[test]
    fn ensure_food_keeps_existing_food() {
        let mut engine = seeded(10, 10, 3);
        let first = engine.ensure_food();
        assert!(first.is_some());
        assert_eq!(engine.ensure_food(), first);
    }

    #[test]
    fn tick_without_food_never_grows() {
        for seed in 0..3000 {
            let mut engine = seeded(10, 10, seed);
            assert_eq!(engine.food(), None);

            let outcome = engine.tick();

            assert!(matches!(outcome, TickOutcome::Moved { ate: false, .. }), "seed {}", seed);
            assert_eq!(engine.snake().len(), 3, "seed {}", seed);
            assert_eq!(engine.score(), 0, "seed {}", seed);
            assert_eq!(engine.food(), None);
        }
    }

    #[test]
    fn filling_the_board_ends_the_game() {
        let (width, height) = (4, 2);
        let mut engine = seeded(width, height, 5);
        // Seven cells taken; the last free cell is (0, 1), right below the head.
        let body = serpentine(width, height, 7);
        assert_eq!(body[0], (1, 1));
        with_snake(&mut engine, body, Left);
        assert_eq!(engine.ensure_food(), Some((0, 1)));

        let outcome = engine.tick();

        assert!(matches!(outcome, TickOutcome::Moved { ate: true, .. }));
        assert!(engine.is_board_full());
        assert_eq!(engine.status(), GameStatus::Over);
        assert_eq!(engine.ensure_food(), None);
    }

    #[test]
    fn reset_restores_start_from_any_state() {
        let mut engine = seeded(10, 10, 9);
        engine.food = Some((6, 5));
        engine.tick();
        engine.queue_direction(Up);
        with_snake(&mut engine, vec![(0, 0)], Left);
        engine.tick();
        assert_eq!(engine.status(), GameStatus::Over);

        engine.reset();
        engine.reset();

        assert_eq!(engine.snake(), &[(5, 5), (4, 5), (3, 5)]);
        assert_eq!(engine.current_direction(), Right);
        assert_eq!(engine.pending_direction(), None);
        assert_eq!(engine.food(), None);
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.status(), GameStatus::Running);
    }

    #[test]
    fn snapshot_classifies_cells() {
        let mut engine = seeded(10, 10, 1);
        engine.food = Some((0, 0));
        let snapshot = engine.snapshot();

        assert_eq!(snapshot.cell_at((5, 5)), Cell::Snake);
        assert_eq!(snapshot.cell_at((3, 5)), Cell::Snake);
        assert_eq!(snapshot.cell_at((0, 0)), Cell::Food);
        assert_eq!(snapshot.cell_at((9, 9)), Cell::Empty);
        assert_eq!((snapshot.width, snapshot.height), (10, 10));
        assert_eq!(snapshot.status, GameStatus::Running);
    }

    fn direction_strategy() -> impl Strategy<Value = Option<Direction>> {
        prop_oneof![
            Just(None),
            Just(Some(Up)),
            Just(Some(Down)),
            Just(Some(Left)),
            Just(Some(Right)),
        ]
    }

    proptest! {
        #[test]
        fn body_stays_valid_over_random_play(
            seed in any::<u64>(),
            inputs in prop::collection::vec(direction_strategy(), 1..300),
        ) {
            let mut engine = seeded(8, 6, seed);

            for input in inputs {
                if engine.status() == GameStatus::Over {
                    engine.reset();
                }
                if let Some(direction) = input {
                    engine.queue_direction(direction);
                }

                let food = engine.ensure_food();
                let before = engine.snake().to_vec();

                match engine.tick() {
                    TickOutcome::Moved { new_head, ate, .. } => {
                        prop_assert_eq!(ate, Some(new_head) == food);
                        let expected = if ate { before.len() + 1 } else { before.len() };
                        prop_assert_eq!(engine.snake().len(), expected);
                    }
                    TickOutcome::Crashed(_) => {
                        prop_assert_eq!(engine.snake(), &before[..]);
                    }
                    TickOutcome::Idle => prop_assert!(false, "running game did not tick"),
                }

                let body = engine.snake();
                let distinct: HashSet<_> = body.iter().collect();
                prop_assert_eq!(distinct.len(), body.len());
                for pos in body {
                    prop_assert!(engine.in_bounds(*pos));
                }
                for pair in body.windows(2) {
                    prop_assert!(Direction::between(pair[1], pair[0]).is_some());
                }
                if let Some(food) = engine.food() {
                    prop_assert!(!body.contains(&food));
                }
            }
        }
    }
}
