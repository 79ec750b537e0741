use std::{fmt, str::FromStr};

use anyhow::bail;

use crate::Coords;
use Direction::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Up => (0, -1),
            Down => (0, 1),
            Left => (-1, 0),
            Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Up => Down,
            Down => Up,
            Left => Right,
            Right => Left,
        }
    }

    /// Only Up/Down and Left/Right are reversals; a perpendicular turn or the
    /// same direction is fine.
    pub fn is_opposite(self, other: Direction) -> bool {
        self.opposite() == other
    }

    /// Direction of a single orthogonal step from `from` to `to`, if it is one.
    pub fn between(from: Coords, to: Coords) -> Option<Direction> {
        match (to.0 - from.0, to.1 - from.1) {
            (0, -1) => Some(Up),
            (0, 1) => Some(Down),
            (-1, 0) => Some(Left),
            (1, 0) => Some(Right),
            _ => None,
        }
    }

    pub fn step(self, pos: Coords) -> Coords {
        let (dx, dy) = self.delta();
        (pos.0 + dx, pos.1 + dy)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Up => "up",
            Down => "down",
            Left => "left",
            Right => "right",
        };
        f.write_str(s)
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Up),
            "down" => Ok(Down),
            "left" => Ok(Left),
            "right" => Ok(Right),
            other => bail!("unknown direction {:?}", other),
        }
    }
}

/// Snake body, head first. `direction` is the fallback heading used when the
/// body is too short to infer one from the head and neck.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snake {
    body: Vec<Coords>,
    direction: Direction,
}

impl Snake {
    /// Builds a straight snake with `head` at the front and the rest of the
    /// body trailing behind it, opposite to `direction`.
    pub fn new(head: Coords, size: usize, direction: Direction) -> Self {
        let back = direction.opposite();
        let mut body = Vec::with_capacity(size.max(1));
        body.push(head);

        for _ in 1..size {
            let last = body[body.len() - 1];
            body.push(back.step(last));
        }

        Snake { body, direction }
    }

    #[cfg(test)]
    pub fn from_body(body: Vec<Coords>, direction: Direction) -> Self {
        assert!(!body.is_empty(), "a snake needs at least one segment");
        Snake { body, direction }
    }

    pub fn body(&self) -> &[Coords] {
        &self.body
    }

    pub fn head(&self) -> Coords {
        self.body[0]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn contains(&self, pos: Coords) -> bool {
        self.body.contains(&pos)
    }

    /// Heading actually applied on the last move: the head-neck vector when
    /// there is a neck, otherwise the stored direction.
    pub fn heading(&self) -> Direction {
        match self.body.get(1) {
            Some(&neck) => Direction::between(neck, self.head()).unwrap_or(self.direction),
            None => self.direction,
        }
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Pushes `new_head` and drops the tail unless growing. Returns the
    /// vacated tail cell, if any.
    pub fn advance(&mut self, new_head: Coords, grow: bool) -> Option<Coords> {
        self.body.insert(0, new_head);

        if grow {
            None
        } else {
            self.body.pop()
        }
    }
}
