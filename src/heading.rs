//! Cardinal headings and turns on the grid.
//!
//! Positions are screen coordinates: x grows eastwards and y grows
//! southwards, so [Heading::North] moves towards smaller y.

use crate::math::Vector2d;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the four directions a vehicle can travel in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Heading {
    North,
    East,
    South,
    West,
}

/// One of the two perpendicular traffic directions at an intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    NorthSouth,
    EastWest,
}

/// A manoeuvre relative to the current heading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Turn {
    Straight,
    Left,
    Right,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::North, Heading::East, Heading::South, Heading::West];

    /// The unit vector of travel.
    pub fn vector(self) -> Vector2d {
        let (dx, dy) = self.delta();
        Vector2d::new(dx as f64, dy as f64)
    }

    /// The change in grid coordinate when moving one cell this way.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Heading::North => (0, -1),
            Heading::East => (1, 0),
            Heading::South => (0, 1),
            Heading::West => (-1, 0),
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Heading::North | Heading::South => Axis::NorthSouth,
            Heading::East | Heading::West => Axis::EastWest,
        }
    }

    /// The heading after a quarter turn to the driver's left.
    pub fn left(self) -> Heading {
        match self {
            Heading::North => Heading::West,
            Heading::West => Heading::South,
            Heading::South => Heading::East,
            Heading::East => Heading::North,
        }
    }

    /// The heading after a quarter turn to the driver's right.
    pub fn right(self) -> Heading {
        self.left().reverse()
    }

    pub fn reverse(self) -> Heading {
        match self {
            Heading::North => Heading::South,
            Heading::East => Heading::West,
            Heading::South => Heading::North,
            Heading::West => Heading::East,
        }
    }

    /// Applies a turn to this heading.
    pub fn turn(self, turn: Turn) -> Heading {
        match turn {
            Turn::Straight => self,
            Turn::Left => self.left(),
            Turn::Right => self.right(),
        }
    }
}

impl Turn {
    pub const ALL: [Turn; 3] = [Turn::Straight, Turn::Left, Turn::Right];
}
