// vehicles.rs

use serde::{Deserialize, Serialize};

/// Heading of a vehicle. A northbound vehicle enters from the south edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn axis(self) -> Axis {
        match self {
            Direction::North | Direction::South => Axis::NorthSouth,
            Direction::East | Direction::West => Axis::EastWest,
        }
    }

    /// Unit step in screen coordinates (y grows downwards).
    pub fn heading(self) -> (f64, f64) {
        match self {
            Direction::North => (0.0, -1.0),
            Direction::South => (0.0, 1.0),
            Direction::East => (1.0, 0.0),
            Direction::West => (-1.0, 0.0),
        }
    }
}

/// One of the two perpendicular streams sharing a green/red state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    NorthSouth,
    EastWest,
}

impl Axis {
    pub fn opposite(self) -> Axis {
        match self {
            Axis::NorthSouth => Axis::EastWest,
            Axis::EastWest => Axis::NorthSouth,
        }
    }

    pub fn directions(self) -> [Direction; 2] {
        match self {
            Axis::NorthSouth => [Direction::North, Direction::South],
            Axis::EastWest => [Direction::East, Direction::West],
        }
    }
}

/// Represents a vehicle approaching or crossing the intersection.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub direction: Direction,
    /// Distance covered per tick when moving.
    pub speed: f64,
    /// Drawing size only.
    pub size: f64,
    pub is_emergency: bool,
    /// Consecutive ticks spent unable to move.
    pub waiting_ticks: u32,
}

impl Vehicle {
    pub fn new(
        id: u64,
        direction: Direction,
        position: (f64, f64),
        speed: f64,
        size: f64,
        is_emergency: bool,
    ) -> Self {
        Self {
            id,
            x: position.0,
            y: position.1,
            direction,
            speed,
            size,
            is_emergency,
            waiting_ticks: 0,
        }
    }

    pub fn axis(&self) -> Axis {
        self.direction.axis()
    }

    /// Moves one tick along the heading and clears the waiting counter.
    pub fn advance(&mut self) {
        let (dx, dy) = self.direction.heading();
        self.x += dx * self.speed;
        self.y += dy * self.speed;
        self.waiting_ticks = 0;
    }

    pub fn hold(&mut self) {
        self.waiting_ticks = self.waiting_ticks.saturating_add(1);
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting_ticks > 0
    }
}
