// intersections.rs

use crate::config::GeometryConfig;
use crate::simulation_engine::vehicles::{Direction, Vehicle};

/// Axis-aligned rectangle in simulation coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Footprint {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Static layout of the single four-way intersection: simulation bounds,
/// the central junction footprint and the lane-edge spawn points.
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    pub width: f64,
    pub height: f64,
    pub footprint: Footprint,
    pub spawn_inset: f64,
    pub bounds_margin: f64,
}

impl Intersection {
    pub fn new(config: &GeometryConfig) -> Self {
        let cx = config.width / 2.0;
        let cy = config.height / 2.0;
        let half = config.footprint_half_extent;
        Self {
            width: config.width,
            height: config.height,
            footprint: Footprint {
                min_x: cx - half,
                max_x: cx + half,
                min_y: cy - half,
                max_y: cy + half,
            },
            spawn_inset: config.spawn_inset,
            bounds_margin: config.bounds_margin,
        }
    }

    /// Lane-centre entry point for vehicles heading in `direction`.
    pub fn spawn_point(&self, direction: Direction) -> (f64, f64) {
        match direction {
            Direction::North => (self.width / 2.0, self.height - self.spawn_inset),
            Direction::South => (self.width / 2.0, self.spawn_inset),
            Direction::East => (self.spawn_inset, self.height / 2.0),
            Direction::West => (self.width - self.spawn_inset, self.height / 2.0),
        }
    }

    /// Inside the junction: such a vehicle always finishes crossing.
    pub fn in_footprint(&self, vehicle: &Vehicle) -> bool {
        self.footprint.contains(vehicle.x, vehicle.y)
    }

    /// Whether the vehicle has not yet reached the near edge of the junction.
    pub fn is_approaching(&self, vehicle: &Vehicle) -> bool {
        match vehicle.direction {
            Direction::North => vehicle.y > self.footprint.max_y,
            Direction::South => vehicle.y < self.footprint.min_y,
            Direction::East => vehicle.x < self.footprint.min_x,
            Direction::West => vehicle.x > self.footprint.max_x,
        }
    }

    pub fn in_bounds(&self, vehicle: &Vehicle) -> bool {
        let m = self.bounds_margin;
        vehicle.x >= -m
            && vehicle.x <= self.width + m
            && vehicle.y >= -m
            && vehicle.y <= self.height + m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intersection() -> Intersection {
        Intersection::new(&GeometryConfig::default())
    }

    #[test]
    fn spawn_points_sit_on_the_entry_edges() {
        let i = intersection();
        assert_eq!(i.spawn_point(Direction::North), (400.0, 550.0));
        assert_eq!(i.spawn_point(Direction::South), (400.0, 50.0));
        assert_eq!(i.spawn_point(Direction::East), (50.0, 300.0));
        assert_eq!(i.spawn_point(Direction::West), (750.0, 300.0));
    }

    #[test]
    fn approach_footprint_and_bounds() {
        let i = intersection();
        let mut v = Vehicle::new(1, Direction::East, (50.0, 300.0), 2.0, 8.0, false);
        assert!(i.is_approaching(&v));
        assert!(!i.in_footprint(&v));

        v.x = 350.0;
        assert!(!i.is_approaching(&v));
        assert!(i.in_footprint(&v));

        v.x = 815.0;
        assert!(i.in_bounds(&v));
        v.x = 821.0;
        assert!(!i.in_bounds(&v));
    }
}
