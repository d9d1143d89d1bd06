//! 2D integer point primitives
//!
//! Shared value type for all generators: distances, bounds checks, and
//! 4/8-connected neighbor enumeration.

use serde::{Deserialize, Serialize};

/// An immutable 2D integer coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Manhattan (taxicab) distance to another point.
    pub fn manhattan_distance(&self, other: Point) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Whether this point lies inside a `width` x `height` grid.
    pub fn in_bounds(&self, width: usize, height: usize) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as usize) < width && (self.y as usize) < height
    }

    /// The 4 orthogonal neighbors (N, S, W, E). No bounds filtering.
    pub fn neighbors(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y - 1),
            Point::new(self.x, self.y + 1),
            Point::new(self.x - 1, self.y),
            Point::new(self.x + 1, self.y),
        ]
    }

    /// All 8 neighbors (orthogonals plus diagonals). No bounds filtering.
    pub fn all_neighbors(&self) -> [Point; 8] {
        [
            Point::new(self.x - 1, self.y - 1),
            Point::new(self.x, self.y - 1),
            Point::new(self.x + 1, self.y - 1),
            Point::new(self.x - 1, self.y),
            Point::new(self.x + 1, self.y),
            Point::new(self.x - 1, self.y + 1),
            Point::new(self.x, self.y + 1),
            Point::new(self.x + 1, self.y + 1),
        ]
    }

    /// Orthogonal neighbors filtered to a `width` x `height` grid.
    pub fn neighbors_within(&self, width: usize, height: usize) -> impl Iterator<Item = Point> {
        self.neighbors()
            .into_iter()
            .filter(move |p| p.in_bounds(width, height))
    }

    /// 8-connected neighbors filtered to a `width` x `height` grid.
    pub fn all_neighbors_within(&self, width: usize, height: usize) -> impl Iterator<Item = Point> {
        self.all_neighbors()
            .into_iter()
            .filter(move |p| p.in_bounds(width, height))
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Point::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distances() {
        let a = Point::new(0, 0);
        let b = Point::new(3, 4);
        assert_eq!(a.distance(b), 5.0);
        assert_eq!(a.manhattan_distance(b), 7);
        assert_eq!(b.manhattan_distance(a), 7);
    }

    #[test]
    fn test_bounds_check() {
        assert!(Point::new(0, 0).in_bounds(10, 10));
        assert!(Point::new(9, 9).in_bounds(10, 10));
        assert!(!Point::new(10, 9).in_bounds(10, 10));
        assert!(!Point::new(-1, 0).in_bounds(10, 10));
    }

    #[test]
    fn test_neighbor_counts() {
        let p = Point::new(5, 5);
        assert_eq!(p.neighbors().len(), 4);
        assert_eq!(p.all_neighbors().len(), 8);

        // Corner of a grid keeps only in-bounds neighbors
        let corner = Point::new(0, 0);
        assert_eq!(corner.neighbors_within(10, 10).count(), 2);
        assert_eq!(corner.all_neighbors_within(10, 10).count(), 3);
    }

    #[test]
    fn test_neighbors_are_adjacent() {
        let p = Point::new(3, 7);
        for n in p.neighbors() {
            assert_eq!(p.manhattan_distance(n), 1);
        }
        for n in p.all_neighbors() {
            assert!(p.manhattan_distance(n) <= 2);
            assert!((p.x - n.x).abs() <= 1 && (p.y - n.y).abs() <= 1);
        }
    }
}
