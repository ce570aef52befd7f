//! Source positions attached to nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A line/column location. Lines start at 1, columns at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub line: u32,
    pub column: u32,
}

impl Point {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open source range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub start: Point,
    pub end: Point,
}

impl Position {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, point: Point) -> bool {
        self.start <= point && point < self.end
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_display_and_contains() {
        let pos = Position::new(Point::new(1, 0), Point::new(2, 5));
        assert_eq!(pos.to_string(), "1:0-2:5");
        assert!(pos.contains(Point::new(1, 7)));
        assert!(!pos.contains(Point::new(2, 5)));
    }
}
