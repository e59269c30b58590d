//! Normalized touch samples and 2-D point helpers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Angle of the vector `self -> other` in degrees, (-180, 180].
    /// Screen coordinates: positive y points down.
    pub fn angle_to(&self, other: Point) -> f32 {
        (other.y - self.y).atan2(other.x - self.x).to_degrees()
    }

    pub fn offset(&self, other: Point) -> (f32, f32) {
        (other.x - self.x, other.y - self.y)
    }
}

/// Mean of a point set; `None` for an empty set.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f32;
    let (sx, sy) = points
        .iter()
        .fold((0.0f32, 0.0f32), |(ax, ay), p| (ax + p.x, ay + p.y));
    Some(Point::new(sx / n, sy / n))
}

/// Platform contact identifier (evdev tracking id, pointer id, ...).
pub type ContactId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Down,
    Move,
    Up,
    /// Contact vanished without a clean lift; never classified.
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchSample {
    pub contact: ContactId,
    pub phase: Phase,
    pub point: Point,
    pub time_ms: u64,
}

impl TouchSample {
    pub fn down(contact: ContactId, x: f32, y: f32, time_ms: u64) -> Self {
        Self {
            contact,
            phase: Phase::Down,
            point: Point::new(x, y),
            time_ms,
        }
    }

    pub fn moved(contact: ContactId, x: f32, y: f32, time_ms: u64) -> Self {
        Self {
            contact,
            phase: Phase::Move,
            point: Point::new(x, y),
            time_ms,
        }
    }

    pub fn up(contact: ContactId, x: f32, y: f32, time_ms: u64) -> Self {
        Self {
            contact,
            phase: Phase::Up,
            point: Point::new(x, y),
            time_ms,
        }
    }

    pub fn is_release(&self) -> bool {
        matches!(self.phase, Phase::Up | Phase::Cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_follows_screen_axes() {
        let o = Point::new(0.0, 0.0);
        assert!((o.angle_to(Point::new(10.0, 0.0)) - 0.0).abs() < 1e-4);
        assert!((o.angle_to(Point::new(0.0, 10.0)) - 90.0).abs() < 1e-4);
        assert!((o.angle_to(Point::new(0.0, -10.0)) + 90.0).abs() < 1e-4);
        assert!((o.angle_to(Point::new(-10.0, 0.0)).abs() - 180.0).abs() < 1e-4);
    }

    #[test]
    fn centroid_of_square() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        assert_eq!(centroid(&pts), Some(Point::new(1.0, 1.0)));
        assert_eq!(centroid(&[]), None);
    }

    #[test]
    fn sample_parses_from_json_line() {
        let s: TouchSample = serde_json::from_str(
            r#"{"contact":3,"phase":"down","point":{"x":10.0,"y":20.0},"time_ms":42}"#,
        )
        .unwrap();
        assert_eq!(s, TouchSample::down(3, 10.0, 20.0, 42));
    }
}
