//! One-contact tracking: displacement, velocity and compass direction.

use serde::Serialize;

use crate::config::ScreenSize;
use crate::sample::{ContactId, Point};
use crate::sensitivity::Sensitivity;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Pinch,
    Spread,
    Rotate,
    #[default]
    None,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Pinch => "pinch",
            Self::Spread => "spread",
            Self::Rotate => "rotate",
            Self::None => "none",
        }
    }

    pub fn is_compass(&self) -> bool {
        matches!(self, Self::Up | Self::Down | Self::Left | Self::Right)
    }

    /// Quantizes an angle (degrees, screen coordinates) into four 90°
    /// sectors centered on right, down, left and up.
    pub fn from_angle(deg: f32) -> Self {
        if (-45.0..=45.0).contains(&deg) {
            Self::Right
        } else if deg > 45.0 && deg <= 135.0 {
            Self::Down
        } else if (-135.0..-45.0).contains(&deg) {
            Self::Up
        } else {
            Self::Left
        }
    }
}

/// Live state of the current gesture. Mutated on every sample and reset
/// once all contacts are released.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureState {
    pub active: bool,
    pub contact: Option<ContactId>,
    pub direction: Direction,
    /// Normalized to [0, 1].
    pub intensity: f32,
    pub start_position: Point,
    pub current_position: Point,
    /// px/s, averaged since contact-down.
    pub velocity: f32,
    pub distance: f32,
    pub max_distance: f32,
    pub angle: f32,
    pub scale: f32,
    pub rotation: f32,
    pub start_ms: u64,
    pub timestamp: u64,
}

impl Default for GestureState {
    fn default() -> Self {
        Self {
            active: false,
            contact: None,
            direction: Direction::None,
            intensity: 0.0,
            start_position: Point::default(),
            current_position: Point::default(),
            velocity: 0.0,
            distance: 0.0,
            max_distance: 0.0,
            angle: 0.0,
            scale: 1.0,
            rotation: 0.0,
            start_ms: 0,
            timestamp: 0,
        }
    }
}

impl GestureState {
    pub fn begin(&mut self, contact: ContactId, at: Point, now_ms: u64) {
        *self = Self {
            active: true,
            contact: Some(contact),
            start_position: at,
            current_position: at,
            start_ms: now_ms,
            timestamp: now_ms,
            ..Self::default()
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn update(&mut self, at: Point, now_ms: u64, sens: &Sensitivity, velocity_scale: f32) {
        if !self.active {
            return;
        }
        self.current_position = at;
        self.timestamp = now_ms.max(self.start_ms);
        self.distance = self.start_position.distance_to(at);
        self.max_distance = self.max_distance.max(self.distance);
        self.angle = self.start_position.angle_to(at);

        let elapsed_s = self.held_ms() as f32 / 1000.0;
        self.velocity = if elapsed_s > 0.0 {
            self.distance / elapsed_s
        } else {
            0.0
        };

        if self.distance > sens.swipe_px {
            self.direction = Direction::from_angle(self.angle);
            self.intensity = if velocity_scale > 0.0 {
                (self.velocity.abs() / velocity_scale).min(1.0)
            } else {
                1.0
            };
        } else {
            self.direction = Direction::None;
            self.intensity = 0.0;
        }
    }

    pub fn held_ms(&self) -> u64 {
        self.timestamp.saturating_sub(self.start_ms)
    }

    /// Damped translation that visual feedback should apply.
    pub fn feedback_offset(&self, parallax: f32) -> (f32, f32) {
        if !self.active {
            return (0.0, 0.0);
        }
        let (dx, dy) = self.start_position.offset(self.current_position);
        (dx * parallax, dy * parallax)
    }

    pub fn stayed_within(&self, tap_px: f32) -> bool {
        self.max_distance <= tap_px
    }
}

/// True when `p` lies within `margin` px (both axes) of any screen corner.
pub fn near_corner(p: Point, screen: ScreenSize, margin: f32) -> bool {
    let near_left = p.x <= margin;
    let near_right = p.x >= screen.width - margin;
    let near_top = p.y <= margin;
    let near_bottom = p.y >= screen.height - margin;
    (near_left || near_right) && (near_top || near_bottom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_at(x: f32, y: f32) -> GestureState {
        let mut g = GestureState::default();
        g.begin(1, Point::new(x, y), 0);
        g
    }

    #[test]
    fn below_swipe_threshold_is_none() {
        let sens = Sensitivity::NORMAL;
        let mut g = started_at(100.0, 100.0);
        for step in 1..=10 {
            g.update(Point::new(100.0 + step as f32 * 4.9, 100.0), step * 10, &sens, 1000.0);
            assert_eq!(g.direction, Direction::None);
        }
    }

    #[test]
    fn cardinal_sectors() {
        let sens = Sensitivity::NORMAL;
        let cases = [
            ((80.0, 10.0), Direction::Right),
            ((-80.0, 20.0), Direction::Left),
            ((10.0, 80.0), Direction::Down),
            ((-20.0, -80.0), Direction::Up),
        ];
        for ((dx, dy), want) in cases {
            let mut g = started_at(500.0, 500.0);
            g.update(Point::new(500.0 + dx, 500.0 + dy), 100, &sens, 1000.0);
            assert_eq!(g.direction, want, "offset ({dx}, {dy})");
        }
    }

    #[test]
    fn sector_boundaries() {
        assert_eq!(Direction::from_angle(45.0), Direction::Right);
        assert_eq!(Direction::from_angle(-45.0), Direction::Right);
        assert_eq!(Direction::from_angle(135.0), Direction::Down);
        assert_eq!(Direction::from_angle(-135.0), Direction::Up);
        assert_eq!(Direction::from_angle(180.0), Direction::Left);
        assert_eq!(Direction::from_angle(-136.0), Direction::Left);
    }

    #[test]
    fn intensity_from_velocity() {
        let sens = Sensitivity::NORMAL;
        let mut g = started_at(0.0, 0.0);
        // 100 px in 200 ms = 500 px/s
        g.update(Point::new(100.0, 0.0), 200, &sens, 1000.0);
        assert!((g.intensity - 0.5).abs() < 1e-4);
        // 300 px in 100 ms = 3000 px/s, clamped
        let mut fast = started_at(0.0, 0.0);
        fast.update(Point::new(300.0, 0.0), 100, &sens, 1000.0);
        assert_eq!(fast.intensity, 1.0);
    }

    #[test]
    fn parallax_offset_is_damped() {
        let sens = Sensitivity::NORMAL;
        let mut g = started_at(10.0, 10.0);
        g.update(Point::new(110.0, -40.0), 50, &sens, 1000.0);
        let (dx, dy) = g.feedback_offset(0.3);
        assert!((dx - 30.0).abs() < 1e-4);
        assert!((dy + 15.0).abs() < 1e-4);
        g.reset();
        assert_eq!(g.feedback_offset(0.3), (0.0, 0.0));
    }

    #[test]
    fn corners() {
        let screen = ScreenSize {
            width: 1000.0,
            height: 800.0,
        };
        assert!(near_corner(Point::new(10.0, 10.0), screen, 60.0));
        assert!(near_corner(Point::new(990.0, 790.0), screen, 60.0));
        assert!(!near_corner(Point::new(10.0, 400.0), screen, 60.0));
        assert!(!near_corner(Point::new(500.0, 10.0), screen, 60.0));
    }
}
