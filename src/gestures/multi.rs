//! Two-contact pinch/spread/rotate tracking.

use log::trace;
use serde::Serialize;

use crate::sample::{ContactId, Point};
use crate::sensitivity::Sensitivity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiTouchKind {
    Pinch,
    Spread,
    Rotate,
}

impl MultiTouchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pinch => "pinch",
            Self::Spread => "spread",
            Self::Rotate => "rotate",
        }
    }
}

/// Wraps an angle difference into (-180, 180].
pub fn wrap_degrees(deg: f32) -> f32 {
    let mut d = deg % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

/// Baseline captured when the second contact lands, plus the live
/// scale/rotation relative to it.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiTouchState {
    touches: [(ContactId, Point); 2],
    pub initial_distance: f32,
    pub initial_angle: f32,
    pub scale: f32,
    pub rotation: f32,
}

impl MultiTouchState {
    pub fn begin(a: (ContactId, Point), b: (ContactId, Point)) -> Self {
        let initial_distance = a.1.distance_to(b.1);
        let initial_angle = a.1.angle_to(b.1);
        trace!("multi: baseline distance={initial_distance:.1} angle={initial_angle:.1}");
        Self {
            touches: [a, b],
            initial_distance,
            initial_angle,
            scale: 1.0,
            rotation: 0.0,
        }
    }

    pub fn contains(&self, contact: ContactId) -> bool {
        self.touches.iter().any(|(id, _)| *id == contact)
    }

    pub fn has_baseline(&self) -> bool {
        self.initial_distance > f32::EPSILON
    }

    /// Applies a move of one tracked contact. Returns false for contacts
    /// outside the pair.
    pub fn update(&mut self, contact: ContactId, at: Point) -> bool {
        let Some(slot) = self.touches.iter_mut().find(|(id, _)| *id == contact) else {
            return false;
        };
        slot.1 = at;

        if !self.has_baseline() {
            return true;
        }
        let [(_, a), (_, b)] = self.touches;
        self.scale = a.distance_to(b) / self.initial_distance;
        self.rotation = wrap_degrees(a.angle_to(b) - self.initial_angle);
        true
    }

    /// Classification at release. Pinch/spread and rotate are judged
    /// independently, so both may be returned.
    pub fn classify(&self, sens: &Sensitivity) -> Vec<(MultiTouchKind, f32)> {
        let mut out = Vec::with_capacity(2);
        if !self.has_baseline() {
            return out;
        }

        let stretch = self.scale - 1.0;
        if stretch.abs() > sens.pinch {
            let kind = if stretch < 0.0 {
                MultiTouchKind::Pinch
            } else {
                MultiTouchKind::Spread
            };
            out.push((kind, stretch.abs().min(1.0)));
        }
        if self.rotation.abs() > sens.rotation_deg {
            out.push((MultiTouchKind::Rotate, (self.rotation.abs() / 180.0).min(1.0)));
        }
        out
    }

    /// Dominant label for the live gesture state.
    pub fn live_direction(&self, sens: &Sensitivity) -> Option<MultiTouchKind> {
        self.classify(sens).first().map(|(k, _)| *k)
    }
}
