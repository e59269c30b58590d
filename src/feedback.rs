//! Typed event delivery and acknowledgment cues.

use serde::Serialize;

use crate::gestures::GestureEvent;

/// Single entry point through which a host consumes recognized gestures.
pub trait GestureHandler {
    fn on_gesture(&mut self, event: &GestureEvent);
}

impl<F> GestureHandler for F
where
    F: FnMut(&GestureEvent),
{
    fn on_gesture(&mut self, event: &GestureEvent) {
        self(event)
    }
}

/// Collects events in order; handy for replay and tests.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<GestureEvent>,
}

impl GestureHandler for EventLog {
    fn on_gesture(&mut self, event: &GestureEvent) {
        self.events.push(event.clone());
    }
}

/// Visual or haptic acknowledgment the host should render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cue", rename_all = "snake_case")]
pub enum Feedback {
    /// Damped translation while a gesture is in progress.
    Translate { dx: f32, dy: f32 },
    /// Brief highlight scaled by gesture intensity.
    Pulse { intensity: f32 },
    /// Vibration pattern, alternating on/off durations in ms.
    Haptic { pattern_ms: Vec<u32> },
}

const TAP_PULSE: f32 = 0.2;
const LONG_PRESS_BUZZ: [u32; 1] = [50];
const EMERGENCY_BUZZ: [u32; 3] = [200, 100, 200];

impl Feedback {
    pub fn for_event(event: &GestureEvent) -> Feedback {
        match event {
            GestureEvent::Swipe { intensity, .. } | GestureEvent::MultiTouch { intensity, .. } => {
                Feedback::Pulse {
                    intensity: intensity.clamp(0.0, 1.0),
                }
            }
            GestureEvent::Tap { .. } => Feedback::Pulse {
                intensity: TAP_PULSE,
            },
            GestureEvent::CircleComplete { .. } => Feedback::Pulse { intensity: 1.0 },
            GestureEvent::LongPress { .. } => Feedback::Haptic {
                pattern_ms: LONG_PRESS_BUZZ.to_vec(),
            },
            GestureEvent::Emergency { .. } => Feedback::Haptic {
                pattern_ms: EMERGENCY_BUZZ.to_vec(),
            },
        }
    }

    /// `None` while there is nothing to translate.
    pub fn translate(offset: (f32, f32)) -> Option<Feedback> {
        let (dx, dy) = offset;
        (dx != 0.0 || dy != 0.0).then_some(Feedback::Translate { dx, dy })
    }
}
