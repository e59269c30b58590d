//! Gesture recognition state machine.
//!
//! `GestureEngine` owns every piece of per-interaction state (the live
//! gesture, the two-contact baseline, the tap counter, the circle path and
//! both timers). Hosts construct one per touch surface, feed it samples in
//! arrival order with [`GestureEngine::handle`] and call
//! [`GestureEngine::tick`] periodically so pending timers can fire.

pub mod circle;
pub mod multi;
pub mod single;
pub mod taps;
pub mod timers;

use log::{debug, trace};
use serde::Serialize;

use crate::config::{PatternConfig, ScreenSize};
use crate::feedback::GestureHandler;
use crate::sample::{ContactId, Phase, Point, TouchSample};
use crate::sensitivity::{OperatingMode, Sensitivity, SensitivityTable};

pub use circle::{CircleFit, CirclePathBuffer};
pub use multi::{MultiTouchKind, MultiTouchState};
pub use single::{Direction, GestureState};
pub use taps::TapCounter;
pub use timers::Timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyCause {
    /// `tap_count` downs in quick succession.
    TripleTap,
    /// Long press that started near a screen corner.
    CornerHold,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GestureEvent {
    Swipe {
        direction: Direction,
        intensity: f32,
    },
    MultiTouch {
        kind: MultiTouchKind,
        intensity: f32,
    },
    Tap {
        at: Point,
    },
    LongPress {
        at: Point,
    },
    Emergency {
        cause: EmergencyCause,
    },
    CircleComplete {
        radius: f32,
    },
}

impl GestureEvent {
    /// Key looked up in a profile's `[bindings]`.
    pub fn binding_key(&self) -> &'static str {
        match self {
            Self::Swipe { direction, .. } => match direction {
                Direction::Up => "swipe.up",
                Direction::Down => "swipe.down",
                Direction::Left => "swipe.left",
                _ => "swipe.right",
            },
            Self::MultiTouch { kind, .. } => match kind {
                MultiTouchKind::Pinch => "multi.pinch",
                MultiTouchKind::Spread => "multi.spread",
                MultiTouchKind::Rotate => "multi.rotate",
            },
            Self::Tap { .. } => "tap",
            Self::LongPress { .. } => "long_press",
            Self::Emergency { .. } => "emergency",
            Self::CircleComplete { .. } => "circle",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub sensitivity: SensitivityTable,
    pub patterns: PatternConfig,
    pub screen: ScreenSize,
}

/// Host-supplied operating context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GestureContext {
    pub mode: OperatingMode,
    pub role: String,
}

impl GestureContext {
    pub fn new(mode: OperatingMode, role: impl Into<String>) -> Self {
        Self {
            mode,
            role: role.into(),
        }
    }
}

#[derive(Debug)]
pub struct GestureEngine {
    config: EngineConfig,
    context: GestureContext,
    sensitivity: Sensitivity,
    circle_enabled: bool,

    /// Contacts currently down, in arrival order.
    contacts: Vec<(ContactId, Point)>,
    gesture: GestureState,
    multi: Option<MultiTouchState>,
    /// Set once a session saw two contacts; the leftover contact then
    /// produces no single-pointer gesture.
    multi_seen: bool,
    long_press_reported: bool,
    taps: TapCounter,
    circle: CirclePathBuffer,

    long_press: Timer,
    tap_reset: Timer,
}

impl GestureEngine {
    pub fn new(config: EngineConfig, context: GestureContext) -> Self {
        let sensitivity = Sensitivity::select(context.mode, &config.sensitivity);
        let circle_enabled = config.patterns.circle_roles.contains(&context.role);
        let circle = CirclePathBuffer::new(
            config.patterns.circle_capacity,
            config.patterns.circle_min_points,
        );
        Self {
            config,
            context,
            sensitivity,
            circle_enabled,
            contacts: Vec::with_capacity(4),
            gesture: GestureState::default(),
            multi: None,
            multi_seen: false,
            long_press_reported: false,
            taps: TapCounter::default(),
            circle,
            long_press: Timer::default(),
            tap_reset: Timer::default(),
        }
    }

    pub fn context(&self) -> &GestureContext {
        &self.context
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    pub fn gesture_state(&self) -> &GestureState {
        &self.gesture
    }

    pub fn multi_touch_state(&self) -> Option<&MultiTouchState> {
        self.multi.as_ref()
    }

    pub fn tap_count(&self) -> u32 {
        self.taps.count
    }

    pub fn circle_points(&self) -> usize {
        self.circle.len()
    }

    pub fn active_contacts(&self) -> usize {
        self.contacts.len()
    }

    /// Earliest pending timer deadline, for hosts that sleep between ticks.
    pub fn next_deadline(&self) -> Option<u64> {
        [self.long_press.deadline(), self.tap_reset.deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    /// Damped translation for visual feedback while a gesture is live.
    pub fn feedback_offset(&self) -> (f32, f32) {
        if self.multi_seen {
            return (0.0, 0.0);
        }
        self.gesture.feedback_offset(self.config.patterns.parallax)
    }

    /// Switches mode/role; thresholds are re-selected immediately.
    pub fn set_context(&mut self, context: GestureContext) {
        if context == self.context {
            return;
        }
        debug!(
            "engine: context {} / '{}' -> {} / '{}'",
            self.context.mode, self.context.role, context.mode, context.role
        );
        self.sensitivity = Sensitivity::select(context.mode, &self.config.sensitivity);
        self.circle_enabled = self.config.patterns.circle_roles.contains(&context.role);
        if !self.circle_enabled {
            self.circle.clear();
        }
        self.context = context;
    }

    /// Replaces the tuning tables. Any in-flight interaction is dropped.
    pub fn reconfigure(&mut self, config: EngineConfig) {
        let context = self.context.clone();
        *self = Self::new(config, context);
    }

    /// Cancels every pending timer and clears all interaction state.
    pub fn shutdown(&mut self) {
        self.long_press.cancel();
        self.tap_reset.cancel();
        self.taps = TapCounter::default();
        self.contacts.clear();
        self.end_session();
    }

    pub fn handle_with(&mut self, sample: &TouchSample, handler: &mut dyn GestureHandler) {
        for ev in self.handle(sample) {
            handler.on_gesture(&ev);
        }
    }

    pub fn tick_with(&mut self, now_ms: u64, handler: &mut dyn GestureHandler) {
        for ev in self.tick(now_ms) {
            handler.on_gesture(&ev);
        }
    }

    /// Fires due timers.
    pub fn tick(&mut self, now_ms: u64) -> Vec<GestureEvent> {
        let mut out = Vec::new();
        self.fire_due(now_ms, &mut out);
        out
    }

    pub fn handle(&mut self, sample: &TouchSample) -> Vec<GestureEvent> {
        let mut out = Vec::new();
        // timers due before this sample fire first, keeping event order
        self.fire_due(sample.time_ms, &mut out);

        if sample.is_release() {
            self.on_release(sample, &mut out);
        } else if sample.phase == Phase::Down {
            self.on_down(sample, &mut out);
        } else {
            self.on_move(sample);
        }
        out
    }

    fn fire_due(&mut self, now_ms: u64, out: &mut Vec<GestureEvent>) {
        if self.tap_reset.poll(now_ms) {
            trace!("engine: tap window expired (count was {})", self.taps.count);
            self.taps.clear();
        }
        if self.long_press.poll(now_ms)
            && self.gesture.active
            && !self.multi_seen
            && self.gesture.stayed_within(self.sensitivity.tap_px)
        {
            self.long_press_reported = true;
            self.emit_long_press(out);
        }
    }

    fn on_down(&mut self, s: &TouchSample, out: &mut Vec<GestureEvent>) {
        if let Some(c) = self.contacts.iter_mut().find(|(id, _)| *id == s.contact) {
            // duplicate down for a known contact: treat as a position update
            c.1 = s.point;
            return;
        }

        let p = &self.config.patterns;
        if self.taps.register(s.time_ms, p.tap_interval_ms, p.tap_count) {
            debug!("engine: triple-tap emergency");
            out.push(GestureEvent::Emergency {
                cause: EmergencyCause::TripleTap,
            });
        }
        self.tap_reset.schedule(s.time_ms, p.tap_interval_ms);

        self.contacts.push((s.contact, s.point));
        match self.contacts.len() {
            1 if !self.multi_seen => {
                self.gesture.begin(s.contact, s.point, s.time_ms);
                self.long_press_reported = false;
                self.long_press
                    .schedule(s.time_ms, self.sensitivity.long_press_ms);
                self.circle.clear();
            }
            2 => {
                // baseline captured once, on the second-contact edge
                self.multi = Some(MultiTouchState::begin(self.contacts[0], self.contacts[1]));
                self.multi_seen = true;
                self.long_press.cancel();
                self.circle.clear();
                self.gesture.direction = Direction::None;
                self.gesture.intensity = 0.0;
            }
            _ => {}
        }
    }

    fn on_move(&mut self, s: &TouchSample) {
        let Some(c) = self.contacts.iter_mut().find(|(id, _)| *id == s.contact) else {
            return;
        };
        c.1 = s.point;

        if let Some(multi) = self.multi.as_mut() {
            if multi.update(s.contact, s.point) {
                self.gesture.scale = multi.scale;
                self.gesture.rotation = multi.rotation;
                self.gesture.timestamp = s.time_ms;
                self.gesture.direction = match multi.live_direction(&self.sensitivity) {
                    Some(MultiTouchKind::Pinch) => Direction::Pinch,
                    Some(MultiTouchKind::Spread) => Direction::Spread,
                    Some(MultiTouchKind::Rotate) => Direction::Rotate,
                    None => Direction::None,
                };
            }
            return;
        }
        if self.multi_seen || self.gesture.contact != Some(s.contact) {
            return;
        }

        self.track_single(s);
    }

    fn track_single(&mut self, s: &TouchSample) {
        self.gesture.update(
            s.point,
            s.time_ms,
            &self.sensitivity,
            self.config.patterns.velocity_scale,
        );
        if !self.gesture.stayed_within(self.sensitivity.tap_px) && self.long_press.cancel() {
            trace!("engine: moved past tap threshold, long-press cancelled");
        }
        if self.circle_enabled && self.gesture.distance > self.config.patterns.circle_min_radius {
            self.circle.push(s.point);
        }
    }

    fn on_release(&mut self, s: &TouchSample, out: &mut Vec<GestureEvent>) {
        let Some(idx) = self.contacts.iter().position(|(id, _)| *id == s.contact) else {
            return;
        };
        self.contacts.remove(idx);
        let cancelled = s.phase == Phase::Cancel;

        if let Some(mut multi) = self.multi.take() {
            if multi.contains(s.contact) {
                if !cancelled {
                    multi.update(s.contact, s.point);
                    for (kind, intensity) in multi.classify(&self.sensitivity) {
                        debug!("engine: {} intensity={intensity:.2}", kind.as_str());
                        out.push(GestureEvent::MultiTouch { kind, intensity });
                    }
                }
            } else {
                self.multi = Some(multi);
            }
        } else if !self.multi_seen && self.gesture.contact == Some(s.contact) {
            if cancelled {
                self.long_press.cancel();
            } else {
                self.track_single(s);
                self.classify_single_release(out);
            }
        }

        if self.contacts.is_empty() {
            self.end_session();
        }
    }

    fn classify_single_release(&mut self, out: &mut Vec<GestureEvent>) {
        self.long_press.cancel();
        let fit = if self.circle_enabled {
            self.circle.fit()
        } else {
            None
        };
        self.circle.clear();

        if let Some(fit) = fit {
            trace!(
                "engine: circle fit radius={:.1} deviation={:.3}",
                fit.radius, fit.deviation
            );
            if fit.deviation < self.config.patterns.circle_tolerance {
                out.push(GestureEvent::CircleComplete { radius: fit.radius });
                return;
            }
        }

        let g = &self.gesture;
        if g.direction.is_compass() {
            debug!(
                "engine: swipe {} intensity={:.2}",
                g.direction.as_str(),
                g.intensity
            );
            out.push(GestureEvent::Swipe {
                direction: g.direction,
                intensity: g.intensity,
            });
        } else if g.stayed_within(self.sensitivity.tap_px) {
            if g.held_ms() >= self.sensitivity.long_press_ms {
                if !self.long_press_reported {
                    self.emit_long_press(out);
                }
            } else {
                out.push(GestureEvent::Tap {
                    at: g.start_position,
                });
            }
        }
    }

    fn emit_long_press(&self, out: &mut Vec<GestureEvent>) {
        let at = self.gesture.start_position;
        out.push(GestureEvent::LongPress { at });
        if single::near_corner(at, self.config.screen, self.sensitivity.corner_margin_px) {
            debug!("engine: corner hold emergency at ({:.0}, {:.0})", at.x, at.y);
            out.push(GestureEvent::Emergency {
                cause: EmergencyCause::CornerHold,
            });
        }
    }

    fn end_session(&mut self) {
        self.gesture.reset();
        self.multi = None;
        self.multi_seen = false;
        self.long_press_reported = false;
        self.long_press.cancel();
        self.circle.clear();
    }
}
