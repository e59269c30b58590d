//! Multitouch protocol-B slot tracking → ordered touch samples.

use crate::config::ScreenSize;
use crate::sample::{Phase, Point, TouchSample};

const MAX_SLOTS: usize = 10;

#[derive(Debug, Clone, Default)]
struct SlotState {
    tracking_id: i32, // -1 = inactive
    x_norm: f32,
    y_norm: f32,
    seen_x: bool,
    seen_y: bool,
    // position reported since the last frame
    dirty: bool,
    // a Down has been emitted for the current tracking id
    announced: bool,
    // contact that lifted this frame and its last position, still owed an Up
    released: Option<(i32, f32, f32)>,
}

impl SlotState {
    fn inactive() -> Self {
        Self {
            tracking_id: -1,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub struct Tracker {
    slots: Vec<SlotState>,
    cur_slot: usize,
    // normalization
    x_min: i32,
    x_max: i32,
    y_min: i32,
    y_max: i32,
    screen: ScreenSize,
}

impl Tracker {
    pub fn new(screen: ScreenSize) -> Self {
        Self {
            slots: vec![SlotState::inactive(); MAX_SLOTS],
            cur_slot: 0,
            x_min: 0,
            x_max: 4096,
            y_min: 0,
            y_max: 4096,
            screen,
        }
    }

    pub fn set_norm_ranges(&mut self, x_min: i32, x_max: i32, y_min: i32, y_max: i32) {
        self.x_min = x_min;
        self.x_max = x_max.max(x_min + 1);
        self.y_min = y_min;
        self.y_max = y_max.max(y_min + 1);
    }

    pub fn set_screen(&mut self, screen: ScreenSize) {
        self.screen = screen;
    }

    pub fn on_slot(&mut self, slot: i32) {
        self.cur_slot = slot.clamp(0, MAX_SLOTS as i32 - 1) as usize;
    }

    pub fn on_tracking_id(&mut self, tracking_id: i32) {
        let s = &mut self.slots[self.cur_slot];
        if tracking_id < 0 {
            if s.tracking_id >= 0 && s.announced {
                s.released = Some((s.tracking_id, s.x_norm, s.y_norm));
            }
            s.tracking_id = -1;
            s.announced = false;
            s.dirty = false;
        } else {
            // new contact: the kernel drops axis events equal to the slot's
            // last value, so a position seen earlier in this slot stands in
            // until fresh axes arrive
            let released = s.released.take().or_else(|| {
                (s.tracking_id >= 0 && s.announced).then_some((s.tracking_id, s.x_norm, s.y_norm))
            });
            *s = SlotState {
                tracking_id,
                x_norm: s.x_norm,
                y_norm: s.y_norm,
                seen_x: s.seen_x,
                seen_y: s.seen_y,
                released,
                ..SlotState::default()
            };
        }
    }

    pub fn on_pos_x(&mut self, raw: i32) {
        let nx = normalize(raw, self.x_min, self.x_max);
        let s = &mut self.slots[self.cur_slot];
        s.x_norm = nx;
        s.seen_x = true;
        s.dirty = true;
    }

    pub fn on_pos_y(&mut self, raw: i32) {
        let ny = normalize(raw, self.y_min, self.y_max);
        let s = &mut self.slots[self.cur_slot];
        s.y_norm = ny;
        s.seen_y = true;
        s.dirty = true;
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.announced).count()
    }

    /// Closes a frame. Lifts come first, then new contacts, then moves,
    /// each group in slot order.
    pub fn on_syn_report(&mut self, time_ms: u64) -> Vec<TouchSample> {
        let (w, h) = (self.screen.width, self.screen.height);
        let to_px = |s: &SlotState| Point::new(s.x_norm * w, s.y_norm * h);

        let mut ups = Vec::new();
        let mut downs = Vec::new();
        let mut moves = Vec::new();

        for s in self.slots.iter_mut() {
            if let Some((id, x, y)) = s.released.take() {
                ups.push(TouchSample {
                    contact: id,
                    phase: Phase::Up,
                    point: Point::new(x * w, y * h),
                    time_ms,
                });
            }
            if s.tracking_id < 0 {
                continue;
            }
            if !s.announced {
                if s.seen_x && s.seen_y {
                    s.announced = true;
                    s.dirty = false;
                    downs.push(TouchSample {
                        contact: s.tracking_id,
                        phase: Phase::Down,
                        point: to_px(s),
                        time_ms,
                    });
                }
            } else if s.dirty {
                s.dirty = false;
                moves.push(TouchSample {
                    contact: s.tracking_id,
                    phase: Phase::Move,
                    point: to_px(s),
                    time_ms,
                });
            }
        }

        ups.extend(downs);
        ups.extend(moves);
        ups
    }

    /// Emits `Cancel` for every live contact, e.g. when the device goes away.
    pub fn cancel_all(&mut self, time_ms: u64) -> Vec<TouchSample> {
        let (w, h) = (self.screen.width, self.screen.height);
        let mut out = Vec::new();
        for s in self.slots.iter_mut() {
            if s.announced && s.tracking_id >= 0 {
                out.push(TouchSample {
                    contact: s.tracking_id,
                    phase: Phase::Cancel,
                    point: Point::new(s.x_norm * w, s.y_norm * h),
                    time_ms,
                });
            }
            *s = SlotState::inactive();
        }
        out
    }
}

fn normalize(raw: i32, min: i32, max: i32) -> f32 {
    ((raw - min) as f32 / (max - min) as f32).clamp(0.0, 1.0)
}
