use std::path::Path;

use gesturenav::config::Profile;
use gesturenav::feedback::EventLog;
use gesturenav::gestures::{
    Direction, EmergencyCause, EngineConfig, GestureContext, GestureEngine, GestureEvent,
    MultiTouchKind,
};
use gesturenav::sample::TouchSample;
use gesturenav::sensitivity::OperatingMode;

fn engine() -> GestureEngine {
    GestureEngine::new(EngineConfig::default(), GestureContext::default())
}

fn engine_in(mode: OperatingMode, role: &str) -> GestureEngine {
    GestureEngine::new(EngineConfig::default(), GestureContext::new(mode, role))
}

fn feed(e: &mut GestureEngine, samples: &[TouchSample]) -> Vec<GestureEvent> {
    let mut log = EventLog::default();
    for s in samples {
        e.handle_with(s, &mut log);
    }
    log.events
}

/// Straight single-contact drag from `from` by (dx, dy) in `steps` moves.
fn drag(from: (f32, f32), dx: f32, dy: f32, steps: u64, step_ms: u64) -> Vec<TouchSample> {
    let mut out = vec![TouchSample::down(1, from.0, from.1, 0)];
    for k in 1..=steps {
        let f = k as f32 / steps as f32;
        out.push(TouchSample::moved(1, from.0 + dx * f, from.1 + dy * f, k * step_ms));
    }
    out.push(TouchSample::up(1, from.0 + dx, from.1 + dy, steps * step_ms));
    out
}

fn swipes(events: &[GestureEvent]) -> Vec<(Direction, f32)> {
    events
        .iter()
        .filter_map(|e| match e {
            GestureEvent::Swipe {
                direction,
                intensity,
            } => Some((*direction, *intensity)),
            _ => None,
        })
        .collect()
}

#[test]
fn below_threshold_motion_produces_nothing() {
    let mut e = engine();
    // 30px is past the tap radius but short of a swipe
    let events = feed(&mut e, &drag((500.0, 500.0), 30.0, 0.0, 6, 20));
    assert!(events.is_empty(), "{events:?}");
}

#[test]
fn cardinal_swipes() {
    let cases = [
        ((120.0, 0.0), Direction::Right),
        ((-120.0, 0.0), Direction::Left),
        ((0.0, 120.0), Direction::Down),
        ((0.0, -120.0), Direction::Up),
        ((100.0, 60.0), Direction::Right),
        ((-30.0, -110.0), Direction::Up),
    ];
    for ((dx, dy), want) in cases {
        let mut e = engine();
        let events = feed(&mut e, &drag((800.0, 500.0), dx, dy, 4, 25));
        let got = swipes(&events);
        assert_eq!(got.len(), 1, "{dx},{dy}: {events:?}");
        assert_eq!(got[0].0, want, "{dx},{dy}");
        assert!(got[0].1 > 0.0 && got[0].1 <= 1.0);
    }
}

#[test]
fn swipe_intensity_scales_with_velocity() {
    let mut fast = engine();
    let f = swipes(&feed(&mut fast, &drag((500.0, 500.0), 200.0, 0.0, 4, 25)));
    let mut slow = engine();
    let s = swipes(&feed(&mut slow, &drag((500.0, 500.0), 200.0, 0.0, 4, 100)));
    // 2000 px/s saturates, 500 px/s is half scale
    assert_eq!(f[0].1, 1.0);
    assert!((s[0].1 - 0.5).abs() < 1e-3, "{s:?}");
}

#[test]
fn quick_tap_is_reported_at_start_position() {
    let mut e = engine();
    let events = feed(
        &mut e,
        &[
            TouchSample::down(1, 300.0, 200.0, 0),
            TouchSample::moved(1, 303.0, 202.0, 40),
            TouchSample::up(1, 303.0, 202.0, 80),
        ],
    );
    assert_eq!(events.len(), 1);
    match &events[0] {
        GestureEvent::Tap { at } => assert_eq!((at.x, at.y), (300.0, 200.0)),
        other => panic!("expected tap, got {other:?}"),
    }
}

#[test]
fn triple_tap_raises_one_emergency() {
    let mut e = engine();
    let mut samples = Vec::new();
    for i in 0..3u64 {
        samples.push(TouchSample::down(1, 500.0, 500.0, i * 150));
        samples.push(TouchSample::up(1, 500.0, 500.0, i * 150 + 60));
    }
    let events = feed(&mut e, &samples);
    let emergencies = events
        .iter()
        .filter(|ev| {
            matches!(
                ev,
                GestureEvent::Emergency {
                    cause: EmergencyCause::TripleTap
                }
            )
        })
        .count();
    assert_eq!(emergencies, 1, "{events:?}");
    assert_eq!(e.tap_count(), 0);

    // after the window lapses a fourth tap starts a new count
    let more = feed(
        &mut e,
        &[
            TouchSample::down(1, 500.0, 500.0, 1_500),
            TouchSample::up(1, 500.0, 500.0, 1_560),
        ],
    );
    assert!(
        !more.iter().any(|ev| matches!(ev, GestureEvent::Emergency { .. })),
        "{more:?}"
    );
    assert_eq!(e.tap_count(), 1);
}

#[test]
fn slow_taps_never_trigger_emergency() {
    let mut e = engine();
    let mut samples = Vec::new();
    for i in 0..5u64 {
        samples.push(TouchSample::down(1, 500.0, 500.0, i * 500));
        samples.push(TouchSample::up(1, 500.0, 500.0, i * 500 + 50));
    }
    let events = feed(&mut e, &samples);
    assert!(!events.iter().any(|ev| matches!(ev, GestureEvent::Emergency { .. })));
    assert_eq!(events.len(), 5);
}

#[test]
fn tap_window_is_cleared_by_timer() {
    let mut e = engine();
    feed(
        &mut e,
        &[
            TouchSample::down(1, 500.0, 500.0, 0),
            TouchSample::up(1, 500.0, 500.0, 50),
            TouchSample::down(1, 500.0, 500.0, 100),
            TouchSample::up(1, 500.0, 500.0, 150),
        ],
    );
    assert_eq!(e.tap_count(), 2);
    assert_eq!(e.next_deadline(), Some(600));
    assert!(e.tick(599).is_empty());
    assert_eq!(e.tap_count(), 2);
    assert!(e.tick(600).is_empty());
    assert_eq!(e.tap_count(), 0);
    assert_eq!(e.next_deadline(), None);
}

#[test]
fn circle_for_coordinator() {
    let (cx, cy, r) = (600.0_f32, 500.0_f32, 100.0_f32);
    let mut samples = vec![TouchSample::down(1, cx + r, cy, 0)];
    for k in 1..=16u64 {
        let a = (22.5 * k as f32).to_radians();
        samples.push(TouchSample::moved(1, cx + r * a.cos(), cy + r * a.sin(), k * 30));
    }
    samples.push(TouchSample::up(1, cx + r, cy, 16 * 30));

    let mut e = engine_in(OperatingMode::Normal, "coordinator");
    let events = feed(&mut e, &samples);
    assert_eq!(events.len(), 1, "{events:?}");
    match events[0] {
        GestureEvent::CircleComplete { radius } => assert!((80.0..110.0).contains(&radius)),
        ref other => panic!("expected circle, got {other:?}"),
    }

    // the same path is not a circle for other roles
    let mut e = engine_in(OperatingMode::Normal, "planner");
    let events = feed(&mut e, &samples);
    assert!(
        !events
            .iter()
            .any(|ev| matches!(ev, GestureEvent::CircleComplete { .. }))
    );
}

#[test]
fn straight_line_is_a_swipe_not_a_circle() {
    let mut e = engine_in(OperatingMode::Normal, "coordinator");
    let events = feed(&mut e, &drag((100.0, 300.0), 500.0, 0.0, 20, 10));
    assert_eq!(swipes(&events), vec![(Direction::Right, 1.0)]);
}

#[test]
fn spread_and_pinch() {
    let mut e = engine();
    let events = feed(
        &mut e,
        &[
            TouchSample::down(1, 400.0, 300.0, 0),
            TouchSample::down(2, 500.0, 300.0, 10),
            TouchSample::moved(2, 550.0, 300.0, 40),
            TouchSample::moved(2, 600.0, 300.0, 70),
            TouchSample::up(2, 600.0, 300.0, 80),
            TouchSample::up(1, 400.0, 300.0, 90),
        ],
    );
    assert_eq!(
        events,
        vec![GestureEvent::MultiTouch {
            kind: MultiTouchKind::Spread,
            intensity: 1.0
        }]
    );

    let mut e = engine();
    let events = feed(
        &mut e,
        &[
            TouchSample::down(1, 400.0, 300.0, 0),
            TouchSample::down(2, 600.0, 300.0, 10),
            TouchSample::moved(2, 500.0, 300.0, 60),
            TouchSample::up(2, 500.0, 300.0, 70),
            TouchSample::up(1, 400.0, 300.0, 80),
        ],
    );
    assert_eq!(
        events,
        vec![GestureEvent::MultiTouch {
            kind: MultiTouchKind::Pinch,
            intensity: 0.5
        }]
    );
}

#[test]
fn rotation_is_reported() {
    let mut e = engine();
    // second contact swings 90 degrees around the first
    let events = feed(
        &mut e,
        &[
            TouchSample::down(1, 500.0, 500.0, 0),
            TouchSample::down(2, 600.0, 500.0, 10),
            TouchSample::moved(2, 570.7, 570.7, 40),
            TouchSample::moved(2, 500.0, 600.0, 70),
            TouchSample::up(2, 500.0, 600.0, 80),
            TouchSample::up(1, 500.0, 500.0, 90),
        ],
    );
    assert_eq!(events.len(), 1, "{events:?}");
    match events[0] {
        GestureEvent::MultiTouch {
            kind: MultiTouchKind::Rotate,
            intensity,
        } => assert!((intensity - 0.5).abs() < 1e-3),
        ref other => panic!("expected rotate, got {other:?}"),
    }
}

#[test]
fn leftover_contact_after_multi_is_ignored() {
    let mut e = engine();
    let events = feed(
        &mut e,
        &[
            TouchSample::down(1, 400.0, 300.0, 0),
            TouchSample::down(2, 500.0, 300.0, 10),
            TouchSample::moved(2, 600.0, 300.0, 50),
            TouchSample::up(2, 600.0, 300.0, 60),
            TouchSample::moved(1, 100.0, 300.0, 100),
            TouchSample::up(1, 100.0, 300.0, 150),
        ],
    );
    assert_eq!(events.len(), 1, "{events:?}");
    assert!(matches!(
        events[0],
        GestureEvent::MultiTouch {
            kind: MultiTouchKind::Spread,
            ..
        }
    ));
}

#[test]
fn state_resets_after_release() {
    let mut e = engine();
    let mut samples = drag((500.0, 500.0), 150.0, 0.0, 3, 30);
    samples.pop();
    feed(&mut e, &samples);
    assert!(e.gesture_state().active);
    assert_eq!(e.gesture_state().direction, Direction::Right);
    let (dx, _) = e.feedback_offset();
    assert!((dx - 45.0).abs() < 1e-3);

    feed(&mut e, &[TouchSample::up(1, 650.0, 500.0, 90)]);
    let g = e.gesture_state();
    assert!(!g.active);
    assert_eq!(g.direction, Direction::None);
    assert_eq!(g.intensity, 0.0);
    assert_eq!(e.active_contacts(), 0);
    assert!(e.multi_touch_state().is_none());
    assert_eq!(e.circle_points(), 0);
    assert_eq!(e.feedback_offset(), (0.0, 0.0));
}

#[test]
fn emergency_mode_lowers_swipe_threshold() {
    let samples = drag((500.0, 500.0), 35.0, 0.0, 3, 30);

    let mut normal = engine();
    assert!(swipes(&feed(&mut normal, &samples)).is_empty());

    let mut urgent = engine_in(OperatingMode::Emergency, "");
    let got = swipes(&feed(&mut urgent, &samples));
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].0, Direction::Right);
}

#[test]
fn mode_switch_applies_to_next_gesture() {
    let samples = drag((500.0, 500.0), 35.0, 0.0, 3, 30);
    let mut e = engine();
    assert!(swipes(&feed(&mut e, &samples)).is_empty());
    e.set_context(GestureContext::new(OperatingMode::Emergency, ""));
    let shifted: Vec<TouchSample> = samples
        .iter()
        .map(|s| TouchSample {
            time_ms: s.time_ms + 1_000,
            ..*s
        })
        .collect();
    assert_eq!(swipes(&feed(&mut e, &shifted)).len(), 1);
}

#[test]
fn long_press_fires_from_timer_once() {
    let mut e = engine();
    assert!(feed(&mut e, &[TouchSample::down(1, 500.0, 500.0, 0)]).is_empty());
    assert!(e.tick(799).is_empty());
    assert_eq!(e.tick(800), vec![GestureEvent::LongPress {
        at: gesturenav::sample::Point::new(500.0, 500.0)
    }]);
    assert!(e.tick(2_000).is_empty());
    let release = feed(&mut e, &[TouchSample::up(1, 501.0, 500.0, 2_100)]);
    assert!(release.is_empty(), "{release:?}");
}

#[test]
fn long_press_detected_at_release_without_ticks() {
    let mut e = engine();
    let events = feed(
        &mut e,
        &[
            TouchSample::down(1, 500.0, 500.0, 0),
            TouchSample::up(1, 500.0, 500.0, 900),
        ],
    );
    assert_eq!(events.len(), 1, "{events:?}");
    assert!(matches!(events[0], GestureEvent::LongPress { .. }));
}

#[test]
fn moving_cancels_long_press() {
    let mut e = engine();
    feed(
        &mut e,
        &[
            TouchSample::down(1, 500.0, 500.0, 0),
            TouchSample::moved(1, 530.0, 500.0, 100),
        ],
    );
    assert!(e.tick(1_000).is_empty());
}

#[test]
fn corner_hold_raises_emergency() {
    let mut e = engine();
    feed(&mut e, &[TouchSample::down(1, 20.0, 1_060.0, 0)]);
    let events = e.tick(800);
    assert_eq!(events.len(), 2, "{events:?}");
    assert!(matches!(events[0], GestureEvent::LongPress { .. }));
    assert_eq!(
        events[1],
        GestureEvent::Emergency {
            cause: EmergencyCause::CornerHold
        }
    );
}

#[test]
fn hold_away_from_corner_is_plain_long_press() {
    let mut e = engine();
    feed(&mut e, &[TouchSample::down(1, 960.0, 20.0, 0)]);
    let events = e.tick(800);
    assert_eq!(events.len(), 1, "{events:?}");
}

#[test]
fn cancel_produces_no_gesture() {
    let mut e = engine();
    let mut samples = drag((500.0, 500.0), 150.0, 0.0, 3, 30);
    if let Some(last) = samples.last_mut() {
        last.phase = gesturenav::sample::Phase::Cancel;
    }
    assert!(feed(&mut e, &samples).is_empty());
    assert_eq!(e.active_contacts(), 0);
}

#[test]
fn bundled_profile_matches_builtin_defaults() {
    let text = include_str!("../profiles/default.toml");
    let profile = Profile::parse(text, Path::new("default.toml")).unwrap();
    assert_eq!(profile.engine_config(), EngineConfig::default());
    assert_eq!(profile.initial_context().mode, OperatingMode::Normal);
    assert_eq!(profile.bindings.get("swipe.left").map(String::as_str), Some("key:ALT+RIGHT"));
}

fn spread_pair_with_third_contact(lift_third_first: bool) -> Vec<TouchSample> {
    let mut samples = vec![
        TouchSample::down(1, 400.0, 300.0, 0),
        TouchSample::down(2, 500.0, 300.0, 10),
        // a third finger lands after the tap window and wanders
        TouchSample::down(3, 900.0, 700.0, 600),
        TouchSample::moved(3, 200.0, 100.0, 630),
        TouchSample::moved(2, 600.0, 300.0, 660),
    ];
    if lift_third_first {
        samples.push(TouchSample::up(3, 200.0, 100.0, 680));
        samples.push(TouchSample::up(2, 600.0, 300.0, 700));
        samples.push(TouchSample::up(1, 400.0, 300.0, 720));
    } else {
        samples.push(TouchSample::up(2, 600.0, 300.0, 680));
        samples.push(TouchSample::moved(3, 250.0, 120.0, 700));
        samples.push(TouchSample::up(1, 400.0, 300.0, 720));
        samples.push(TouchSample::up(3, 250.0, 120.0, 740));
    }
    samples
}

#[test]
fn third_contact_does_not_affect_pair() {
    let spread = vec![GestureEvent::MultiTouch {
        kind: MultiTouchKind::Spread,
        intensity: 1.0,
    }];
    for lift_third_first in [false, true] {
        let mut e = engine();
        let events = feed(&mut e, &spread_pair_with_third_contact(lift_third_first));
        assert_eq!(events, spread, "lift_third_first={lift_third_first}");
        assert_eq!(e.active_contacts(), 0);
        assert!(!e.gesture_state().active);
    }
}

#[test]
fn pair_member_lift_with_third_down_classifies_once() {
    let mut e = engine();
    let samples = spread_pair_with_third_contact(false);
    // up to and including the pair member's lift
    let events = feed(&mut e, &samples[..6]);
    assert_eq!(events.len(), 1, "{events:?}");
    assert_eq!(e.active_contacts(), 2);
    assert!(e.multi_touch_state().is_none());
    assert!(feed(&mut e, &samples[6..]).is_empty());
}

/// Same-spot retaps reach the kernel as tracking-id changes only.
#[test]
fn same_spot_retaps_through_tracker() {
    use gesturenav::config::ScreenSize;
    use gesturenav::tracker::Tracker;

    let mut t = Tracker::new(ScreenSize::default());
    t.set_norm_ranges(0, 1000, 0, 1000);
    let mut e = engine();
    let mut events = Vec::new();
    for (i, id) in [10, 11, 12].into_iter().enumerate() {
        let down_ms = i as u64 * 150;
        t.on_slot(0);
        t.on_tracking_id(id);
        if i == 0 {
            t.on_pos_x(500);
            t.on_pos_y(500);
        }
        let down = t.on_syn_report(down_ms);
        assert_eq!(down.len(), 1, "tap {i} down frame: {down:?}");
        t.on_tracking_id(-1);
        let up = t.on_syn_report(down_ms + 60);
        assert_eq!(up.len(), 1, "tap {i} up frame: {up:?}");
        events.extend(feed(&mut e, &down));
        events.extend(feed(&mut e, &up));
    }
    let taps = events
        .iter()
        .filter(|ev| matches!(ev, GestureEvent::Tap { .. }))
        .count();
    assert_eq!(taps, 3, "{events:?}");
    assert!(events.contains(&GestureEvent::Emergency {
        cause: EmergencyCause::TripleTap
    }));
}
