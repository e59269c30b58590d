use anyhow::Result;
use log::{debug, error, info, trace, warn};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
    },
    thread,
    time::{Duration, Instant},
};

use evdev::{AbsoluteAxisCode, Device, EventType, SynchronizationCode};

use super::SharedSettings;
use super::server::DaemonEvent;
use crate::actions::NavigationSink;
use crate::feedback::Feedback;
use crate::gestures::GestureEngine;
use crate::input;
use crate::tracker::Tracker;

/// One touch device with its own slot tracker and recognizer.
struct Surface {
    name: String,
    dev: Device,
    tracker: Tracker,
    engine: GestureEngine,
}

pub fn run_pipeline(
    settings: SharedSettings,
    tx_evt: Sender<DaemonEvent>,
    stop: Arc<AtomicBool>,
) -> Result<()> {
    let (mut profile, context, mut profile_rev, mut context_rev) = {
        let s = lock(&settings);
        (
            s.profile.clone(),
            s.context.clone(),
            s.profile_rev,
            s.context_rev,
        )
    };

    let mut surfaces = Vec::new();
    for d in input::discover_multitouch() {
        match Device::open(&d.path) {
            Ok(mut dev) => {
                if let Err(e) = dev.set_nonblocking(true) {
                    warn!("failed to set {} nonblocking: {e}", d.path);
                    continue;
                }
                let mut tracker = Tracker::new(profile.screen);
                if let Some(r) = input::axis_ranges(&dev) {
                    tracker.set_norm_ranges(r.x_min, r.x_max, r.y_min, r.y_max);
                }
                info!("pipeline: using {} ({})", d.name, d.path);
                surfaces.push(Surface {
                    name: d.name,
                    dev,
                    tracker,
                    engine: GestureEngine::new(profile.engine_config(), context.clone()),
                });
            }
            Err(e) => warn!("failed to open {}: {e}", d.path),
        }
    }
    if surfaces.is_empty() {
        warn!("no usable multitouch devices; pipeline idle");
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(200));
        }
        return Ok(());
    }

    let mut sink = NavigationSink::new().unwrap_or_else(|e| {
        warn!("uinput unavailable ({e}); bindings will not be emitted");
        NavigationSink::noop()
    });
    if sink.is_virtual() {
        info!("pipeline: bindings go to the uinput device");
    }
    let started = Instant::now();
    let now_ms = || started.elapsed().as_millis() as u64;

    while !stop.load(Ordering::Relaxed) {
        // pick up profile/context changes from the control loop
        {
            let s = lock(&settings);
            if s.profile_rev != profile_rev {
                profile_rev = s.profile_rev;
                profile = s.profile.clone();
                for surf in surfaces.iter_mut() {
                    surf.tracker.set_screen(profile.screen);
                    surf.engine.reconfigure(profile.engine_config());
                }
                debug!("pipeline: profile revision {profile_rev}");
            }
            if s.context_rev != context_rev {
                context_rev = s.context_rev;
                for surf in surfaces.iter_mut() {
                    surf.engine.set_context(s.context.clone());
                }
                debug!("pipeline: context revision {context_rev}");
            }
        }

        let mut any_event = false;
        for surf in surfaces.iter_mut() {
            let mut samples = Vec::new();
            match surf.dev.fetch_events() {
                Ok(events) => {
                    for ev in events {
                        any_event = true;
                        if ev.event_type() == EventType::ABSOLUTE {
                            match ev.code() {
                                c if c == AbsoluteAxisCode::ABS_MT_SLOT.0 => {
                                    surf.tracker.on_slot(ev.value())
                                }
                                c if c == AbsoluteAxisCode::ABS_MT_TRACKING_ID.0 => {
                                    surf.tracker.on_tracking_id(ev.value())
                                }
                                c if c == AbsoluteAxisCode::ABS_MT_POSITION_X.0 => {
                                    surf.tracker.on_pos_x(ev.value())
                                }
                                c if c == AbsoluteAxisCode::ABS_MT_POSITION_Y.0 => {
                                    surf.tracker.on_pos_y(ev.value())
                                }
                                _ => {}
                            }
                        } else if ev.event_type() == EventType::SYNCHRONIZATION
                            && ev.code() == SynchronizationCode::SYN_REPORT.0
                        {
                            samples.extend(surf.tracker.on_syn_report(now_ms()));
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    error!("{}: read failed: {e}", surf.name);
                    samples.extend(surf.tracker.cancel_all(now_ms()));
                }
            }

            let mut recognized = Vec::new();
            for s in &samples {
                recognized.extend(surf.engine.handle(s));
            }
            if !samples.is_empty() {
                if let Some(fb) = Feedback::translate(surf.engine.feedback_offset()) {
                    trace!("{}: {fb:?}", surf.name);
                }
            }
            recognized.extend(surf.engine.tick(now_ms()));

            for ev in recognized {
                if let Err(e) = super::dispatch::dispatch_gesture(&ev, &profile, &mut sink) {
                    error!("dispatch failed: {e}");
                }
                let _ = tx_evt.send(DaemonEvent::Recognized(ev));
            }
        }

        if !any_event {
            thread::sleep(Duration::from_millis(4));
        }
    }

    for surf in surfaces.iter_mut() {
        surf.engine.shutdown();
    }
    info!("pipeline: stopped");
    Ok(())
}

fn lock(settings: &SharedSettings) -> std::sync::MutexGuard<'_, super::Settings> {
    settings.lock().unwrap_or_else(|p| p.into_inner())
}
