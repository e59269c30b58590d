use anyhow::{Result, anyhow};
use log::{debug, info};

use crate::actions::NavigationSink;
use crate::config::Profile;
use crate::feedback::Feedback;
use crate::gestures::GestureEvent;

/// Runs the profile binding for `event`. Unbound gestures are a no-op.
pub fn dispatch_gesture(
    event: &GestureEvent,
    profile: &Profile,
    sink: &mut NavigationSink,
) -> Result<()> {
    let key = event.binding_key();
    debug!("feedback {key}: {:?}", Feedback::for_event(event));

    let Some(action) = profile.bindings.get(key).map(|a| a.trim()) else {
        return Ok(());
    };

    if action == "log" {
        info!("gesture {key}: {}", serde_json::to_string(event)?);
        return Ok(());
    }
    if let Some(rest) = action.strip_prefix("mouse:") {
        return sink.click_mouse(rest.trim());
    }
    if let Some(rest) = action.strip_prefix("scroll:") {
        let (axis, steps) = parse_scroll(rest)?;
        if axis.eq_ignore_ascii_case("vertical") {
            sink.scroll_vertical(steps)?;
        }
        return Ok(());
    }
    if let Some(rest) = action.strip_prefix("key:") {
        return sink.key_chord(rest.trim());
    }
    if let Some(rest) = action.strip_prefix("cmd:") {
        if !profile.meta.allow_commands {
            return Err(anyhow!("binding '{key}' uses cmd: but allow_commands=false"));
        }
        return sink.run_command(rest.trim());
    }

    Err(anyhow!("unknown action mapping for {key} -> '{action}'"))
}

/// "vertical@-3" -> ("vertical", -3); steps default to +1.
fn parse_scroll(spec: &str) -> Result<(&str, i32)> {
    let mut parts = spec.splitn(2, '@');
    let axis = parts.next().map(str::trim).unwrap_or("vertical");
    let steps = match parts.next() {
        Some(s) => s
            .trim()
            .parse()
            .map_err(|_| anyhow!("bad scroll steps in '{spec}'"))?,
        None => 1,
    };
    Ok((axis, steps))
}
