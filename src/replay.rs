//! Offline replay of recorded touch traces.
//!
//! A trace is JSON lines, one `TouchSample` per line. Blank lines and lines
//! starting with `#` are skipped.

use anyhow::{Context, Result};
use std::io::BufRead;

use crate::feedback::GestureHandler;
use crate::gestures::GestureEngine;
use crate::sample::TouchSample;

pub fn parse_trace(reader: impl BufRead) -> Result<Vec<TouchSample>> {
    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let sample: TouchSample = serde_json::from_str(line)
            .with_context(|| format!("trace line {}: invalid sample", idx + 1))?;
        out.push(sample);
    }
    Ok(out)
}

/// Feeds samples in order, then lets every pending timer expire so a
/// trailing long-press is reported.
pub fn run(engine: &mut GestureEngine, samples: &[TouchSample], handler: &mut dyn GestureHandler) {
    for s in samples {
        engine.handle_with(s, handler);
    }
    while let Some(deadline) = engine.next_deadline() {
        engine.tick_with(deadline, handler);
    }
}
