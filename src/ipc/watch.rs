use anyhow::Result;
use log::{debug, warn};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{path::Path, sync::mpsc::Sender};

use super::server::IpcMsg;

/// Watches the profiles directory and forwards edits to the control loop.
/// The returned watcher must be kept alive.
pub fn watch_profiles(dir: &Path, tx: Sender<IpcMsg>) -> Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(ev) if matches!(ev.kind, EventKind::Create(_) | EventKind::Modify(_)) => {
                for path in ev.paths {
                    if path.extension().is_some_and(|e| e == "toml") {
                        debug!("watch: {} changed", path.display());
                        let _ = tx.send(IpcMsg::ProfileChanged(path));
                    }
                }
            }
            Ok(_) => {}
            Err(e) => warn!("profile watch error: {e}"),
        }
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
