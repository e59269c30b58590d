use anyhow::{Result, anyhow};
use log::{error, info, warn};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    io::{BufRead, BufReader, Write},
    os::unix::net::{UnixListener, UnixStream},
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    thread,
    time::{Duration, Instant},
};

use super::pipeline::run_pipeline;
use super::runtime::socket_path;
use super::watch::watch_profiles;
use super::{Settings, SharedSettings};
use crate::config::DaemonConfigState;
use crate::gestures::{GestureContext, GestureEvent, Timer};
use crate::sensitivity::OperatingMode;

/// Editors tend to emit several events per save (truncate, then write).
const RELOAD_DEBOUNCE_MS: u64 = 250;

pub fn run_daemon() -> Result<()> {
    // socket
    let sock = socket_path()?;
    if sock.exists() {
        let _ = std::fs::remove_file(&sock);
    }
    let listener = UnixListener::bind(&sock)?;
    listener.set_nonblocking(true)?;
    info!("daemon: listening on {}", sock.display());

    // state
    let mut state = DaemonState::new()?;
    info!(
        "daemon: active profile '{}' (mode {}, role '{}')",
        state.cfg.active_name, state.context.mode, state.context.role
    );
    let settings: SharedSettings = Arc::new(Mutex::new(Settings::new(state.cfg.profile.clone())));

    // channels
    let (tx_req, rx_req) = mpsc::channel::<IpcMsg>();
    let (tx_evt, rx_evt) = mpsc::channel::<DaemonEvent>();

    spawn_signal_listener(tx_req.clone())?;
    let _watcher = match watch_profiles(&state.cfg.profiles_dir, tx_req.clone()) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("profile hot-reload disabled: {e}");
            None
        }
    };

    // gesture thread
    let gesture_thread = GestureThread::start(settings.clone(), tx_evt)?;

    let result = control_loop(&listener, &mut state, &settings, &tx_req, &rx_req, &rx_evt);

    gesture_thread.stop();
    let _ = std::fs::remove_file(&sock);
    info!("daemon: stopped");
    result
}

fn control_loop(
    listener: &UnixListener,
    state: &mut DaemonState,
    settings: &SharedSettings,
    tx_req: &Sender<IpcMsg>,
    rx_req: &Receiver<IpcMsg>,
    rx_evt: &Receiver<DaemonEvent>,
) -> Result<()> {
    let mut pending_reload = ReloadDebounce::new(Instant::now());

    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                let tx = tx_req.clone();
                let snapshot = state.clone_shallow();
                thread::spawn(move || {
                    if let Err(e) = handle_client(stream, snapshot, tx) {
                        error!("ipc client error: {e}");
                    }
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => warn!("accept failed: {e}"),
        }

        while let Ok(DaemonEvent::Recognized(ev)) = rx_evt.try_recv() {
            state.recognized += 1;
            state.last_gesture = Some(ev);
        }

        while let Ok(msg) = rx_req.try_recv() {
            match msg {
                IpcMsg::Reload => state.reload(settings),
                IpcMsg::ProfileChanged(path) => {
                    if path == state.cfg.profile_path(&state.cfg.active_name) {
                        pending_reload.touch(Instant::now());
                    }
                }
                IpcMsg::UseProfile(name) => {
                    if let Err(e) = state.cfg.set_active(&name) {
                        error!("use profile failed: {e}");
                    } else {
                        state.apply_profile(settings);
                        info!("switched active profile to {}", state.cfg.active_name);
                    }
                }
                IpcMsg::SetMode(mode) => {
                    state.context.mode = mode;
                    state.publish_context(settings);
                    info!("operating mode set to {mode}");
                }
                IpcMsg::SetRole(role) => {
                    info!("role set to '{role}'");
                    state.context.role = role;
                    state.publish_context(settings);
                }
                IpcMsg::Shutdown => return Ok(()),
            }
        }

        if pending_reload.due(Instant::now()) {
            info!("active profile changed on disk");
            state.reload(settings);
        }

        thread::sleep(Duration::from_millis(5));
    }
}

/// Trailing-edge debounce: reloads once no change arrived for
/// `RELOAD_DEBOUNCE_MS`.
struct ReloadDebounce {
    started: Instant,
    timer: Timer,
}

impl ReloadDebounce {
    fn new(started: Instant) -> Self {
        Self {
            started,
            timer: Timer::default(),
        }
    }

    fn ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started).as_millis() as u64
    }

    fn touch(&mut self, now: Instant) {
        let now_ms = self.ms(now);
        self.timer.schedule(now_ms, RELOAD_DEBOUNCE_MS);
    }

    fn due(&mut self, now: Instant) -> bool {
        let now_ms = self.ms(now);
        self.timer.poll(now_ms)
    }
}

fn handle_client(mut stream: UnixStream, st: DaemonState, tx_req: Sender<IpcMsg>) -> Result<()> {
    // accepted sockets inherit non-blocking mode on some platforms
    stream.set_nonblocking(false)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim().is_empty() {
        return Ok(());
    }
    let req: serde_json::Value = serde_json::from_str(&line)?;
    let op = req.get("op").and_then(|v| v.as_str()).unwrap_or("");
    let arg = |key: &str| req.get(key).and_then(|v| v.as_str()).unwrap_or("").to_string();

    let resp = match op {
        "status" => serde_json::json!({"ok": true, "data": {
            "active_profile": st.cfg.active_name,
            "mode": st.context.mode.as_str(),
            "role": st.context.role,
            "recognized": st.recognized,
            "last_gesture": st.last_gesture,
            "socket": socket_path()?,
            "devices": st.cfg.detected_devices,
            "pid": std::process::id(),
        }}),
        "reload" => {
            let _ = tx_req.send(IpcMsg::Reload);
            serde_json::json!({"ok": true, "data": {"active_profile": st.cfg.active_name}})
        }
        "use" => {
            let name = arg("profile");
            if name.is_empty() {
                serde_json::json!({"ok": false, "error": "missing profile name"})
            } else if !st.cfg.profile_path(&name).exists() {
                serde_json::json!({"ok": false, "error": format!("profile not found: {name}")})
            } else {
                let _ = tx_req.send(IpcMsg::UseProfile(name.clone()));
                serde_json::json!({"ok": true, "data": {"active_profile": name}})
            }
        }
        "list" => {
            let list = st.cfg.list_profiles();
            serde_json::json!({"ok": true, "data": {"profiles": list, "active": st.cfg.active_name}})
        }
        "doctor" => {
            let report = st.cfg.doctor_report(&st.context);
            serde_json::json!({"ok": true, "data": report})
        }
        "mode" => match arg("mode").parse::<OperatingMode>() {
            Ok(mode) => {
                let _ = tx_req.send(IpcMsg::SetMode(mode));
                serde_json::json!({"ok": true, "data": {"mode": mode.as_str()}})
            }
            Err(e) => serde_json::json!({"ok": false, "error": e.to_string()}),
        },
        "role" => {
            let role = arg("role");
            let _ = tx_req.send(IpcMsg::SetRole(role.clone()));
            serde_json::json!({"ok": true, "data": {"role": role}})
        }
        "shutdown" => {
            let _ = tx_req.send(IpcMsg::Shutdown);
            serde_json::json!({"ok": true, "data": "shutting down"})
        }
        _ => serde_json::json!({"ok": false, "error": format!("unknown op: {op}")}),
    };

    writeln!(stream, "{resp}")?;
    Ok(())
}

fn spawn_signal_listener(tx: Sender<IpcMsg>) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!("daemon: received signal {sig}, shutting down");
            let _ = tx.send(IpcMsg::Shutdown);
        }
    });
    Ok(())
}

struct DaemonState {
    cfg: DaemonConfigState,
    context: GestureContext,
    recognized: u64,
    last_gesture: Option<GestureEvent>,
}

impl DaemonState {
    fn new() -> Result<Self> {
        let cfg = DaemonConfigState::load_or_install_default()?;
        let context = cfg.profile.initial_context();
        Ok(Self {
            cfg,
            context,
            recognized: 0,
            last_gesture: None,
        })
    }

    fn clone_shallow(&self) -> Self {
        Self {
            cfg: self.cfg.clone(),
            context: self.context.clone(),
            recognized: self.recognized,
            last_gesture: self.last_gesture.clone(),
        }
    }

    fn reload(&mut self, settings: &SharedSettings) {
        match self.cfg.reload() {
            Ok(()) => {
                self.apply_profile(settings);
                info!("profile reloaded");
            }
            Err(e) => error!("reload failed, keeping last good profile: {e}"),
        }
    }

    /// A freshly loaded profile also resets mode/role to its [context].
    fn apply_profile(&mut self, settings: &SharedSettings) {
        self.context = self.cfg.profile.initial_context();
        let mut s = settings.lock().unwrap_or_else(|p| p.into_inner());
        s.replace_profile(self.cfg.profile.clone());
        s.set_context(self.context.clone());
    }

    fn publish_context(&self, settings: &SharedSettings) {
        let mut s = settings.lock().unwrap_or_else(|p| p.into_inner());
        s.set_context(self.context.clone());
    }
}

pub enum IpcMsg {
    Reload,
    ProfileChanged(PathBuf),
    UseProfile(String),
    SetMode(OperatingMode),
    SetRole(String),
    Shutdown,
}

pub enum DaemonEvent {
    Recognized(GestureEvent),
}

struct GestureThread {
    stop: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

impl GestureThread {
    fn start(settings: SharedSettings, tx_evt: Sender<DaemonEvent>) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let handle = thread::Builder::new()
            .name("gesture-pipeline".into())
            .spawn(move || {
                if let Err(e) = run_pipeline(settings, tx_evt, stop_flag) {
                    error!("gesture pipeline failed: {e}");
                }
            })?;
        Ok(Self { stop, handle })
    }

    fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        if self.handle.join().is_err() {
            error!("gesture pipeline panicked");
        }
    }
}

// client helper
pub fn client_request(req: serde_json::Value) -> Result<serde_json::Value> {
    let sock = socket_path()?;
    if !sock.exists() {
        return Err(anyhow!(
            "gesturenav daemon is not running (socket missing at {})",
            sock.display()
        ));
    }
    let mut stream = UnixStream::connect(sock)?;
    let line = serde_json::to_string(&req)? + "\n";
    stream.write_all(line.as_bytes())?;
    let mut reader = BufReader::new(stream);
    let mut resp = String::new();
    reader.read_line(&mut resp)?;
    let v: serde_json::Value = serde_json::from_str(&resp)?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_waits_for_last_change() {
        let t0 = Instant::now();
        let at = |ms: u64| t0 + Duration::from_millis(ms);
        let mut d = ReloadDebounce::new(t0);
        assert!(!d.due(at(1_000)));

        // truncate, then write 5ms later
        d.touch(at(0));
        d.touch(at(5));
        assert!(!d.due(at(250)));
        assert!(d.due(at(255)));
        assert!(!d.due(at(600)));
    }

    #[test]
    fn steady_edits_postpone_reload() {
        let t0 = Instant::now();
        let at = |ms: u64| t0 + Duration::from_millis(ms);
        let mut d = ReloadDebounce::new(t0);
        for ms in (0..1_000).step_by(100) {
            d.touch(at(ms));
            assert!(!d.due(at(ms + 50)));
        }
        assert!(d.due(at(1_150)));
    }
}
