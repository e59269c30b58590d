use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use std::process::Command;

/// Virtual input device that bound gestures are replayed through.
pub struct NavigationSink {
    #[allow(dead_code)]
    linux: Option<Box<LinuxUinput>>,
}

impl NavigationSink {
    pub fn new() -> Result<Self> {
        #[cfg(target_os = "linux")]
        {
            let dev = LinuxUinput::create()?;
            return Ok(Self {
                linux: Some(Box::new(dev)),
            });
        }
        #[allow(unreachable_code)]
        {
            warn!("uinput not available; running in NO-OP mode");
            Ok(Self::noop())
        }
    }

    /// Sink that accepts every action and emits nothing.
    pub fn noop() -> Self {
        Self { linux: None }
    }

    pub fn is_virtual(&self) -> bool {
        self.linux.is_some()
    }

    pub fn scroll_vertical(&mut self, steps: i32) -> Result<()> {
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            dev.scroll_vertical(steps)?;
        }
        Ok(())
    }

    pub fn click_mouse(&mut self, which: &str) -> Result<()> {
        let button = MouseButton::parse(which)?;
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            dev.click(button)?;
        }
        #[cfg(not(target_os = "linux"))]
        let _ = button;
        Ok(())
    }

    /// Send a chord like "ALT+LEFT" or a single "PAGEDOWN".
    pub fn key_chord(&mut self, chord: &str) -> Result<()> {
        let tokens = parse_chord(chord)?;
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            let keys = tokens
                .iter()
                .map(|t| map_key(t))
                .collect::<Result<Vec<_>>>()?;
            // press in order
            for k in &keys {
                dev.key_send(*k, 1)?;
            }
            dev.sync()?;
            // release in reverse
            for k in keys.iter().rev() {
                dev.key_send(*k, 0)?;
            }
            dev.sync()?;
        }
        #[cfg(not(target_os = "linux"))]
        let _ = tokens;
        Ok(())
    }

    /// Runs a shell command detached; the caller gates this on
    /// `allow_commands`.
    pub fn run_command(&mut self, cmd: &str) -> Result<()> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .spawn()
            .with_context(|| format!("spawning '{cmd}'"))?;
        info!("spawned '{cmd}' (pid={})", child.id());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn parse(which: &str) -> Result<Self> {
        match which.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "middle" => Ok(Self::Middle),
            other => Err(anyhow!("unknown mouse button: {other}")),
        }
    }
}

/// Key names accepted in chords.
const KEY_TOKENS: &[&str] = &[
    "CTRL", "CONTROL", "ALT", "SHIFT", "SUPER", "META", "WIN", "TAB", "MINUS", "-", "EQUAL", "=",
    "LEFT", "RIGHT", "UP", "DOWN", "PAGEUP", "PAGEDOWN", "HOME", "END", "ESC", "ENTER", "SPACE",
];

/// Splits and validates a chord without touching any device.
pub fn parse_chord(chord: &str) -> Result<Vec<String>> {
    let parts: Vec<String> = chord
        .split('+')
        .map(|s| s.trim().to_ascii_uppercase())
        .collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(anyhow!("malformed key chord: '{chord}'"));
    }
    for p in &parts {
        if !KEY_TOKENS.contains(&p.as_str()) {
            return Err(anyhow!("unsupported key token: {p}"));
        }
    }
    Ok(parts)
}

#[cfg(target_os = "linux")]
fn map_key(tok: &str) -> Result<uinput::event::keyboard::Key> {
    use uinput::event::keyboard::Key as K;
    let k = match tok {
        "CTRL" | "CONTROL" => K::LeftControl,
        "ALT" => K::LeftAlt,
        "SHIFT" => K::LeftShift,
        "SUPER" | "META" | "WIN" => K::LeftMeta,
        "TAB" => K::Tab,
        "MINUS" | "-" => K::Minus,
        "EQUAL" | "=" => K::Equal,
        "LEFT" => K::Left,
        "RIGHT" => K::Right,
        "UP" => K::Up,
        "DOWN" => K::Down,
        "PAGEUP" => K::PageUp,
        "PAGEDOWN" => K::PageDown,
        "HOME" => K::Home,
        "END" => K::End,
        "ESC" => K::Esc,
        "ENTER" => K::Enter,
        "SPACE" => K::Space,
        other => return Err(anyhow!("unsupported key token: {other}")),
    };
    Ok(k)
}

#[cfg(target_os = "linux")]
struct LinuxUinput {
    dev: uinput::device::Device,
}

#[cfg(target_os = "linux")]
impl LinuxUinput {
    fn create() -> Result<Self> {
        use uinput::event::{controller::Mouse, keyboard::Key, relative};

        let mut builder = uinput::default()?
            .name("Gesturenav Virtual Input")?
            .event(relative::Position::X)?
            .event(relative::Position::Y)?
            .event(relative::Wheel::Vertical)?
            .event(Mouse::Left)?
            .event(Mouse::Right)?
            .event(Mouse::Middle)?;
        for key in [
            Key::LeftControl,
            Key::LeftAlt,
            Key::LeftShift,
            Key::LeftMeta,
            Key::Tab,
            Key::Minus,
            Key::Equal,
            Key::Left,
            Key::Right,
            Key::Up,
            Key::Down,
            Key::PageUp,
            Key::PageDown,
            Key::Home,
            Key::End,
            Key::Esc,
            Key::Enter,
            Key::Space,
        ] {
            builder = builder.event(key)?;
        }
        let dev = builder.create()?;

        info!("uinput: created virtual device");
        Ok(Self { dev })
    }

    fn sync(&mut self) -> Result<()> {
        self.dev.synchronize()?;
        Ok(())
    }

    fn key_send(&mut self, key: uinput::event::keyboard::Key, val: i32) -> Result<()> {
        self.dev.send(key, val)?;
        Ok(())
    }

    fn click(&mut self, button: MouseButton) -> Result<()> {
        use uinput::event::controller::Mouse;
        let code = || match button {
            MouseButton::Left => Mouse::Left,
            MouseButton::Right => Mouse::Right,
            MouseButton::Middle => Mouse::Middle,
        };
        self.dev.send(code(), 1)?;
        self.sync()?;
        self.dev.send(code(), 0)?;
        self.sync()
    }

    fn scroll_vertical(&mut self, steps: i32) -> Result<()> {
        use uinput::event::relative::Wheel;
        self.dev.send(Wheel::Vertical, steps)?;
        self.sync()
    }
}
