use anyhow::{Context, Result, anyhow};
use directories::UserDirs;
use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::actions;
use crate::error::ProfileError;
use crate::gestures::{EngineConfig, GestureContext};
use crate::input;
use crate::sensitivity::{OperatingMode, SensitivityTable};

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
    #[serde(default)]
    pub allow_commands: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub mode: OperatingMode,
    pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenSize {
    pub width: f32,
    pub height: f32,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

/// Tuning for the pattern matchers and feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub tap_interval_ms: u64,
    pub tap_count: u32,
    pub parallax: f32,
    /// px/s that maps to full swipe intensity.
    pub velocity_scale: f32,
    pub circle_roles: Vec<String>,
    pub circle_capacity: usize,
    pub circle_min_points: usize,
    pub circle_min_radius: f32,
    pub circle_tolerance: f32,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            tap_interval_ms: 500,
            tap_count: 3,
            parallax: 0.3,
            velocity_scale: 1000.0,
            circle_roles: vec!["coordinator".to_string()],
            circle_capacity: 20,
            circle_min_points: 8,
            circle_min_radius: 50.0,
            circle_tolerance: 0.3,
        }
    }
}

impl PatternConfig {
    fn validate(&self) -> Result<(), ProfileError> {
        let bad = |field: &'static str, reason: &str| ProfileError::InvalidPattern {
            field,
            reason: reason.to_string(),
        };
        if self.tap_interval_ms == 0 {
            return Err(bad("tap_interval_ms", "must be positive"));
        }
        if self.tap_count < 2 {
            return Err(bad("tap_count", "must be at least 2"));
        }
        if !(0.0..=1.0).contains(&self.parallax) {
            return Err(bad("parallax", "must be in [0, 1]"));
        }
        if !(self.velocity_scale > 0.0) {
            return Err(bad("velocity_scale", "must be positive"));
        }
        if self.circle_capacity == 0 {
            return Err(bad("circle_capacity", "must be positive"));
        }
        if self.circle_min_points < 3 || self.circle_min_points > self.circle_capacity {
            return Err(bad(
                "circle_min_points",
                "must be at least 3 and not exceed circle_capacity",
            ));
        }
        if !(self.circle_tolerance > 0.0) {
            return Err(bad("circle_tolerance", "must be positive"));
        }
        if self.circle_min_radius < 0.0 {
            return Err(bad("circle_min_radius", "must not be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub meta: Meta,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub screen: ScreenSize,
    #[serde(default)]
    pub thresholds: SensitivityTable,
    #[serde(default)]
    pub patterns: PatternConfig,

    // nested/dotted tables flattened into "a.b" -> "value"
    #[serde(default, deserialize_with = "deserialize_bindings_flat")]
    pub bindings: HashMap<String, String>,
}

impl Profile {
    pub fn parse(text: &str, path: &Path) -> Result<Self, ProfileError> {
        let profile: Profile = toml::from_str(text).map_err(|source| ProfileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        if !(self.screen.width > 0.0 && self.screen.height > 0.0) {
            return Err(ProfileError::InvalidScreen {
                width: self.screen.width,
                height: self.screen.height,
            });
        }
        self.thresholds.validate()?;
        self.patterns.validate()?;

        for (k, v) in &self.bindings {
            if k.trim().is_empty() {
                return Err(ProfileError::EmptyBindingKey);
            }
            let v = v.trim();
            let ok = v.starts_with("mouse:")
                || v.starts_with("scroll:")
                || v.starts_with("key:")
                || v.starts_with("cmd:")
                || v == "log";
            let target_ok = if let Some(chord) = v.strip_prefix("key:") {
                actions::parse_chord(chord.trim()).is_ok()
            } else if let Some(button) = v.strip_prefix("mouse:") {
                actions::MouseButton::parse(button).is_ok()
            } else {
                true
            };
            if !(ok && target_ok) {
                return Err(ProfileError::InvalidBinding {
                    key: k.clone(),
                    action: v.to_string(),
                });
            }
            if v.starts_with("cmd:") && !self.meta.allow_commands {
                return Err(ProfileError::CommandsDisabled(k.clone()));
            }
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            sensitivity: self.thresholds.clone(),
            patterns: self.patterns.clone(),
            screen: self.screen,
        }
    }

    pub fn initial_context(&self) -> GestureContext {
        GestureContext {
            mode: self.context.mode,
            role: self.context.role.clone(),
        }
    }
}

fn deserialize_bindings_flat<'de, D>(
    de: D,
) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = toml::Value::deserialize(de)?;
    let table = match val {
        toml::Value::Table(t) => t,
        other => {
            return Err(serde::de::Error::custom(format!(
                "bindings must be a table, got {:?}",
                other.type_str()
            )));
        }
    };

    let mut out = HashMap::new();
    flatten_table("", &table, &mut out).map_err(serde::de::Error::custom)?;
    Ok(out)
}

fn flatten_table(
    prefix: &str,
    table: &toml::value::Table,
    out: &mut HashMap<String, String>,
) -> std::result::Result<(), String> {
    for (k, v) in table {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        match v {
            toml::Value::String(s) => {
                out.insert(key, s.clone());
            }
            toml::Value::Table(sub) => {
                flatten_table(&key, sub, out)?;
            }
            other => {
                return Err(format!(
                    "binding '{}' value must be a string, got {}",
                    key,
                    other.type_str()
                ));
            }
        }
    }
    Ok(())
}

/// Profile directory layout plus the currently loaded profile.
#[derive(Debug, Clone)]
pub struct DaemonConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
    pub detected_devices: Vec<String>,
}

pub fn default_config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(dirs.home_dir().join(".config").join("gesturenav"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl DaemonConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        let dir = default_config_dir()?;
        let mut state = Self::load_from(&dir)?;
        state.detected_devices = input::discover_multitouch()
            .into_iter()
            .map(|d| format!("{} ({})", d.name, d.path))
            .collect();
        Ok(state)
    }

    /// Loads from an explicit config dir, installing the bundled default
    /// profile and active pointer if missing. Does not probe devices.
    pub fn load_from(config_dir: &Path) -> Result<Self> {
        let profiles_dir = config_dir.join("profiles");
        fs::create_dir_all(&profiles_dir)
            .with_context(|| format!("creating {}", profiles_dir.display()))?;

        let def_path = profiles_dir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = config_dir.join("active");
        if !active_ptr.exists() {
            fs::write(&active_ptr, b"default")?;
        }

        let mut active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        if active_name.is_empty() {
            warn!("active pointer is empty; using 'default'");
            active_name = "default".to_string();
        }
        let profile = load_profile(&profiles_dir, &active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir: config_dir.to_path_buf(),
            profiles_dir,
            active_ptr,
            detected_devices: Vec::new(),
        })
    }

    /// On error the previously loaded profile stays in place.
    pub fn reload(&mut self) -> Result<()> {
        self.profile = load_profile(&self.profiles_dir, &self.active_name)?;
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profile_path(name);
        if !p.exists() {
            return Err(ProfileError::NotFound(p).into());
        }
        let profile = load_profile(&self.profiles_dir, name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.profile = profile;
        Ok(())
    }

    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(format!("{name}.toml"))
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }

    pub fn doctor_report(&self, context: &GestureContext) -> serde_json::Value {
        let uinput_ok = Path::new("/dev/uinput").exists();
        let in_input_group = check_in_input_group();
        serde_json::json!({
            "uinput_present": uinput_ok,
            "input_group_member": in_input_group,
            "profiles_dir": self.profiles_dir,
            "active_profile": self.active_name,
            "mode": context.mode.as_str(),
            "role": context.role,
            "circle_enabled": self.profile.patterns.circle_roles.contains(&context.role),
            "devices": self.detected_devices,
            "hints": {
                "udev_rule": "/etc/udev/rules.d/80-uinput.rules",
                "add_user_to_input_group": "sudo usermod -aG input $USER && newgrp input"
            }
        })
    }
}

fn load_profile(profiles_dir: &Path, name: &str) -> Result<Profile> {
    let path = profiles_dir.join(format!("{name}.toml"));
    let txt = fs::read_to_string(&path).map_err(|source| ProfileError::Read {
        path: path.clone(),
        source,
    })?;
    Ok(Profile::parse(&txt, &path)?)
}

fn check_in_input_group() -> bool {
    let Ok(s) = fs::read_to_string("/etc/group") else {
        return false;
    };
    let user = whoami::username();
    s.lines()
        .filter(|line| line.starts_with("input:"))
        .any(|line| {
            line.split(':')
                .nth(3)
                .unwrap_or("")
                .split(',')
                .any(|u| u == user)
        })
}
