//! Operating mode → threshold selection.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::ProfileError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    #[default]
    Normal,
    #[serde(alias = "high-stress")]
    HighStress,
    Emergency,
}

impl OperatingMode {
    pub const ALL: [OperatingMode; 3] = [Self::Normal, Self::HighStress, Self::Emergency];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::HighStress => "high_stress",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatingMode {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "normal" => Ok(Self::Normal),
            "high_stress" | "stress" => Ok(Self::HighStress),
            "emergency" => Ok(Self::Emergency),
            other => Err(ProfileError::UnknownMode(other.to_string())),
        }
    }
}

/// Thresholds in effect for one operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sensitivity {
    /// Max displacement (px) for a contact to still count as a tap.
    pub tap_px: f32,
    /// Min displacement (px) before a direction is reported.
    pub swipe_px: f32,
    pub long_press_ms: u64,
    /// Min |scale - 1| for pinch/spread.
    pub pinch: f32,
    pub rotation_deg: f32,
    /// Distance from a screen corner that arms the corner hold.
    pub corner_margin_px: f32,
}

impl Sensitivity {
    pub const NORMAL: Sensitivity = Sensitivity {
        tap_px: 10.0,
        swipe_px: 50.0,
        long_press_ms: 800,
        pinch: 0.2,
        rotation_deg: 15.0,
        corner_margin_px: 60.0,
    };

    pub const HIGH_STRESS: Sensitivity = Sensitivity {
        tap_px: 8.0,
        swipe_px: 40.0,
        long_press_ms: 600,
        pinch: 0.15,
        rotation_deg: 12.0,
        corner_margin_px: 80.0,
    };

    pub const EMERGENCY: Sensitivity = Sensitivity {
        tap_px: 5.0,
        swipe_px: 30.0,
        long_press_ms: 400,
        pinch: 0.1,
        rotation_deg: 10.0,
        corner_margin_px: 100.0,
    };

    /// Pure lookup; no state is kept between calls.
    pub fn select(mode: OperatingMode, table: &SensitivityTable) -> Sensitivity {
        match mode {
            OperatingMode::Normal => table.normal,
            OperatingMode::HighStress => table.high_stress,
            OperatingMode::Emergency => table.emergency,
        }
    }

    fn check_positive(&self, mode: OperatingMode) -> Result<(), ProfileError> {
        let fields = [
            ("tap_px", self.tap_px),
            ("swipe_px", self.swipe_px),
            ("long_press_ms", self.long_press_ms as f32),
            ("pinch", self.pinch),
            ("rotation_deg", self.rotation_deg),
            ("corner_margin_px", self.corner_margin_px),
        ];
        for (field, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(ProfileError::InvalidThreshold {
                    mode: mode.as_str(),
                    field,
                    value: value as f64,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityTable {
    pub normal: Sensitivity,
    pub high_stress: Sensitivity,
    pub emergency: Sensitivity,
}

impl Default for SensitivityTable {
    fn default() -> Self {
        Self {
            normal: Sensitivity::NORMAL,
            high_stress: Sensitivity::HIGH_STRESS,
            emergency: Sensitivity::EMERGENCY,
        }
    }
}

impl SensitivityTable {
    /// Every threshold must be positive, and moving to a more stressed
    /// mode may only make gestures easier: recognition thresholds never
    /// increase and the corner capture area never shrinks.
    pub fn validate(&self) -> Result<(), ProfileError> {
        for mode in OperatingMode::ALL {
            Sensitivity::select(mode, self).check_positive(mode)?;
        }

        let steps = [
            (OperatingMode::HighStress, &self.normal, &self.high_stress),
            (OperatingMode::Emergency, &self.high_stress, &self.emergency),
        ];
        for (mode, calmer, stressed) in steps {
            let lowered = [
                ("tap_px", calmer.tap_px, stressed.tap_px),
                ("swipe_px", calmer.swipe_px, stressed.swipe_px),
                (
                    "long_press_ms",
                    calmer.long_press_ms as f32,
                    stressed.long_press_ms as f32,
                ),
                ("pinch", calmer.pinch, stressed.pinch),
                ("rotation_deg", calmer.rotation_deg, stressed.rotation_deg),
            ];
            for (field, before, after) in lowered {
                if after > before {
                    return Err(ProfileError::NotMonotonic {
                        mode: mode.as_str(),
                        field,
                    });
                }
            }
            if stressed.corner_margin_px < calmer.corner_margin_px {
                return Err(ProfileError::NotMonotonic {
                    mode: mode.as_str(),
                    field: "corner_margin_px",
                });
            }
        }
        Ok(())
    }
}
