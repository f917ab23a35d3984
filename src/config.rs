//! Session configuration.
//!
//! All sections deserialize from JSON with per-field defaults, so a host
//! may pass `{}` or only the values it wants to override.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level configuration for a navigation session.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct NavConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub guidance: GuidanceConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub snap: SnapConfig,
}

impl NavConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Simulated drive parameters.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Vehicle speed in km/h (default: 100)
    #[serde(default = "default_speed_kmh")]
    pub speed_kmh: f64,

    /// Tick interval in milliseconds (default: 1000)
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,
}

/// Guidance card and speed filter parameters.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GuidanceConfig {
    /// Speed filter process noise (default: 0.1)
    #[serde(default = "default_process_noise")]
    pub process_noise: f64,

    /// Speed filter measurement noise (default: 1.0)
    #[serde(default = "default_measurement_noise")]
    pub measurement_noise: f64,

    /// Distance beyond which an empty turn-type reverts the direction to
    /// "keep going straight" (default: 300 m)
    #[serde(default = "default_neutral_direction_distance")]
    pub neutral_direction_distance_m: f64,
}

/// Follow-camera parameters.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CameraConfig {
    /// Whether the camera follows the BlueDot (default: true)
    #[serde(default = "default_follow_enabled")]
    pub follow_enabled: bool,

    /// Zoom used for the establishing shot (default: 17)
    #[serde(default = "default_zoom")]
    pub zoom: f32,

    /// Tilt in degrees used for the establishing shot (default: 45)
    #[serde(default = "default_tilt")]
    pub tilt: f32,
}

/// Route snapping parameters.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SnapConfig {
    /// Fixes farther than this from the route are not snapped (default: 500 m)
    #[serde(default = "default_max_snap_distance")]
    pub max_snap_distance_m: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            speed_kmh: default_speed_kmh(),
            step_ms: default_step_ms(),
        }
    }
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            process_noise: default_process_noise(),
            measurement_noise: default_measurement_noise(),
            neutral_direction_distance_m: default_neutral_direction_distance(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            follow_enabled: default_follow_enabled(),
            zoom: default_zoom(),
            tilt: default_tilt(),
        }
    }
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            max_snap_distance_m: default_max_snap_distance(),
        }
    }
}

fn default_speed_kmh() -> f64 {
    100.0
}
fn default_step_ms() -> u64 {
    1000
}
fn default_process_noise() -> f64 {
    0.1
}
fn default_measurement_noise() -> f64 {
    1.0
}
fn default_neutral_direction_distance() -> f64 {
    300.0
}
fn default_follow_enabled() -> bool {
    true
}
fn default_zoom() -> f32 {
    17.0
}
fn default_tilt() -> f32 {
    45.0
}
fn default_max_snap_distance() -> f64 {
    500.0
}
