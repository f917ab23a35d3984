//! Follow camera.
//!
//! Computes where the map camera should look while guidance is active.
//! Advisory only: the host applies the pose to whatever renderer it owns.

use serde::{Deserialize, Serialize};

use crate::config::CameraConfig;
use crate::geo::GeoPoint;

/// Target camera pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub focus: GeoPoint,
    /// Map rotation in degrees; absent when the heading is unknown.
    pub rotation: Option<f64>,
    /// Only set for the establishing shot.
    pub zoom: Option<f32>,
    /// Only set for the establishing shot.
    pub tilt: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct FollowCamera {
    follow_enabled: bool,
    zoom: f32,
    tilt: f32,
}

impl FollowCamera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            follow_enabled: config.follow_enabled,
            zoom: config.zoom,
            tilt: config.tilt,
        }
    }

    pub fn set_follow_enabled(&mut self, enabled: bool) {
        self.follow_enabled = enabled;
    }

    /// Pose for the latest position, preferring the route-snapped one.
    ///
    /// Returns `None` when following is disabled or neither position is
    /// valid. `initial_focus` adds the fixed zoom and tilt.
    pub fn compute_pose(
        &self,
        snap_position: Option<GeoPoint>,
        fallback_position: Option<GeoPoint>,
        heading: Option<f64>,
        initial_focus: bool,
    ) -> Option<CameraPose> {
        if !self.follow_enabled {
            return None;
        }

        let focus = snap_position
            .filter(GeoPoint::is_valid)
            .or_else(|| fallback_position.filter(GeoPoint::is_valid))?;

        Some(CameraPose {
            focus,
            rotation: heading.filter(|h| h.is_finite()),
            zoom: initial_focus.then_some(self.zoom),
            tilt: initial_focus.then_some(self.tilt),
        })
    }
}
