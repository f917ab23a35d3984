//! GPX route import.
//!
//! Wraps the `gpx` crate and extracts routes and tracks as polylines, so
//! a recorded or planned path can be driven by the simulator without the
//! routing collaborator.

use serde::Serialize;
use std::io::Read;

use crate::error::{Error, Result};
use crate::geo::GeoPoint;

/// A named sequence of points from a `<rte>` or a flattened `<trk>`.
#[derive(Debug, Clone, Serialize)]
pub struct NamedPolyline {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub points: Vec<GeoPoint>,
}

/// Routes and tracks extracted from a GPX file.
#[derive(Debug, Clone, Serialize)]
pub struct GpxData {
    pub routes: Vec<NamedPolyline>,
    pub tracks: Vec<NamedPolyline>,
}

impl GpxData {
    /// The polyline to navigate: the first non-empty route, else the first
    /// non-empty track.
    pub fn first_polyline(&self) -> Option<&NamedPolyline> {
        self.routes
            .iter()
            .chain(self.tracks.iter())
            .find(|p| !p.points.is_empty())
    }
}

fn to_geo(wp: &gpx::Waypoint) -> GeoPoint {
    let p = wp.point();
    GeoPoint::new(p.x(), p.y())
}

/// Parse a GPX file from any reader.
pub fn parse<R: Read>(reader: R) -> Result<GpxData> {
    let gpx = gpx::read(reader).map_err(|e| Error::Gpx(e.to_string()))?;

    let routes = gpx
        .routes
        .iter()
        .map(|r| NamedPolyline {
            name: r.name.clone(),
            points: r.points.iter().map(to_geo).collect(),
        })
        .collect();

    let tracks = gpx
        .tracks
        .iter()
        .map(|t| NamedPolyline {
            name: t.name.clone(),
            points: t
                .segments
                .iter()
                .flat_map(|seg| seg.points.iter())
                .map(to_geo)
                .collect(),
        })
        .collect();

    Ok(GpxData { routes, tracks })
}

/// Parse GPX from a string. Convenience wrapper for JNI.
pub fn parse_str(data: &str) -> Result<GpxData> {
    parse(data.as_bytes())
}
