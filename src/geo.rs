//! Great-circle geometry.
//!
//! Spherical-earth primitives used by the resampler, the simulation
//! driver and route snapping. All coordinates use WGS84 (lon/lat in
//! degrees).

use serde::{Deserialize, Serialize};

/// Earth radius in meters (spherical model).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic coordinate.
///
/// Equality is exact field equality. "Same point" checks in the resampler
/// rely on that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// True if both components are finite and the point is not the (0, 0)
    /// sentinel some location providers report before their first fix.
    pub fn is_valid(&self) -> bool {
        if !self.lon.is_finite() || !self.lat.is_finite() {
            return false;
        }
        !(self.lon.abs() < 1e-6 && self.lat.abs() < 1e-6)
    }
}

/// Haversine distance between two points in meters.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    // Rounding can push h slightly above 1 for near-antipodal points.
    // clamp keeps NaN so garbage coordinates never measure as a real distance.
    2.0 * EARTH_RADIUS_M * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| distance_meters(w[0], w[1]))
        .sum()
}

/// Point at `fraction` of the way from `a` to `b` along the great circle.
///
/// `fraction` is expected in `[0, 1]`; the endpoints are returned exactly.
pub fn interpolate(a: GeoPoint, b: GeoPoint, fraction: f64) -> GeoPoint {
    if fraction <= 0.0 {
        return a;
    }
    if fraction >= 1.0 {
        return b;
    }

    let phi1 = a.lat.to_radians();
    let lambda1 = a.lon.to_radians();
    let phi2 = b.lat.to_radians();
    let lambda2 = b.lon.to_radians();

    let delta = 2.0
        * (((phi2 - phi1) / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * ((lambda2 - lambda1) / 2.0).sin().powi(2))
        .clamp(0.0, 1.0)
        .sqrt()
        .asin();

    if delta == 0.0 {
        return a;
    }

    let wa = ((1.0 - fraction) * delta).sin() / delta.sin();
    let wb = (fraction * delta).sin() / delta.sin();

    let x = wa * phi1.cos() * lambda1.cos() + wb * phi2.cos() * lambda2.cos();
    let y = wa * phi1.cos() * lambda1.sin() + wb * phi2.cos() * lambda2.sin();
    let z = wa * phi1.sin() + wb * phi2.sin();

    let phi = z.atan2((x * x + y * y).sqrt());
    let lambda = y.atan2(x);

    GeoPoint::new(lambda.to_degrees(), phi.to_degrees())
}

/// Initial bearing from `from` to `to` in degrees [0, 360).
pub fn bearing_degrees(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlon = (to.lon - from.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    let bearing = y.atan2(x).to_degrees();
    let normalized = (bearing + 360.0) % 360.0;
    // -0.0 and values a hair below 360 can round up to exactly 360
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}
