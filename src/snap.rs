//! Route snapping.
//!
//! Pulls a raw fix onto the active route so the BlueDot and the follow
//! camera stay on the road. Each segment is measured in a flat metric frame
//! centred on the fix, which is accurate for the few hundred meters a snap
//! can span.

use crate::geo::{distance_meters, GeoPoint, EARTH_RADIUS_M};

/// Closest route point to a fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSnap {
    pub point: GeoPoint,
    /// Distance from the fix to `point`, in meters.
    pub offset_m: f64,
}

/// East/north offsets in meters from `origin`.
#[derive(Debug, Clone, Copy)]
struct LocalFrame {
    origin: GeoPoint,
    meters_per_deg_lon: f64,
    meters_per_deg_lat: f64,
}

impl LocalFrame {
    fn centred_on(origin: GeoPoint) -> Self {
        let meters_per_deg_lat = EARTH_RADIUS_M.to_radians();
        Self {
            origin,
            meters_per_deg_lon: meters_per_deg_lat * origin.lat.to_radians().cos(),
            meters_per_deg_lat,
        }
    }

    fn to_local(&self, p: GeoPoint) -> (f64, f64) {
        (
            (p.lon - self.origin.lon) * self.meters_per_deg_lon,
            (p.lat - self.origin.lat) * self.meters_per_deg_lat,
        )
    }

    /// Fraction along `a -> b` of the point closest to the origin.
    fn closest_fraction(&self, a: GeoPoint, b: GeoPoint) -> f64 {
        let (ax, ay) = self.to_local(a);
        let (bx, by) = self.to_local(b);
        let (dx, dy) = (bx - ax, by - ay);
        let len_sq = dx * dx + dy * dy;
        if len_sq < 1e-12 {
            return 0.0;
        }
        (-(ax * dx + ay * dy) / len_sq).clamp(0.0, 1.0)
    }
}

/// Closest point on `route` to `position`.
///
/// Segments with an invalid vertex are skipped. `None` for an invalid
/// position or a route without a usable segment.
pub fn nearest_on_route(position: GeoPoint, route: &[GeoPoint]) -> Option<RouteSnap> {
    if !position.is_valid() {
        return None;
    }
    let frame = LocalFrame::centred_on(position);

    route
        .windows(2)
        .filter(|seg| seg[0].is_valid() && seg[1].is_valid())
        .map(|seg| {
            let (a, b) = (seg[0], seg[1]);
            let t = frame.closest_fraction(a, b);
            let point = GeoPoint::new(a.lon + t * (b.lon - a.lon), a.lat + t * (b.lat - a.lat));
            RouteSnap {
                point,
                offset_m: distance_meters(position, point),
            }
        })
        .filter(|snap| snap.offset_m.is_finite())
        .min_by(|x, y| x.offset_m.total_cmp(&y.offset_m))
}

/// Snapped position if the fix is within `max_distance_m` of the route.
pub fn snap_position(position: GeoPoint, route: &[GeoPoint], max_distance_m: f64) -> Option<GeoPoint> {
    nearest_on_route(position, route)
        .filter(|snap| snap.offset_m <= max_distance_m)
        .map(|snap| snap.point)
}
