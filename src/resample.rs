//! Polyline resampling.
//!
//! Turns a sparse route polyline into points spaced a fixed distance
//! apart along the route, which is what the simulation driver walks one
//! point per tick.

use crate::geo::{distance_meters, interpolate, GeoPoint};

/// Distances within this many meters of a spacing threshold count as
/// reaching it. Keeps already-spaced input from losing or duplicating
/// vertices to floating-point drift.
const SNAP_EPSILON_M: f64 = 1e-6;

/// Resample `points` so that consecutive output points are
/// `spacing_meters` apart, measured along the polyline.
///
/// The first input point is always the first output point and the last
/// input point is always the last one. Inputs with fewer than 2 points,
/// or a spacing that is not a positive finite distance, are returned
/// unchanged.
pub fn resample(points: &[GeoPoint], spacing_meters: f64) -> Vec<GeoPoint> {
    if points.len() < 2 || !spacing_meters.is_finite() || spacing_meters <= SNAP_EPSILON_M {
        return points.to_vec();
    }

    let mut out = Vec::with_capacity(points.len());
    out.push(points[0]);

    // Distance walked along the input up to the current segment start
    let mut acc = 0.0;
    let mut next_target = spacing_meters;

    for segment in points.windows(2) {
        let b = segment[1];
        let mut start = segment[0];
        let mut seg_len = distance_meters(start, b);
        if !seg_len.is_finite() {
            continue;
        }

        // Long segments emit several points, re-measuring from each one
        while seg_len.is_finite() && acc + seg_len + SNAP_EPSILON_M >= next_target {
            let remain = next_target - acc;
            let np = if remain >= seg_len - SNAP_EPSILON_M {
                b
            } else {
                interpolate(start, b, (remain / seg_len).clamp(0.0, 1.0))
            };
            out.push(np);
            start = np;
            seg_len = distance_meters(start, b);
            acc = next_target;
            next_target += spacing_meters;
        }
        if seg_len.is_finite() {
            acc += seg_len;
        }
    }

    if let (Some(last), Some(last_out)) = (points.last(), out.last()) {
        if last != last_out {
            out.push(*last);
        }
    }

    out
}
