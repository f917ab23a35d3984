//! Simulated drive along a route.
//!
//! The driver resamples the route so that one point is consumed per tick
//! at the requested speed, and turns each point into a synthetic location
//! fix. It owns no timer: whoever drives it calls [`SimulationDriver::tick`]
//! immediately after a successful start and then every
//! [`SimulationDriver::tick_interval`] (see [`crate::session`]).

use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::StartError;
use crate::geo::{bearing_degrees, GeoPoint};
use crate::resample::resample;

/// A synthesized position fix pushed to the mock-location sink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub position: GeoPoint,
    /// Bearing in degrees [0, 360), absent when the previous position
    /// was unknown or invalid.
    pub bearing: Option<f64>,
}

/// Receives simulation completion.
///
/// Called while the owner's lock is held; implementations must not call
/// back into the driver or session synchronously.
pub trait SimulationListener: Send {
    fn on_simulation_finished(&mut self);
}

impl<F: FnMut() + Send> SimulationListener for F {
    fn on_simulation_finished(&mut self) {
        self()
    }
}

/// Lifecycle of the driver. `Completed` and `Stopped` are passed through
/// on the way back to `Idle` and are never observable from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationPhase {
    Idle,
    Running,
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// A fix was produced; schedule the next tick after the interval.
    Fix(LocationFix),
    /// All points were consumed; the listener has been notified.
    Completed,
    /// The driver is not running (stopped while the tick was pending).
    Inactive,
}

#[derive(Debug, Default)]
struct SimulationState {
    points: Vec<GeoPoint>,
    cursor: usize,
    running: bool,
}

impl SimulationState {
    fn clear(&mut self) {
        self.points.clear();
        self.cursor = 0;
        self.running = false;
    }
}

/// Walks a resampled route one point per tick.
#[derive(Default)]
pub struct SimulationDriver {
    state: SimulationState,
    tick_interval: Duration,
    run_id: u64,
    listener: Option<Box<dyn SimulationListener>>,
}

/// Point spacing that makes a vehicle at `speed_kmh` advance one point per
/// tick of `tick_interval_ms`.
pub fn spacing_meters(speed_kmh: f64, tick_interval_ms: u64) -> f64 {
    speed_kmh * 1000.0 / 3600.0 * (tick_interval_ms as f64 / 1000.0)
}

impl SimulationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run over `route`.
    ///
    /// Never pre-empts an active run. On success the first tick is due
    /// immediately. The listener hears about the end of this run exactly
    /// once, by completion or by `stop`.
    pub fn start(
        &mut self,
        route: &[GeoPoint],
        target_speed_kmh: f64,
        tick_interval_ms: u64,
        listener: Box<dyn SimulationListener>,
    ) -> Result<(), StartError> {
        if self.state.running {
            warn!("Simulation start rejected: already running");
            return Err(StartError::AlreadyRunning);
        }
        if route.is_empty() {
            warn!("Simulation start rejected: no route");
            return Err(StartError::InsufficientRoute);
        }

        let spacing = spacing_meters(target_speed_kmh, tick_interval_ms);
        if tick_interval_ms == 0 || !spacing.is_finite() || spacing <= 0.0 {
            warn!("Simulation start rejected: speed {target_speed_kmh} km/h, interval {tick_interval_ms} ms");
            return Err(StartError::InvalidTiming);
        }

        let points = resample(route, spacing);
        if points.len() < 2 {
            warn!("Simulation start rejected: not enough points to simulate");
            return Err(StartError::InsufficientRoute);
        }

        info!(
            "Simulation started: {} points, {:.1} m spacing, {} ms ticks",
            points.len(),
            spacing,
            tick_interval_ms
        );
        self.state = SimulationState {
            points,
            cursor: 0,
            running: true,
        };
        self.tick_interval = Duration::from_millis(tick_interval_ms);
        self.run_id = self.run_id.wrapping_add(1);
        self.listener = Some(listener);
        Ok(())
    }

    /// Advance by one point.
    ///
    /// `last_known` is the position the host last reported; the bearing of
    /// the fix is measured from it when it is valid.
    pub fn tick(&mut self, last_known: Option<GeoPoint>) -> Tick {
        if !self.state.running {
            return Tick::Inactive;
        }

        let Some(&position) = self.state.points.get(self.state.cursor) else {
            info!("Simulation completed");
            self.state.clear();
            self.notify_finished();
            return Tick::Completed;
        };
        self.state.cursor += 1;

        let bearing = last_known
            .filter(GeoPoint::is_valid)
            .map(|from| bearing_degrees(from, position));

        Tick::Fix(LocationFix { position, bearing })
    }

    /// Stop the current run and notify the listener.
    ///
    /// Stopping an idle driver changes nothing. A listener whose run has
    /// already been reported is not notified again.
    pub fn stop(&mut self) {
        if self.state.running {
            info!("Simulation stopped at point {}/{}", self.state.cursor, self.state.points.len());
            self.state.clear();
        }
        self.notify_finished();
    }

    pub fn phase(&self) -> SimulationPhase {
        if self.state.running {
            SimulationPhase::Running
        } else {
            SimulationPhase::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Identifies the current run so a stale ticker can tell it has been
    /// superseded.
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Points not yet emitted in the current run.
    pub fn remaining(&self) -> usize {
        self.state.points.len().saturating_sub(self.state.cursor)
    }

    fn notify_finished(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            listener.on_simulation_finished();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{distance_meters, EARTH_RADIUS_M};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn north(meters: f64) -> GeoPoint {
        GeoPoint::new(32.0, 39.0 + (meters / EARTH_RADIUS_M).to_degrees())
    }

    fn counter() -> (Arc<AtomicUsize>, Box<dyn SimulationListener>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let listener = move || {
            c.fetch_add(1, Ordering::SeqCst);
        };
        (count, Box::new(listener))
    }

    fn drain(driver: &mut SimulationDriver) -> Vec<LocationFix> {
        let mut fixes = Vec::new();
        let mut last = None;
        loop {
            match driver.tick(last) {
                Tick::Fix(fix) => {
                    last = Some(fix.position);
                    fixes.push(fix);
                }
                Tick::Completed | Tick::Inactive => break,
            }
        }
        fixes
    }

    #[test]
    fn spacing_from_speed_and_interval() {
        assert!((spacing_meters(100.0, 1000) - 27.777_777).abs() < 1e-5);
        assert!((spacing_meters(36.0, 500) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn empty_route_is_insufficient() {
        let (_, listener) = counter();
        let mut driver = SimulationDriver::new();
        assert_eq!(
            driver.start(&[], 100.0, 1000, listener),
            Err(StartError::InsufficientRoute)
        );
        assert_eq!(driver.phase(), SimulationPhase::Idle);
    }

    #[test]
    fn single_point_route_is_insufficient() {
        let (_, listener) = counter();
        let mut driver = SimulationDriver::new();
        assert_eq!(
            driver.start(&[north(0.0)], 100.0, 1000, listener),
            Err(StartError::InsufficientRoute)
        );
    }

    #[test]
    fn duplicate_point_route_is_insufficient() {
        let (_, listener) = counter();
        let mut driver = SimulationDriver::new();
        let p = north(0.0);
        assert_eq!(
            driver.start(&[p, p, p], 100.0, 1000, listener),
            Err(StartError::InsufficientRoute)
        );
    }

    #[test]
    fn invalid_timing_is_rejected() {
        let route = [north(0.0), north(100.0)];
        let mut driver = SimulationDriver::new();
        let (_, l1) = counter();
        assert_eq!(driver.start(&route, 0.0, 1000, l1), Err(StartError::InvalidTiming));
        let (_, l2) = counter();
        assert_eq!(driver.start(&route, 50.0, 0, l2), Err(StartError::InvalidTiming));
        let (_, l3) = counter();
        assert_eq!(driver.start(&route, f64::NAN, 1000, l3), Err(StartError::InvalidTiming));
    }

    #[test]
    fn second_start_is_rejected_while_running() {
        let route = [north(0.0), north(100.0)];
        let mut driver = SimulationDriver::new();
        let (first, l1) = counter();
        let (second, l2) = counter();

        driver.start(&route, 36.0, 1000, l1).unwrap();
        assert_eq!(driver.start(&route, 36.0, 1000, l2), Err(StartError::AlreadyRunning));
        assert!(driver.is_running());

        // The rejected listener never hears anything; the first one does
        driver.stop();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn walks_every_point_then_completes_once() {
        // 36 km/h at 1 s ticks = 10 m per tick
        let route = [north(0.0), north(100.0)];
        let mut driver = SimulationDriver::new();
        let (finished, listener) = counter();
        driver.start(&route, 36.0, 1000, listener).unwrap();
        assert_eq!(driver.tick_interval(), Duration::from_millis(1000));

        let fixes = drain(&mut driver);
        assert_eq!(fixes.len(), 11);
        assert_eq!(fixes[0].position, route[0]);
        assert_eq!(fixes[10].position, route[1]);
        for w in fixes.windows(2) {
            assert!((distance_meters(w[0].position, w[1].position) - 10.0).abs() < 1e-3);
        }

        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(driver.phase(), SimulationPhase::Idle);
        assert_eq!(driver.remaining(), 0);

        // Further ticks are inert and do not notify again
        assert_eq!(driver.tick(None), Tick::Inactive);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bearing_follows_last_known_position() {
        let route = [north(0.0), north(50.0)];
        let mut driver = SimulationDriver::new();
        let (_, listener) = counter();
        driver.start(&route, 36.0, 1000, listener).unwrap();

        // Unknown or sentinel previous position: no bearing
        match driver.tick(None) {
            Tick::Fix(fix) => assert!(fix.bearing.is_none()),
            other => panic!("unexpected {other:?}"),
        }
        match driver.tick(Some(GeoPoint::new(0.0, 0.0))) {
            Tick::Fix(fix) => assert!(fix.bearing.is_none()),
            other => panic!("unexpected {other:?}"),
        }
        match driver.tick(Some(route[0])) {
            Tick::Fix(fix) => {
                let bearing = fix.bearing.unwrap();
                assert!(bearing < 0.1 || bearing > 359.9, "heading north, got {bearing}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn stop_clears_state_and_notifies_once() {
        let route = [north(0.0), north(100.0)];
        let mut driver = SimulationDriver::new();
        let (finished, listener) = counter();
        driver.start(&route, 36.0, 1000, listener).unwrap();
        assert!(matches!(driver.tick(None), Tick::Fix(_)));

        driver.stop();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(driver.phase(), SimulationPhase::Idle);
        assert_eq!(driver.remaining(), 0);
        // A tick that was already scheduled has no effect
        assert_eq!(driver.tick(None), Tick::Inactive);
    }

    #[test]
    fn completed_run_is_signalled_once() {
        let mut driver = SimulationDriver::new();
        // Nothing registered yet: nothing to notify, nothing to break
        driver.stop();
        assert_eq!(driver.phase(), SimulationPhase::Idle);

        let route = [north(0.0), north(20.0)];
        let (finished, listener) = counter();
        driver.start(&route, 36.0, 1000, listener).unwrap();
        drain(&mut driver);
        assert_eq!(finished.load(Ordering::SeqCst), 1);

        driver.stop();
        driver.stop();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(driver.phase(), SimulationPhase::Idle);
    }

    #[test]
    fn stopped_run_is_signalled_once() {
        let route = [north(0.0), north(100.0)];
        let mut driver = SimulationDriver::new();
        let (finished, listener) = counter();
        driver.start(&route, 36.0, 1000, listener).unwrap();

        driver.stop();
        driver.stop();
        assert_eq!(driver.tick(None), Tick::Inactive);
        assert_eq!(finished.load(Ordering::SeqCst), 1);

        // The next run reports to its own listener only
        let (next, listener) = counter();
        driver.start(&route, 36.0, 1000, listener).unwrap();
        driver.stop();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(next.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn restart_after_completion_gets_new_run_id() {
        let route = [north(0.0), north(20.0)];
        let mut driver = SimulationDriver::new();
        let (_, l1) = counter();
        driver.start(&route, 36.0, 1000, l1).unwrap();
        let first = driver.run_id();
        drain(&mut driver);

        let (_, l2) = counter();
        driver.start(&route, 36.0, 1000, l2).unwrap();
        assert_ne!(driver.run_id(), first);
        assert_eq!(driver.remaining(), 3);
    }
}
