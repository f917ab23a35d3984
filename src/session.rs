//! Navigation session.
//!
//! Ties the guidance state machine, the simulation driver and the follow
//! camera together behind one lock. Two contexts touch a session: the
//! ticker thread that drives a running simulation, and the host's event
//! thread delivering command events and GPS fixes. Both go through the
//! same mutex, so every operation below is a single critical section.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::camera::{CameraPose, FollowCamera};
use crate::config::NavConfig;
use crate::error::Result;
use crate::geo::GeoPoint;
use crate::guidance::{ActiveRoute, CommandEvent, GuidanceSnapshot, GuidanceState};
use crate::simulation::{LocationFix, SimulationDriver, SimulationListener, Tick};
use crate::snap::snap_position;

/// A raw fix from the device location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawLocation {
    pub position: GeoPoint,
    #[serde(default)]
    pub speed_mps: Option<f64>,
    /// Heading in degrees, if the provider reports one.
    #[serde(default)]
    pub direction: Option<f64>,
}

/// Receives simulated fixes (the host forwards them to its mock provider).
pub trait LocationSink: Send {
    fn send_mock_location(&mut self, fix: &LocationFix);
}

/// Receives the guidance snapshot whenever it changes.
pub trait GuidancePresenter: Send {
    fn present(&mut self, snapshot: &GuidanceSnapshot);
}

/// Receives camera poses while following.
pub trait CameraTarget: Send {
    fn apply(&mut self, pose: &CameraPose);
}

// Sends fail only once the receiver is gone, which means nobody is
// listening any more.
impl LocationSink for Sender<LocationFix> {
    fn send_mock_location(&mut self, fix: &LocationFix) {
        let _ = self.send(*fix);
    }
}

impl GuidancePresenter for Sender<GuidanceSnapshot> {
    fn present(&mut self, snapshot: &GuidanceSnapshot) {
        let _ = self.send(snapshot.clone());
    }
}

impl CameraTarget for Sender<CameraPose> {
    fn apply(&mut self, pose: &CameraPose) {
        let _ = self.send(*pose);
    }
}

struct Discard;

impl LocationSink for Discard {
    fn send_mock_location(&mut self, _fix: &LocationFix) {}
}

impl GuidancePresenter for Discard {
    fn present(&mut self, _snapshot: &GuidanceSnapshot) {}
}

impl CameraTarget for Discard {
    fn apply(&mut self, _pose: &CameraPose) {}
}

/// Where a session pushes its outputs. Outputs are called with the
/// session lock held and must not call back into the session.
pub struct SessionOutputs {
    pub location_sink: Box<dyn LocationSink>,
    pub presenter: Box<dyn GuidancePresenter>,
    pub camera: Box<dyn CameraTarget>,
}

impl Default for SessionOutputs {
    fn default() -> Self {
        Self {
            location_sink: Box::new(Discard),
            presenter: Box::new(Discard),
            camera: Box::new(Discard),
        }
    }
}

struct SessionState {
    config: NavConfig,
    guidance: GuidanceState,
    camera: FollowCamera,
    driver: SimulationDriver,
    last_position: Option<GeoPoint>,
    last_heading: Option<f64>,
    initial_focus_pending: bool,
    outputs: SessionOutputs,
}

impl SessionState {
    fn handle_event(&mut self, event: CommandEvent) {
        let update = self.guidance.handle(event);
        if update.snapshot_changed {
            self.outputs.presenter.present(self.guidance.snapshot());
        }
        if update.started {
            self.initial_focus_pending = true;
        }
        if update.started || update.route_replaced {
            self.follow();
        }
    }

    fn on_location(&mut self, raw: RawLocation) {
        if !raw.position.is_valid() {
            debug!("Dropping invalid fix {:?}", raw.position);
            return;
        }
        self.last_position = Some(raw.position);
        if let Some(direction) = raw.direction.filter(|d| d.is_finite()) {
            self.last_heading = Some(direction);
        }
        if let Some(speed) = raw.speed_mps {
            if self.guidance.on_speed(speed) {
                self.outputs.presenter.present(self.guidance.snapshot());
            }
        }
        self.follow();
    }

    fn tick(&mut self) -> Tick {
        let tick = self.driver.tick(self.last_position);
        if let Tick::Fix(fix) = tick {
            self.outputs.location_sink.send_mock_location(&fix);
            self.last_position = Some(fix.position);
            if fix.bearing.is_some() {
                self.last_heading = fix.bearing;
            }
            self.follow();
        }
        tick
    }

    /// Push a camera pose for the last known position. The establishing
    /// shot stays pending until a pose is actually produced.
    fn follow(&mut self) {
        let snapped = self.last_position.and_then(|p| {
            snap_position(p, &self.guidance.route().points, self.config.snap.max_snap_distance_m)
        });
        let pose = self.camera.compute_pose(
            snapped,
            self.last_position,
            self.last_heading,
            self.initial_focus_pending,
        );
        if let Some(pose) = pose {
            self.initial_focus_pending = false;
            self.outputs.camera.apply(&pose);
        }
    }
}

struct Shared {
    state: Mutex<SessionState>,
    /// Signalled when a simulation is stopped so the ticker stops waiting.
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One navigation session over a single active route.
pub struct NavigationSession {
    shared: Arc<Shared>,
}

impl NavigationSession {
    pub fn new(config: NavConfig, outputs: SessionOutputs) -> Self {
        let state = SessionState {
            guidance: GuidanceState::new(config.guidance.clone()),
            camera: FollowCamera::new(&config.camera),
            driver: SimulationDriver::new(),
            last_position: None,
            last_heading: None,
            initial_focus_pending: false,
            outputs,
            config,
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                wake: Condvar::new(),
            }),
        }
    }

    /// Install the route returned by the routing collaborator. Its first
    /// point becomes the starting position if nothing is known yet.
    pub fn set_route(&self, route: ActiveRoute) {
        let mut state = self.shared.lock();
        if state.last_position.is_none() {
            state.last_position = route.points.first().copied().filter(GeoPoint::is_valid);
        }
        state.handle_event(CommandEvent::Recalculated(route));
    }

    /// Install the first route (or track) of a GPX document as the active
    /// route. Returns false if the document has no points.
    pub fn load_gpx_route(&self, gpx_xml: &str) -> Result<bool> {
        let data = crate::gpx::parse_str(gpx_xml)?;
        let Some(line) = data.first_polyline() else {
            return Ok(false);
        };
        info!("Loaded GPX route {:?} with {} points", line.name, line.points.len());
        self.set_route(ActiveRoute {
            points: line.points.clone(),
            instructions: Vec::new(),
        });
        Ok(true)
    }

    pub fn handle_event(&self, event: CommandEvent) {
        self.shared.lock().handle_event(event);
    }

    pub fn on_location(&self, raw: RawLocation) {
        self.shared.lock().on_location(raw);
    }

    /// Start driving the active route at the configured speed.
    ///
    /// The first fix is emitted immediately, then one per `step_ms`.
    /// `listener` hears about completion or stop.
    pub fn start_simulation(&self, listener: impl SimulationListener + 'static) -> Result<()> {
        let mut state = self.shared.lock();
        let route = state.guidance.route().points.clone();
        let sim = state.config.simulation.clone();
        state
            .driver
            .start(&route, sim.speed_kmh, sim.step_ms, Box::new(listener))?;
        state.initial_focus_pending = true;

        let run_id = state.driver.run_id();
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("navsim-ticker".into())
            .spawn(move || run_ticker(&shared, run_id));

        if let Err(e) = spawned {
            error!("Failed to spawn ticker thread: {e}");
            state.driver.stop();
            return Err(e.into());
        }
        Ok(())
    }

    /// Stop the simulation. The listener of a running simulation is
    /// notified; a run that already ended is not reported again.
    pub fn stop_simulation(&self) {
        self.shared.lock().driver.stop();
        self.shared.wake.notify_all();
    }

    pub fn is_simulation_running(&self) -> bool {
        self.shared.lock().driver.is_running()
    }

    pub fn snapshot(&self) -> GuidanceSnapshot {
        self.shared.lock().guidance.snapshot().clone()
    }

    pub fn route(&self) -> ActiveRoute {
        self.shared.lock().guidance.route().clone()
    }

    pub fn last_position(&self) -> Option<GeoPoint> {
        self.shared.lock().last_position
    }

    pub fn set_follow_enabled(&self, enabled: bool) {
        self.shared.lock().camera.set_follow_enabled(enabled);
    }
}

impl Drop for NavigationSession {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        if state.driver.is_running() {
            state.driver.stop();
        }
        drop(state);
        self.shared.wake.notify_all();
    }
}

/// Tick loop for one simulation run. Exits when the run completes, is
/// stopped, or is superseded by a newer run.
fn run_ticker(shared: &Shared, run_id: u64) {
    let mut state = shared.lock();
    loop {
        if state.driver.run_id() != run_id {
            break;
        }
        match state.tick() {
            Tick::Fix(_) => {}
            Tick::Completed | Tick::Inactive => break,
        }

        let interval = state.driver.tick_interval();
        let (guard, _) = shared
            .wake
            .wait_timeout_while(state, interval, |s| {
                s.driver.is_running() && s.driver.run_id() == run_id
            })
            .unwrap_or_else(PoisonError::into_inner);
        state = guard;
    }
    debug!("Ticker for run {run_id} exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, StartError};
    use crate::geo::EARTH_RADIUS_M;
    use crate::guidance::NavigationCommand;
    use std::sync::mpsc::{channel, Receiver};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn north(meters: f64) -> GeoPoint {
        GeoPoint::new(32.0, 39.0 + (meters / EARTH_RADIUS_M).to_degrees())
    }

    struct Outputs {
        fixes: Receiver<LocationFix>,
        snapshots: Receiver<GuidanceSnapshot>,
        poses: Receiver<CameraPose>,
    }

    fn session(config: NavConfig) -> (NavigationSession, Outputs) {
        let (fix_tx, fixes) = channel();
        let (snap_tx, snapshots) = channel();
        let (pose_tx, poses) = channel();
        let outputs = SessionOutputs {
            location_sink: Box::new(fix_tx),
            presenter: Box::new(snap_tx),
            camera: Box::new(pose_tx),
        };
        (NavigationSession::new(config, outputs), Outputs { fixes, snapshots, poses })
    }

    /// 3600 km/h at 10 ms ticks: one point every 10 m.
    fn fast_config() -> NavConfig {
        let mut config = NavConfig::default();
        config.simulation.speed_kmh = 3600.0;
        config.simulation.step_ms = 10;
        config
    }

    fn slow_config() -> NavConfig {
        let mut config = fast_config();
        config.simulation.step_ms = 60_000;
        config
    }

    fn straight_route(meters: f64) -> ActiveRoute {
        ActiveRoute {
            points: vec![north(0.0), north(meters)],
            instructions: Vec::new(),
        }
    }

    fn done_channel() -> (Receiver<()>, impl SimulationListener) {
        let (tx, rx) = channel();
        (rx, move || {
            let _ = tx.send(());
        })
    }

    #[test]
    fn snapshot_pushed_only_on_change() {
        let (session, out) = session(NavConfig::default());
        let cmd = NavigationCommand {
            distance_to_command: 450.0,
            upcoming: vec!["TURN_RIGHT".into()],
            ..Default::default()
        };

        session.handle_event(CommandEvent::Ready(cmd.clone()));
        let pushed = out.snapshots.try_recv().unwrap();
        assert_eq!(pushed.direction_icon_id, "turn_right");
        assert_eq!(pushed, session.snapshot());

        session.handle_event(CommandEvent::LocationChanged(cmd));
        assert!(out.snapshots.try_recv().is_err());
    }

    #[test]
    fn location_fix_updates_speed_and_camera() {
        let (session, out) = session(NavConfig::default());
        session.set_route(straight_route(1000.0));
        // Route installation focuses on the route start
        let pose = out.poses.try_recv().unwrap();
        assert_eq!(pose.focus, north(0.0));

        // ~100 m east of the route: snapped back onto it
        let raw = GeoPoint::new(32.0012, north(500.0).lat);
        session.on_location(RawLocation {
            position: raw,
            speed_mps: Some(15.0),
            direction: Some(350.0),
        });

        let snapshot = out.snapshots.try_recv().unwrap();
        assert!(snapshot.speed_kmh > 0);
        let pose = out.poses.try_recv().unwrap();
        assert!((pose.focus.lon - 32.0).abs() < 1e-9);
        assert_eq!(pose.rotation, Some(350.0));
        assert_eq!(session.last_position(), Some(raw));
    }

    #[test]
    fn invalid_fix_is_dropped() {
        let (session, out) = session(NavConfig::default());
        session.on_location(RawLocation {
            position: GeoPoint::new(0.0, 0.0),
            speed_mps: Some(10.0),
            direction: None,
        });
        assert!(out.poses.try_recv().is_err());
        assert!(out.snapshots.try_recv().is_err());
        assert_eq!(session.last_position(), None);
    }

    #[test]
    fn started_gives_one_establishing_shot() {
        let (session, out) = session(NavConfig::default());
        session.set_route(straight_route(1000.0));
        let _ = out.poses.try_recv();

        session.handle_event(CommandEvent::Started);
        let first = out.poses.try_recv().unwrap();
        assert_eq!(first.zoom, Some(17.0));
        assert_eq!(first.tilt, Some(45.0));

        session.on_location(RawLocation {
            position: north(10.0),
            speed_mps: None,
            direction: None,
        });
        let next = out.poses.try_recv().unwrap();
        assert_eq!(next.zoom, None);
    }

    #[test]
    fn follow_disabled_emits_no_pose() {
        let (session, out) = session(NavConfig::default());
        session.set_follow_enabled(false);
        session.set_route(straight_route(1000.0));
        session.on_location(RawLocation {
            position: north(10.0),
            speed_mps: None,
            direction: None,
        });
        assert!(out.poses.try_recv().is_err());
    }

    #[test]
    fn simulation_runs_to_completion() {
        let (session, out) = session(fast_config());
        session.set_route(straight_route(100.0));
        let (done, listener) = done_channel();

        session.start_simulation(listener).unwrap();
        done.recv_timeout(WAIT).unwrap();

        let fixes: Vec<LocationFix> = out.fixes.try_iter().collect();
        assert_eq!(fixes.len(), 11);
        assert_eq!(fixes[0].position, north(0.0));
        assert_eq!(fixes[10].position, north(100.0));
        let bearing = fixes[5].bearing.unwrap();
        assert!(bearing < 0.1 || bearing > 359.9, "got {bearing}");

        assert!(!session.is_simulation_running());
        assert_eq!(session.last_position(), Some(north(100.0)));
        assert!(done.try_recv().is_err());

        // Stopping after completion does not report the run a second time
        session.stop_simulation();
        session.stop_simulation();
        assert!(done.try_recv().is_err());
    }

    #[test]
    fn second_start_rejected_then_stop_notifies_once() {
        let (session, out) = session(slow_config());
        session.set_route(straight_route(100.0));
        let (done, listener) = done_channel();
        session.start_simulation(listener).unwrap();

        // First tick is immediate
        out.fixes.recv_timeout(WAIT).unwrap();

        let (other_done, other) = done_channel();
        let err = session.start_simulation(other).unwrap_err();
        assert!(matches!(err, Error::Start(StartError::AlreadyRunning)));

        session.stop_simulation();
        done.recv_timeout(WAIT).unwrap();
        assert!(done.try_recv().is_err());
        assert!(other_done.try_recv().is_err());
        assert!(!session.is_simulation_running());
        // The pending tick was cancelled
        assert!(out.fixes.try_recv().is_err());
    }

    #[test]
    fn restart_after_stop() {
        let (session, out) = session(fast_config());
        session.set_route(straight_route(50.0));

        let (first_done, first) = done_channel();
        session.start_simulation(first).unwrap();
        session.stop_simulation();
        first_done.recv_timeout(WAIT).unwrap();
        let _ = out.fixes.try_iter().count();

        let (done, listener) = done_channel();
        session.start_simulation(listener).unwrap();
        done.recv_timeout(WAIT).unwrap();
        assert!(!session.is_simulation_running());
    }

    #[test]
    fn start_without_route_fails() {
        let (session, _out) = session(fast_config());
        let (_done, listener) = done_channel();
        let err = session.start_simulation(listener).unwrap_err();
        assert!(matches!(err, Error::Start(StartError::InsufficientRoute)));
    }

    #[test]
    fn stop_when_idle_is_harmless() {
        let (session, _out) = session(fast_config());
        session.stop_simulation();
        assert!(!session.is_simulation_running());
    }

    #[test]
    fn gpx_route_can_be_simulated() {
        let gpx = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <rte>
    <rtept lat="{}" lon="32.0"></rtept>
    <rtept lat="{}" lon="32.0"></rtept>
  </rte>
</gpx>"#,
            north(0.0).lat,
            north(30.0).lat
        );

        let (session, _out) = session(fast_config());
        assert!(session.load_gpx_route(&gpx).unwrap());
        assert_eq!(session.route().points.len(), 2);

        let (done, listener) = done_channel();
        session.start_simulation(listener).unwrap();
        done.recv_timeout(WAIT).unwrap();
    }

    #[test]
    fn stopped_event_resets_snapshot() {
        let (session, out) = session(NavConfig::default());
        session.handle_event(CommandEvent::Ready(NavigationCommand {
            distance_to_command: 80.0,
            ..Default::default()
        }));
        let _ = out.snapshots.try_recv();

        session.handle_event(CommandEvent::Stopped);
        assert_eq!(out.snapshots.try_recv().unwrap(), GuidanceSnapshot::default());
    }
}
