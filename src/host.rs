//! Session wiring for hosts that poll.
//!
//! A JVM host cannot hand Rust a callback that is safe to invoke from the
//! ticker thread, so everything the session pushes (mock-location fixes,
//! camera poses, snapshots, completion) is buffered in an [`Outbox`] and
//! handed over in batches by [`HostSession::poll`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::camera::CameraPose;
use crate::config::NavConfig;
use crate::error::Result;
use crate::guidance::GuidanceSnapshot;
use crate::session::{CameraTarget, GuidancePresenter, LocationSink, NavigationSession, SessionOutputs};
use crate::simulation::{LocationFix, SimulationListener};

/// Oldest events are dropped beyond this many pending ones.
pub const MAX_PENDING_EVENTS: usize = 1024;

/// One buffered session output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// Forward to the platform's mock-location provider.
    MockLocation(LocationFix),
    Camera(CameraPose),
    Guidance(GuidanceSnapshot),
    SimulationFinished,
}

/// Shared, bounded event queue. Clones push into the same queue.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    queue: Arc<Mutex<VecDeque<HostEvent>>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<HostEvent>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, event: HostEvent) {
        let mut queue = self.lock();
        if queue.len() >= MAX_PENDING_EVENTS {
            if let Some(dropped) = queue.pop_front() {
                warn!("Outbox full, dropping {dropped:?}");
            }
        }
        queue.push_back(event);
    }

    /// Take every pending event, oldest first.
    pub fn drain(&self) -> Vec<HostEvent> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Session outputs that all feed this outbox.
    pub fn session_outputs(&self) -> SessionOutputs {
        SessionOutputs {
            location_sink: Box::new(self.clone()),
            presenter: Box::new(self.clone()),
            camera: Box::new(self.clone()),
        }
    }

    /// Listener that queues [`HostEvent::SimulationFinished`].
    pub fn simulation_listener(&self) -> impl SimulationListener + 'static {
        let outbox = self.clone();
        move || outbox.push(HostEvent::SimulationFinished)
    }
}

impl LocationSink for Outbox {
    fn send_mock_location(&mut self, fix: &LocationFix) {
        self.push(HostEvent::MockLocation(*fix));
    }
}

impl GuidancePresenter for Outbox {
    fn present(&mut self, snapshot: &GuidanceSnapshot) {
        self.push(HostEvent::Guidance(snapshot.clone()));
    }
}

impl CameraTarget for Outbox {
    fn apply(&mut self, pose: &CameraPose) {
        self.push(HostEvent::Camera(*pose));
    }
}

/// A [`NavigationSession`] whose outputs are collected for polling.
pub struct HostSession {
    session: NavigationSession,
    outbox: Outbox,
}

impl HostSession {
    pub fn new(config: NavConfig) -> Self {
        let outbox = Outbox::new();
        Self {
            session: NavigationSession::new(config, outbox.session_outputs()),
            outbox,
        }
    }

    pub fn session(&self) -> &NavigationSession {
        &self.session
    }

    /// Start simulating the active route; completion or stop is queued as
    /// [`HostEvent::SimulationFinished`].
    pub fn start_simulation(&self) -> Result<()> {
        self.session.start_simulation(self.outbox.simulation_listener())
    }

    pub fn poll(&self) -> Vec<HostEvent> {
        self.outbox.drain()
    }

    /// Pending events as a JSON array.
    pub fn poll_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.poll())?)
    }
}
