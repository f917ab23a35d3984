//! Turn-by-turn guidance state.
//!
//! Folds the navigation SDK's command events into a single
//! [`GuidanceSnapshot`] that the presentation layer renders as-is. The
//! state machine is the only writer of the snapshot; readers get copies.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::command::{is_arrival, CommandTable, Direction, KEEP_GOING_STRAIGHT};
use crate::config::GuidanceConfig;
use crate::format::{format_distance, format_total_distance, format_total_time, DISTANCE_PLACEHOLDER};
use crate::geo::GeoPoint;
use crate::speed::SpeedFilter;

/// Headline shown when neither the command nor the route names a road.
pub const MANIFEST_PLACEHOLDER: &str = "Follow the route";

/// One entry of the routing collaborator's instruction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInstruction {
    pub index: usize,
    #[serde(default)]
    pub street_name: String,
}

/// Route geometry and instructions for the active navigation session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveRoute {
    #[serde(default)]
    pub points: Vec<GeoPoint>,
    #[serde(default)]
    pub instructions: Vec<RouteInstruction>,
}

/// A navigation command as delivered by the SDK.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationCommand {
    /// Meters until the next instruction.
    pub distance_to_command: f64,
    /// Meters until the end of the current instruction.
    pub total_distance_to_command: f64,
    pub remaining_time_secs: f64,
    pub speed_limit_kmh: i32,
    pub next_road_name: String,
    /// Primary turn-type of this command.
    pub command: String,
    /// Upcoming turn-types; the first one drives the direction card.
    pub upcoming: Vec<String>,
    /// Turn-types of the instruction after the upcoming one.
    pub next_upcoming: Vec<String>,
    /// Position of this instruction in [`ActiveRoute::instructions`].
    pub static_manifest_index: i64,
}

/// Events from the navigation-command collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandEvent {
    Ready(NavigationCommand),
    LocationChanged(NavigationCommand),
    Recalculated(ActiveRoute),
    Started,
    Stopped,
    WillRecalculate,
}

/// Everything the guidance card shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceSnapshot {
    pub manifest_text: String,
    pub direction_text: String,
    pub direction_icon_id: String,
    pub distance_text: String,
    pub next_icon_id: Option<String>,
    pub show_next: bool,
    pub total_distance_text: String,
    pub total_time_text: String,
    pub speed_kmh: i32,
    pub speed_limit_kmh: i32,
    pub is_speeding: bool,
}

impl Default for GuidanceSnapshot {
    fn default() -> Self {
        Self {
            manifest_text: MANIFEST_PLACEHOLDER.to_string(),
            direction_text: KEEP_GOING_STRAIGHT.text.to_string(),
            direction_icon_id: KEEP_GOING_STRAIGHT.icon_id.to_string(),
            distance_text: DISTANCE_PLACEHOLDER.to_string(),
            next_icon_id: None,
            show_next: false,
            total_distance_text: DISTANCE_PLACEHOLDER.to_string(),
            total_time_text: DISTANCE_PLACEHOLDER.to_string(),
            speed_kmh: 0,
            speed_limit_kmh: 0,
            is_speeding: false,
        }
    }
}

/// What handling an event changed, for the owner to act on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Update {
    pub snapshot_changed: bool,
    /// A new route with geometry was installed; follow state should be
    /// recomputed.
    pub route_replaced: bool,
    pub started: bool,
}

/// Guidance state machine for one navigation session.
#[derive(Debug, Clone)]
pub struct GuidanceState {
    config: GuidanceConfig,
    table: CommandTable,
    snapshot: GuidanceSnapshot,
    speed_filter: SpeedFilter,
    route: ActiveRoute,
    current_turn_type: String,
}

impl GuidanceState {
    pub fn new(config: GuidanceConfig) -> Self {
        Self::with_table(config, CommandTable::default())
    }

    pub fn with_table(config: GuidanceConfig, table: CommandTable) -> Self {
        let speed_filter = SpeedFilter::new(config.process_noise, config.measurement_noise);
        Self {
            config,
            table,
            snapshot: GuidanceSnapshot::default(),
            speed_filter,
            route: ActiveRoute::default(),
            current_turn_type: String::new(),
        }
    }

    pub fn snapshot(&self) -> &GuidanceSnapshot {
        &self.snapshot
    }

    pub fn route(&self) -> &ActiveRoute {
        &self.route
    }

    pub fn instruction_count(&self) -> usize {
        self.route.instructions.len()
    }

    pub fn handle(&mut self, event: CommandEvent) -> Update {
        let before = self.snapshot.clone();
        let mut update = Update::default();

        match event {
            CommandEvent::Ready(command) => self.on_ready(&command),
            CommandEvent::LocationChanged(command) => self.on_location_changed(&command),
            CommandEvent::Recalculated(route) => {
                update.route_replaced = self.on_navigation_recalculated(route);
            }
            CommandEvent::Started => {
                info!("Navigation started");
                update.started = true;
            }
            CommandEvent::Stopped => self.on_navigation_stopped(),
            CommandEvent::WillRecalculate => debug!("Navigation will recalculate"),
        }

        update.snapshot_changed = self.snapshot != before;
        update
    }

    /// A fresh command: every field is taken from it.
    pub fn on_ready(&mut self, command: &NavigationCommand) {
        self.snapshot.manifest_text = self
            .resolve_manifest(command)
            .unwrap_or_else(|| MANIFEST_PLACEHOLDER.to_string());
        self.set_direction(first_turn_type(&command.upcoming));
        self.apply_progress(command);
    }

    /// Progress along the current command. Manifest and direction only
    /// change when the command says something new.
    pub fn on_location_changed(&mut self, command: &NavigationCommand) {
        if let Some(text) = self.resolve_manifest(command) {
            if text != self.snapshot.manifest_text {
                self.snapshot.manifest_text = text;
            }
        }

        let turn_type = first_turn_type(&command.upcoming);
        let changed = !turn_type.is_empty() && turn_type != self.current_turn_type;
        let far_without_guidance = turn_type.is_empty()
            && command.distance_to_command > self.config.neutral_direction_distance_m;
        if changed || far_without_guidance {
            self.set_direction(turn_type);
        }

        self.apply_progress(command);
    }

    /// Install a recalculated route. Returns true if it has geometry.
    pub fn on_navigation_recalculated(&mut self, route: ActiveRoute) -> bool {
        info!(
            "Route recalculated: {} points, {} instructions",
            route.points.len(),
            route.instructions.len()
        );
        self.route = route;
        !self.route.points.is_empty()
    }

    pub fn on_navigation_stopped(&mut self) {
        info!("Navigation stopped");
        self.snapshot = GuidanceSnapshot::default();
        self.current_turn_type.clear();
        self.speed_filter = SpeedFilter::new(self.config.process_noise, self.config.measurement_noise);
    }

    /// Feed a raw speed sample in m/s. Returns true if the snapshot changed.
    pub fn on_speed(&mut self, speed_mps: f64) -> bool {
        let before = (self.snapshot.speed_kmh, self.snapshot.is_speeding);
        let kmh = self.speed_filter.update_mps(speed_mps);
        self.snapshot.speed_kmh = kmh.max(0.0).round() as i32;
        self.refresh_speeding();
        before != (self.snapshot.speed_kmh, self.snapshot.is_speeding)
    }

    fn apply_progress(&mut self, command: &NavigationCommand) {
        self.snapshot.distance_text = format_distance(command.distance_to_command);
        self.snapshot.total_distance_text = format_total_distance(command.total_distance_to_command);
        self.snapshot.total_time_text = format_total_time(command.remaining_time_secs);
        self.snapshot.speed_limit_kmh = command.speed_limit_kmh.max(0);
        self.refresh_speeding();

        match self.next_preview(command) {
            Some(next) => {
                self.snapshot.show_next = true;
                self.snapshot.next_icon_id = Some(next.icon_id.to_string());
            }
            None => {
                self.snapshot.show_next = false;
                self.snapshot.next_icon_id = None;
            }
        }
    }

    fn set_direction(&mut self, turn_type: &str) {
        let direction = self.table.classify(turn_type);
        self.current_turn_type = turn_type.to_string();
        self.snapshot.direction_text = direction.text.to_string();
        self.snapshot.direction_icon_id = direction.icon_id.to_string();
    }

    fn refresh_speeding(&mut self) {
        let s = &mut self.snapshot;
        s.is_speeding = s.speed_limit_kmh > 0 && s.speed_kmh > s.speed_limit_kmh;
    }

    /// Road name from the command, else the street of the instruction it
    /// points at.
    fn resolve_manifest(&self, command: &NavigationCommand) -> Option<String> {
        let road = command.next_road_name.trim();
        if !road.is_empty() {
            return Some(road.to_string());
        }

        let last = self.route.instructions.len().checked_sub(1)?;
        let index = command.static_manifest_index.clamp(0, last as i64) as usize;
        let street = self.route.instructions[index].street_name.trim();
        (!street.is_empty()).then(|| street.to_string())
    }

    fn next_preview(&self, command: &NavigationCommand) -> Option<Direction> {
        let next = command.next_upcoming.first().filter(|t| !t.is_empty())?;
        if is_arrival(&command.command) {
            return None;
        }
        let last_index = self.route.instructions.len() as i64 - 1;
        if command.static_manifest_index >= last_index {
            return None;
        }
        Some(self.table.classify(next))
    }
}

fn first_turn_type(turn_types: &[String]) -> &str {
    turn_types.first().map(String::as_str).unwrap_or("")
}
