//! Fleet data model shared across the console
//!
//! Everything the console mirrors locally lives here: vehicles, detections,
//! waypoints, route plans, advisory text and the command log. All types
//! derive `PartialEq`; structural equality on these derives is the single
//! comparison routine used by the merge policy and the subscription diff.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConsoleError;

/// UTC timestamp used across the console
pub type Timestamp = DateTime<Utc>;

/// Current UTC time
pub fn now() -> Timestamp {
    Utc::now()
}

/// Altitude assigned to a waypoint when the producing source omits one, in meters
pub const DEFAULT_ALTITUDE_M: f64 = 100.0;

fn default_altitude() -> f64 {
    DEFAULT_ALTITUDE_M
}

/// A named field of [`FleetState`], used by merge reports, merge faults and
/// subscription declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Drones,
    Detections,
    RoutePlan,
    Waypoints,
    Advice,
    Telemetry,
    Connectivity,
    CommandLog,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Drones => "drones",
            Field::Detections => "detections",
            Field::RoutePlan => "route_plan",
            Field::Waypoints => "waypoints",
            Field::Advice => "advice",
            Field::Telemetry => "telemetry",
            Field::Connectivity => "connectivity",
            Field::CommandLog => "command_log",
        };
        write!(f, "{}", name)
    }
}

/// A latitude/longitude pair used for command targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A position fix with altitude, as reported by a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub alt: f64,
}

/// One canonical waypoint in the flight sequence
///
/// `id` is globally unique and stable across edits. Sequence order is flight
/// order. Instances are only created by the entity builder in
/// [`crate::waypoint`] or decoded from a push snapshot that already carries
/// ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "default_altitude")]
    pub alt: f64,
    #[serde(default)]
    pub name: String,
}

/// A not-yet-normalized waypoint from a form, a map click or a backend route
/// payload
///
/// Only `lat`/`lon` are required; the entity builder fills the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaypointDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub alt: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
}

impl WaypointDraft {
    pub fn at(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ..Self::default()
        }
    }

    pub fn with_alt(mut self, alt: f64) -> Self {
        self.alt = Some(alt);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// One detection reported by the vision pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Classifier confidence in `[0, 1]`
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub distance: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub estimated_size: Option<String>,
    #[serde(default)]
    pub estimated_weight: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
}

/// Reported vehicle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Idle,
    Ready,
    Mission,
    Returning,
    Maintenance,
    Error,
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VehicleStatus::Idle => "idle",
            VehicleStatus::Ready => "ready",
            VehicleStatus::Mission => "mission",
            VehicleStatus::Returning => "returning",
            VehicleStatus::Maintenance => "maintenance",
            VehicleStatus::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// One fleet member; `id` is the join key for point updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneInstance {
    pub id: String,
    pub name: String,
    pub status: VehicleStatus,
    #[serde(default)]
    pub battery: Option<f64>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub speed: Option<f64>,
}

/// A planned route as produced by the backend planner
///
/// Treated as an atomic value: replaced wholesale, never field-merged. Its
/// embedded waypoints stay exactly as received; the active flight sequence in
/// [`FleetState::waypoints`] is normalized separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    #[serde(default)]
    pub waypoints: Vec<WaypointDraft>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub estimated_time_minutes: Option<f64>,
    #[serde(default)]
    pub fuel_consumption: Option<f64>,
}

/// A live telemetry sample from the active vehicle, atomic like [`RoutePlan`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub battery: Option<f64>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub armed: Option<bool>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// One append-only command log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandLogEntry {
    /// RFC 3339 UTC timestamp taken at append time
    pub timestamp: String,
    pub message: String,
}

impl CommandLogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: now().to_rfc3339(),
            message: message.into(),
        }
    }
}

/// The operation the console is currently planning for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    FilmingWedding,
    FilmingAdvertisement,
    FilmingEvent,
    Mustering,
    Hunting,
    Surveying,
    Inspection,
    SearchRescue,
}

impl OperationMode {
    /// Wire token, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMode::FilmingWedding => "filming_wedding",
            OperationMode::FilmingAdvertisement => "filming_advertisement",
            OperationMode::FilmingEvent => "filming_event",
            OperationMode::Mustering => "mustering",
            OperationMode::Hunting => "hunting",
            OperationMode::Surveying => "surveying",
            OperationMode::Inspection => "inspection",
            OperationMode::SearchRescue => "search_rescue",
        }
    }

    /// Human-readable label for console output
    pub fn label(&self) -> &'static str {
        match self {
            OperationMode::FilmingWedding => "Wedding filming",
            OperationMode::FilmingAdvertisement => "Advertisement filming",
            OperationMode::FilmingEvent => "Event filming",
            OperationMode::Mustering => "Mustering",
            OperationMode::Hunting => "Hunting",
            OperationMode::Surveying => "Surveying",
            OperationMode::Inspection => "Inspection",
            OperationMode::SearchRescue => "Search and rescue",
        }
    }

    /// All selectable modes, in menu order
    pub fn all() -> [OperationMode; 8] {
        [
            OperationMode::FilmingWedding,
            OperationMode::FilmingAdvertisement,
            OperationMode::FilmingEvent,
            OperationMode::Mustering,
            OperationMode::Hunting,
            OperationMode::Surveying,
            OperationMode::Inspection,
            OperationMode::SearchRescue,
        ]
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperationMode {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationMode::all()
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ConsoleError::Validation(format!("unknown operation mode: {}", s)))
    }
}

/// The operator's persisted role, the only state that survives a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorRole {
    Admin,
    Operator,
    Observer,
}

impl OperatorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorRole::Admin => "admin",
            OperatorRole::Operator => "operator",
            OperatorRole::Observer => "observer",
        }
    }
}

impl fmt::Display for OperatorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperatorRole {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(OperatorRole::Admin),
            "operator" => Ok(OperatorRole::Operator),
            "observer" => Ok(OperatorRole::Observer),
            other => Err(ConsoleError::Validation(format!(
                "unknown operator role: {}",
                other
            ))),
        }
    }
}

/// The authoritative local mirror of fleet state
///
/// Created empty at session start, mutated only through the store's entry
/// points, discarded at session end.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FleetState {
    pub connected: bool,
    pub drones: Vec<DroneInstance>,
    pub detections: Vec<Detection>,
    pub waypoints: Vec<Waypoint>,
    pub route_plan: Option<RoutePlan>,
    pub advice: String,
    pub telemetry: Option<TelemetrySample>,
    pub command_log: Vec<CommandLogEntry>,
}
