//! Per-field merge policy for inbound fleet snapshots
//!
//! A snapshot never overwrites state blindly: each field is judged on its
//! own, and collections carry a non-empty guard so a momentarily sparse
//! frame cannot visibly clear populated state. Last-known-good beats strict
//! recency here; there is no sequence numbering across the push and command
//! paths.

use crate::fleet::{
    Detection, DroneInstance, Field, FleetState, RoutePlan, TelemetrySample, Waypoint,
};

/// A typed, partial update; absent fields leave state untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetUpdate {
    pub drones: Option<Vec<DroneInstance>>,
    pub detections: Option<Vec<Detection>>,
    pub route_plan: Option<RoutePlan>,
    pub waypoints: Option<Vec<Waypoint>>,
    pub advice: Option<String>,
    pub telemetry: Option<TelemetrySample>,
}

impl FleetUpdate {
    pub fn with_drones(mut self, drones: Vec<DroneInstance>) -> Self {
        self.drones = Some(drones);
        self
    }

    pub fn with_detections(mut self, detections: Vec<Detection>) -> Self {
        self.detections = Some(detections);
        self
    }

    pub fn with_route_plan(mut self, route_plan: RoutePlan) -> Self {
        self.route_plan = Some(route_plan);
        self
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Waypoint>) -> Self {
        self.waypoints = Some(waypoints);
        self
    }

    pub fn with_advice(mut self, advice: impl Into<String>) -> Self {
        self.advice = Some(advice.into());
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetrySample) -> Self {
        self.telemetry = Some(telemetry);
        self
    }
}

/// A fault confined to a single field while decoding or merging a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct MergeFault {
    pub field: Field,
    pub reason: String,
}

/// What one reconciliation pass did, per field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    /// Fields whose candidate value was written
    pub applied: Vec<Field>,
    /// Fields whose candidate was present but vetoed by policy
    pub skipped: Vec<Field>,
    /// Per-field faults, isolated from the surviving fields
    pub faults: Vec<MergeFault>,
}

impl MergeReport {
    pub fn applied(&self, field: Field) -> bool {
        self.applied.contains(&field)
    }

    /// True when nothing was written and nothing faulted
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.faults.is_empty()
    }
}

/// Drones replace only when the candidate is non-empty and structurally
/// different from the current list
pub fn should_replace_drones(current: &[DroneInstance], candidate: &[DroneInstance]) -> bool {
    !candidate.is_empty() && candidate != current
}

/// Detections replace when structurally different, unless that would clear a
/// populated list (the anti-flicker guard)
pub fn should_replace_detections(current: &[Detection], candidate: &[Detection]) -> bool {
    candidate != current && (!candidate.is_empty() || current.is_empty())
}

/// A present route plan replaces anything it differs from; plans are atomic
pub fn should_replace_route_plan(current: Option<&RoutePlan>, candidate: &RoutePlan) -> bool {
    current != Some(candidate)
}

/// Waypoints follow the drones rule: non-empty and different
pub fn should_replace_waypoints(current: &[Waypoint], candidate: &[Waypoint]) -> bool {
    !candidate.is_empty() && candidate != current
}

/// Advisory text replaces when non-empty and different
pub fn should_replace_advice(current: &str, candidate: &str) -> bool {
    !candidate.is_empty() && candidate != current
}

/// Telemetry samples are atomic values like route plans
pub fn should_replace_telemetry(
    current: Option<&TelemetrySample>,
    candidate: &TelemetrySample,
) -> bool {
    current != Some(candidate)
}

/// Apply one partial update to the state, field by field
///
/// Each field is judged independently; a veto on one field never blocks the
/// others.
pub fn apply_update(state: &mut FleetState, update: FleetUpdate) -> MergeReport {
    let mut report = MergeReport::default();

    if let Some(drones) = update.drones {
        if should_replace_drones(&state.drones, &drones) {
            state.drones = drones;
            report.applied.push(Field::Drones);
        } else {
            report.skipped.push(Field::Drones);
        }
    }

    if let Some(detections) = update.detections {
        if should_replace_detections(&state.detections, &detections) {
            state.detections = detections;
            report.applied.push(Field::Detections);
        } else {
            report.skipped.push(Field::Detections);
        }
    }

    if let Some(route_plan) = update.route_plan {
        if should_replace_route_plan(state.route_plan.as_ref(), &route_plan) {
            state.route_plan = Some(route_plan);
            report.applied.push(Field::RoutePlan);
        } else {
            report.skipped.push(Field::RoutePlan);
        }
    }

    if let Some(waypoints) = update.waypoints {
        if should_replace_waypoints(&state.waypoints, &waypoints) {
            state.waypoints = waypoints;
            report.applied.push(Field::Waypoints);
        } else {
            report.skipped.push(Field::Waypoints);
        }
    }

    if let Some(advice) = update.advice {
        if should_replace_advice(&state.advice, &advice) {
            state.advice = advice;
            report.applied.push(Field::Advice);
        } else {
            report.skipped.push(Field::Advice);
        }
    }

    if let Some(telemetry) = update.telemetry {
        if should_replace_telemetry(state.telemetry.as_ref(), &telemetry) {
            state.telemetry = Some(telemetry);
            report.applied.push(Field::Telemetry);
        } else {
            report.skipped.push(Field::Telemetry);
        }
    }

    report
}
