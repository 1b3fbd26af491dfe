//! Canonical fleet state with constrained mutation entry points
//!
//! The store is the single authoritative mirror. Reads clone a snapshot or
//! follow the watch channel; writes go through the handful of entry points
//! below, which serialize mutation and route every candidate value through
//! the merge policy in [`crate::reconcile`].

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::fleet::{CommandLogEntry, FleetState, Waypoint, WaypointDraft};
use crate::reconcile::{self, FleetUpdate, MergeReport};
use crate::waypoint;

/// A local waypoint edit, as produced by forms, map clicks or the console
#[derive(Debug, Clone, PartialEq)]
pub enum WaypointEvent {
    Add(WaypointDraft),
    Update(Waypoint),
    Delete(String),
}

/// What happened to one local edit after the waypoints policy saw it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The edited sequence was written
    Applied,
    /// The edit changed nothing (missing id, identical value)
    NoOp,
    /// The edit produced a candidate the policy vetoed (an emptied list)
    Suppressed,
}

/// The authoritative state holder
#[derive(Debug)]
pub struct FleetStore {
    inner: RwLock<FleetState>,
    notify: watch::Sender<FleetState>,
}

impl FleetStore {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(FleetState::default());
        Self {
            inner: RwLock::new(FleetState::default()),
            notify,
        }
    }

    /// Clone the current state; never blocks on I/O, never fails
    pub fn snapshot(&self) -> FleetState {
        self.inner.read().clone()
    }

    /// Follow state changes; the receiver coalesces bursts
    pub fn watch(&self) -> watch::Receiver<FleetState> {
        self.notify.subscribe()
    }

    fn publish(&self) {
        let state = self.inner.read().clone();
        let _ = self.notify.send(state);
    }

    /// Merge a partial update through the per-field policy
    pub fn reconcile(&self, update: FleetUpdate) -> MergeReport {
        let report = {
            let mut state = self.inner.write();
            reconcile::apply_update(&mut state, update)
        };
        if !report.applied.is_empty() {
            let fields: Vec<String> = report.applied.iter().map(|f| f.to_string()).collect();
            debug!("Reconciled fields: {}", fields.join(", "));
            self.publish();
        }
        report
    }

    fn edit_waypoints<F>(&self, edit: F) -> MergeOutcome
    where
        F: FnOnce(&[Waypoint]) -> Vec<Waypoint>,
    {
        let outcome = {
            let mut state = self.inner.write();
            let next = edit(&state.waypoints);
            if reconcile::should_replace_waypoints(&state.waypoints, &next) {
                state.waypoints = next;
                MergeOutcome::Applied
            } else if next == state.waypoints {
                MergeOutcome::NoOp
            } else {
                MergeOutcome::Suppressed
            }
        };
        match outcome {
            MergeOutcome::Applied => self.publish(),
            MergeOutcome::Suppressed => {
                debug!("Waypoint edit vetoed by merge policy (empty candidate)")
            }
            MergeOutcome::NoOp => {}
        }
        outcome
    }

    /// Apply one local edit, normalized by the entity builder, then judged by
    /// the waypoints policy
    pub fn apply_waypoint_event(&self, event: WaypointEvent) -> MergeOutcome {
        self.edit_waypoints(|seq| match event {
            WaypointEvent::Add(draft) => waypoint::add(seq, draft),
            WaypointEvent::Update(wp) => waypoint::update(seq, &wp),
            WaypointEvent::Delete(id) => waypoint::delete(seq, &id),
        })
    }

    /// Replace the sequence with a normalized batch (AI route, survey grid)
    pub fn ingest_batch(&self, drafts: Vec<WaypointDraft>) -> MergeOutcome {
        self.edit_waypoints(|_| waypoint::normalize_batch(drafts))
    }

    /// Append one command log entry
    pub fn append_log(&self, message: impl Into<String>) {
        self.append_log_many(vec![message.into()]);
    }

    /// Append several entries under one lock so their order is preserved
    pub fn append_log_many(&self, messages: Vec<String>) {
        if messages.is_empty() {
            return;
        }
        {
            let mut state = self.inner.write();
            for message in messages {
                debug!("Command log: {}", message);
                state.command_log.push(CommandLogEntry::new(message));
            }
        }
        self.publish();
    }

    /// Mirror the push-link connectivity flag; only the connection supervisor
    /// calls this
    pub fn set_connected(&self, connected: bool) {
        {
            let mut state = self.inner.write();
            if state.connected == connected {
                return;
            }
            state.connected = connected;
        }
        info!(
            "Push link {}",
            if connected { "connected" } else { "disconnected" }
        );
        self.publish();
    }
}

impl Default for FleetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{DroneInstance, VehicleStatus};

    fn drone(id: &str) -> DroneInstance {
        DroneInstance {
            id: id.to_string(),
            name: format!("Drone {}", id),
            status: VehicleStatus::Idle,
            battery: None,
            position: None,
            speed: None,
        }
    }

    #[test]
    fn test_reconcile_writes_and_notifies() {
        let store = FleetStore::new();
        let mut rx = store.watch();

        let report = store.reconcile(FleetUpdate::default().with_drones(vec![drone("d1")]));
        assert_eq!(report.applied.len(), 1);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().drones.len(), 1);
    }

    #[test]
    fn test_noop_reconcile_does_not_notify() {
        let store = FleetStore::new();
        store.reconcile(FleetUpdate::default().with_drones(vec![drone("d1")]));

        let mut rx = store.watch();
        store.reconcile(FleetUpdate::default().with_drones(vec![drone("d1")]));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_add_then_delete_last_waypoint_is_suppressed() {
        let store = FleetStore::new();
        let outcome = store.apply_waypoint_event(WaypointEvent::Add(WaypointDraft::at(1.0, 2.0)));
        assert_eq!(outcome, MergeOutcome::Applied);

        let id = store.snapshot().waypoints[0].id.clone();
        let outcome = store.apply_waypoint_event(WaypointEvent::Delete(id));
        assert_eq!(outcome, MergeOutcome::Suppressed);
        assert_eq!(store.snapshot().waypoints.len(), 1);
    }

    #[test]
    fn test_delete_with_two_waypoints_applies() {
        let store = FleetStore::new();
        store.apply_waypoint_event(WaypointEvent::Add(WaypointDraft::at(1.0, 2.0)));
        store.apply_waypoint_event(WaypointEvent::Add(WaypointDraft::at(3.0, 4.0)));

        let id = store.snapshot().waypoints[0].id.clone();
        let outcome = store.apply_waypoint_event(WaypointEvent::Delete(id.clone()));
        assert_eq!(outcome, MergeOutcome::Applied);

        let remaining = store.snapshot().waypoints;
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].id, id);
    }

    #[test]
    fn test_update_with_unknown_id_is_a_noop() {
        let store = FleetStore::new();
        store.apply_waypoint_event(WaypointEvent::Add(WaypointDraft::at(1.0, 2.0)));

        let mut ghost = store.snapshot().waypoints[0].clone();
        ghost.id = "missing".to_string();
        let outcome = store.apply_waypoint_event(WaypointEvent::Update(ghost));
        assert_eq!(outcome, MergeOutcome::NoOp);
    }

    #[test]
    fn test_ingest_batch_replaces_the_sequence() {
        let store = FleetStore::new();
        store.apply_waypoint_event(WaypointEvent::Add(WaypointDraft::at(1.0, 2.0)));

        let outcome = store.ingest_batch(vec![
            WaypointDraft::at(5.0, 6.0),
            WaypointDraft::at(7.0, 8.0),
        ]);
        assert_eq!(outcome, MergeOutcome::Applied);
        assert_eq!(store.snapshot().waypoints.len(), 2);
        assert_eq!(store.snapshot().waypoints[0].name, "Waypoint 1");
    }

    #[test]
    fn test_log_entries_keep_append_order() {
        let store = FleetStore::new();
        store.append_log_many(vec![
            "Route recommendation: hold east ridge".to_string(),
            "Route recommendation completed".to_string(),
        ]);

        let log = store.snapshot().command_log;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].message, "Route recommendation: hold east ridge");
        assert_eq!(log[1].message, "Route recommendation completed");
    }

    #[test]
    fn test_set_connected_ignores_repeats() {
        let store = FleetStore::new();
        store.set_connected(true);

        let mut rx = store.watch();
        store.set_connected(true);
        assert!(!rx.has_changed().unwrap());

        store.set_connected(false);
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().connected);
    }

    #[test]
    fn test_disconnect_retains_last_known_state() {
        let store = FleetStore::new();
        store.set_connected(true);
        store.reconcile(
            FleetUpdate::default()
                .with_drones(vec![drone("d1")])
                .with_advice("hold the ridge line"),
        );

        store.set_connected(false);

        let state = store.snapshot();
        assert!(!state.connected);
        assert_eq!(state.drones.len(), 1);
        assert_eq!(state.advice, "hold the ridge line");
    }
}
