//! Field-scoped state subscriptions
//!
//! A subscription declares up front which [`Field`]s it reacts to. On every
//! published snapshot the registry diffs exactly those fields against the
//! previous snapshot, by structural equality, and runs the handler only when
//! one of them changed. Re-publishing an identical snapshot fires nothing.

use std::fmt;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::fleet::{Field, FleetState};

type Handler = Box<dyn FnMut(&FleetState) + Send>;

/// One named reaction to a declared set of fields
pub struct Subscription {
    name: String,
    fields: Vec<Field>,
    handler: Handler,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Whether `field` differs between two snapshots
pub fn field_changed(prev: &FleetState, next: &FleetState, field: Field) -> bool {
    match field {
        Field::Drones => prev.drones != next.drones,
        Field::Detections => prev.detections != next.detections,
        Field::RoutePlan => prev.route_plan != next.route_plan,
        Field::Waypoints => prev.waypoints != next.waypoints,
        Field::Advice => prev.advice != next.advice,
        Field::Telemetry => prev.telemetry != next.telemetry,
        Field::Connectivity => prev.connected != next.connected,
        Field::CommandLog => prev.command_log != next.command_log,
    }
}

/// Registry of subscriptions plus the last snapshot they were shown
#[derive(Default)]
pub struct Subscriptions {
    subs: Vec<Subscription>,
    last: FleetState,
}

impl fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriptions")
            .field("subs", &self.subs)
            .finish()
    }
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for the given fields
    pub fn register(
        &mut self,
        name: impl Into<String>,
        fields: Vec<Field>,
        handler: impl FnMut(&FleetState) + Send + 'static,
    ) {
        let name = name.into();
        debug!("Registering subscription {} on {:?}", name, fields);
        self.subs.push(Subscription {
            name,
            fields,
            handler: Box::new(handler),
        });
    }

    /// Diff `state` against the last seen snapshot and run every subscription
    /// whose fields changed; returns how many fired
    pub fn observe(&mut self, state: &FleetState) -> usize {
        let mut fired = 0;
        for sub in &mut self.subs {
            let changed = sub
                .fields
                .iter()
                .any(|field| field_changed(&self.last, state, *field));
            if changed {
                trace!("Subscription {} fired", sub.name);
                (sub.handler)(state);
                fired += 1;
            }
        }
        self.last = state.clone();
        fired
    }

    /// Drive the registry from a snapshot channel until the sender goes away
    pub async fn run(mut self, mut rx: watch::Receiver<FleetState>) {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            self.observe(&state);
        }
        debug!("Subscription channel closed");
    }
}
