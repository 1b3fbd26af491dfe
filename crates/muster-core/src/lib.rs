//! Muster Core - Reconciliation and dispatch engine for a drone fleet console
//!
//! Muster Core keeps a single canonical mirror of fleet state on the operator
//! side and guards every path that mutates it: push snapshots from the
//! backend, local waypoint edits, and the results of asynchronous planning
//! commands.
//!
//! # Architecture
//!
//! The crate is built on five pieces:
//!
//! 1. **Fleet model** (`fleet`): the state types, compared only by structural equality
//! 2. **Reconciler** (`reconcile`): per-field merge policy over partial snapshots
//! 3. **Entity builder** (`waypoint`): draft normalization, unique ids, positional names
//! 4. **Dispatcher** (`dispatch`): validated, single-flight planning commands
//! 5. **Session** (`console`, `session`, `subscribe`): wiring, persisted role, field-scoped subscriptions
//!
//! # Quick Start
//!
//! ```
//! use muster_core::fleet::Field;
//! use muster_core::reconcile::FleetUpdate;
//! use muster_core::store::FleetStore;
//!
//! let store = FleetStore::new();
//!
//! // Merge a partial snapshot; only fields that pass policy are written.
//! let report = store.reconcile(
//!     FleetUpdate::default().with_advice("Hold position and observe"),
//! );
//! assert!(report.applied(Field::Advice));
//!
//! // Re-applying the identical snapshot changes nothing.
//! let report = store.reconcile(
//!     FleetUpdate::default().with_advice("Hold position and observe"),
//! );
//! assert!(report.is_noop());
//! ```
//!
//! # Design Principles
//!
//! 1. **One writer discipline**: state changes only through the store's entry points
//! 2. **Idempotent ingestion**: the same frame applied twice writes once
//! 3. **Contained faults**: a bad field in a snapshot never poisons its siblings
//! 4. **Validation before network**: a request that cannot succeed is never sent

#![deny(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod console;
pub mod dispatch;
pub mod error;
pub mod fleet;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod subscribe;
pub mod waypoint;

// Re-export commonly used types for convenience
pub use console::Console;
pub use dispatch::{DispatchOutcome, Dispatcher, PlanContext, PlannerApi};
pub use error::{ConsoleError, Result};
pub use fleet::{
    Detection, DroneInstance, Field, FleetState, GeoPoint, OperationMode, OperatorRole, RoutePlan,
    TelemetrySample, VehicleStatus, Waypoint, WaypointDraft,
};
pub use reconcile::{FleetUpdate, MergeFault, MergeReport};
pub use session::RoleStore;
pub use store::{FleetStore, MergeOutcome, WaypointEvent};
pub use subscribe::Subscriptions;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
