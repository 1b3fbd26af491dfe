//! Console session wiring
//!
//! One [`Console`] is one operator session: a fresh store, a dispatcher
//! bound to it, the injected role store, and the teardown plumbing shared
//! with every background task. Dropping the session never reuses state; a
//! new session starts from an empty mirror.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::dispatch::{Dispatcher, PlannerApi};
use crate::fleet::Field;
use crate::session::RoleStore;
use crate::store::FleetStore;
use crate::subscribe::Subscriptions;

/// An operator session and everything attached to it
pub struct Console {
    store: Arc<FleetStore>,
    dispatcher: Arc<Dispatcher>,
    roles: Arc<RoleStore>,
    live: Arc<AtomicBool>,
    shutdown: broadcast::Sender<()>,
    session_id: Uuid,
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("session_id", &self.session_id)
            .field("live", &self.is_live())
            .finish()
    }
}

impl Console {
    /// Wire a fresh session around the given backend surface and role store
    pub fn new(api: Arc<dyn PlannerApi>, roles: Arc<RoleStore>) -> Self {
        let store = Arc::new(FleetStore::new());
        let live = Arc::new(AtomicBool::new(true));
        let (shutdown, _) = broadcast::channel(4);
        let dispatcher = Arc::new(Dispatcher::new(api, store.clone(), live.clone()));
        let session_id = Uuid::new_v4();
        info!("Console session {} starting", session_id);
        Self {
            store,
            dispatcher,
            roles,
            live,
            shutdown,
            session_id,
        }
    }

    pub fn store(&self) -> Arc<FleetStore> {
        self.store.clone()
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    pub fn roles(&self) -> Arc<RoleStore> {
        self.roles.clone()
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Flag shared with background tasks; false once teardown has begun
    pub fn live_flag(&self) -> Arc<AtomicBool> {
        self.live.clone()
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// A receiver that fires when [`shutdown`] runs
    ///
    /// [`shutdown`]: Console::shutdown
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    /// Start the built-in panel subscriptions on the session store
    pub fn spawn_default_subscriptions(&self) -> JoinHandle<()> {
        let mut subs = Subscriptions::new();
        subs.register("advisory-panel", vec![Field::Advice], |state| {
            if !state.advice.is_empty() {
                info!("Advisory: {}", state.advice);
            }
        });
        subs.register("link-indicator", vec![Field::Connectivity], |state| {
            if state.connected {
                info!("Push link established");
            } else {
                info!("Push link lost");
            }
        });
        tokio::spawn(subs.run(self.store.watch()))
    }

    /// Mark the session dead and wake every background task
    ///
    /// In-flight planning responses observe the dead flag and are discarded
    /// without merging or logging.
    pub fn shutdown(&self) {
        self.live.store(false, Ordering::SeqCst);
        let _ = self.shutdown.send(());
        info!("Console session {} shut down", self.session_id);
    }
}
