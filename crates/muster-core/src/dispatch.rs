//! Asynchronous planning command dispatch
//!
//! The dispatcher validates before any network call, holds one busy flag for
//! the whole planning operation class, merges successful results through the
//! reconciler and appends to the command log. Responses that land after a
//! mode change or after teardown are discarded, never applied.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ConsoleError, Result};
use crate::fleet::{GeoPoint, OperationMode, RoutePlan, Waypoint, WaypointDraft};
use crate::reconcile::FleetUpdate;
use crate::store::FleetStore;
use crate::waypoint;

/// `route/cleanup` request body
#[derive(Debug, Clone, Serialize)]
pub struct CleanupRequest {
    pub mode: OperationMode,
    pub waypoints: Vec<Waypoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<GeoPoint>,
}

/// `route/recommend` request body
#[derive(Debug, Clone, Serialize)]
pub struct RecommendRequest {
    pub mode: OperationMode,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<GeoPoint>,
}

/// `route/execute-ai` request body
#[derive(Debug, Clone, Serialize)]
pub struct TakeoverRequest {
    pub mode: OperationMode,
    pub operation: String,
    pub waypoints: Vec<Waypoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<GeoPoint>,
}

/// `route/execute` request body
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteRequest {
    pub waypoints: Vec<Waypoint>,
}

/// One prior exchange carried with an advice request
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn operator(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn advisor(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// `ai/chat` request body
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub mode: OperationMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conversation_history: Vec<ChatTurn>,
}

/// Route-bearing response from cleanup/recommend; every field optional at
/// the boundary
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub route: Option<RoutePlan>,
    #[serde(default)]
    pub waypoints: Option<Vec<WaypointDraft>>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Acknowledgement from `route/execute-ai`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TakeoverResponse {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Outcome of `route/execute`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExecuteResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Reply from the AI advisor
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub route: Option<RoutePlan>,
    #[serde(default)]
    pub advice: Option<String>,
}

/// Backend health probe result; the server contract keeps this endpoint
/// always-200, so failures here are connectivity signals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub drones_online: Option<u32>,
    #[serde(default)]
    pub version: Option<String>,
}

/// The backend planning surface the dispatcher talks to
///
/// Implemented over HTTP in `muster-uplink`; tests substitute in-memory
/// fakes.
#[async_trait]
pub trait PlannerApi: Send + Sync {
    async fn cleanup_route(&self, request: &CleanupRequest) -> Result<RouteResponse>;
    async fn recommend_route(&self, request: &RecommendRequest) -> Result<RouteResponse>;
    async fn execute_with_ai(&self, request: &TakeoverRequest) -> Result<TakeoverResponse>;
    async fn execute_route(&self, request: &ExecuteRequest) -> Result<ExecuteResponse>;
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply>;
    async fn status(&self) -> Result<StatusReport>;
}

/// Operator-selected targeting context passed with each planning call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanContext {
    pub mode: Option<OperationMode>,
    pub location: Option<GeoPoint>,
    pub destination: Option<GeoPoint>,
}

/// How a planning operation ended
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The response was merged and logged; carries the backend's reason text
    Completed { reason: Option<String> },
    /// The response landed after a mode change or teardown and was discarded
    Superseded,
}

struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Issues planning operations and merges their results
pub struct Dispatcher {
    api: Arc<dyn PlannerApi>,
    store: Arc<FleetStore>,
    live: Arc<AtomicBool>,
    busy: AtomicBool,
    generation: AtomicU64,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("busy", &self.is_busy())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}

impl Dispatcher {
    pub fn new(api: Arc<dyn PlannerApi>, store: Arc<FleetStore>, live: Arc<AtomicBool>) -> Self {
        Self {
            api,
            store,
            live,
            busy: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Whether a planning-class operation is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Record a mode change; responses captured under an older generation
    /// are discarded when they land
    pub fn note_mode_change(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn begin_planning(&self) -> Result<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ConsoleError::Validation(
                "a planning operation is already in progress".to_string(),
            ));
        }
        Ok(BusyGuard { flag: &self.busy })
    }

    fn still_current(&self, generation: u64) -> bool {
        self.live.load(Ordering::SeqCst)
            && self.generation.load(Ordering::SeqCst) == generation
    }

    fn require_mode(ctx: &PlanContext) -> Result<OperationMode> {
        ctx.mode
            .ok_or_else(|| ConsoleError::Validation("select an operation mode first".to_string()))
    }

    fn require_waypoints(&self) -> Result<Vec<Waypoint>> {
        let waypoints = self.store.snapshot().waypoints;
        if waypoints.is_empty() {
            return Err(ConsoleError::Validation(
                "no waypoints in the current sequence".to_string(),
            ));
        }
        Ok(waypoints)
    }

    /// Ask the backend to clean up the current route
    pub async fn cleanup_route(&self, ctx: &PlanContext) -> Result<DispatchOutcome> {
        let mode = Self::require_mode(ctx)?;
        let waypoints = self.require_waypoints()?;
        let _guard = self.begin_planning()?;
        let generation = self.generation.load(Ordering::SeqCst);

        info!(
            "Dispatching route cleanup ({} waypoints, mode {})",
            waypoints.len(),
            mode
        );
        let request = CleanupRequest {
            mode,
            waypoints,
            destination: ctx.destination,
        };
        match self.api.cleanup_route(&request).await {
            Ok(response) => self.complete_route_op("Route cleanup", generation, response),
            Err(err) => self.fail_op("Route cleanup", generation, err),
        }
    }

    /// Ask the backend for a recommended route for the selected mode
    pub async fn recommend_route(&self, ctx: &PlanContext) -> Result<DispatchOutcome> {
        let mode = Self::require_mode(ctx)?;
        let _guard = self.begin_planning()?;
        let generation = self.generation.load(Ordering::SeqCst);

        info!("Requesting route recommendation (mode {})", mode);
        let request = RecommendRequest {
            mode,
            operation: mode.to_string(),
            location: ctx.location,
            destination: ctx.destination,
        };
        match self.api.recommend_route(&request).await {
            Ok(response) => self.complete_route_op("Route recommendation", generation, response),
            Err(err) => self.fail_op("Route recommendation", generation, err),
        }
    }

    /// Hand the current sequence to the AI pilot
    pub async fn takeover(&self, ctx: &PlanContext) -> Result<DispatchOutcome> {
        let mode = Self::require_mode(ctx)?;
        let waypoints = self.require_waypoints()?;
        let _guard = self.begin_planning()?;
        let generation = self.generation.load(Ordering::SeqCst);

        info!(
            "Requesting AI takeover ({} waypoints, mode {})",
            waypoints.len(),
            mode
        );
        let request = TakeoverRequest {
            mode,
            operation: mode.to_string(),
            waypoints,
            destination: ctx.destination,
        };
        match self.api.execute_with_ai(&request).await {
            Ok(response) => {
                if !self.still_current(generation) {
                    debug!("Discarding stale AI takeover response");
                    return Ok(DispatchOutcome::Superseded);
                }
                let mut lines = Vec::new();
                if let Some(reason) = &response.reason {
                    lines.push(reason.clone());
                }
                lines.push("AI takeover engaged".to_string());
                self.store.append_log_many(lines);
                Ok(DispatchOutcome::Completed {
                    reason: response.reason,
                })
            }
            Err(err) => self.fail_op("AI takeover", generation, err),
        }
    }

    /// Execute the current waypoint sequence
    ///
    /// Not part of the planning class: never touches the busy flag and never
    /// merges state.
    pub async fn execute_mission(&self) -> Result<ExecuteResponse> {
        let waypoints = self.require_waypoints()?;

        info!("Executing mission with {} waypoints", waypoints.len());
        let request = ExecuteRequest { waypoints };
        match self.api.execute_route(&request).await {
            Ok(response) => Ok(response),
            Err(err) => {
                if self.live.load(Ordering::SeqCst) {
                    warn!("Mission execution failed: {}", err);
                    self.store
                        .append_log(format!("Mission execution failed: {}", err));
                }
                Err(err)
            }
        }
    }

    /// Ask the AI advisor a question
    ///
    /// A route in the reply is merged like any other planning result: the
    /// plan wholesale through the route policy, its waypoints normalized by
    /// the entity builder first.
    pub async fn request_advice(
        &self,
        ctx: &PlanContext,
        message: impl Into<String>,
        history: Vec<ChatTurn>,
    ) -> Result<DispatchOutcome> {
        let mode = Self::require_mode(ctx)?;
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ConsoleError::Validation(
                "advice request needs a message".to_string(),
            ));
        }
        let _guard = self.begin_planning()?;
        let generation = self.generation.load(Ordering::SeqCst);

        info!("Requesting AI advice (mode {})", mode);
        let request = ChatRequest {
            message,
            mode,
            conversation_history: history,
        };
        match self.api.chat(&request).await {
            Ok(reply) => {
                if !self.still_current(generation) {
                    debug!("Discarding stale advice reply");
                    return Ok(DispatchOutcome::Superseded);
                }
                let mut update = FleetUpdate::default();
                if let Some(advice) = &reply.advice {
                    update = update.with_advice(advice.clone());
                }
                if let Some(route) = reply.route {
                    update = update
                        .with_waypoints(waypoint::normalize_batch(route.waypoints.clone()))
                        .with_route_plan(route);
                }
                self.store.reconcile(update);
                if !reply.response.is_empty() {
                    self.store
                        .append_log(format!("AI advisor: {}", reply.response));
                }
                Ok(DispatchOutcome::Completed {
                    reason: Some(reply.response),
                })
            }
            Err(err) => self.fail_op("Advice request", generation, err),
        }
    }

    /// Probe backend health; read-only, no busy-flag involvement
    pub async fn status(&self) -> Result<StatusReport> {
        self.api.status().await
    }

    fn complete_route_op(
        &self,
        label: &str,
        generation: u64,
        response: RouteResponse,
    ) -> Result<DispatchOutcome> {
        if !self.still_current(generation) {
            debug!("Discarding stale {} response", label.to_lowercase());
            return Ok(DispatchOutcome::Superseded);
        }

        let mut update = FleetUpdate::default();
        if let Some(route) = response.route {
            update = update.with_route_plan(route);
        }
        if let Some(drafts) = response.waypoints {
            update = update.with_waypoints(waypoint::normalize_batch(drafts));
        }
        let report = self.store.reconcile(update);
        debug!("{} merged {} field(s)", label, report.applied.len());

        let mut lines = Vec::new();
        if let Some(reason) = &response.reason {
            lines.push(reason.clone());
        }
        lines.push(format!("{} completed", label));
        self.store.append_log_many(lines);
        Ok(DispatchOutcome::Completed {
            reason: response.reason,
        })
    }

    fn fail_op(&self, label: &str, generation: u64, err: ConsoleError) -> Result<DispatchOutcome> {
        if !self.still_current(generation) {
            debug!("Discarding stale {} failure", label.to_lowercase());
            return Ok(DispatchOutcome::Superseded);
        }
        warn!("{} failed: {}", label, err);
        self.store.append_log(format!("{} failed: {}", label, err));
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WaypointEvent;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct StubPlanner {
        calls: AtomicUsize,
        response: Mutex<RouteResponse>,
        fail_with: Mutex<Option<ConsoleError>>,
        gate: Option<Arc<Notify>>,
    }

    impl StubPlanner {
        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::default()
            }
        }

        fn respond_with(self, response: RouteResponse) -> Self {
            *self.response.lock() = response;
            self
        }

        fn fail_next(self, err: ConsoleError) -> Self {
            *self.fail_with.lock() = Some(err);
            self
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn respond(&self) -> Result<RouteResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if let Some(err) = self.fail_with.lock().take() {
                return Err(err);
            }
            Ok(self.response.lock().clone())
        }
    }

    #[async_trait]
    impl PlannerApi for StubPlanner {
        async fn cleanup_route(&self, _request: &CleanupRequest) -> Result<RouteResponse> {
            self.respond().await
        }

        async fn recommend_route(&self, _request: &RecommendRequest) -> Result<RouteResponse> {
            self.respond().await
        }

        async fn execute_with_ai(&self, _request: &TakeoverRequest) -> Result<TakeoverResponse> {
            self.respond().await.map(|r| TakeoverResponse { reason: r.reason })
        }

        async fn execute_route(&self, _request: &ExecuteRequest) -> Result<ExecuteResponse> {
            self.respond().await.map(|_| ExecuteResponse {
                success: Some(true),
                status: Some("executing".to_string()),
                message: None,
            })
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
            self.respond().await.map(|r| ChatReply {
                response: format!("Echo: {}", request.message),
                route: r.route,
                advice: r.reason,
            })
        }

        async fn status(&self) -> Result<StatusReport> {
            Ok(StatusReport {
                running: true,
                authenticated: true,
                ..StatusReport::default()
            })
        }
    }

    fn harness(stub: StubPlanner) -> (Arc<StubPlanner>, Arc<FleetStore>, Dispatcher) {
        let api = Arc::new(stub);
        let store = Arc::new(FleetStore::new());
        let live = Arc::new(AtomicBool::new(true));
        let dispatcher = Dispatcher::new(api.clone(), store.clone(), live);
        (api, store, dispatcher)
    }

    fn seed_waypoint(store: &FleetStore) {
        store.apply_waypoint_event(WaypointEvent::Add(WaypointDraft::at(-31.95, 115.86)));
    }

    fn mode_ctx() -> PlanContext {
        PlanContext {
            mode: Some(OperationMode::Mustering),
            ..PlanContext::default()
        }
    }

    #[tokio::test]
    async fn test_cleanup_without_mode_never_calls_the_backend() {
        let (api, store, dispatcher) = harness(StubPlanner::default());
        seed_waypoint(&store);

        let err = dispatcher
            .cleanup_route(&PlanContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
        assert_eq!(api.call_count(), 0);
        assert!(!dispatcher.is_busy());
        assert!(store.snapshot().command_log.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_without_waypoints_never_calls_the_backend() {
        let (api, store, dispatcher) = harness(StubPlanner::default());

        let err = dispatcher.cleanup_route(&mode_ctx()).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
        assert_eq!(api.call_count(), 0);
        assert!(store.snapshot().command_log.is_empty());
    }

    #[tokio::test]
    async fn test_recommend_needs_only_a_mode() {
        let (api, store, dispatcher) = harness(StubPlanner::default());

        let outcome = dispatcher.recommend_route(&mode_ctx()).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Completed { reason: None });
        assert_eq!(api.call_count(), 1);

        let log = store.snapshot().command_log;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].message, "Route recommendation completed");
    }

    #[tokio::test]
    async fn test_recommend_merges_route_and_waypoints_and_logs_reason_first() {
        let route = RoutePlan {
            waypoints: vec![WaypointDraft::at(-31.95, 115.86)],
            distance_km: Some(4.2),
            ..RoutePlan::default()
        };
        let response = RouteResponse {
            route: Some(route.clone()),
            waypoints: Some(vec![
                WaypointDraft::at(-31.95, 115.86),
                WaypointDraft::at(-31.96, 115.87).with_alt(80.0),
            ]),
            reason: Some("Two passes cover the paddock".to_string()),
        };
        let (_api, store, dispatcher) = harness(StubPlanner::default().respond_with(response));

        let outcome = dispatcher.recommend_route(&mode_ctx()).await.unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::Completed {
                reason: Some("Two passes cover the paddock".to_string()),
            }
        );

        let state = store.snapshot();
        assert_eq!(state.route_plan, Some(route));
        assert_eq!(state.waypoints.len(), 2);
        assert!(state.waypoints.iter().all(|wp| !wp.id.is_empty()));
        assert_eq!(state.waypoints[0].alt, 100.0);
        assert_eq!(state.waypoints[0].name, "Waypoint 1");
        assert_eq!(state.waypoints[1].alt, 80.0);

        let log = state.command_log;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].message, "Two passes cover the paddock");
        assert_eq!(log[1].message, "Route recommendation completed");
    }

    #[tokio::test]
    async fn test_second_planning_call_is_rejected_while_busy() {
        let gate = Arc::new(Notify::new());
        let (_api, store, dispatcher) = harness(StubPlanner::gated(gate.clone()));
        seed_waypoint(&store);
        let dispatcher = Arc::new(dispatcher);

        assert!(!dispatcher.is_busy());
        let first = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.cleanup_route(&mode_ctx()).await })
        };
        while !dispatcher.is_busy() {
            tokio::task::yield_now().await;
        }

        let err = dispatcher.recommend_route(&mode_ctx()).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert!(!dispatcher.is_busy());
    }

    #[tokio::test]
    async fn test_busy_flag_resets_after_a_failure() {
        let (_api, store, dispatcher) =
            harness(StubPlanner::default().fail_next(ConsoleError::Network("boom".to_string())));
        seed_waypoint(&store);

        let err = dispatcher.cleanup_route(&mode_ctx()).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Network(_)));
        assert!(!dispatcher.is_busy());

        let log = store.snapshot().command_log;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].message, "Route cleanup failed: Network error: boom");
    }

    #[tokio::test]
    async fn test_mode_change_mid_flight_discards_the_response() {
        let gate = Arc::new(Notify::new());
        let (_api, store, dispatcher) = harness(
            StubPlanner::gated(gate.clone()).respond_with(RouteResponse {
                route: Some(RoutePlan {
                    distance_km: Some(3.0),
                    ..RoutePlan::default()
                }),
                waypoints: None,
                reason: Some("stale".to_string()),
            }),
        );
        let dispatcher = Arc::new(dispatcher);

        let pending = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.recommend_route(&mode_ctx()).await })
        };
        while !dispatcher.is_busy() {
            tokio::task::yield_now().await;
        }

        dispatcher.note_mode_change();
        gate.notify_one();

        let outcome = pending.await.unwrap().unwrap();
        assert_eq!(outcome, DispatchOutcome::Superseded);
        assert!(store.snapshot().route_plan.is_none());
        assert!(store.snapshot().command_log.is_empty());
    }

    #[tokio::test]
    async fn test_execute_mission_skips_the_busy_flag_and_the_log() {
        let (api, store, dispatcher) = harness(StubPlanner::default());
        seed_waypoint(&store);

        let response = dispatcher.execute_mission().await.unwrap();
        assert_eq!(response.success, Some(true));
        assert_eq!(api.call_count(), 1);
        assert!(!dispatcher.is_busy());
        assert!(store.snapshot().command_log.is_empty());
    }

    #[tokio::test]
    async fn test_execute_mission_requires_waypoints() {
        let (api, _store, dispatcher) = harness(StubPlanner::default());

        let err = dispatcher.execute_mission().await.unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_advice_merges_route_and_advice_and_logs_the_reply() {
        let route = RoutePlan {
            waypoints: vec![WaypointDraft::at(1.0, 2.0), WaypointDraft::at(3.0, 4.0)],
            distance_km: Some(1.2),
            ..RoutePlan::default()
        };
        let (_api, store, dispatcher) = harness(StubPlanner::default().respond_with(
            RouteResponse {
                route: Some(route.clone()),
                waypoints: None,
                reason: Some("Stay south of the herd".to_string()),
            },
        ));

        let outcome = dispatcher
            .request_advice(&mode_ctx(), "where should I fly?", Vec::new())
            .await
            .unwrap();
        assert!(matches!(outcome, DispatchOutcome::Completed { .. }));

        let state = store.snapshot();
        assert_eq!(state.advice, "Stay south of the herd");
        assert_eq!(state.route_plan, Some(route));
        assert_eq!(state.waypoints.len(), 2);
        assert_eq!(state.waypoints[0].name, "Waypoint 1");
        assert_eq!(state.command_log.len(), 1);
        assert!(state.command_log[0].message.starts_with("AI advisor: Echo:"));
    }

    #[tokio::test]
    async fn test_advice_requires_a_message() {
        let (api, _store, dispatcher) = harness(StubPlanner::default());

        let err = dispatcher
            .request_advice(&mode_ctx(), "   ", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
        assert_eq!(api.call_count(), 0);
    }
}
