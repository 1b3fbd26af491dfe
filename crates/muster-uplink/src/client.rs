//! HTTP planning client
//!
//! Implements the console's planning surface over the backend's REST API.
//! The offline flag lives here and is flipped only by the status probe; a
//! failing planning request classifies itself by consulting that flag,
//! never by inspecting its own transport error.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use muster_core::dispatch::{
    ChatReply, ChatRequest, CleanupRequest, ExecuteRequest, ExecuteResponse, PlannerApi,
    RecommendRequest, RouteResponse, StatusReport, TakeoverRequest, TakeoverResponse,
};
use muster_core::{ConsoleError, Result};

use crate::config::ConsoleConfig;

const ROUTE_CLEANUP: &str = "api/civilian/route/cleanup";
const ROUTE_RECOMMEND: &str = "api/civilian/route/recommend";
const ROUTE_EXECUTE_AI: &str = "api/civilian/route/execute-ai";
const ROUTE_EXECUTE: &str = "api/civilian/route/execute";
const AI_CHAT: &str = "api/civilian/ai/chat";
const STATUS: &str = "api/status";

/// Wire shape of the `execute-ai` acknowledgement
#[derive(Debug, Default, Deserialize)]
struct TakeoverRaw {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

fn takeover_from_raw(raw: TakeoverRaw) -> Result<TakeoverResponse> {
    if raw.success == Some(false) {
        let detail = raw
            .reason
            .or(raw.status)
            .unwrap_or_else(|| "AI takeover rejected".to_string());
        return Err(ConsoleError::Network(detail));
    }
    Ok(TakeoverResponse { reason: raw.reason })
}

/// Planning client over the backend REST API
#[derive(Debug)]
pub struct HttpPlanner {
    http: reqwest::Client,
    base: Url,
    offline: Arc<AtomicBool>,
}

impl HttpPlanner {
    /// Build a client for the configured backend origin
    pub fn new(config: &ConsoleConfig) -> Result<Self> {
        let mut base = Url::parse(&config.backend_url)
            .map_err(|err| ConsoleError::Validation(format!("backend_url: {}", err)))?;
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|err| ConsoleError::Internal(format!("http client: {}", err)))?;
        Ok(Self {
            http,
            base,
            offline: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The flag the status probe maintains
    pub fn offline_flag(&self) -> Arc<AtomicBool> {
        self.offline.clone()
    }

    /// Whether the backend is currently flagged unreachable
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Start the periodic status probe that maintains the offline flag
    pub fn spawn_status_probe(
        self: &Arc<Self>,
        poll_secs: u64,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let planner = self.clone();
        let interval = Duration::from_secs(poll_secs.max(1));
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        planner.probe_once().await;
                    }
                    _ = shutdown.recv() => {
                        debug!("Status probe stopping");
                        break;
                    }
                }
            }
        })
    }

    async fn probe_once(&self) {
        match self.status().await {
            Ok(report) => {
                if self.offline.swap(false, Ordering::SeqCst) {
                    info!("Backend reachable again (running={})", report.running);
                }
            }
            // An auth rejection still proves the backend is up
            Err(ConsoleError::Auth(_)) => {
                self.offline.store(false, Ordering::SeqCst);
            }
            Err(err) => {
                if !self.offline.swap(true, Ordering::SeqCst) {
                    warn!("Backend unreachable: {}", err);
                }
            }
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|err| ConsoleError::Validation(format!("endpoint {}: {}", path, err)))
    }

    fn classify(&self, err: reqwest::Error) -> ConsoleError {
        if self.offline.load(Ordering::SeqCst) {
            return ConsoleError::Offline("backend flagged unreachable".to_string());
        }
        if err.is_timeout() {
            return ConsoleError::Network(format!("request timed out: {}", err));
        }
        ConsoleError::Network(err.to_string())
    }

    async fn decode_response<R: DeserializeOwned>(&self, response: reqwest::Response) -> Result<R> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ConsoleError::Auth(format!("backend returned {}", status)));
        }
        if !status.is_success() {
            return Err(ConsoleError::Network(format!("backend returned {}", status)));
        }
        response
            .json::<R>()
            .await
            .map_err(|err| ConsoleError::Network(format!("malformed response: {}", err)))
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| self.classify(err))?;
        self.decode_response(response).await
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| self.classify(err))?;
        self.decode_response(response).await
    }
}

#[async_trait]
impl PlannerApi for HttpPlanner {
    async fn cleanup_route(&self, request: &CleanupRequest) -> Result<RouteResponse> {
        self.post_json(ROUTE_CLEANUP, request).await
    }

    async fn recommend_route(&self, request: &RecommendRequest) -> Result<RouteResponse> {
        self.post_json(ROUTE_RECOMMEND, request).await
    }

    async fn execute_with_ai(&self, request: &TakeoverRequest) -> Result<TakeoverResponse> {
        let raw: TakeoverRaw = self.post_json(ROUTE_EXECUTE_AI, request).await?;
        takeover_from_raw(raw)
    }

    async fn execute_route(&self, request: &ExecuteRequest) -> Result<ExecuteResponse> {
        self.post_json(ROUTE_EXECUTE, request).await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.post_json(AI_CHAT, request).await
    }

    async fn status(&self) -> Result<StatusReport> {
        self.get_json(STATUS).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner_for(url: &str) -> HttpPlanner {
        HttpPlanner::new(&ConsoleConfig::new().with_backend_url(url)).unwrap()
    }

    #[test]
    fn test_endpoints_join_off_the_origin() {
        let planner = planner_for("http://127.0.0.1:8000");
        assert_eq!(
            planner.endpoint(ROUTE_CLEANUP).unwrap().as_str(),
            "http://127.0.0.1:8000/api/civilian/route/cleanup"
        );
        assert_eq!(
            planner.endpoint(STATUS).unwrap().as_str(),
            "http://127.0.0.1:8000/api/status"
        );
    }

    #[test]
    fn test_base_path_keeps_its_prefix() {
        let planner = planner_for("http://gcs.example/fleet");
        assert_eq!(
            planner.endpoint(ROUTE_EXECUTE).unwrap().as_str(),
            "http://gcs.example/fleet/api/civilian/route/execute"
        );
    }

    #[test]
    fn test_invalid_backend_url_is_a_validation_error() {
        let err = HttpPlanner::new(&ConsoleConfig::new().with_backend_url("not a url"))
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
    }

    #[test]
    fn test_takeover_rejection_maps_to_network() {
        let raw = TakeoverRaw {
            success: Some(false),
            status: None,
            reason: Some("no safe corridor".to_string()),
        };
        let err = takeover_from_raw(raw).unwrap_err();
        assert!(matches!(err, ConsoleError::Network(reason) if reason == "no safe corridor"));
    }

    #[test]
    fn test_takeover_ack_carries_the_reason() {
        let raw = TakeoverRaw {
            success: Some(true),
            status: Some("executing".to_string()),
            reason: Some("herd moving east".to_string()),
        };
        let response = takeover_from_raw(raw).unwrap();
        assert_eq!(response.reason.as_deref(), Some("herd moving east"));
    }

    #[tokio::test]
    async fn test_failed_request_reports_offline_only_when_flagged() {
        // Nothing listens on the discard port, so the send fails fast.
        let planner = planner_for("http://127.0.0.1:9");

        let err = planner.status().await.unwrap_err();
        assert!(matches!(err, ConsoleError::Network(_)));

        planner.offline_flag().store(true, Ordering::SeqCst);
        let err = planner.status().await.unwrap_err();
        assert!(matches!(err, ConsoleError::Offline(_)));
    }

    #[tokio::test]
    async fn test_status_probe_stops_on_shutdown() {
        let planner = Arc::new(planner_for("http://127.0.0.1:9"));
        let (tx, rx) = broadcast::channel(1);

        let probe = planner.spawn_status_probe(60, rx);
        tx.send(()).unwrap();
        probe.await.unwrap();
    }
}
