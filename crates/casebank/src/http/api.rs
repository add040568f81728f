//! Telemetry API routes
//!
//! The dashboard polls these endpoints every few seconds; payload field
//! names and types are the compatibility contract. An empty bank
//! answers with an empty array or zeroed stats, never an error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, Method},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::bank::CaseBank;
use crate::domain::case::Case;
use crate::domain::stats::WindowSnapshot;

/// Process-wide counters passed through on `/health`.
///
/// The engine does not measure these itself; the embedding host updates
/// them and the endpoint reports whatever was last written. Percentages
/// are stored as `f64` bit patterns.
pub struct ProcessTelemetry {
    active_agents: AtomicU64,
    queue_depth: AtomicU64,
    cpu_percent: AtomicU64,
    memory_percent: AtomicU64,
}

impl ProcessTelemetry {
    pub fn new() -> Self {
        Self {
            active_agents: AtomicU64::new(0),
            queue_depth: AtomicU64::new(0),
            cpu_percent: AtomicU64::new(0.0f64.to_bits()),
            memory_percent: AtomicU64::new(0.0f64.to_bits()),
        }
    }

    pub fn set_active_agents(&self, count: u64) {
        self.active_agents.store(count, Ordering::Relaxed);
    }

    pub fn set_queue_depth(&self, depth: u64) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    pub fn set_cpu_percent(&self, percent: f64) {
        self.cpu_percent.store(percent.to_bits(), Ordering::Relaxed);
    }

    pub fn set_memory_percent(&self, percent: f64) {
        self.memory_percent
            .store(percent.to_bits(), Ordering::Relaxed);
    }

    fn body(&self) -> HealthBody {
        HealthBody {
            status: "healthy",
            active_agents: self.active_agents.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            cpu_percent: f64::from_bits(self.cpu_percent.load(Ordering::Relaxed)),
            memory_percent: f64::from_bits(self.memory_percent.load(Ordering::Relaxed)),
        }
    }
}

impl Default for ProcessTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state behind the router.
#[derive(Clone)]
pub struct ApiState {
    pub bank: Arc<CaseBank>,
    pub telemetry: Arc<ProcessTelemetry>,
    /// Default and maximum page size for recent-case reads.
    pub page_size: usize,
}

/// Wire form of one case.
#[derive(Debug, Serialize)]
struct CaseBody {
    case_id: String,
    state: Vec<f32>,
    action: serde_json::Value,
    reward: f64,
    agent: String,
    timestamp: String,
}

impl CaseBody {
    fn from_case(case: &Case) -> Self {
        Self {
            case_id: case.case_id.to_string(),
            state: case.state.0.clone(),
            action: case.action.clone(),
            reward: case.reward,
            agent: case.agent.clone(),
            timestamp: case.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatsBody {
    count: u64,
    mean_reward: f64,
    success_rate: f64,
    window: WindowSnapshot,
    unique_agents: usize,
    retrievals_served: u64,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    active_agents: u64,
    queue_depth: u64,
    cpu_percent: f64,
    memory_percent: f64,
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    limit: Option<usize>,
    before: Option<DateTime<Utc>>,
    agent: Option<String>,
}

async fn recent_cases(
    State(state): State<ApiState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<CaseBody>> {
    let limit = query
        .limit
        .unwrap_or(state.page_size)
        .min(state.page_size.max(1) * 10);

    let page = state
        .bank
        .recent_page(limit, query.before, query.agent.as_deref())
        .await;

    Json(page.iter().map(|c| CaseBody::from_case(c)).collect())
}

async fn stats(State(state): State<ApiState>) -> Json<StatsBody> {
    let snapshot = state.bank.stats();
    Json(StatsBody {
        count: snapshot.count,
        mean_reward: snapshot.mean_reward,
        success_rate: snapshot.success_rate,
        window: snapshot.window,
        unique_agents: state.bank.unique_agents().await,
        retrievals_served: state.bank.retrievals_served(),
    })
}

async fn health(State(state): State<ApiState>) -> Json<HealthBody> {
    Json(state.telemetry.body())
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "casebank",
        "version": crate::CASEBANK_VERSION,
        "description": "Case bank memory engine",
    }))
}

/// Build the telemetry router. CORS is open so the dashboard can poll
/// from any origin.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/casebank", get(recent_cases))
        .route("/casebank/stats", get(stats))
        .route("/health", get(health))
        .route("/version", get(version))
        .layer(cors)
        .with_state(state)
}
