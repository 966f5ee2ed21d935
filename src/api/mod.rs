// HTTP API routes (allocation planning, support dispatch, snapshots).

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::dispatch::{DispatchQueue, SupportCommand};
use crate::metrics;
use crate::rate_limit::{RateLimitType, RateLimiter};
use crate::snapshot::SupplyStore;
use crate::support::{
    self, AllocationRequest, AllocationResult, VillageAllocation, VillageSupply,
};

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSupportRequest {
    /// Server whose stored snapshot should be used when `villages` is absent.
    pub server_id: Option<i64>,
    /// Inline unit counts; takes precedence over the stored snapshot.
    pub villages: Option<Vec<VillageSupply>>,
    pub package_count: i64,
    pub package_size: i64,
    pub max_units_per_village: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityRequest {
    pub server_id: Option<i64>,
    pub villages: Option<Vec<VillageSupply>>,
    pub package_size: i64,
    pub max_units_per_village: i64,
}

/// The wire contract the panel frontend submits after the operator
/// reviews a plan. `target_village_id` is the raw operator input.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSupportRequest {
    pub server_id: i64,
    pub target_village_id: String,
    pub allocations: Vec<VillageAllocation>,
    pub total_packages: i64,
    pub package_size: i64,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone, Default)]
pub struct AppState {
    pub snapshots: SupplyStore,
    pub dispatch_queue: DispatchQueue,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

// ── Error helpers ─────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> impl IntoResponse {
    (status, Json(json!({ "error": msg })))
}

/// Reasons a send request is refused before anything is queued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendValidationError {
    #[error("Invalid target village id")]
    InvalidTargetId,
    #[error("packageSize must be positive")]
    InvalidPackageSize,
    #[error("No allocations to dispatch")]
    EmptyAllocations,
    #[error("Allocation for village {village} is inconsistent with the package size")]
    InconsistentAllocation { village: String },
    #[error("Allocations sum to {actual} packages, expected {expected}")]
    TotalsMismatch { expected: i64, actual: i64 },
}

impl SendValidationError {
    /// Stable label for the rejection metric.
    fn reason(&self) -> &'static str {
        match self {
            SendValidationError::InvalidTargetId => "invalid_target",
            SendValidationError::InvalidPackageSize => "invalid_package_size",
            SendValidationError::EmptyAllocations => "empty_allocations",
            SendValidationError::InconsistentAllocation { .. } => "inconsistent_allocation",
            SendValidationError::TotalsMismatch { .. } => "totals_mismatch",
        }
    }
}

/// Check a send request against the allocator's invariants and resolve
/// the target id to its numeric form.
///
/// The allocator itself never errors; this is the request-submission
/// boundary deciding whether a plan is fit to hand to the crawler.
pub fn validate_send_request(req: &SendSupportRequest) -> Result<i64, SendValidationError> {
    let target_village_id = support::parse_village_id(&req.target_village_id)
        .ok_or(SendValidationError::InvalidTargetId)?;

    if req.package_size <= 0 {
        return Err(SendValidationError::InvalidPackageSize);
    }
    if req.allocations.is_empty() {
        return Err(SendValidationError::EmptyAllocations);
    }

    for alloc in &req.allocations {
        let consistent = alloc.packages_from_village > 0
            && alloc.spear_to_send == alloc.packages_from_village * req.package_size
            && alloc.sword_to_send == alloc.packages_from_village * req.package_size;
        if !consistent {
            return Err(SendValidationError::InconsistentAllocation {
                village: alloc.village_name.clone(),
            });
        }
    }

    let total: i64 = req.allocations.iter().map(|a| a.packages_from_village).sum();
    if total != req.total_packages {
        return Err(SendValidationError::TotalsMismatch {
            expected: req.total_packages,
            actual: total,
        });
    }

    Ok(target_village_id)
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Support planning
        .route("/api/support/plan", post(plan_support))
        .route("/api/support/capacity", post(support_capacity))
        .route("/api/support/send", post(send_support))
        // Dispatch queue (crawler side)
        .route("/api/support/queue", get(queue_status))
        .route("/api/support/queue/next", post(next_command))
        // Village unit snapshots
        .route(
            "/api/servers/{id}/village-units",
            put(upload_snapshot)
                .get(get_snapshot)
                .delete(delete_snapshot),
        )
        .with_state(state)
}

// ── Health & metrics handlers ────────────────────────────────────────

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "plemiona-backend" }))
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}

// ── Planning handlers ─────────────────────────────────────────────────

/// Resolve the villages a planning request applies to: inline counts win,
/// otherwise the stored snapshot for the named server.
fn resolve_villages(
    state: &AppState,
    villages: Option<Vec<VillageSupply>>,
    server_id: Option<i64>,
) -> Result<Vec<VillageSupply>, (StatusCode, &'static str)> {
    match (villages, server_id) {
        (Some(v), _) => Ok(v),
        (None, Some(server_id)) => match state.snapshots.get(server_id) {
            Some(snapshot) => Ok(snapshot.villages),
            None => Err((
                StatusCode::NOT_FOUND,
                "No units snapshot for this server",
            )),
        },
        (None, None) => Err((
            StatusCode::BAD_REQUEST,
            "Either villages or serverId is required",
        )),
    }
}

async fn plan_support(
    State(state): State<AppState>,
    Json(req): Json<PlanSupportRequest>,
) -> impl IntoResponse {
    let villages = match resolve_villages(&state, req.villages, req.server_id) {
        Ok(v) => v,
        Err((status, msg)) => return json_error(status, msg).into_response(),
    };

    let request = AllocationRequest {
        package_count: req.package_count,
        package_size: req.package_size,
        max_units_per_village: req.max_units_per_village,
    };
    let result: AllocationResult = support::allocate(&villages, &request);
    let available =
        support::total_available_packages(&villages, req.package_size, req.max_units_per_village);

    let outcome = if result.is_valid { "complete" } else { "short" };
    metrics::PLANS_COMPUTED_TOTAL
        .with_label_values(&[outcome])
        .inc();

    (
        StatusCode::OK,
        Json(json!({
            "allocation": result,
            "availablePackages": available,
        })),
    )
        .into_response()
}

async fn support_capacity(
    State(state): State<AppState>,
    Json(req): Json<CapacityRequest>,
) -> impl IntoResponse {
    let villages = match resolve_villages(&state, req.villages, req.server_id) {
        Ok(v) => v,
        Err((status, msg)) => return json_error(status, msg).into_response(),
    };

    let available =
        support::total_available_packages(&villages, req.package_size, req.max_units_per_village);

    (
        StatusCode::OK,
        Json(json!({ "availablePackages": available })),
    )
        .into_response()
}

// ── Send handler ─────────────────────────────────────────────────────

async fn send_support(
    State(state): State<AppState>,
    Json(req): Json<SendSupportRequest>,
) -> impl IntoResponse {
    let target_village_id = match validate_send_request(&req) {
        Ok(id) => id,
        Err(e) => {
            metrics::SEND_REJECTIONS_TOTAL
                .with_label_values(&[e.reason()])
                .inc();
            return json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response();
        }
    };

    if let Err(e) = state
        .rate_limiter
        .check_limit(req.server_id, RateLimitType::SupportSends)
    {
        return json_error(StatusCode::TOO_MANY_REQUESTS, &e.to_string()).into_response();
    }

    let dispatched_count = req.allocations.len();
    let command = SupportCommand::new(
        req.server_id,
        target_village_id,
        req.allocations,
        req.total_packages,
        req.package_size,
    );
    let command_id = command.id.clone();

    tracing::info!(
        "Queued support command {command_id}: {} package(s) from {dispatched_count} village(s) to village {target_village_id} on server {}",
        req.total_packages,
        req.server_id,
    );

    state.dispatch_queue.enqueue(command);
    metrics::SUPPORT_COMMANDS_QUEUED_TOTAL.inc();

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Support command queued for dispatch",
            "dispatchedCount": dispatched_count,
            "commandId": command_id,
            "queueDepth": state.dispatch_queue.depth(),
        })),
    )
        .into_response()
}

// ── Dispatch queue handlers ──────────────────────────────────────────

async fn queue_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.dispatch_queue.status();
    (StatusCode::OK, Json(json!(status))).into_response()
}

/// Crawler endpoint: claim the next pending command.
async fn next_command(State(state): State<AppState>) -> impl IntoResponse {
    match state.dispatch_queue.dequeue() {
        Some(command) => (StatusCode::OK, Json(json!(command))).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

// ── Snapshot handlers ────────────────────────────────────────────────

async fn upload_snapshot(
    State(state): State<AppState>,
    Path(server_id): Path<i64>,
    Json(villages): Json<Vec<VillageSupply>>,
) -> impl IntoResponse {
    if let Err(e) = state
        .rate_limiter
        .check_limit(server_id, RateLimitType::SnapshotUploads)
    {
        return json_error(StatusCode::TOO_MANY_REQUESTS, &e.to_string()).into_response();
    }

    let village_count = villages.len();
    let snapshot = state.snapshots.update(server_id, villages);
    metrics::SNAPSHOT_UPLOADS_TOTAL.inc();
    tracing::debug!("Snapshot updated for server {server_id}: {village_count} village(s)");

    (
        StatusCode::OK,
        Json(json!({
            "serverId": server_id,
            "villageCount": village_count,
            "capturedAt": snapshot.captured_at,
        })),
    )
        .into_response()
}

async fn get_snapshot(
    State(state): State<AppState>,
    Path(server_id): Path<i64>,
) -> impl IntoResponse {
    match state.snapshots.get(server_id) {
        Some(snapshot) => (StatusCode::OK, Json(json!(snapshot))).into_response(),
        None => json_error(StatusCode::NOT_FOUND, "No units snapshot for this server")
            .into_response(),
    }
}

async fn delete_snapshot(
    State(state): State<AppState>,
    Path(server_id): Path<i64>,
) -> impl IntoResponse {
    if state.snapshots.remove(server_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        json_error(StatusCode::NOT_FOUND, "No units snapshot for this server").into_response()
    }
}
