use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use geofix::{PermissionStatus, PositionFix, UpdateFrequency};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::TrackingError;
use crate::journey::JourneySnapshot;
use crate::tracker_service::TrackerClient;

#[derive(Clone)]
pub struct AppState {
    pub tracker: TrackerClient,
}

/// `{status, data, error}` envelope of every API reply
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> From<Result<T, TrackingError>> for ApiResponse<T> {
    fn from(result: Result<T, TrackingError>) -> Self {
        match result {
            Ok(data) => Self { status: "ok", data: Some(data), error: None },
            Err(e) => Self { status: "error", data: None, error: Some(e.to_string()) },
        }
    }
}

type ApiReply<T> = Json<ApiResponse<T>>;

/// Wrap a tracker reply, logging failures
fn reply<T>(action: &str, result: Result<T, TrackingError>) -> ApiReply<T> {
    if let Err(e) = &result {
        error!(error = %e, "Failed to {}", action);
    }
    Json(result.into())
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub frequency: UpdateFrequency,
}

/// Snapshot plus the km/h values presentation layers display
#[derive(Debug, Serialize)]
pub struct JourneyView {
    #[serde(flatten)]
    pub snapshot: JourneySnapshot,
    pub current_speed_kmh: Option<f64>,
    pub average_speed_kmh: Option<f64>,
}

impl From<JourneySnapshot> for JourneyView {
    fn from(snapshot: JourneySnapshot) -> Self {
        Self {
            current_speed_kmh: snapshot.current_speed_kmh(),
            average_speed_kmh: snapshot.average_speed_kmh(),
            snapshot,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PermissionView {
    pub permission: PermissionStatus,
}

pub async fn get_journey(State(state): State<AppState>) -> ApiReply<JourneyView> {
    reply("read journey snapshot", state.tracker.snapshot().await.map(JourneyView::from))
}

pub async fn start_journey(State(state): State<AppState>, Json(params): Json<StartRequest>) -> ApiReply<()> {
    info!(frequency = %params.frequency, "POST /api/journey/start");
    reply("start tracking", state.tracker.start(params.frequency).await)
}

/// `data` is false when no journey was active
pub async fn stop_journey(State(state): State<AppState>) -> ApiReply<bool> {
    info!("POST /api/journey/stop");
    reply("stop tracking", state.tracker.stop().await)
}

pub async fn locate(State(state): State<AppState>) -> ApiReply<PositionFix> {
    reply("get location", state.tracker.locate().await)
}

pub async fn get_permission(State(state): State<AppState>) -> ApiReply<PermissionView> {
    let result = state.tracker.permission_status().await;
    reply("read permission status", result.map(|permission| PermissionView { permission }))
}

pub async fn request_permission(State(state): State<AppState>) -> ApiReply<PermissionView> {
    info!("POST /api/permission/request");
    let result = state.tracker.request_permission().await;
    reply("request permission", result.map(|permission| PermissionView { permission }))
}

pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .route("/journey", get(get_journey))
        .route("/journey/start", post(start_journey))
        .route("/journey/stop", post(stop_journey))
        .route("/location", post(locate))
        .route("/permission", get(get_permission))
        .route("/permission/request", post(request_permission))
        .with_state(state)
}
