//! Agent-fleet feed: JSON snapshots, a server-push update stream, and the
//! action endpoint that records audited fleet commands.

use axum::{
    extract::{Extension, Query},
    http::{header::ACCEPT, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio_stream::{wrappers::IntervalStream, Stream, StreamExt};
use tracing::error;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::fleet;

use super::auth::{audit, state::AuthState, types::AuthError, utils::client_identity};

/// Fleet commands the gateway accepts; everything else is rejected before it
/// reaches the audit trail.
const VALID_ACTIONS: [&str; 5] = ["spawn", "stop", "restart", "update", "execute"];

const UPDATE_INTERVAL: Duration = Duration::from_secs(5);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct FeedQuery {
    /// Request the server-sent-events stream instead of a snapshot.
    stream: Option<bool>,
}

#[derive(Serialize, Debug)]
struct FleetEvent {
    #[serde(rename = "type")]
    kind: &'static str,
    agents: Vec<fleet::Agent>,
    timestamp: i64,
}

impl FleetEvent {
    fn now(kind: &'static str) -> Self {
        let snapshot = fleet::snapshot();
        Self {
            kind,
            agents: snapshot.agents,
            timestamp: snapshot.timestamp,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AgentActionRequest {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AgentActionResponse {
    pub success: bool,
    pub message: String,
    pub job_id: String,
}

#[utoipa::path(
    get,
    path = "/agents",
    params(FeedQuery),
    responses(
        (status = 200, description = "Fleet snapshot, or an SSE stream when requested", body = fleet::FleetSnapshot)
    ),
    tag = "agents"
)]
pub async fn agents(headers: HeaderMap, query: Query<FeedQuery>) -> Response {
    let wants_stream = headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"))
        || query.stream == Some(true);

    if wants_stream {
        return update_stream().into_response();
    }

    Json(fleet::snapshot()).into_response()
}

/// Server-push channel for live agent updates: one initial snapshot, then an
/// update every five seconds, with comment heartbeats keeping intermediaries
/// from closing the connection. Dropping the response tears the interval
/// timers down with it.
fn update_stream() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let initial = tokio_stream::once(fleet_event("initial"));
    let start = tokio::time::Instant::now() + UPDATE_INTERVAL;
    let updates = IntervalStream::new(tokio::time::interval_at(start, UPDATE_INTERVAL))
        .map(|_| fleet_event("update"));

    Sse::new(initial.chain(updates))
        .keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat"))
}

fn fleet_event(kind: &'static str) -> Result<Event, Infallible> {
    match Event::default().json_data(FleetEvent::now(kind)) {
        Ok(event) => Ok(event),
        Err(err) => {
            error!("Failed to encode fleet event: {err}");
            Ok(Event::default().comment("update skipped"))
        }
    }
}

#[utoipa::path(
    post,
    path = "/agents",
    request_body = AgentActionRequest,
    responses(
        (status = 200, description = "Action queued", body = AgentActionResponse),
        (status = 400, description = "Unknown action or malformed request", body = AuthError)
    ),
    tag = "agents"
)]
pub async fn agent_action(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<AgentActionRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(AuthError::new("Invalid request")),
        )
            .into_response();
    };

    if !VALID_ACTIONS.contains(&request.action.as_str()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(AuthError::new("Invalid action")),
        )
            .into_response();
    }

    let identity = client_identity(&headers);
    audit::record_agent_action(
        auth_state.store(),
        &request.action,
        request.agent_id.as_deref(),
        request.data.as_ref(),
        &identity,
    )
    .await;

    let target = request.agent_id.as_deref().unwrap_or("all");
    (
        StatusCode::OK,
        Json(AgentActionResponse {
            success: true,
            message: format!("Action '{}' queued for agent '{target}'", request.action),
            job_id: format!("job_{}", Uuid::new_v4()),
        }),
    )
        .into_response()
}
