//! OpenAPI document for the gateway endpoints.

use utoipa::OpenApi;

use super::handlers::{agents, auth, health};
use crate::fleet;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "opsgate",
        description = "Session gateway for the agent operations dashboard"
    ),
    paths(
        auth::session::login,
        auth::session::verify,
        auth::session::verify_token,
        auth::session::logout,
        agents::agents,
        agents::agent_action,
        health::health,
    ),
    components(schemas(
        auth::types::LoginRequest,
        auth::types::LoginResponse,
        auth::types::AuthError,
        auth::types::VerifyTokenRequest,
        auth::types::SessionUser,
        auth::types::VerifyResponse,
        auth::types::LogoutResponse,
        agents::AgentActionRequest,
        agents::AgentActionResponse,
        fleet::Agent,
        fleet::AgentStatus,
        fleet::FleetSnapshot,
        health::Health,
    )),
    tags(
        (name = "auth", description = "Login, session verification, logout"),
        (name = "agents", description = "Agent-fleet feed and actions"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
