use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::api::GIT_COMMIT_HASH;

use super::auth::AuthState;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    store: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and store are healthy", body = Health),
        (status = 503, description = "Key-value store is unreachable", body = Health)
    ),
    tag = "health"
)]
pub async fn health(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let store_ok = match auth_state.store().get("health:ping").await {
        Ok(_) => true,
        Err(err) => {
            error!("Store health check failed: {err}");
            false
        }
    };

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: if store_ok {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let mut headers = HeaderMap::new();
    match format!("{}:{}:{}", health.name, health.version, short_hash).parse() {
        Ok(value) => {
            headers.insert("X-App", value);
        }
        Err(err) => {
            debug!("Failed to build X-App header: {err}");
        }
    }

    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, headers, Json(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn healthy_store_reports_ok() {
        let state = Extension(Arc::new(AuthState::new(
            None,
            None,
            Arc::new(MemoryStore::new()),
        )));
        let response = health(state).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("X-App").is_some());
    }
}
