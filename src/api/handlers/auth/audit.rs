//! Append-only audit records.
//!
//! Entries are written to the key-value store under `audit:<unix-millis>`
//! (logins) and `agent_action:<unix-millis>` (agent actions). Writes are
//! best-effort: a storage failure is logged and never fails the request.

use chrono::Utc;
use serde::Serialize;
use tracing::error;

use crate::store::KvStore;

const AUDIT_PREFIX: &str = "audit:";
const AGENT_ACTION_PREFIX: &str = "agent_action:";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginAudit<'a> {
    action: &'a str,
    ip: &'a str,
    timestamp: String,
    user_agent: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AgentActionAudit<'a> {
    action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Value>,
    timestamp: String,
    ip: &'a str,
}

/// Record a successful login.
pub(crate) async fn record_login(store: &dyn KvStore, ip: &str, user_agent: &str) {
    let entry = LoginAudit {
        action: "login_success",
        ip,
        timestamp: Utc::now().to_rfc3339(),
        user_agent,
    };
    append(store, AUDIT_PREFIX, &entry).await;
}

/// Record an agent action accepted by the gateway.
pub(crate) async fn record_agent_action(
    store: &dyn KvStore,
    action: &str,
    agent_id: Option<&str>,
    data: Option<&serde_json::Value>,
    ip: &str,
) {
    let entry = AgentActionAudit {
        action: format!("agent_{action}"),
        agent_id,
        data,
        timestamp: Utc::now().to_rfc3339(),
        ip,
    };
    append(store, AGENT_ACTION_PREFIX, &entry).await;
}

async fn append<T: Serialize>(store: &dyn KvStore, prefix: &str, entry: &T) {
    let value = match serde_json::to_string(entry) {
        Ok(value) => value,
        Err(err) => {
            error!("Failed to encode audit entry: {err}");
            return;
        }
    };

    let key = format!("{prefix}{}", Utc::now().timestamp_millis());
    if let Err(err) = store.put(&key, value, None).await {
        error!("Failed to write audit entry: {err}");
    }
}
