//! Mock agent-fleet data source.
//!
//! The dashboard consumes agent status through this module; the auth core
//! never inspects it. Snapshots are static seed data with randomized
//! activity counters until a real orchestrator integration replaces them.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Idle,
    Error,
    Stopped,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub status: AgentStatus,
    pub task: String,
    pub tokens: u64,
    pub cost: f64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct FleetSnapshot {
    pub agents: Vec<Agent>,
    pub timestamp: i64,
}

fn seed_agents() -> Vec<Agent> {
    let seed = [
        ("main", "Mission Control", "Main", AgentStatus::Active, "Coordinating the fleet", 45_200, 0.08),
        ("router", "Smart Router", "Router", AgentStatus::Idle, "-", 0, 0.0),
        ("researcher", "Research Agent", "Research", AgentStatus::Idle, "-", 0, 0.0),
        ("engineer", "Software Engineer", "Engineering", AgentStatus::Idle, "-", 0, 0.0),
        ("writer", "Content Writer", "Content", AgentStatus::Idle, "-", 0, 0.0),
        ("tester", "QA Agent", "QA", AgentStatus::Idle, "-", 0, 0.0),
        ("security", "Security Agent", "Security", AgentStatus::Idle, "-", 0, 0.0),
        ("ops", "DevOps Agent", "DevOps", AgentStatus::Idle, "-", 0, 0.0),
    ];

    seed.into_iter()
        .map(|(id, name, kind, status, task, tokens, cost)| Agent {
            id: id.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            status,
            task: task.to_string(),
            tokens,
            cost,
        })
        .collect()
}

/// Current fleet snapshot. Active agents get jittered token/cost counters to
/// simulate activity between polls.
#[must_use]
pub fn snapshot() -> FleetSnapshot {
    let mut rng = rand::thread_rng();
    let agents = seed_agents()
        .into_iter()
        .map(|mut agent| {
            if agent.status == AgentStatus::Active {
                agent.tokens += rng.gen_range(0..100);
                agent.cost = ((agent.cost + rng.gen_range(0.0..0.01)) * 100.0).round() / 100.0;
            }
            agent
        })
        .collect();

    FleetSnapshot {
        agents,
        timestamp: Utc::now().timestamp_millis(),
    }
}
