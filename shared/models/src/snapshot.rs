use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cumulative statistics of one counter (http, sql, jobs, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterStats {
    #[serde(default)]
    pub hits: u64,
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub duration_millis: u64,
}

impl CounterStats {
    pub fn combine(&mut self, other: &CounterStats) {
        self.hits = self.hits.saturating_add(other.hits);
        self.errors = self.errors.saturating_add(other.errors);
        self.duration_millis = self.duration_millis.saturating_add(other.duration_millis);
    }
}

/// Metrics returned by a single node's collection endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default)]
    pub counters: BTreeMap<String, CounterStats>,
    #[serde(default)]
    pub gauges: BTreeMap<String, f64>,
}

/// Metrics of one application after merging every node that answered.
///
/// Counters are summed across nodes. Gauges are not summed: each value is
/// kept under the URL of the node that reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSnapshot {
    pub application: String,
    pub node_count: usize,
    pub counters: BTreeMap<String, CounterStats>,
    pub gauges: BTreeMap<String, BTreeMap<String, f64>>,
    pub collected_at: DateTime<Utc>,
}

impl ApplicationSnapshot {
    pub fn empty(application: impl Into<String>, collected_at: DateTime<Utc>) -> Self {
        Self {
            application: application.into(),
            node_count: 0,
            counters: BTreeMap::new(),
            gauges: BTreeMap::new(),
            collected_at,
        }
    }
}

/// Result of contacting one node during a collection cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeOutcome {
    Collected {
        url: String,
        elapsed_ms: u64,
        counters: usize,
    },
    Failed {
        url: String,
        elapsed_ms: u64,
        reason: String,
    },
}

impl NodeOutcome {
    pub fn url(&self) -> &str {
        match self {
            NodeOutcome::Collected { url, .. } | NodeOutcome::Failed { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NodeOutcome::Collected { .. })
    }
}

/// Per-node summary of one collection cycle, in node display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollSummary {
    pub application: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub nodes: Vec<NodeOutcome>,
    pub available: bool,
}

impl PollSummary {
    pub fn succeeded(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.nodes.len() - self.succeeded()
    }

    /// A cycle fails only when no node answered.
    pub fn is_failure(&self) -> bool {
        self.succeeded() == 0
    }
}
