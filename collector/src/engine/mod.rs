//! Collection engine: polls the nodes of each direct application, merges
//! their statistics, and tracks whether each application has data.

pub mod availability;
pub mod fetcher;
pub mod merge;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use pulse_config::CollectorSettings;
use pulse_models::{ApplicationEntry, ApplicationSnapshot, MetricsSnapshot, NodeOutcome, PollSummary};
use pulse_registry::{RegistryError, RegistryStore};
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};
use url::Url;

pub use availability::Availability;
pub use fetcher::{ensure_supported, CollectError, HttpNodeFetcher, NodeFetcher};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown application '{0}'")]
    UnknownApplication(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Tunables for polling.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub failure_threshold: u32,
    pub node_timeout: Duration,
    pub node_fan_out: usize,
    /// `None` shows every counter.
    pub displayed_counters: Option<Vec<String>>,
}

impl EngineConfig {
    pub fn from_settings(settings: &CollectorSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold,
            node_timeout: settings.node_timeout,
            node_fan_out: settings.node_fan_out,
            displayed_counters: settings.displayed_counters.clone(),
        }
    }

    fn is_counter_hidden(&self, counter: &str) -> bool {
        pulse_config::is_counter_hidden(self.displayed_counters.as_deref(), counter)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_settings(&CollectorSettings::default())
    }
}

struct ApplicationState {
    /// Held for the whole cycle; at most one cycle per application. A state
    /// is only dropped from the map while this is free.
    in_flight: Arc<tokio::sync::Mutex<()>>,
    data: Mutex<CollectedData>,
}

struct CollectedData {
    availability: Availability,
    snapshot: Option<ApplicationSnapshot>,
    summary: Option<PollSummary>,
    /// Bumped on reset; a cycle that started under an older generation
    /// does not store its results.
    generation: u64,
}

impl CollectedData {
    fn clear(&mut self, threshold: u32) {
        self.availability = Availability::new(threshold);
        self.snapshot = None;
        self.summary = None;
        self.generation += 1;
    }
}

impl ApplicationState {
    fn new(threshold: u32) -> Self {
        Self {
            in_flight: Arc::new(tokio::sync::Mutex::new(())),
            data: Mutex::new(CollectedData {
                availability: Availability::new(threshold),
                snapshot: None,
                summary: None,
                generation: 0,
            }),
        }
    }
}

type Claim = (Arc<ApplicationState>, OwnedMutexGuard<()>);

pub struct CollectorEngine {
    registry: Arc<RegistryStore>,
    fetcher: Arc<dyn NodeFetcher>,
    config: EngineConfig,
    states: DashMap<String, Arc<ApplicationState>>,
}

impl CollectorEngine {
    pub fn new(registry: Arc<RegistryStore>, fetcher: Arc<dyn NodeFetcher>, config: EngineConfig) -> Self {
        Self {
            registry,
            fetcher,
            config,
            states: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<RegistryStore> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn state(&self, name: &str) -> Arc<ApplicationState> {
        self.states
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(ApplicationState::new(self.config.failure_threshold)))
            .value()
            .clone()
    }

    fn is_current(&self, name: &str, state: &Arc<ApplicationState>) -> bool {
        self.states
            .get(name)
            .is_some_and(|current| Arc::ptr_eq(current.value(), state))
    }

    /// Takes the cycle slot of a registered direct application. With `wait`
    /// unset, returns `None` when a cycle is already running.
    async fn claim(&self, name: &str, wait: bool) -> Result<Option<Claim>, EngineError> {
        loop {
            if !self.registry.snapshot()?.direct.contains_key(name) {
                return Err(EngineError::UnknownApplication(name.to_string()));
            }
            let state = self.state(name);
            let slot = Arc::clone(&state.in_flight);
            let guard = if wait {
                slot.lock_owned().await
            } else {
                match slot.try_lock_owned() {
                    Ok(guard) => guard,
                    Err(_) => return Ok(None),
                }
            };
            // The state may have been dropped while we waited for it.
            if self.is_current(name, &state) {
                return Ok(Some((state, guard)));
            }
        }
    }

    /// Number of applications with collection state.
    pub fn tracked_applications(&self) -> usize {
        self.states.len()
    }

    fn direct_available(&self, name: &str) -> bool {
        self.states
            .get(name)
            .map(|state| state.data.lock().availability.is_available())
            .unwrap_or(false)
    }

    /// Whether `name` has data to show. An aggregation has data when any of
    /// the direct applications it reaches does.
    pub fn is_data_available(&self, name: &str) -> bool {
        let registry = match self.registry.snapshot() {
            Ok(registry) => registry,
            Err(e) => {
                warn!(application = %name, error = %e, "Registry unavailable");
                return false;
            }
        };
        if registry.direct.contains_key(name) {
            return self.direct_available(name);
        }
        if registry.aggregations.contains_key(name) {
            return registry
                .resolve_direct_members(name)
                .iter()
                .any(|member| self.direct_available(member));
        }
        false
    }

    /// Runs one cycle for a direct application, waiting for a cycle already
    /// in flight to finish first.
    pub async fn poll_now(&self, name: &str) -> Result<PollSummary, EngineError> {
        match self.claim(name, true).await? {
            Some((state, _guard)) => self.run_cycle(name, &state).await,
            None => Err(EngineError::UnknownApplication(name.to_string())),
        }
    }

    /// Like [`poll_now`](Self::poll_now) but returns `None` immediately when
    /// a cycle for `name` is already running.
    pub async fn try_poll(&self, name: &str) -> Result<Option<PollSummary>, EngineError> {
        let Some((state, _guard)) = self.claim(name, false).await? else {
            debug!(application = %name, "Cycle already in flight, skipping");
            return Ok(None);
        };
        self.run_cycle(name, &state).await.map(Some)
    }

    /// Polls a direct application, or every direct member of an aggregation
    /// one after the other.
    pub async fn poll_application(&self, name: &str) -> Result<Vec<PollSummary>, EngineError> {
        let registry = self.registry.snapshot()?;
        match registry.entry(name) {
            Some(ApplicationEntry::Direct { .. }) => Ok(vec![self.poll_now(name).await?]),
            Some(ApplicationEntry::Aggregation { .. }) => {
                let mut summaries = Vec::new();
                for member in registry.resolve_direct_members(name) {
                    match self.poll_now(&member).await {
                        Ok(summary) => summaries.push(summary),
                        // Removed while the aggregation was being polled.
                        Err(EngineError::UnknownApplication(_)) => continue,
                        Err(e) => return Err(e),
                    }
                }
                Ok(summaries)
            }
            None => Err(EngineError::UnknownApplication(name.to_string())),
        }
    }

    async fn run_cycle(&self, name: &str, state: &ApplicationState) -> Result<PollSummary, EngineError> {
        let registry = self.registry.snapshot()?;
        let urls = registry
            .direct
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownApplication(name.to_string()))?;
        let generation = state.data.lock().generation;

        let started_at = Utc::now();
        let start = Instant::now();
        let results: Vec<(Url, u64, Result<MetricsSnapshot, CollectError>)> = stream::iter(urls)
            .map(|url| self.collect_node(name, url))
            .buffered(self.config.node_fan_out.max(1))
            .collect()
            .await;

        let mut nodes = Vec::with_capacity(results.len());
        let mut collected = Vec::new();
        for (url, elapsed_ms, result) in &results {
            match result {
                Ok(snapshot) => {
                    nodes.push(NodeOutcome::Collected {
                        url: url.to_string(),
                        elapsed_ms: *elapsed_ms,
                        counters: snapshot.counters.len(),
                    });
                    collected.push((url.as_str(), snapshot));
                }
                Err(e) => {
                    warn!(application = %name, node = %url, elapsed_ms, error = %e, "Node collection failed");
                    nodes.push(NodeOutcome::Failed {
                        url: url.to_string(),
                        elapsed_ms: *elapsed_ms,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let cycle_failed = collected.is_empty();
        let merged = (!cycle_failed).then(|| merge::merge_nodes(name, collected, Utc::now()));

        let mut data = state.data.lock();
        if data.generation != generation {
            debug!(application = %name, "Application reset during the cycle, discarding results");
            return Ok(PollSummary {
                application: name.to_string(),
                started_at,
                elapsed_ms: start.elapsed().as_millis() as u64,
                nodes,
                available: data.availability.is_available(),
            });
        }
        if cycle_failed {
            if data.availability.record_failure() {
                warn!(
                    application = %name,
                    failures = data.availability.consecutive_failures(),
                    "Data unavailable after consecutive failed cycles"
                );
            }
        } else {
            data.availability.record_success();
            data.snapshot = merged;
        }
        let summary = PollSummary {
            application: name.to_string(),
            started_at,
            elapsed_ms: start.elapsed().as_millis() as u64,
            nodes,
            available: data.availability.is_available(),
        };
        data.summary = Some(summary.clone());
        drop(data);

        info!(
            application = %name,
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            elapsed_ms = summary.elapsed_ms,
            "Collection cycle finished"
        );
        Ok(summary)
    }

    async fn collect_node(&self, name: &str, url: Url) -> (Url, u64, Result<MetricsSnapshot, CollectError>) {
        pulse_observability::log_node_call!(name, url);
        let start = Instant::now();
        let result = match tokio::time::timeout(self.config.node_timeout, self.fetcher.fetch(&url)).await {
            Ok(result) => result,
            Err(_) => Err(CollectError::Timeout(self.config.node_timeout)),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let status = if result.is_ok() { "collected" } else { "failed" };
        pulse_observability::log_node_call!(name, url, elapsed_ms, status);
        (url, elapsed_ms, result)
    }

    /// Latest merged statistics with hidden counters removed. For an
    /// aggregation, the merge of its members' latest snapshots.
    pub fn latest_snapshot(&self, name: &str) -> Option<ApplicationSnapshot> {
        let registry = self.registry.snapshot().ok()?;
        let snapshot = match registry.entry(name)? {
            ApplicationEntry::Direct { .. } => self.states.get(name)?.data.lock().snapshot.clone()?,
            ApplicationEntry::Aggregation { .. } => {
                let members: Vec<ApplicationSnapshot> = registry
                    .resolve_direct_members(name)
                    .iter()
                    .filter_map(|member| self.states.get(member)?.data.lock().snapshot.clone())
                    .collect();
                merge::merge_applications(name, &members)?
            }
        };
        Some(merge::filter_counters(snapshot, |counter| self.config.is_counter_hidden(counter)))
    }

    pub fn last_summary(&self, name: &str) -> Option<PollSummary> {
        self.states.get(name)?.data.lock().summary.clone()
    }

    /// Starts `name` over as if it had never been polled.
    pub fn reset(&self, name: &str) {
        if let Some(state) = self.states.get(name) {
            state.data.lock().clear(self.config.failure_threshold);
        }
    }

    /// Drops the state of `name`. While a cycle is running the state is
    /// kept and only cleared, so the next cycle still waits for it.
    pub fn forget(&self, name: &str) {
        let idle = |_: &String, state: &Arc<ApplicationState>| state.in_flight.try_lock().is_ok();
        if self.states.remove_if(name, idle).is_some() {
            debug!(application = %name, "Dropped collection state");
        } else {
            self.reset(name);
        }
    }

    /// Drops idle state for applications no longer registered as direct.
    pub fn retain_registered(&self) {
        let registry = match self.registry.snapshot() {
            Ok(registry) => registry,
            Err(e) => {
                warn!(error = %e, "Registry unavailable, keeping collection state");
                return;
            }
        };
        self.states.retain(|name, state| {
            registry.direct.contains_key(name) || state.in_flight.try_lock().is_err()
        });
    }
}
