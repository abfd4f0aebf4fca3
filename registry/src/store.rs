use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use pulse_config::CollectorSettings;
use pulse_models::ApplicationEntry;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::RegistryError;
use crate::model::Registry;
use crate::persistence::{is_url_list, read_registry, write_registry};
use crate::reconcile::reconcile;
use crate::url_builder::UrlBuilder;
use crate::RegistryResult;

/// File-backed registry shared by the HTTP handlers and the scheduler.
///
/// Reads return the current [`Registry`] snapshot without blocking on
/// writers. Mutations are serialized: each one edits a private copy,
/// reconciles it, writes the file, and only then publishes the copy. A
/// failed write leaves both the file and the published snapshot untouched.
pub struct RegistryStore {
    path: PathBuf,
    url_builder: UrlBuilder,
    cache: RwLock<Option<Arc<Registry>>>,
    mutation: Mutex<()>,
    closed: AtomicBool,
}

impl RegistryStore {
    pub fn open(path: impl Into<PathBuf>, url_builder: UrlBuilder) -> Self {
        Self {
            path: path.into(),
            url_builder,
            cache: RwLock::new(None),
            mutation: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn from_settings(settings: &CollectorSettings) -> Self {
        Self::open(settings.registry_file(), UrlBuilder::from_settings(settings))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn url_builder(&self) -> &UrlBuilder {
        &self.url_builder
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Drops the in-memory state. Later calls fail with
    /// [`RegistryError::Closed`].
    pub fn close(&self) {
        let _guard = self.mutation.lock();
        self.closed.store(true, Ordering::SeqCst);
        *self.cache.write() = None;
        debug!(path = %self.path.display(), "Registry store closed");
    }

    fn ensure_open(&self) -> RegistryResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RegistryError::Closed);
        }
        Ok(())
    }

    /// Reads the file on first use; afterwards a no-op.
    pub fn load_if_absent(&self) -> RegistryResult<()> {
        self.snapshot().map(|_| ())
    }

    /// The current registry. Loads the file when nothing is cached yet.
    pub fn snapshot(&self) -> RegistryResult<Arc<Registry>> {
        self.ensure_open()?;
        if let Some(current) = self.cache.read().as_ref() {
            return Ok(Arc::clone(current));
        }
        let _guard = self.mutation.lock();
        self.load_locked()
    }

    /// Caller holds the mutation lock.
    fn load_locked(&self) -> RegistryResult<Arc<Registry>> {
        self.ensure_open()?;
        if let Some(current) = self.cache.read().as_ref() {
            return Ok(Arc::clone(current));
        }
        let registry = Arc::new(read_registry(&self.path, &self.url_builder)?);
        info!(
            path = %self.path.display(),
            direct = registry.direct.len(),
            aggregations = registry.aggregations.len(),
            "Loaded application registry"
        );
        *self.cache.write() = Some(Arc::clone(&registry));
        Ok(registry)
    }

    pub fn direct_applications(&self) -> RegistryResult<BTreeMap<String, Vec<Url>>> {
        Ok(self.snapshot()?.direct.clone())
    }

    pub fn aggregation_applications(&self) -> RegistryResult<BTreeMap<String, Vec<String>>> {
        Ok(self.snapshot()?.aggregations.clone())
    }

    pub fn entry(&self, name: &str) -> RegistryResult<Option<ApplicationEntry>> {
        Ok(self.snapshot()?.entry(name))
    }

    pub fn resolve_direct_members(&self, name: &str) -> RegistryResult<Vec<String>> {
        Ok(self.snapshot()?.resolve_direct_members(name))
    }

    /// Registers or replaces a direct application. Any aggregation with the
    /// same name is replaced.
    pub fn add_direct(&self, name: &str, urls: Vec<Url>) -> RegistryResult<()> {
        validate_name(name)?;
        if urls.is_empty() {
            return Err(RegistryError::validation("urls", "at least one URL is required"));
        }
        for url in &urls {
            self.url_builder.base_url(url)?;
        }
        self.mutate(|registry| {
            registry.aggregations.remove(name);
            registry.direct.insert(name.to_string(), urls);
            Ok(true)
        })?;
        info!(application = %name, "Registered direct application");
        Ok(())
    }

    /// Parses a comma-separated list of base URLs and registers them.
    pub fn add_direct_application(&self, name: &str, raw_urls: &str) -> RegistryResult<Vec<Url>> {
        let urls = self.url_builder.parse_urls(raw_urls)?;
        self.add_direct(name, urls.clone())?;
        Ok(urls)
    }

    /// Registers or replaces an aggregation. Returns the members that
    /// survived reconciliation. Unknown names are dropped; when no member
    /// resolves the call fails and the registry is left unchanged.
    pub fn add_aggregation(&self, name: &str, members: &[String]) -> RegistryResult<Vec<String>> {
        validate_name(name)?;
        let mut cleaned: Vec<String> = Vec::with_capacity(members.len());
        for member in members {
            let member = member.trim();
            if member.is_empty() {
                continue;
            }
            validate_name(member)?;
            if member == name {
                return Err(RegistryError::validation(
                    "aggregatedApps",
                    format!("'{}' cannot aggregate itself", name),
                ));
            }
            if !cleaned.iter().any(|m| m == member) {
                cleaned.push(member.to_string());
            }
        }
        if cleaned.is_empty() {
            return Err(RegistryError::validation(
                "aggregatedApps",
                "at least one member is required",
            ));
        }

        let registry = self.mutate(|registry| {
            registry.direct.remove(name);
            registry.aggregations.insert(name.to_string(), cleaned);
            let mut resolvable = registry.aggregations.clone();
            reconcile(&registry.direct, &mut resolvable);
            if !resolvable.contains_key(name) {
                return Err(RegistryError::validation(
                    "aggregatedApps",
                    format!("no member of '{}' resolves to a registered application", name),
                ));
            }
            Ok(true)
        })?;
        let retained = registry.aggregations.get(name).cloned().unwrap_or_default();
        info!(application = %name, members = retained.len(), "Registered aggregation");
        Ok(retained)
    }

    /// Removes an application of either kind. Aggregations that referenced it
    /// lose the member, and are dropped when left empty.
    pub fn remove(&self, name: &str) -> RegistryResult<bool> {
        let mut removed = false;
        self.mutate(|registry| {
            removed = registry.direct.remove(name).is_some()
                || registry.aggregations.remove(name).is_some();
            Ok(removed)
        })?;
        if removed {
            info!(application = %name, "Removed application");
        }
        Ok(removed)
    }

    /// Appends node URLs to a direct application, creating it when absent.
    /// URLs already registered are not duplicated.
    pub fn register_node(&self, name: &str, raw_urls: &str) -> RegistryResult<Vec<Url>> {
        validate_name(name)?;
        let urls = self.url_builder.parse_urls(raw_urls)?;
        let registry = self.mutate(|registry| {
            if registry.aggregations.contains_key(name) {
                return Err(RegistryError::validation(
                    "appName",
                    format!("'{}' is an aggregation", name),
                ));
            }
            let existing = registry.direct.entry(name.to_string()).or_default();
            let before = existing.len();
            for url in urls {
                if !existing.contains(&url) {
                    existing.push(url);
                }
            }
            Ok(existing.len() != before)
        })?;
        Ok(registry.direct.get(name).cloned().unwrap_or_default())
    }

    /// Removes node URLs from a direct application. The application itself
    /// is removed once its last node is gone. Returns whether anything
    /// changed.
    pub fn unregister_nodes(&self, name: &str, raw_urls: &str) -> RegistryResult<bool> {
        validate_name(name)?;
        let urls = self.url_builder.parse_urls(raw_urls)?;
        let mut changed = false;
        self.mutate(|registry| {
            let Some(existing) = registry.direct.get_mut(name) else {
                return Ok(false);
            };
            let before = existing.len();
            existing.retain(|url| !urls.contains(url));
            changed = existing.len() != before;
            if existing.is_empty() {
                registry.direct.remove(name);
            }
            Ok(changed)
        })?;
        if changed {
            info!(application = %name, "Unregistered nodes");
        }
        Ok(changed)
    }

    /// Runs `apply` on a copy of the registry. When it reports a change the
    /// copy is reconciled, written, and published. Returns the registry that
    /// is current afterwards.
    fn mutate<F>(&self, apply: F) -> RegistryResult<Arc<Registry>>
    where
        F: FnOnce(&mut Registry) -> RegistryResult<bool>,
    {
        let _guard = self.mutation.lock();
        let current = self.load_locked()?;
        let mut next = (*current).clone();
        if !apply(&mut next)? {
            return Ok(current);
        }

        let report = reconcile(&next.direct, &mut next.aggregations);
        for (aggregation, member) in &report.pruned_members {
            debug!(%aggregation, %member, "Pruned dangling aggregation member");
        }
        for aggregation in &report.removed_aggregations {
            info!(%aggregation, "Removed empty aggregation");
        }

        if let Err(e) = write_registry(&self.path, &next, &self.url_builder) {
            warn!(path = %self.path.display(), error = %e, "Failed to persist registry");
            return Err(e);
        }
        let next = Arc::new(next);
        *self.cache.write() = Some(Arc::clone(&next));
        Ok(next)
    }
}

fn validate_name(name: &str) -> RegistryResult<()> {
    if name.is_empty() {
        return Err(RegistryError::validation("appName", "must not be empty"));
    }
    if name.trim() != name {
        return Err(RegistryError::validation(
            "appName",
            format!("'{}' has surrounding whitespace", name),
        ));
    }
    if name.contains(',') {
        return Err(RegistryError::validation(
            "appName",
            format!("'{}' should not contain a comma", name),
        ));
    }
    if is_url_list(name) {
        return Err(RegistryError::validation(
            "appName",
            format!("'{}' looks like a URL", name),
        ));
    }
    if name.contains(['\n', '\r']) {
        return Err(RegistryError::validation(
            "appName",
            "must not contain line breaks",
        ));
    }
    Ok(())
}
