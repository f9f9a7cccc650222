use std::collections::HashSet;
use std::sync::Arc;

use budgetbook_core::domain::customer::Customer;
use budgetbook_core::errors::ApplicationError;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, info, warn};

use crate::storage::{parent_dir, ByteStore, StorageError};

const NOTICE_CAPACITY: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    Unloaded,
    Loading,
    Loaded,
}

/// Conditions the store degrades through instead of failing the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryNotice {
    LoadDegraded { path: String, message: String },
}

struct Cache {
    phase: LoadPhase,
    customers: Vec<Customer>,
    last_load_failure: Option<ApplicationError>,
    /// Flips to `true` once the spawned read has been applied to this cache.
    in_flight: Option<watch::Receiver<bool>>,
}

/// Owns the in-memory customer list and its serialized copy in a [`ByteStore`].
///
/// Loads are single-flight: the read runs on its own task and every `load`
/// issued while it is pending waits on that task instead of reading again.
/// Dropping or aborting a waiting caller never cancels the read. Mutations go
/// through the crate-internal `with_customers` accessor and only become
/// durable once a caller invokes [`RegistryStore::save`].
pub struct RegistryStore<S> {
    storage: Arc<S>,
    path: String,
    cache: Arc<RwLock<Cache>>,
    notices: broadcast::Sender<RegistryNotice>,
}

impl<S: ByteStore> RegistryStore<S> {
    pub fn new(storage: Arc<S>, path: impl Into<String>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            storage,
            path: path.into(),
            cache: Arc::new(RwLock::new(Cache {
                phase: LoadPhase::Unloaded,
                customers: Vec::new(),
                last_load_failure: None,
                in_flight: None,
            })),
            notices,
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryNotice> {
        self.notices.subscribe()
    }

    pub async fn phase(&self) -> LoadPhase {
        self.cache.read().await.phase
    }

    /// The failure the most recent load degraded from, if it did.
    pub async fn last_load_failure(&self) -> Option<ApplicationError> {
        self.cache.read().await.last_load_failure.clone()
    }

    pub async fn load(&self, force_reload: bool) -> Vec<Customer> {
        let mut finished = {
            let mut cache = self.cache.write().await;
            match cache.in_flight.clone() {
                Some(receiver) => {
                    debug!(
                        event_name = "registry.load.joined",
                        registry_path = %self.path,
                        "joined in-flight registry load"
                    );
                    receiver
                }
                None if !force_reload && cache.phase == LoadPhase::Loaded => {
                    return cache.customers.clone();
                }
                None => {
                    let (sender, receiver) = watch::channel(false);
                    cache.phase = LoadPhase::Loading;
                    cache.in_flight = Some(receiver.clone());
                    let task = LoadTask {
                        storage: Arc::clone(&self.storage),
                        path: self.path.clone(),
                        cache: Arc::clone(&self.cache),
                        notices: self.notices.clone(),
                        forced: force_reload,
                    };
                    tokio::spawn(task.run(sender));
                    receiver
                }
            }
        };

        if finished.wait_for(|done| *done).await.is_err() {
            warn!(
                event_name = "registry.load.abandoned",
                registry_path = %self.path,
                "registry load task ended without publishing a result"
            );
            let mut cache = self.cache.write().await;
            if cache.in_flight.as_ref().is_some_and(|pending| pending.same_channel(&finished)) {
                cache.in_flight = None;
            }
        }

        self.all().await
    }

    pub async fn save(&self) -> Result<(), ApplicationError> {
        if self.phase().await != LoadPhase::Loaded {
            self.load(false).await;
        }

        let snapshot = self.all().await;
        let payload = serde_json::to_vec_pretty(&snapshot).map_err(|error| {
            ApplicationError::StorageWrite(format!("could not serialize registry: {error}"))
        })?;

        if let Some(dir) = parent_dir(&self.path) {
            if let Err(error) = self.storage.mkdir(dir, true).await {
                warn!(
                    event_name = "registry.save.mkdir_failed",
                    registry_path = %self.path,
                    error = %error,
                    "could not ensure registry directory; attempting write anyway"
                );
            }
        }

        self.storage.write(&self.path, &payload).await.map_err(|error| {
            warn!(
                event_name = "registry.save.failed",
                registry_path = %self.path,
                error = %error,
                "registry write failed; in-memory changes are not durable"
            );
            ApplicationError::StorageWrite(error.to_string())
        })?;

        info!(
            event_name = "registry.save.completed",
            registry_path = %self.path,
            customers = snapshot.len(),
            "registry saved"
        );
        Ok(())
    }

    pub async fn all(&self) -> Vec<Customer> {
        self.cache.read().await.customers.clone()
    }

    pub async fn count(&self) -> usize {
        self.cache.read().await.customers.len()
    }

    pub async fn document_count(&self) -> usize {
        self.cache.read().await.customers.iter().map(|customer| customer.documents.len()).sum()
    }

    pub(crate) async fn with_customers<R>(&self, mutate: impl FnOnce(&mut Vec<Customer>) -> R) -> R {
        let mut cache = self.cache.write().await;
        mutate(&mut cache.customers)
    }
}

struct LoadTask<S> {
    storage: Arc<S>,
    path: String,
    cache: Arc<RwLock<Cache>>,
    notices: broadcast::Sender<RegistryNotice>,
    forced: bool,
}

impl<S: ByteStore> LoadTask<S> {
    async fn run(self, finished: watch::Sender<bool>) {
        let result = read_registry(self.storage.as_ref(), &self.path).await;

        let (failure, customers) = {
            let mut cache = self.cache.write().await;
            let failure = match result {
                Ok(customers) => {
                    cache.customers = customers;
                    None
                }
                Err(error) => {
                    cache.customers.clear();
                    Some(error)
                }
            };
            cache.phase = LoadPhase::Loaded;
            cache.last_load_failure = failure.clone();
            cache.in_flight = None;
            (failure, cache.customers.len())
        };

        match failure {
            Some(error) => {
                warn!(
                    event_name = "registry.load.degraded",
                    registry_path = %self.path,
                    error_class = error.class(),
                    error = %error,
                    "registry could not be loaded; continuing with an empty customer list"
                );
                let _ = self.notices.send(RegistryNotice::LoadDegraded {
                    path: self.path.clone(),
                    message: error.to_string(),
                });
            }
            None => {
                info!(
                    event_name = "registry.load.completed",
                    registry_path = %self.path,
                    customers,
                    forced = self.forced,
                    "registry loaded"
                );
            }
        }

        let _ = finished.send(true);
    }
}

async fn read_registry<S: ByteStore>(storage: &S, path: &str) -> Result<Vec<Customer>, ApplicationError> {
    let bytes = match storage.read(path).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) => {
            info!(
                event_name = "registry.load.missing",
                registry_path = %path,
                "registry file not found; starting with an empty customer list"
            );
            return Ok(Vec::new());
        }
        Err(error) => return Err(ApplicationError::StorageRead(error.to_string())),
    };

    let customers: Vec<Customer> = serde_json::from_slice(&bytes).map_err(|error| {
        ApplicationError::StorageRead(format!("registry `{path}` is not valid: {error}"))
    })?;

    let mut seen = HashSet::new();
    let duplicates = customers
        .iter()
        .filter_map(Customer::identity)
        .filter(|id| !seen.insert(id.0.clone()))
        .count();
    if duplicates > 0 {
        warn!(
            event_name = "registry.load.duplicate_ids",
            registry_path = %path,
            duplicates,
            "registry contains repeated customer ids; lookups use the first occurrence"
        );
    }

    Ok(customers)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use budgetbook_core::domain::customer::{Customer, CustomerId, Document};
    use budgetbook_core::errors::ApplicationError;

    use crate::storage::InMemoryByteStore;

    use super::{LoadPhase, RegistryNotice, RegistryStore};

    const PATH: &str = "data/clientes.json";

    fn customer(id: &str, name: &str) -> Customer {
        Customer {
            id: Some(CustomerId(id.to_string())),
            name: name.to_string(),
            phone: None,
            email: None,
            documents: Vec::new(),
        }
    }

    fn registry(storage: &Arc<InMemoryByteStore>) -> RegistryStore<InMemoryByteStore> {
        RegistryStore::new(Arc::clone(storage), PATH)
    }

    #[tokio::test]
    async fn missing_registry_loads_as_empty() {
        let storage = Arc::new(InMemoryByteStore::default());
        let registry = registry(&storage);
        assert_eq!(registry.phase().await, LoadPhase::Unloaded);

        let customers = registry.load(false).await;

        assert!(customers.is_empty());
        assert_eq!(registry.phase().await, LoadPhase::Loaded);
        assert!(registry.last_load_failure().await.is_none());
    }

    #[tokio::test]
    async fn loaded_registry_is_served_from_cache_until_forced() {
        let storage = Arc::new(InMemoryByteStore::default());
        let json = serde_json::to_vec(&vec![customer("a", "Ana")]).expect("serialize");
        storage.insert(PATH, json).await;
        let registry = registry(&storage);

        assert_eq!(registry.load(false).await.len(), 1);
        assert_eq!(registry.load(false).await.len(), 1);
        assert_eq!(storage.read_count(), 1);

        registry.load(true).await;
        assert_eq!(storage.read_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_read() {
        let storage = Arc::new(InMemoryByteStore::default());
        storage.set_read_delay(Duration::from_millis(20)).await;
        let registry = registry(&storage);

        let (first, second) = tokio::join!(registry.load(false), registry.load(false));

        assert_eq!(first, second);
        assert_eq!(storage.read_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_forced_reloads_share_one_read() {
        let storage = Arc::new(InMemoryByteStore::default());
        storage.set_read_delay(Duration::from_millis(20)).await;
        let registry = registry(&storage);

        tokio::join!(registry.load(true), registry.load(true));

        assert_eq!(storage.read_count(), 1);
    }

    #[tokio::test]
    async fn aborted_first_loader_does_not_trigger_a_second_read() {
        let storage = Arc::new(InMemoryByteStore::default());
        let json = serde_json::to_vec(&vec![customer("a", "Ana")]).expect("serialize");
        storage.insert(PATH, json).await;
        storage.set_read_delay(Duration::from_millis(100)).await;
        let registry = Arc::new(registry(&storage));

        let first = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move { registry.load(false).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move { registry.load(false).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        first.abort();

        let customers = second.await.expect("second loader");
        assert!(first.await.expect_err("first loader was aborted").is_cancelled());
        assert_eq!(customers.len(), 1);
        assert_eq!(storage.read_count(), 1);
        assert_eq!(registry.phase().await, LoadPhase::Loaded);
    }

    #[tokio::test]
    async fn forced_reload_joins_a_pending_load() {
        let storage = Arc::new(InMemoryByteStore::default());
        storage.set_read_delay(Duration::from_millis(20)).await;
        let registry = registry(&storage);

        tokio::join!(registry.load(false), registry.load(true));

        assert_eq!(storage.read_count(), 1);
        assert_eq!(registry.phase().await, LoadPhase::Loaded);
    }

    #[tokio::test]
    async fn corrupt_registry_degrades_to_empty_and_notifies_once() {
        let storage = Arc::new(InMemoryByteStore::default());
        storage.insert(PATH, b"{ not json".to_vec()).await;
        let registry = registry(&storage);
        let mut notices = registry.subscribe();

        assert!(registry.load(false).await.is_empty());
        assert!(registry.load(false).await.is_empty());

        assert_eq!(storage.read_count(), 1, "degraded load must not retry on its own");
        assert_eq!(registry.phase().await, LoadPhase::Loaded);
        assert!(matches!(
            registry.last_load_failure().await,
            Some(ApplicationError::StorageRead(_))
        ));
        let notice = notices.try_recv().expect("one notice");
        assert!(matches!(notice, RegistryNotice::LoadDegraded { ref path, .. } if path == PATH));
        assert!(notices.try_recv().is_err());
    }

    #[tokio::test]
    async fn read_fault_degrades_like_corruption() {
        let storage = Arc::new(InMemoryByteStore::default());
        storage.insert(PATH, b"[]".to_vec()).await;
        storage.fail_reads_on(PATH).await;
        let registry = registry(&storage);

        assert!(registry.load(false).await.is_empty());
        assert!(registry.last_load_failure().await.is_some());

        storage.clear_faults().await;
        registry.load(true).await;
        assert!(registry.last_load_failure().await.is_none());
    }

    #[tokio::test]
    async fn save_creates_parent_directory_and_writes_pretty_json() {
        let storage = Arc::new(InMemoryByteStore::default());
        let registry = registry(&storage);
        registry.load(false).await;
        registry
            .with_customers(|customers| {
                let mut ana = customer("a", "Ana");
                ana.attach(Document::new("orcamento_0001.pdf", "memory:///x", "x"));
                customers.push(ana);
            })
            .await;

        registry.save().await.expect("save");

        assert!(storage.has_dir("data").await);
        let written = String::from_utf8(storage.contents(PATH).await.expect("written"))
            .expect("utf-8 registry");
        assert!(written.starts_with("[\n  {"), "registry should be pretty printed: {written}");
        assert!(written.contains("\"nome\": \"Ana\""));
        assert!(!written.contains("null"));
        assert_eq!(registry.count().await, 1);
        assert_eq!(registry.document_count().await, 1);
    }

    #[tokio::test]
    async fn failed_save_keeps_in_memory_mutation() {
        let storage = Arc::new(InMemoryByteStore::default());
        storage.fail_writes_on(PATH).await;
        let registry = registry(&storage);
        registry.load(false).await;
        registry.with_customers(|customers| customers.push(customer("a", "Ana"))).await;

        let error = registry.save().await.expect_err("write fault");

        assert!(matches!(error, ApplicationError::StorageWrite(_)));
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn save_before_first_load_does_not_clobber_the_file() {
        let storage = Arc::new(InMemoryByteStore::default());
        let json = serde_json::to_vec(&vec![customer("a", "Ana")]).expect("serialize");
        storage.insert(PATH, json).await;
        let registry = registry(&storage);

        registry.save().await.expect("save");

        assert_eq!(registry.load(true).await.len(), 1);
    }

    #[tokio::test]
    async fn all_returns_a_detached_copy() {
        let storage = Arc::new(InMemoryByteStore::default());
        let registry = registry(&storage);
        registry.load(false).await;
        registry.with_customers(|customers| customers.push(customer("a", "Ana"))).await;

        let mut copy = registry.all().await;
        copy[0].name = "Changed".to_string();
        copy.clear();

        let current = registry.all().await;
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].name, "Ana");
    }
}
