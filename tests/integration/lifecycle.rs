//! Lifecycle scenarios against an in-memory registry

use async_trait::async_trait;
use garden_cache::agent::{Agent, AgentSettings, AgentState, ResponseSource};
use garden_cache::audit::AuditLog;
use garden_cache::cache::{
    AssetRequest, CacheEntry, CacheStore, CapturedResponse, GenerationInfo, GenerationTag,
    Manifest, MemoryRegistry, RequestKey, StoreManager, StoreRegistry,
};
use garden_cache::host::Host;
use garden_cache::network::{Network, Origin};
use garden_cache::{GardenError, GardenResult};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const ORIGIN: &str = "https://garden.example/";

/// Counts calls and serves a mutable set of bodies; 404 for the rest
#[derive(Default)]
struct CountingNetwork {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
    offline: AtomicBool,
}

impl CountingNetwork {
    fn serving(assets: &[&str]) -> Arc<Self> {
        let network = Self::default();
        for asset in assets {
            network.set(asset, format!("body of {}", asset));
        }
        Arc::new(network)
    }

    fn set(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.bodies.lock().unwrap().insert(path.to_string(), body.into());
    }

    fn remove(&self, path: &str) {
        self.bodies.lock().unwrap().remove(path);
    }

    fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for CountingNetwork {
    async fn fetch(&self, request: &AssetRequest) -> GardenResult<CapturedResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(GardenError::network(request.url.as_str(), "network unreachable"));
        }
        let bodies = self.bodies.lock().unwrap();
        Ok(match bodies.get(request.url.path()) {
            Some(body) => CapturedResponse::new(200, body.clone())
                .with_header("content-type", "text/plain"),
            None => CapturedResponse::new(404, "not found"),
        })
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Memory registry whose deletes and entry writes fail for chosen tags
#[derive(Default)]
struct FlakyRegistry {
    inner: MemoryRegistry,
    locked: Mutex<HashSet<String>>,
    read_only: Mutex<HashSet<String>>,
}

impl FlakyRegistry {
    /// Deleting `generation` fails until `heal`
    fn lock(&self, generation: &str) {
        self.locked.lock().unwrap().insert(generation.to_string());
    }

    /// Writing entries into `generation` fails until `heal`
    fn make_read_only(&self, generation: &str) {
        self.read_only.lock().unwrap().insert(generation.to_string());
    }

    fn heal(&self) {
        self.locked.lock().unwrap().clear();
        self.read_only.lock().unwrap().clear();
    }

    fn wrap(&self, store: Arc<dyn CacheStore>) -> Arc<dyn CacheStore> {
        let read_only = self.read_only.lock().unwrap().contains(store.tag().as_str());
        Arc::new(FlakyStore { inner: store, read_only })
    }
}

#[async_trait]
impl StoreRegistry for FlakyRegistry {
    async fn open(&self, tag: &GenerationTag) -> GardenResult<Arc<dyn CacheStore>> {
        Ok(self.wrap(self.inner.open(tag).await?))
    }

    async fn get(&self, tag: &GenerationTag) -> GardenResult<Option<Arc<dyn CacheStore>>> {
        Ok(self.inner.get(tag).await?.map(|store| self.wrap(store)))
    }

    async fn list_tags(&self) -> GardenResult<Vec<GenerationTag>> {
        self.inner.list_tags().await
    }

    async fn delete(&self, tag: &GenerationTag) -> GardenResult<bool> {
        if self.locked.lock().unwrap().contains(tag.as_str()) {
            return Err(GardenError::store("deleting generation", format!("{} is locked", tag)));
        }
        self.inner.delete(tag).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

struct FlakyStore {
    inner: Arc<dyn CacheStore>,
    read_only: bool,
}

#[async_trait]
impl CacheStore for FlakyStore {
    fn tag(&self) -> &GenerationTag {
        self.inner.tag()
    }

    async fn put(&self, entry: CacheEntry) -> GardenResult<()> {
        if self.read_only {
            return Err(GardenError::store("writing entry", "quota exceeded"));
        }
        self.inner.put(entry).await
    }

    async fn lookup(&self, key: &RequestKey) -> GardenResult<Option<CapturedResponse>> {
        self.inner.lookup(key).await
    }

    async fn keys(&self) -> GardenResult<Vec<RequestKey>> {
        self.inner.keys().await
    }

    async fn info(&self) -> GardenResult<GenerationInfo> {
        self.inner.info().await
    }

    async fn seal(&self) -> GardenResult<()> {
        self.inner.seal().await
    }

    async fn mark_activated(&self) -> GardenResult<()> {
        self.inner.mark_activated().await
    }
}

fn agent_over(manager: &StoreManager, generation: &str, assets: &[&str]) -> Agent {
    let settings = AgentSettings {
        generation: tag(generation),
        owner_prefix: "garden-cache-".to_string(),
        manifest: Manifest::new(assets.iter().copied()).unwrap(),
    };
    Agent::new(settings, manager.clone(), Arc::new(AuditLog::disabled())).unwrap()
}

struct Fixture {
    registry: Arc<MemoryRegistry>,
    network: Arc<CountingNetwork>,
    manager: StoreManager,
}

impl Fixture {
    fn new(assets: &[&str]) -> Self {
        let registry = Arc::new(MemoryRegistry::new());
        let network = CountingNetwork::serving(assets);
        let manager = StoreManager::new(
            registry.clone(),
            network.clone(),
            Origin::parse(ORIGIN).unwrap(),
        );
        Self {
            registry,
            network,
            manager,
        }
    }

    fn agent(&self, generation: &str, assets: &[&str]) -> Agent {
        agent_over(&self.manager, generation, assets)
    }

    async fn tags(&self) -> Vec<GenerationTag> {
        self.registry.list_tags().await.unwrap()
    }

    async fn seed(&self, generation: &str) {
        self.registry.open(&tag(generation)).await.unwrap();
    }
}

fn tag(s: &str) -> GenerationTag {
    GenerationTag::new(s).unwrap()
}

fn get(path: &str) -> AssetRequest {
    AssetRequest::get(Origin::parse(ORIGIN).unwrap().resolve(path).unwrap())
}

const ASSETS: &[&str] = &["/", "/index.html", "/css/style.css", "/js/main.js"];

#[tokio::test]
async fn install_captures_exactly_the_manifest() {
    let fx = Fixture::new(ASSETS);
    let agent = fx.agent("garden-cache-v3", ASSETS);

    let report = agent.on_install().await.unwrap();
    assert_eq!(report.entries, ASSETS.len());
    assert!(!report.reinstalled);

    let store = fx.manager.get(&tag("garden-cache-v3")).await.unwrap().unwrap();
    let mut keys = store.keys().await.unwrap();
    keys.sort();
    let origin = Origin::parse(ORIGIN).unwrap();
    let mut expected: Vec<RequestKey> = ASSETS
        .iter()
        .map(|a| RequestKey::get(&origin.resolve(a).unwrap()))
        .collect();
    expected.sort();
    assert_eq!(keys, expected);
    assert_eq!(fx.network.calls(), ASSETS.len());
}

#[tokio::test]
async fn reinstall_is_idempotent() {
    let fx = Fixture::new(ASSETS);

    fx.agent("garden-cache-v3", ASSETS).on_install().await.unwrap();
    let report = fx.agent("garden-cache-v3", ASSETS).on_install().await.unwrap();

    assert!(report.reinstalled);
    assert_eq!(report.entries, ASSETS.len());
    assert_eq!(fx.tags().await, vec![tag("garden-cache-v3")]);
    let store = fx.manager.get(&tag("garden-cache-v3")).await.unwrap().unwrap();
    assert_eq!(store.keys().await.unwrap().len(), ASSETS.len());
}

#[tokio::test]
async fn activation_with_no_stale_generations() {
    let fx = Fixture::new(ASSETS);
    let agent = fx.agent("garden-cache-v3", ASSETS);
    agent.on_install().await.unwrap();

    let report = agent.on_activate().await.unwrap();
    assert!(report.deleted.is_empty());
    assert_eq!(fx.tags().await, vec![tag("garden-cache-v3")]);
}

#[tokio::test]
async fn activation_removes_one_stale_generation() {
    let fx = Fixture::new(ASSETS);
    fx.seed("garden-cache-v2").await;
    let agent = fx.agent("garden-cache-v3", ASSETS);
    agent.on_install().await.unwrap();

    let report = agent.on_activate().await.unwrap();
    assert_eq!(report.deleted, vec![tag("garden-cache-v2")]);
    assert_eq!(fx.tags().await, vec![tag("garden-cache-v3")]);
}

#[tokio::test]
async fn activation_removes_many_stale_generations() {
    let fx = Fixture::new(ASSETS);
    for old in ["garden-cache-v0", "garden-cache-v1", "garden-cache-v2"] {
        fx.seed(old).await;
    }
    let agent = fx.agent("garden-cache-v3", ASSETS);
    agent.on_install().await.unwrap();

    let report = agent.on_activate().await.unwrap();
    assert_eq!(report.deleted.len(), 3);
    assert_eq!(fx.tags().await, vec![tag("garden-cache-v3")]);
}

#[tokio::test]
async fn activation_leaves_foreign_generations() {
    let fx = Fixture::new(ASSETS);
    fx.seed("garden-cache-v2").await;
    fx.seed("notes-v1").await;
    let agent = fx.agent("garden-cache-v3", ASSETS);
    agent.on_install().await.unwrap();

    let report = agent.on_activate().await.unwrap();
    assert_eq!(report.skipped, vec![tag("notes-v1")]);
    assert_eq!(fx.tags().await, vec![tag("garden-cache-v3"), tag("notes-v1")]);
}

#[tokio::test]
async fn hit_makes_no_network_call() {
    let fx = Fixture::new(ASSETS);
    let host = Host::new(fx.manager.clone());
    host.deploy(fx.agent("garden-cache-v3", ASSETS)).await.unwrap();
    let before = fx.network.calls();

    // Origin content changes after install; the cache keeps the captured bytes
    fx.network.set("/css/style.css", "body{color:red}");
    let outcome = host.fetch(&get("/css/style.css")).await.unwrap();

    assert_eq!(outcome.source, ResponseSource::Cache);
    assert_eq!(outcome.response.body, b"body of /css/style.css");
    assert_eq!(outcome.response.header("Content-Type"), Some("text/plain"));
    assert_eq!(fx.network.calls(), before);
}

#[tokio::test]
async fn miss_makes_one_network_call_and_writes_nothing() {
    let fx = Fixture::new(ASSETS);
    fx.network.set("/unknown.js", "late");
    let host = Host::new(fx.manager.clone());
    host.deploy(fx.agent("garden-cache-v3", ASSETS)).await.unwrap();
    let before = fx.network.calls();

    let outcome = host.fetch(&get("/unknown.js")).await.unwrap();
    assert_eq!(outcome.source, ResponseSource::Network);
    assert_eq!(outcome.response.body, b"late");
    assert_eq!(fx.network.calls(), before + 1);

    let store = fx.manager.get(&tag("garden-cache-v3")).await.unwrap().unwrap();
    assert_eq!(store.keys().await.unwrap().len(), ASSETS.len());

    // Still a miss the second time
    let again = host.fetch(&get("/unknown.js")).await.unwrap();
    assert!(!again.is_hit());
    assert_eq!(fx.network.calls(), before + 2);
}

#[tokio::test]
async fn non_get_requests_always_miss() {
    let fx = Fixture::new(ASSETS);
    let host = Host::new(fx.manager.clone());
    host.deploy(fx.agent("garden-cache-v3", ASSETS)).await.unwrap();
    let before = fx.network.calls();

    let url = Origin::parse(ORIGIN).unwrap().resolve("/index.html").unwrap();
    let outcome = host.fetch(&AssetRequest::new("POST", url)).await.unwrap();

    assert!(!outcome.is_hit());
    assert_eq!(fx.network.calls(), before + 1);
}

#[tokio::test]
async fn upgrade_replaces_previous_generation() {
    let fx = Fixture::new(ASSETS);
    let host = Host::new(fx.manager.clone());
    host.deploy(fx.agent("garden-cache-v2", ASSETS)).await.unwrap();

    fx.network.set("/js/main.js", "console.log('v3')");
    let installed = host.register(fx.agent("garden-cache-v3", ASSETS)).await.unwrap();
    assert_eq!(installed.entries, ASSETS.len());

    // Old agent keeps serving the old bytes until the new one activates
    let old = host.fetch(&get("/js/main.js")).await.unwrap();
    assert_eq!(old.response.body, b"body of /js/main.js");
    assert_eq!(
        fx.tags().await,
        vec![tag("garden-cache-v2"), tag("garden-cache-v3")]
    );

    let activated = host.activate_waiting().await.unwrap();
    assert_eq!(activated.deleted, vec![tag("garden-cache-v2")]);
    assert_eq!(fx.tags().await, vec![tag("garden-cache-v3")]);

    let new = host.fetch(&get("/js/main.js")).await.unwrap();
    assert!(new.is_hit());
    assert_eq!(new.response.body, b"console.log('v3')");
}

#[tokio::test]
async fn garden_upgrade_scenario() {
    let manifest = ["/index.html", "/css/style.css"];
    let fx = Fixture::new(&manifest);
    fx.seed("garden-cache-v2").await;
    let host = Host::new(fx.manager.clone());

    host.deploy(fx.agent("garden-cache-v3", &manifest)).await.unwrap();
    assert_eq!(fx.tags().await, vec![tag("garden-cache-v3")]);
    let before = fx.network.calls();

    assert!(host.fetch(&get("/index.html")).await.unwrap().is_hit());
    assert_eq!(fx.network.calls(), before);

    let miss = host.fetch(&get("/unknown.js")).await.unwrap();
    assert_eq!(miss.source, ResponseSource::Network);
    assert_eq!(miss.response.status, 404);
    assert_eq!(fx.network.calls(), before + 1);
}

#[tokio::test]
async fn offline_hits_still_served_and_misses_fail() {
    let fx = Fixture::new(ASSETS);
    let host = Host::new(fx.manager.clone());
    host.deploy(fx.agent("garden-cache-v3", ASSETS)).await.unwrap();

    fx.network.go_offline();

    let hit = host.fetch(&get("/js/main.js")).await.unwrap();
    assert_eq!(hit.response.body, b"body of /js/main.js");

    let err = host.fetch(&get("/data.json")).await.unwrap_err();
    assert!(matches!(err, GardenError::NetworkFailure { .. }));
}

#[tokio::test]
async fn failed_install_keeps_old_generation_serving() {
    let fx = Fixture::new(ASSETS);
    let host = Host::new(fx.manager.clone());
    host.deploy(fx.agent("garden-cache-v2", ASSETS)).await.unwrap();

    fx.network.remove("/css/style.css");
    let err = host
        .register(fx.agent("garden-cache-v3", ASSETS))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    match err {
        GardenError::PopulateFailure { asset, .. } => assert_eq!(asset, "/css/style.css"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fx.tags().await, vec![tag("garden-cache-v2")]);
    assert!(host.waiting().await.is_none());

    let active = host.active().await.unwrap();
    assert_eq!(active.generation(), &tag("garden-cache-v2"));
    assert_eq!(active.state().await, AgentState::Active);
    assert!(host.fetch(&get("/css/style.css")).await.unwrap().is_hit());
}

#[tokio::test]
async fn activation_requires_installed_agent() {
    let fx = Fixture::new(ASSETS);
    let host = Host::new(fx.manager.clone());

    let err = host.activate_waiting().await.unwrap_err();
    assert!(matches!(err, GardenError::User(_)));
}

#[tokio::test]
async fn host_without_agent_forwards_to_network() {
    let fx = Fixture::new(ASSETS);
    let host = Host::new(fx.manager.clone());

    let outcome = host.fetch(&get("/index.html")).await.unwrap();
    assert_eq!(outcome.source, ResponseSource::Network);
    assert_eq!(fx.network.calls(), 1);
    assert!(fx.tags().await.is_empty());
}

#[tokio::test]
async fn concurrent_fetches_are_served() {
    let fx = Fixture::new(ASSETS);
    fx.seed("garden-cache-v1").await;
    let agent = Arc::new(fx.agent("garden-cache-v3", ASSETS));
    agent.on_install().await.unwrap();
    agent.on_activate().await.unwrap();

    let fetches = (0..8).map(|_| {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.on_fetch(&get("/index.html")).await })
    });
    for handle in fetches {
        assert!(handle.await.unwrap().unwrap().is_hit());
    }
}

fn flaky_manager(assets: &[&str]) -> (Arc<FlakyRegistry>, StoreManager) {
    let registry = Arc::new(FlakyRegistry::default());
    let manager = StoreManager::new(
        registry.clone(),
        CountingNetwork::serving(assets),
        Origin::parse(ORIGIN).unwrap(),
    );
    (registry, manager)
}

#[tokio::test]
async fn failed_deletion_settles_the_rest_and_keeps_agent_installed() {
    let (registry, manager) = flaky_manager(ASSETS);
    for old in ["garden-cache-v0", "garden-cache-v1", "garden-cache-v2"] {
        manager.open(&tag(old)).await.unwrap();
    }
    registry.lock("garden-cache-v1");

    let agent = agent_over(&manager, "garden-cache-v3", ASSETS);
    agent.on_install().await.unwrap();

    let err = agent.on_activate().await.unwrap_err();
    assert!(matches!(err, GardenError::StoreUnavailable { .. }));
    assert!(err.to_string().contains("garden-cache-v1"));
    assert_eq!(agent.state().await, AgentState::Installed);
    assert_eq!(
        manager.list_tags().await.unwrap(),
        vec![tag("garden-cache-v1"), tag("garden-cache-v3")]
    );
    assert_eq!(manager.active_generation("garden-cache-").await.unwrap(), None);
    assert!(agent.on_fetch(&get("/index.html")).await.is_err());

    // Retry once the store recovers
    registry.heal();
    let report = agent.on_activate().await.unwrap();
    assert_eq!(report.deleted, vec![tag("garden-cache-v1")]);
    assert_eq!(agent.state().await, AgentState::Active);
    assert_eq!(
        manager.active_generation("garden-cache-").await.unwrap(),
        Some(tag("garden-cache-v3"))
    );
}

#[tokio::test]
async fn failed_write_during_install_rolls_back_new_generation() {
    let (registry, manager) = flaky_manager(ASSETS);
    let agent = agent_over(&manager, "garden-cache-v3", ASSETS);
    registry.make_read_only("garden-cache-v3");

    let err = agent.on_install().await.unwrap_err();
    assert!(matches!(err, GardenError::StoreUnavailable { .. }));
    assert!(err.is_retryable());
    assert_eq!(agent.state().await, AgentState::Pending);
    assert!(manager.list_tags().await.unwrap().is_empty());

    registry.heal();
    assert_eq!(agent.on_install().await.unwrap().entries, ASSETS.len());
    assert_eq!(agent.state().await, AgentState::Installed);
}

#[tokio::test]
async fn store_failure_reaches_host_and_old_generation_serves() {
    let (registry, manager) = flaky_manager(ASSETS);
    let host = Host::new(manager.clone());
    host.deploy(agent_over(&manager, "garden-cache-v2", ASSETS)).await.unwrap();

    registry.make_read_only("garden-cache-v3");
    let err = host
        .register(agent_over(&manager, "garden-cache-v3", ASSETS))
        .await
        .unwrap_err();

    assert!(matches!(err, GardenError::StoreUnavailable { .. }));
    assert!(host.waiting().await.is_none());
    assert_eq!(manager.list_tags().await.unwrap(), vec![tag("garden-cache-v2")]);
    assert!(host.fetch(&get("/index.html")).await.unwrap().is_hit());
}
