// ── Workspace facade ──
//
// Owns one gateway session: fetches and rebuilds the MBean tree, runs the
// post-processor pipeline, polls the change counters of whichever agent
// features are present, and answers selection / permission queries.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use jmxtree_api::GatewayClient;

use crate::config::WorkspaceConfig;
use crate::error::CoreError;
use crate::gateway::{Domains, Gateway, build_gateway};
use crate::location::Location;
use crate::model::{Folder, MBeanTree, NodeId};
use crate::preferences::{MemoryPreferences, PreferenceStore};
use crate::selection::SelectionView;
use crate::store::{PublishOutcome, ReplayOutcome, WorkspaceStore};
use crate::stream::TreeStream;
use crate::tree::{LazyLoaders, PostProcessors, TreeBuilder};
use crate::watch::{CounterAction, CounterSubscription, WatchTarget, WatchedCounter, WatcherKind};

const EVENT_CHANNEL_SIZE: usize = 64;
const MAX_REPLAY_ATTEMPTS: usize = 4;

// ── WorkspaceEvent ───────────────────────────────────────────────────

/// Notifications broadcast to observers (views, the CLI `watch` loop).
#[derive(Debug, Clone)]
pub enum WorkspaceEvent {
    /// A rebuilt tree was published.
    TreeUpdated { generation: u64 },
    /// The selection changed; carries a snapshot of the new node.
    SelectionChanged(Option<Arc<Folder>>),
    /// The plugin registry changed; the session should be restarted.
    ReloadRequested,
}

// ── Workspace ────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<WorkspaceInner>`. Nothing is fetched until
/// [`load_tree()`](Self::load_tree) is called.
pub struct Workspace<G: Gateway> {
    inner: Arc<WorkspaceInner<G>>,
}

impl<G: Gateway> Clone for Workspace<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct WorkspaceInner<G> {
    config: WorkspaceConfig,
    gateway: G,
    store: WorkspaceStore,
    event_tx: broadcast::Sender<WorkspaceEvent>,
    processors: Mutex<PostProcessors>,
    replays: Mutex<ReplayQueue>,
    lazy_loaders: Mutex<LazyLoaders>,
    watchers: Mutex<Watchers>,
    preferences: Arc<dyn PreferenceStore>,
    cancel: CancellationToken,
}

/// Processors waiting to run against the published tree. One caller
/// drains at a time; registrations made meanwhile only enqueue.
#[derive(Default)]
struct ReplayQueue {
    pending: VecDeque<String>,
    draining: bool,
}

/// Releases the drain flag if a processor panics mid-drain.
struct DrainGuard<'a>(&'a Mutex<ReplayQueue>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            lock(self.0).draining = false;
        }
    }
}

#[derive(Default)]
struct Watchers {
    plugin_registry: WatcherSlot,
    tree_watcher: WatcherSlot,
}

#[derive(Default)]
struct WatcherSlot {
    counter: WatchedCounter,
    subscription: Option<CounterSubscription>,
}

impl Watchers {
    fn slot(&mut self, kind: WatcherKind) -> &mut WatcherSlot {
        match kind {
            WatcherKind::PluginRegistry => &mut self.plugin_registry,
            WatcherKind::TreeWatcher => &mut self.tree_watcher,
        }
    }
}

impl Workspace<GatewayClient> {
    /// Build the HTTP gateway from `config` and wrap it in a workspace.
    pub fn connect(config: WorkspaceConfig) -> Result<Self, CoreError> {
        let gateway = build_gateway(&config)?;
        Ok(Self::new(config, gateway))
    }
}

impl<G: Gateway> Workspace<G> {
    /// Create a workspace with process-local view preferences.
    pub fn new(config: WorkspaceConfig, gateway: G) -> Self {
        Self::with_preferences(config, gateway, Arc::new(MemoryPreferences::new()))
    }

    pub fn with_preferences(
        config: WorkspaceConfig,
        gateway: G,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            inner: Arc::new(WorkspaceInner {
                config,
                gateway,
                store: WorkspaceStore::new(),
                event_tx,
                processors: Mutex::new(PostProcessors::new()),
                replays: Mutex::new(ReplayQueue::default()),
                lazy_loaders: Mutex::new(LazyLoaders::new()),
                watchers: Mutex::new(Watchers::default()),
                preferences,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.inner.config
    }

    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }

    pub fn store(&self) -> &WorkspaceStore {
        &self.inner.store
    }

    // ── Fetch & rebuild ──────────────────────────────────────────────

    /// Fetch the full listing and rebuild. Failures are logged and leave
    /// the current tree in place.
    pub async fn load_tree(&self) {
        if let Err(e) = self.try_load_tree().await {
            warn!(error = %e, "failed to load mbean tree");
        }
    }

    /// Like [`load_tree()`](Self::load_tree), but reports the failure.
    /// The tree counts as fetched either way.
    pub async fn try_load_tree(&self) -> Result<bool, CoreError> {
        self.fetch_and_populate(None).await
    }

    /// Shallow refetch (`refresh_max_depth`) followed by a rebuild.
    pub async fn refetch_tree(&self) {
        let depth = self.inner.config.refresh_max_depth;
        if let Err(e) = self.fetch_and_populate(Some(depth)).await {
            warn!(error = %e, max_depth = depth, "failed to refetch mbean tree");
        }
    }

    async fn fetch_and_populate(&self, max_depth: Option<u32>) -> Result<bool, CoreError> {
        let generation = self.inner.store.next_generation();
        debug!(generation, ?max_depth, "fetching mbean listing");
        match self.inner.gateway.list(max_depth).await {
            Ok(domains) => Ok(self.apply(generation, &domains)),
            Err(e) => {
                self.inner.store.mark_fetched();
                Err(e)
            }
        }
    }

    /// Rebuild from an already fetched listing. Returns `false` only when
    /// a newer tree has been published in the meantime.
    pub fn populate_tree(&self, domains: &Domains) -> bool {
        let generation = self.inner.store.next_generation();
        self.apply(generation, domains)
    }

    fn apply(&self, generation: u64, domains: &Domains) -> bool {
        let loaders = lock(&self.inner.lazy_loaders).clone();
        let mut tree = TreeBuilder::new(&loaders).build(domains);

        // Run outside the lock so processors may register others.
        let processors = lock(&self.inner.processors).clone();
        processors.run_all(&mut tree);

        let outcome = self
            .inner
            .store
            .publish(generation, tree, processors.handles());
        self.inner.store.mark_fetched();
        let PublishOutcome::Applied { selection_changed } = outcome else {
            return false;
        };

        // Registrations that raced the rebuild have not seen this tree.
        let registered: Vec<String> = lock(&self.inner.processors)
            .names()
            .map(str::to_string)
            .collect();
        self.queue_replays(registered);

        info!(generation, domains = domains.len(), "mbean tree updated");
        let _ = self
            .inner
            .event_tx
            .send(WorkspaceEvent::TreeUpdated { generation });
        if selection_changed {
            self.emit_selection();
        }
        self.maybe_monitor_plugins();
        true
    }

    pub fn tree(&self) -> Arc<MBeanTree> {
        self.inner.store.tree_snapshot()
    }

    pub fn is_tree_fetched(&self) -> bool {
        self.inner.store.is_fetched()
    }

    // ── Post-processors & lazy loaders ───────────────────────────────

    /// Register under the next auto-assigned name; see
    /// [`PostProcessors::next_name`].
    pub fn add_tree_post_processor(
        &self,
        processor: impl Fn(&mut MBeanTree) + Send + Sync + 'static,
    ) -> String {
        let name = lock(&self.inner.processors).push(processor);
        self.replay_processor(&name);
        name
    }

    /// Register (or replace) a named processor. When a tree is already
    /// loaded the processor runs against it immediately.
    pub fn add_named_tree_post_processor(
        &self,
        name: impl Into<String>,
        processor: impl Fn(&mut MBeanTree) + Send + Sync + 'static,
    ) -> String {
        let name = lock(&self.inner.processors).insert(name, processor);
        self.replay_processor(&name);
        name
    }

    pub fn remove_named_tree_post_processor(&self, name: &str) -> bool {
        lock(&self.inner.processors).remove(name)
    }

    fn replay_processor(&self, name: &str) {
        if self.inner.store.is_fetched() {
            self.queue_replays([name.to_string()]);
        }
    }

    /// Queue processors to run against the published tree and drain the
    /// queue unless another call is already draining it.
    fn queue_replays(&self, names: impl IntoIterator<Item = String>) {
        {
            let mut queue = lock(&self.inner.replays);
            for name in names {
                if !queue.pending.contains(&name) {
                    queue.pending.push_back(name);
                }
            }
            if queue.draining || queue.pending.is_empty() {
                return;
            }
            queue.draining = true;
        }

        let _guard = DrainGuard(&self.inner.replays);
        loop {
            let name = {
                let mut queue = lock(&self.inner.replays);
                let Some(name) = queue.pending.pop_front() else {
                    queue.draining = false;
                    return;
                };
                name
            };
            self.replay_now(&name);
        }
    }

    /// Run one processor on a copy of the published tree, with no lock
    /// held, and swap the result in if the tree did not move meanwhile.
    fn replay_now(&self, name: &str) {
        for _ in 0..MAX_REPLAY_ATTEMPTS {
            let Some(processor) = lock(&self.inner.processors).get(name) else {
                return;
            };
            if self.inner.store.has_processed(&processor) {
                return;
            }
            let base = self.inner.store.tree_snapshot();
            let mut tree = MBeanTree::clone(&base);
            debug!(processor = name, "replaying post-processor against current tree");
            processor(&mut tree);

            match self.inner.store.commit_processed(&base, &processor, tree) {
                ReplayOutcome::Applied | ReplayOutcome::AlreadyApplied => return,
                ReplayOutcome::Superseded => {
                    debug!(processor = name, "tree changed during replay, retrying");
                }
            }
        }
        warn!(processor = name, "tree kept changing, replay left to the next rebuild");
    }

    /// Register a lazy-load provider; consulted on the next rebuild.
    pub fn add_lazy_loader(
        &self,
        name: impl Into<String>,
        loader: impl Fn(&Folder) -> bool + Send + Sync + 'static,
    ) {
        lock(&self.inner.lazy_loaders).register(name, loader);
    }

    // ── Change detection ─────────────────────────────────────────────

    fn target(&self, kind: WatcherKind) -> &WatchTarget {
        match kind {
            WatcherKind::PluginRegistry => &self.inner.config.plugin_registry,
            WatcherKind::TreeWatcher => &self.inner.config.tree_watcher,
        }
    }

    /// Start or stop each counter poll depending on whether its feature
    /// MBean is in the current tree. Runs after every rebuild.
    pub fn maybe_monitor_plugins(&self) {
        let view = self.view();
        let mut watchers = lock(&self.inner.watchers);
        for kind in [WatcherKind::PluginRegistry, WatcherKind::TreeWatcher] {
            let target = self.target(kind);
            let present =
                view.tree_contains_domain_and_properties(&target.domain, &target.property_pairs());
            let slot = watchers.slot(kind);

            if !present {
                if slot.subscription.take().is_some() {
                    info!(watcher = %kind, "feature mbean gone, stopping counter poll");
                }
                slot.counter.reset();
                continue;
            }
            if slot.subscription.as_ref().is_some_and(|s| !s.is_finished()) {
                continue;
            }
            slot.subscription = self.spawn_counter_poll(kind);
        }
    }

    fn spawn_counter_poll(&self, kind: WatcherKind) -> Option<CounterSubscription> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(watcher = %kind, "no runtime, counter poll not started");
            return None;
        };
        let cancel = self.inner.cancel.child_token();
        let task = counter_poll_task(self.clone(), kind, cancel.clone());
        info!(watcher = %kind, mbean = %self.target(kind).mbean(), "starting counter poll");
        Some(CounterSubscription::new(cancel, handle.spawn(task)))
    }

    /// Whether a counter poll is currently running for `kind`.
    pub fn is_watching(&self, kind: WatcherKind) -> bool {
        lock(&self.inner.watchers)
            .slot(kind)
            .subscription
            .as_ref()
            .is_some_and(|s| !s.is_finished())
    }

    /// Feed one counter value. Returns the action it calls for, if any;
    /// a plugin-registry change only calls for a reload with `auto_refresh`.
    pub fn observe_counter(&self, kind: WatcherKind, value: Value) -> Option<CounterAction> {
        let changed = lock(&self.inner.watchers).slot(kind).counter.observe(value);
        if !changed {
            return None;
        }
        if kind == WatcherKind::PluginRegistry && !self.inner.config.auto_refresh {
            debug!("plugin registry changed, auto refresh disabled");
            return None;
        }
        Some(kind.action())
    }

    /// Feed one counter value and carry out the resulting action.
    pub async fn on_counter(&self, kind: WatcherKind, value: Value) {
        match self.observe_counter(kind, value) {
            Some(CounterAction::Reload) => {
                info!("plugin registry changed, requesting reload");
                let _ = self.inner.event_tx.send(WorkspaceEvent::ReloadRequested);
            }
            Some(CounterAction::Refetch) => {
                info!("tree watcher counter changed, refetching");
                self.refetch_tree().await;
            }
            None => {}
        }
    }

    // ── Selection ────────────────────────────────────────────────────

    /// Snapshot of the current tree and selection for queries.
    pub fn view(&self) -> SelectionView {
        SelectionView::new(
            self.inner.store.tree_snapshot(),
            self.inner.store.selection(),
        )
    }

    pub fn selection(&self) -> Option<NodeId> {
        self.inner.store.selection()
    }

    pub fn selected_folder(&self) -> Option<Folder> {
        self.view().selection().cloned()
    }

    pub fn selected_mbean_name(&self) -> Option<String> {
        self.view().selected_mbean_name().map(str::to_string)
    }

    /// Make `id` the active selection. Ids not in the current tree clear it.
    pub fn select(&self, id: Option<NodeId>) {
        let tree = self.inner.store.tree_snapshot();
        let id = id.filter(|&id| tree.get(id).is_some());
        self.inner.store.set_selection(id);
        self.emit_selection();
    }

    pub fn select_by_key(&self, key: &str) -> Option<NodeId> {
        let id = self.inner.store.tree_snapshot().node_by_key(key)?;
        self.select(Some(id));
        Some(id)
    }

    /// Current selection, or the node named by the location's `nid`
    /// parameter when nothing is selected yet.
    pub fn select_from_location(&self, location: &Location) -> Option<NodeId> {
        if let Some(id) = self.selection() {
            return Some(id);
        }
        let nid = location.nid()?;
        let tree = self.inner.store.tree_snapshot();
        let id = tree
            .find_descendant(tree.root(), |f| f.key.as_deref() == Some(nid))?;
        self.select(Some(id));
        Some(id)
    }

    /// Detach the selection from its parent and select the parent.
    pub fn remove_and_select_parent_node(&self) -> Option<NodeId> {
        let selected = self.selection()?;
        let mut parent = None;
        self.inner
            .store
            .modify_tree(|tree| parent = tree.detach(selected));
        if parent.is_some() {
            self.select(parent);
        }
        parent
    }

    pub fn select_parent_node(&self) -> Option<NodeId> {
        let parent = self.tree().parent(self.selection()?)?;
        self.select(Some(parent));
        Some(parent)
    }

    fn emit_selection(&self) {
        let folder = self.view().selection().cloned().map(Arc::new);
        let _ = self
            .inner
            .event_tx
            .send(WorkspaceEvent::SelectionChanged(folder));
    }

    // ── Permissions ──────────────────────────────────────────────────

    pub fn has_invoke_rights(&self, methods: &[&str]) -> bool {
        self.view().selection_has_invoke_rights(methods)
    }

    pub fn has_invoke_rights_for_name(&self, object_name: &str, methods: &[&str]) -> bool {
        self.view().has_invoke_rights_for_name(object_name, methods)
    }

    // ── View preferences ─────────────────────────────────────────────

    pub fn selection_config_key(&self, prefix: &str) -> Option<String> {
        self.view().selection_config_key(prefix)
    }

    /// Remember `view` as the preferred sub-view for this kind of selection.
    pub fn remember_view(&self, view: &str) -> bool {
        let Some(key) = self.view().selection_view_config_key() else {
            return false;
        };
        self.inner.preferences.set(&key, view);
        true
    }

    pub fn preferred_view(&self) -> Option<String> {
        let key = self.view().selection_view_config_key()?;
        self.inner.preferences.get(&key)
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn events(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn subscribe_tree(&self) -> TreeStream {
        self.inner.store.subscribe_tree()
    }

    pub fn subscribe_selection(&self) -> watch::Receiver<Option<NodeId>> {
        self.inner.store.subscribe_selection()
    }

    /// Stop every counter poll.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut watchers = lock(&self.inner.watchers);
        for kind in [WatcherKind::PluginRegistry, WatcherKind::TreeWatcher] {
            watchers.slot(kind).subscription = None;
        }
        debug!("workspace shut down");
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Poll one counter at `update_rate` until cancelled.
async fn counter_poll_task<G: Gateway>(
    workspace: Workspace<G>,
    kind: WatcherKind,
    cancel: CancellationToken,
) {
    let target = workspace.target(kind).clone();
    let mbean = target.mbean();
    let rate = workspace.config().update_rate.max(Duration::from_millis(1));
    let mut interval = tokio::time::interval(rate);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match workspace.inner.gateway.read(&mbean, &target.attribute).await {
                    Ok(value) => workspace.on_counter(kind, value).await,
                    Err(e) => debug!(watcher = %kind, error = %e, "counter read failed"),
                }
            }
        }
    }
    debug!(watcher = %kind, "counter poll stopped");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
