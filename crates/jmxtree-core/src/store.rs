// ── Workspace store ──
//
// Holds the published tree and the active selection in `watch` channels.
// A rebuilt tree is swapped in with one send, so readers see either the
// old tree or the new one, never a partial build. Fetches are stamped
// with a generation; a response older than the last applied one is
// dropped instead of overwriting newer state. Late post-processor runs
// are committed only onto the tree they ran against.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::model::{MBeanTree, NodeId};
use crate::stream::TreeStream;
use crate::tree::PostProcessor;

/// Result of offering a rebuilt tree to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A newer tree was already applied; this one was discarded.
    Stale,
    Applied { selection_changed: bool },
}

/// Result of committing a post-processor run against a tree snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    Applied,
    /// The processor had already run against the published tree.
    AlreadyApplied,
    /// The published tree changed after the snapshot was taken.
    Superseded,
}

pub struct WorkspaceStore {
    pub(crate) tree: watch::Sender<Arc<MBeanTree>>,
    pub(crate) selection: watch::Sender<Option<NodeId>>,
    pub(crate) last_rebuild: watch::Sender<Option<DateTime<Utc>>>,
    requested_generation: AtomicU64,
    applied_generation: AtomicU64,
    tree_fetched: AtomicBool,
    /// Processors that have run against the published tree. Only touched
    /// while the tree channel is locked for writing.
    processed: Mutex<Vec<PostProcessor>>,
}

impl Default for WorkspaceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceStore {
    pub fn new() -> Self {
        let (tree, _) = watch::channel(Arc::new(MBeanTree::new()));
        let (selection, _) = watch::channel(None);
        let (last_rebuild, _) = watch::channel(None);
        Self {
            tree,
            selection,
            last_rebuild,
            requested_generation: AtomicU64::new(0),
            applied_generation: AtomicU64::new(0),
            tree_fetched: AtomicBool::new(false),
            processed: Mutex::new(Vec::new()),
        }
    }

    // ── Tree ─────────────────────────────────────────────────────────

    pub fn tree_snapshot(&self) -> Arc<MBeanTree> {
        self.tree.borrow().clone()
    }

    pub fn subscribe_tree(&self) -> TreeStream {
        TreeStream::new(self.tree.subscribe())
    }

    /// Whether at least one fetch has completed (successfully or not).
    pub fn is_fetched(&self) -> bool {
        self.tree_fetched.load(Ordering::Acquire)
    }

    pub(crate) fn mark_fetched(&self) {
        self.tree_fetched.store(true, Ordering::Release);
    }

    pub fn last_rebuild(&self) -> Option<DateTime<Utc>> {
        *self.last_rebuild.borrow()
    }

    /// Stamp a new fetch.
    pub(crate) fn next_generation(&self) -> u64 {
        self.requested_generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn applied_generation(&self) -> u64 {
        self.applied_generation.load(Ordering::Acquire)
    }

    /// Swap in a rebuilt tree unless a newer generation already landed.
    ///
    /// The selection is carried over by key; it is cleared when the new
    /// tree has no node with that key. `ran` lists the processors already
    /// applied to `tree`.
    pub(crate) fn publish(
        &self,
        generation: u64,
        tree: MBeanTree,
        ran: Vec<PostProcessor>,
    ) -> PublishOutcome {
        let selected = *self.selection.borrow();
        let mut remapped = None;

        let applied = self.tree.send_if_modified(|current| {
            let last = self.applied_generation.load(Ordering::Acquire);
            if generation < last {
                return false;
            }
            self.applied_generation.store(generation, Ordering::Release);
            remapped = selected
                .and_then(|id| current.get(id))
                .and_then(|folder| folder.key.as_deref())
                .and_then(|key| tree.node_by_key(key));
            *current = Arc::new(tree);
            *lock(&self.processed) = ran;
            true
        });

        if !applied {
            debug!(generation, "discarding stale tree");
            return PublishOutcome::Stale;
        }

        self.last_rebuild.send_replace(Some(Utc::now()));
        let selection_changed = self.selection.send_if_modified(|sel| {
            let changed = *sel != remapped;
            *sel = remapped;
            changed
        });
        PublishOutcome::Applied { selection_changed }
    }

    /// Mutate the published tree in place (copy-on-write).
    pub(crate) fn modify_tree(&self, f: impl FnOnce(&mut MBeanTree)) {
        self.tree.send_modify(|current| f(Arc::make_mut(current)));
    }

    /// Whether `processor` has already run against the published tree.
    pub(crate) fn has_processed(&self, processor: &PostProcessor) -> bool {
        lock(&self.processed)
            .iter()
            .any(|p| Arc::ptr_eq(p, processor))
    }

    /// Publish `tree`, the result of running `processor` on a copy of
    /// `base`, provided `base` is still the published tree.
    pub(crate) fn commit_processed(
        &self,
        base: &Arc<MBeanTree>,
        processor: &PostProcessor,
        tree: MBeanTree,
    ) -> ReplayOutcome {
        let mut outcome = ReplayOutcome::Superseded;
        self.tree.send_if_modified(|current| {
            let mut processed = lock(&self.processed);
            if processed.iter().any(|p| Arc::ptr_eq(p, processor)) {
                outcome = ReplayOutcome::AlreadyApplied;
                return false;
            }
            if !Arc::ptr_eq(current, base) {
                return false;
            }
            processed.push(Arc::clone(processor));
            *current = Arc::new(tree);
            outcome = ReplayOutcome::Applied;
            true
        });
        outcome
    }

    // ── Selection ────────────────────────────────────────────────────

    pub fn selection(&self) -> Option<NodeId> {
        *self.selection.borrow()
    }

    pub fn subscribe_selection(&self) -> watch::Receiver<Option<NodeId>> {
        self.selection.subscribe()
    }

    /// Returns `true` when the selection actually changed.
    pub(crate) fn set_selection(&self, id: Option<NodeId>) -> bool {
        self.selection.send_if_modified(|sel| {
            let changed = *sel != id;
            *sel = id;
            changed
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tree_with(domain: &str) -> MBeanTree {
        let mut tree = MBeanTree::new();
        let id = tree.get_or_create_child(NodeId::ROOT, domain);
        tree.ensure_key(id, || format!("root-{domain}"));
        tree
    }

    #[test]
    fn stale_generation_is_discarded() {
        let store = WorkspaceStore::new();
        let older = store.next_generation();
        let newer = store.next_generation();

        assert!(matches!(
            store.publish(newer, tree_with("java.lang"), Vec::new()),
            PublishOutcome::Applied { .. }
        ));
        assert_eq!(
            store.publish(older, tree_with("stale"), Vec::new()),
            PublishOutcome::Stale
        );

        let tree = store.tree_snapshot();
        assert!(tree.domain("java.lang").is_some());
        assert!(tree.domain("stale").is_none());
        assert_eq!(store.applied_generation(), newer);
        assert!(store.last_rebuild().is_some());
    }

    #[test]
    fn selection_follows_key_across_rebuilds() {
        let store = WorkspaceStore::new();
        store.publish(store.next_generation(), tree_with("java.lang"), Vec::new());
        let selected = store.tree_snapshot().node_by_key("root-java.lang");
        store.set_selection(selected);

        // Same key at a different arena position.
        let mut rebuilt = MBeanTree::new();
        let a = rebuilt.get_or_create_child(NodeId::ROOT, "hawtio");
        rebuilt.ensure_key(a, || "root-hawtio".into());
        let b = rebuilt.get_or_create_child(NodeId::ROOT, "java.lang");
        rebuilt.ensure_key(b, || "root-java.lang".into());

        let outcome = store.publish(store.next_generation(), rebuilt, Vec::new());
        assert_eq!(outcome, PublishOutcome::Applied { selection_changed: true });
        assert_eq!(store.selection(), Some(b));

        let outcome = store.publish(store.next_generation(), tree_with("hawtio"), Vec::new());
        assert_eq!(outcome, PublishOutcome::Applied { selection_changed: true });
        assert_eq!(store.selection(), None);
    }

    #[test]
    fn modify_tree_is_copy_on_write() {
        let store = WorkspaceStore::new();
        store.publish(store.next_generation(), tree_with("java.lang"), Vec::new());
        let before = store.tree_snapshot();
        let domain = before.domain("java.lang").unwrap();

        let mut parent = None;
        store.modify_tree(|tree| parent = tree.detach(domain));
        assert_eq!(parent, Some(NodeId::ROOT));
        assert!(before.domain("java.lang").is_some());
        assert!(store.tree_snapshot().domain("java.lang").is_none());
    }

    #[test]
    fn processed_commit_requires_unchanged_base() {
        let store = WorkspaceStore::new();
        let processor: PostProcessor = Arc::new(|_: &mut MBeanTree| {});
        store.publish(store.next_generation(), tree_with("java.lang"), Vec::new());

        let base = store.tree_snapshot();
        store.publish(store.next_generation(), tree_with("hawtio"), Vec::new());
        assert_eq!(
            store.commit_processed(&base, &processor, tree_with("stale")),
            ReplayOutcome::Superseded
        );
        assert!(store.tree_snapshot().domain("stale").is_none());
        assert!(!store.has_processed(&processor));

        let base = store.tree_snapshot();
        assert_eq!(
            store.commit_processed(&base, &processor, tree_with("fresh")),
            ReplayOutcome::Applied
        );
        assert!(store.tree_snapshot().domain("fresh").is_some());
        assert!(store.has_processed(&processor));

        let base = store.tree_snapshot();
        assert_eq!(
            store.commit_processed(&base, &processor, tree_with("again")),
            ReplayOutcome::AlreadyApplied
        );

        // A rebuild that did not run the processor forgets it.
        store.publish(store.next_generation(), tree_with("java.lang"), Vec::new());
        assert!(!store.has_processed(&processor));
    }
}
