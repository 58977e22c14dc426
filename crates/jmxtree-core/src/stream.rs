// ── Reactive tree stream ──
//
// Subscription type for consuming tree rebuilds from the WorkspaceStore.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::MBeanTree;

/// A subscription to the published tree.
///
/// Provides both point-in-time snapshot access and change notification
/// via [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct TreeStream {
    current: Arc<MBeanTree>,
    receiver: watch::Receiver<Arc<MBeanTree>>,
}

impl TreeStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<MBeanTree>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot captured at creation (or at the last `changed()`).
    pub fn current(&self) -> &Arc<MBeanTree> {
        &self.current
    }

    /// Latest published tree.
    pub fn latest(&self) -> Arc<MBeanTree> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next rebuild or node removal.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<MBeanTree>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> TreeWatchStream {
        TreeWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding each published tree, starting with the
/// current one.
pub struct TreeWatchStream {
    inner: WatchStream<Arc<MBeanTree>>,
}

impl Stream for TreeWatchStream {
    type Item = Arc<MBeanTree>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_stream::StreamExt;

    use crate::model::NodeId;
    use crate::store::WorkspaceStore;

    #[tokio::test]
    async fn stream_yields_current_then_each_change() {
        let store = WorkspaceStore::new();
        let mut trees = store.subscribe_tree().into_stream();

        let first = trees.next().await.unwrap();
        assert!(first.is_empty());

        store.modify_tree(|tree| {
            tree.get_or_create_child(NodeId::ROOT, "java.lang");
        });
        let next = trees.next().await.unwrap();
        assert_eq!(next.children(NodeId::ROOT).len(), 1);
    }
}
