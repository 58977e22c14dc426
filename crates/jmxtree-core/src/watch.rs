// ── Change-detection counters ──
//
// Two optional agent features expose a counter attribute that bumps
// whenever something changes remotely. The first value seen is the
// baseline; every later value that differs is one actionable change.

use std::fmt;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Which feature a counter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatcherKind {
    /// Plugin registry: a change means the whole session should restart.
    PluginRegistry,
    /// Tree watcher: a change means the MBean tree should be refetched.
    TreeWatcher,
}

impl WatcherKind {
    pub fn action(self) -> CounterAction {
        match self {
            Self::PluginRegistry => CounterAction::Reload,
            Self::TreeWatcher => CounterAction::Refetch,
        }
    }
}

impl fmt::Display for WatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PluginRegistry => f.write_str("plugin-registry"),
            Self::TreeWatcher => f.write_str("tree-watcher"),
        }
    }
}

/// What a counter change asks the workspace to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterAction {
    Reload,
    Refetch,
}

/// Feature-indicator MBean plus the counter attribute to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub domain: String,
    pub properties: Vec<(String, String)>,
    pub attribute: String,
}

impl WatchTarget {
    pub fn new(
        domain: impl Into<String>,
        properties: &[(&str, &str)],
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            properties: properties
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            attribute: attribute.into(),
        }
    }

    /// `hawtio:type=Registry` / `UpdateCounter`
    pub fn plugin_registry() -> Self {
        Self::new("hawtio", &[("type", "Registry")], "UpdateCounter")
    }

    /// `hawtio:type=TreeWatcher` / `Counter`
    pub fn tree_watcher() -> Self {
        Self::new("hawtio", &[("type", "TreeWatcher")], "Counter")
    }

    /// Full object name, e.g. `hawtio:type=Registry`.
    pub fn mbean(&self) -> String {
        let props: Vec<String> = self
            .properties
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("{}:{}", self.domain, props.join(","))
    }

    pub fn property_pairs(&self) -> Vec<(&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Last observed counter value. Values are opaque; only inequality matters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchedCounter {
    last: Option<Value>,
}

impl WatchedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value. Returns `true` when it differs from a previously
    /// recorded one; the first value only sets the baseline.
    pub fn observe(&mut self, value: Value) -> bool {
        match self.last.replace(value) {
            None => false,
            Some(previous) => self.last.as_ref() != Some(&previous),
        }
    }

    pub fn last(&self) -> Option<&Value> {
        self.last.as_ref()
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// A running counter poll. Dropping it stops delivery.
#[derive(Debug)]
pub(crate) struct CounterSubscription {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl CounterSubscription {
    pub(crate) fn new(cancel: CancellationToken, handle: JoinHandle<()>) -> Self {
        Self { cancel, handle }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CounterSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn first_value_is_baseline_then_changes_count_once() {
        let mut counter = WatchedCounter::new();
        assert!(!counter.observe(json!(5)));
        assert!(counter.observe(json!(6)));
        assert!(!counter.observe(json!(6)));
        assert_eq!(counter.last(), Some(&json!(6)));
    }

    #[test]
    fn reset_clears_baseline() {
        let mut counter = WatchedCounter::new();
        counter.observe(json!(1));
        counter.reset();
        assert!(!counter.observe(json!(2)));
    }

    #[test]
    fn values_are_opaque() {
        let mut counter = WatchedCounter::new();
        counter.observe(json!("a"));
        assert!(counter.observe(json!({ "n": 1 })));
    }

    #[test]
    fn well_known_targets() {
        assert_eq!(
            WatchTarget::plugin_registry().mbean(),
            "hawtio:type=Registry"
        );
        assert_eq!(
            WatchTarget::tree_watcher().mbean(),
            "hawtio:type=TreeWatcher"
        );
        assert_eq!(WatchTarget::tree_watcher().attribute, "Counter");
        assert_eq!(WatcherKind::TreeWatcher.action(), CounterAction::Refetch);
    }
}
