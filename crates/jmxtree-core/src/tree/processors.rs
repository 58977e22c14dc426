// ── Post-processor registry ──
//
// Ordered, named callbacks run against every freshly built tree before it
// is published. Processors mutate the tree in place for side effects only.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::model::MBeanTree;

pub type PostProcessor = Arc<dyn Fn(&mut MBeanTree) + Send + Sync>;

#[derive(Clone, Default)]
pub struct PostProcessors {
    processors: IndexMap<String, PostProcessor>,
}

impl fmt::Debug for PostProcessors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostProcessors")
            .field("names", &self.processors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PostProcessors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name an unnamed registration would receive: `len + 1`.
    ///
    /// Not stable under removals; a later registration may reuse the name
    /// of a surviving processor and replace it.
    pub fn next_name(&self) -> String {
        (self.processors.len() + 1).to_string()
    }

    /// Register under `name`, replacing any processor already using it.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        processor: impl Fn(&mut MBeanTree) + Send + Sync + 'static,
    ) -> String {
        let name = name.into();
        if self
            .processors
            .insert(name.clone(), Arc::new(processor))
            .is_some()
        {
            debug!(processor = %name, "replaced tree post-processor");
        }
        name
    }

    /// Register under the next auto-assigned name.
    pub fn push(&mut self, processor: impl Fn(&mut MBeanTree) + Send + Sync + 'static) -> String {
        let name = self.next_name();
        self.insert(name, processor)
    }

    pub fn get(&self, name: &str) -> Option<PostProcessor> {
        self.processors.get(name).cloned()
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.processors.shift_remove(name).is_some()
    }

    /// Every registered processor, in registration order.
    pub fn handles(&self) -> Vec<PostProcessor> {
        self.processors.values().cloned().collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.processors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Run every processor once, in registration order.
    pub fn run_all(&self, tree: &mut MBeanTree) {
        for (name, processor) in &self.processors {
            debug!(processor = %name, "running tree post-processor");
            processor(tree);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::model::NodeId;

    #[test]
    fn unnamed_registrations_count_up() {
        let mut processors = PostProcessors::new();
        assert_eq!(processors.push(|_| {}), "1");
        assert_eq!(processors.push(|_| {}), "2");
        assert_eq!(processors.insert("camel", |_| {}), "camel");
        assert_eq!(processors.next_name(), "4");
    }

    #[test]
    fn auto_names_collide_after_removal() {
        let mut processors = PostProcessors::new();
        processors.push(|_| {});
        processors.push(|_| {});
        assert!(processors.remove("1"));
        // len is 1 again, so the next unnamed processor replaces "2".
        assert_eq!(processors.push(|_| {}), "2");
        assert_eq!(processors.len(), 1);
    }

    #[test]
    fn run_all_preserves_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut processors = PostProcessors::new();
        for label in ["b", "a", "c"] {
            let seen = Arc::clone(&seen);
            processors.insert(
                label,
                move |tree: &mut MBeanTree| {
                    if let Some(root) = tree.get_mut(NodeId::ROOT) {
                        root.add_class(label);
                    }
                    seen.lock().unwrap().push(label);
                },
            );
        }

        let mut tree = MBeanTree::new();
        processors.run_all(&mut tree);

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec!["b", "a", "c"]);
        assert_eq!(tree.get(NodeId::ROOT).map(|r| r.class_names.len()), Some(3));
    }
}
