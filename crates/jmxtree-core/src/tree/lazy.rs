// ── Lazy-load providers ──
//
// Named predicates answering "will something populate this leaf on
// demand?". Only consulted to decide a childless leaf's `lazy_load` flag.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::Folder;

pub type LazyLoader = Arc<dyn Fn(&Folder) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct LazyLoaders {
    loaders: IndexMap<String, LazyLoader>,
}

impl fmt::Debug for LazyLoaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyLoaders")
            .field("names", &self.loaders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl LazyLoaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a provider under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        loader: impl Fn(&Folder) -> bool + Send + Sync + 'static,
    ) {
        self.loaders.insert(name.into(), Arc::new(loader));
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.loaders.shift_remove(name).is_some()
    }

    /// Name of the first provider claiming `folder`.
    pub fn find(&self, folder: &Folder) -> Option<&str> {
        self.loaders
            .iter()
            .find(|(_, loader)| loader(folder))
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_provider_wins() {
        let mut loaders = LazyLoaders::new();
        loaders.register("never", |_| false);
        loaders.register("osgi", |f: &Folder| {
            f.domain.as_deref() == Some("osgi.core")
        });
        loaders.register("any", |_| true);

        let mut folder = Folder::new("bundles");
        folder.domain = Some("osgi.core".into());
        assert_eq!(loaders.find(&folder), Some("osgi"));

        assert!(loaders.remove("osgi"));
        assert_eq!(loaders.find(&folder), Some("any"));
    }
}
