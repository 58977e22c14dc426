// ── Domain-scoped lookup indices ──
//
// `value → domain → folder(s)`, used for the `type` and `service`
// properties. Rebuilt from scratch on every tree build; a detached
// folder is dropped in place.

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::NodeId;

/// One folder, or every folder sharing the value within a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum IndexEntry {
    Single(NodeId),
    Many(Vec<NodeId>),
}

impl IndexEntry {
    pub fn nodes(&self) -> &[NodeId] {
        match self {
            Self::Single(id) => std::slice::from_ref(id),
            Self::Many(ids) => ids,
        }
    }

    /// Promote to `Many` on the first collision, then append.
    fn push(&mut self, id: NodeId) {
        match self {
            Self::Single(existing) => *self = Self::Many(vec![*existing, id]),
            Self::Many(ids) => ids.push(id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainIndex {
    entries: IndexMap<String, IndexMap<String, IndexEntry>>,
}

impl DomainIndex {
    pub fn insert(&mut self, value: &str, domain: &str, id: NodeId) {
        let by_domain = self.entries.entry(value.to_string()).or_default();
        match by_domain.get_mut(domain) {
            Some(entry) => entry.push(id),
            None => {
                by_domain.insert(domain.to_string(), IndexEntry::Single(id));
            }
        }
    }

    pub fn get(&self, value: &str, domain: &str) -> Option<&IndexEntry> {
        self.entries.get(value)?.get(domain)
    }

    /// Every domain that has at least one folder for `value`.
    pub fn domains(&self, value: &str) -> Option<&IndexMap<String, IndexEntry>> {
        self.entries.get(value)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget a detached folder.
    pub(crate) fn remove_node(&mut self, id: NodeId) {
        for by_domain in self.entries.values_mut() {
            by_domain.retain(|_, entry| match entry {
                IndexEntry::Single(existing) => *existing != id,
                IndexEntry::Many(ids) => {
                    ids.retain(|&n| n != id);
                    !ids.is_empty()
                }
            });
        }
        self.entries.retain(|_, by_domain| !by_domain.is_empty());
    }
}
