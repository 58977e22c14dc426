// ── MBean tree arena ──
//
// Folders live in a flat arena addressed by `NodeId`; children are owned
// through the parent's child list and the parent link is a plain index.
// Detached subtrees leave empty slots behind so outstanding ids never
// alias a different node.

use std::collections::HashMap;

use serde::Serialize;

use super::folder::{Folder, NodeId};
use crate::tree::DomainIndex;

/// Key of the root folder.
pub const ROOT_KEY: &str = "root";
/// Display text of the root folder.
pub const ROOT_TEXT: &str = "MBeans";
/// Joins `folder_names` into node keys.
pub const KEY_SEPARATOR: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MBeanTree {
    nodes: Vec<Option<Folder>>,
    #[serde(skip)]
    key_to_node: HashMap<String, NodeId>,
    types_to_domain: DomainIndex,
    services_to_domain: DomainIndex,
}

impl Default for MBeanTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MBeanTree {
    pub fn new() -> Self {
        let mut root = Folder::new(ROOT_TEXT);
        root.key = Some(ROOT_KEY.to_string());
        let mut key_to_node = HashMap::new();
        key_to_node.insert(ROOT_KEY.to_string(), NodeId::ROOT);
        Self {
            nodes: vec![Some(root)],
            key_to_node,
            types_to_domain: DomainIndex::default(),
            services_to_domain: DomainIndex::default(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn get(&self, id: NodeId) -> Option<&Folder> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Folder> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Number of live folders, root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.children(NodeId::ROOT).is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], Folder::children)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Folder::parent)
    }

    pub fn node_by_key(&self, key: &str) -> Option<NodeId> {
        self.key_to_node.get(key).copied()
    }

    pub fn types_to_domain(&self) -> &DomainIndex {
        &self.types_to_domain
    }

    pub fn services_to_domain(&self) -> &DomainIndex {
        &self.services_to_domain
    }

    pub(crate) fn indices_mut(&mut self) -> (&mut DomainIndex, &mut DomainIndex) {
        (&mut self.types_to_domain, &mut self.services_to_domain)
    }

    /// Top-level folder for a domain.
    pub fn domain(&self, domain: &str) -> Option<NodeId> {
        self.child_named(NodeId::ROOT, domain)
    }

    /// Direct child created under `name`.
    pub fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.get(c).is_some_and(|f| f.name == name))
    }

    /// Existing child named `name`, or a fresh one appended to `parent`.
    pub fn get_or_create_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(existing) = self.child_named(parent, name) {
            return existing;
        }
        let id = NodeId(self.nodes.len());
        let mut folder = Folder::new(name);
        folder.parent = Some(parent);
        self.nodes.push(Some(folder));
        if let Some(p) = self.get_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// Assign a key unless the folder already has one; indexes it either way.
    pub(crate) fn ensure_key(&mut self, id: NodeId, key: impl FnOnce() -> String) {
        let Some(folder) = self.get_mut(id) else {
            return;
        };
        let key = folder.key.get_or_insert_with(key).clone();
        self.key_to_node.insert(key, id);
    }

    /// True when a strict ancestor carries `key = value` in its entries.
    pub fn ancestor_has_entry(&self, id: NodeId, key: &str, value: &str) -> bool {
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if self
                .get(ancestor)
                .is_some_and(|f| f.entry(key) == Some(value))
            {
                return true;
            }
            current = self.parent(ancestor);
        }
        false
    }

    /// Ancestors from the direct parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            out.push(ancestor);
            current = self.parent(ancestor);
        }
        out
    }

    /// Pre-order walk of `start` and everything beneath it.
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if self.get(id).is_none() {
                continue;
            }
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// First node in pre-order (starting with `start` itself) matching `pred`.
    pub fn find_descendant(
        &self,
        start: NodeId,
        mut pred: impl FnMut(&Folder) -> bool,
    ) -> Option<NodeId> {
        self.descendants(start)
            .into_iter()
            .find(|&id| self.get(id).is_some_and(&mut pred))
    }

    /// Sort every folder's children by display text.
    pub fn sort_children(&mut self) {
        for id in self.descendants(NodeId::ROOT) {
            let mut children = self.children(id).to_vec();
            children.sort_by(|a, b| {
                let ta = self.get(*a).map(|f| f.text.as_str());
                let tb = self.get(*b).map(|f| f.text.as_str());
                ta.cmp(&tb)
            });
            if let Some(folder) = self.get_mut(id) {
                folder.children = children;
            }
        }
    }

    /// Detach a node (and its subtree) from its parent.
    ///
    /// The child is located by identity first, then by key. Returns the
    /// parent, which is reported even when the child was no longer listed.
    pub fn detach(&mut self, id: NodeId) -> Option<NodeId> {
        let folder = self.get(id)?;
        let parent = folder.parent?;
        let key = folder.key.clone();

        let position = self
            .children(parent)
            .iter()
            .position(|&c| c == id)
            .or_else(|| {
                let key = key.as_deref()?;
                self.children(parent)
                    .iter()
                    .position(|&c| self.get(c).is_some_and(|f| f.key.as_deref() == Some(key)))
            });

        let Some(position) = position else {
            return Some(parent);
        };
        let removed = match self.get_mut(parent) {
            Some(p) => p.children.remove(position),
            None => return Some(parent),
        };

        for gone in self.descendants(removed) {
            let key = self
                .nodes
                .get_mut(gone.0)
                .and_then(Option::take)
                .and_then(|folder| folder.key);
            if let Some(key) = key.filter(|k| self.key_to_node.get(k) == Some(&gone)) {
                self.key_to_node.remove(&key);
            }
            self.types_to_domain.remove_node(gone);
            self.services_to_domain.remove_node(gone);
        }
        Some(parent)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> (MBeanTree, NodeId, NodeId, NodeId) {
        let mut tree = MBeanTree::new();
        let domain = tree.get_or_create_child(NodeId::ROOT, "java.lang");
        tree.ensure_key(domain, || "root-java.lang".into());
        let memory = tree.get_or_create_child(domain, "Memory");
        tree.ensure_key(memory, || "root-java.lang-Memory".into());
        let gc = tree.get_or_create_child(domain, "GarbageCollector");
        tree.ensure_key(gc, || "root-java.lang-GarbageCollector".into());
        (tree, domain, memory, gc)
    }

    #[test]
    fn root_has_sentinel_key() {
        let tree = MBeanTree::new();
        assert_eq!(tree.get(tree.root()).unwrap().key(), ROOT_KEY);
        assert_eq!(tree.get(tree.root()).unwrap().text, ROOT_TEXT);
        assert!(tree.is_empty());
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let (mut tree, domain, memory, _) = sample();
        assert_eq!(tree.get_or_create_child(domain, "Memory"), memory);
        assert_eq!(tree.children(domain).len(), 2);
    }

    #[test]
    fn key_is_assigned_once() {
        let (mut tree, _, memory, _) = sample();
        tree.ensure_key(memory, || "other".into());
        assert_eq!(tree.get(memory).unwrap().key(), "root-java.lang-Memory");
        assert_eq!(tree.node_by_key("root-java.lang-Memory"), Some(memory));
    }

    #[test]
    fn sort_orders_children_by_text() {
        let (mut tree, domain, memory, gc) = sample();
        tree.sort_children();
        assert_eq!(tree.children(domain), &[gc, memory]);
    }

    #[test]
    fn detach_removes_subtree_and_keys() {
        let (mut tree, domain, memory, gc) = sample();
        assert_eq!(tree.detach(memory), Some(domain));
        assert_eq!(tree.children(domain), &[gc]);
        assert!(tree.get(memory).is_none());
        assert_eq!(tree.node_by_key("root-java.lang-Memory"), None);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn detach_root_is_a_no_op() {
        let (mut tree, ..) = sample();
        assert_eq!(tree.detach(NodeId::ROOT), None);
    }

    #[test]
    fn find_descendant_includes_start() {
        let (tree, domain, memory, _) = sample();
        assert_eq!(
            tree.find_descendant(domain, |f| f.name == "java.lang"),
            Some(domain)
        );
        assert_eq!(
            tree.find_descendant(domain, |f| f.name == "Memory"),
            Some(memory)
        );
        assert_eq!(
            tree.find_descendant(domain, |f| f.name == "Threading"),
            None
        );
    }
}
