// ── Selection & permission resolver ──
//
// Read-only queries over one tree snapshot and the active selection.
// Everything degrades to a safe answer: misses are `false` / `None` for
// structural queries and "permitted" for invoke checks.

use std::sync::Arc;

use tracing::debug;

use crate::model::{Folder, MBeanTree, NodeId, ObjectName};

/// Prefix used for persisted view preferences.
pub const VIEW_KEY_PREFIX: &str = "view/";

const CAMEL_DOMAIN: &str = "org.apache.camel";

/// A tree snapshot plus the node selected in it.
#[derive(Debug, Clone)]
pub struct SelectionView {
    tree: Arc<MBeanTree>,
    selection: Option<NodeId>,
}

impl SelectionView {
    pub fn new(tree: Arc<MBeanTree>, selection: Option<NodeId>) -> Self {
        let selection = selection.filter(|&id| tree.get(id).is_some());
        Self { tree, selection }
    }

    pub fn tree(&self) -> &Arc<MBeanTree> {
        &self.tree
    }

    pub fn selection_id(&self) -> Option<NodeId> {
        self.selection
    }

    pub fn selection(&self) -> Option<&Folder> {
        self.selection.and_then(|id| self.tree.get(id))
    }

    pub fn selected_mbean_name(&self) -> Option<&str> {
        self.selection()?.object_name.as_deref()
    }

    /// True when at least one domain is present.
    pub fn has_mbeans(&self) -> bool {
        !self.tree.children(self.tree.root()).is_empty()
    }

    // ── Structural queries ───────────────────────────────────────────

    /// Whether any folder under `domain` carries all `properties`.
    ///
    /// Descends only through folders of the same domain. With no
    /// properties, the domain folder existing is enough.
    pub fn tree_contains_domain_and_properties(
        &self,
        domain: &str,
        properties: &[(&str, &str)],
    ) -> bool {
        let Some(domain_folder) = self.tree.domain(domain) else {
            return false;
        };
        if properties.is_empty() {
            return true;
        }
        let mut stack: Vec<NodeId> = self.tree.children(domain_folder).to_vec();
        while let Some(id) = stack.pop() {
            let Some(folder) = self.tree.get(id) else {
                continue;
            };
            if entries_match(folder, properties) {
                return true;
            }
            if folder.domain.as_deref() == Some(domain) {
                stack.extend(folder.children().iter().copied());
            }
        }
        false
    }

    /// Whether the selection is in `domain` and matches `properties`
    /// (and, when given, has exactly `count` entries).
    pub fn has_domain_and_properties(
        &self,
        domain: &str,
        properties: &[(&str, &str)],
        count: Option<usize>,
    ) -> bool {
        self.selection().is_some_and(|node| {
            matches(node, properties, count) && node.domain.as_deref() == Some(domain)
        })
    }

    /// First folder under `domain` matching `properties` / `count`.
    pub fn find_mbean_with_properties(
        &self,
        domain: &str,
        properties: &[(&str, &str)],
        count: Option<usize>,
    ) -> Option<NodeId> {
        let domain_folder = self.tree.domain(domain)?;
        self.find_child_mbean_with_properties(domain_folder, properties, count)
    }

    /// Search below `folder`: each level's children are checked before
    /// descending into them in order; the first match wins.
    pub fn find_child_mbean_with_properties(
        &self,
        folder: NodeId,
        properties: &[(&str, &str)],
        count: Option<usize>,
    ) -> Option<NodeId> {
        let children = self.tree.children(folder);
        children
            .iter()
            .copied()
            .find(|&c| self.tree.get(c).is_some_and(|f| matches(f, properties, count)))
            .or_else(|| {
                children
                    .iter()
                    .find_map(|&c| self.find_child_mbean_with_properties(c, properties, count))
            })
    }

    pub fn selection_has_domain(&self, domain: &str) -> bool {
        self.selection()
            .is_some_and(|node| node.domain.as_deref() == Some(domain))
    }

    pub fn selection_has_domain_and_type(&self, domain: &str, type_name: &str) -> bool {
        self.selection().is_some_and(|node| {
            node.domain.as_deref() == Some(domain) && node.type_name.as_deref() == Some(type_name)
        })
    }

    /// Whether the selection is a pure grouping folder in `domain` whose
    /// last path segment (or display text) is `last_name`, ignoring case.
    pub fn selection_has_domain_and_last_folder_name(
        &self,
        domain: &str,
        last_name: &str,
    ) -> bool {
        let Some(node) = self.selection() else {
            return false;
        };
        if node.domain.as_deref() != Some(domain) {
            return false;
        }
        let is_name = |name: &str| name.to_lowercase() == last_name.to_lowercase();
        (is_name(node.last_folder_name().unwrap_or_default()) || is_name(&node.text))
            && node.is_folder()
            && node.object_name.is_none()
    }

    // ── Permissions ──────────────────────────────────────────────────

    /// Invoke rights for `methods` on `node`; permitted when the node or
    /// its descriptor is missing.
    pub fn has_invoke_rights(&self, node: Option<NodeId>, methods: &[&str]) -> bool {
        node.and_then(|id| self.tree.get(id))
            .and_then(|folder| folder.mbean.as_ref())
            .is_none_or(|mbean| mbean.has_invoke_rights(methods))
    }

    pub fn selection_has_invoke_rights(&self, methods: &[&str]) -> bool {
        self.has_invoke_rights(self.selection, methods)
    }

    /// Invoke rights by object name. Any miss resolves to permitted.
    pub fn has_invoke_rights_for_name(&self, object_name: &str, methods: &[&str]) -> bool {
        if object_name.is_empty() {
            return true;
        }
        let name = ObjectName::parse(object_name);
        match self.find_mbean_with_properties(&name.domain, &name.property_pairs(), None) {
            Some(folder) => self.has_invoke_rights(Some(folder), methods),
            None => {
                debug!(object_name, "no folder for mbean, permitting");
                true
            }
        }
    }

    // ── Preference keys ──────────────────────────────────────────────

    /// `prefix + domain + "/" + (type_name | text)`, plus `"/folder"` for
    /// nodes with children.
    pub fn selection_config_key(&self, prefix: &str) -> Option<String> {
        let node = self.selection()?;
        let kind = node.type_name.as_deref().unwrap_or(&node.text);
        let mut key = format!("{prefix}{}/{kind}", node.domain.as_deref().unwrap_or_default());
        if node.is_folder() {
            key.push_str("/folder");
        }
        Some(key)
    }

    pub fn selection_view_config_key(&self) -> Option<String> {
        self.selection_config_key(VIEW_KEY_PREFIX)
    }

    // ── Well-known folders ───────────────────────────────────────────

    pub fn is_camel_context(&self) -> bool {
        self.has_domain_and_properties(CAMEL_DOMAIN, &[("type", "context")], None)
    }

    pub fn is_camel_folder(&self) -> bool {
        self.has_domain_and_properties(CAMEL_DOMAIN, &[], None)
    }

    pub fn is_endpoints_folder(&self) -> bool {
        self.selection_has_domain_and_last_folder_name(CAMEL_DOMAIN, "endpoints")
    }

    pub fn is_endpoint(&self) -> bool {
        self.has_domain_and_properties(CAMEL_DOMAIN, &[("type", "endpoints")], None)
    }

    pub fn is_routes_folder(&self) -> bool {
        self.selection_has_domain_and_last_folder_name(CAMEL_DOMAIN, "routes")
    }

    pub fn is_route(&self) -> bool {
        self.has_domain_and_properties(CAMEL_DOMAIN, &[("type", "routes")], None)
    }

    pub fn is_components_folder(&self) -> bool {
        self.selection_has_domain_and_last_folder_name(CAMEL_DOMAIN, "components")
    }

    pub fn is_component(&self) -> bool {
        self.has_domain_and_properties(CAMEL_DOMAIN, &[("type", "components")], None)
    }

    pub fn is_dataformats_folder(&self) -> bool {
        self.selection_has_domain_and_last_folder_name(CAMEL_DOMAIN, "dataformats")
    }

    pub fn is_dataformat(&self) -> bool {
        self.has_domain_and_properties(CAMEL_DOMAIN, &[("type", "dataformats")], None)
    }

    pub fn is_osgi_folder(&self) -> bool {
        self.has_domain_and_properties("osgi.core", &[], None)
    }

    pub fn is_osgi_compendium_folder(&self) -> bool {
        self.has_domain_and_properties("osgi.compendium", &[], None)
    }

    pub fn is_karaf_folder(&self) -> bool {
        self.has_domain_and_properties("org.apache.karaf", &[], None)
    }
}

/// Every property present in `entries` with the same, non-empty value.
fn entries_match(folder: &Folder, properties: &[(&str, &str)]) -> bool {
    properties
        .iter()
        .all(|(key, value)| !value.is_empty() && folder.entry(key) == Some(*value))
}

/// Property match plus an optional exact entry count. A count of zero
/// means no count constraint.
fn matches(folder: &Folder, properties: &[(&str, &str)], count: Option<usize>) -> bool {
    if !properties.is_empty() && !entries_match(folder, properties) {
        return false;
    }
    match count.filter(|&c| c > 0) {
        Some(count) => folder.entries.len() == count,
        None => true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::gateway::Domains;
    use crate::model::{MBean, Operation, OperationEntry, OperationPermission};
    use crate::tree::{LazyLoaders, TreeBuilder};

    fn route_mbean() -> MBean {
        let mut operations = IndexMap::new();
        operations.insert(
            "stop".to_string(),
            OperationEntry::Single(Operation {
                can_invoke: Some(false),
                ..Operation::default()
            }),
        );
        let mut by_signature = IndexMap::new();
        by_signature.insert(
            "stop()".to_string(),
            OperationPermission {
                can_invoke: Some(false),
            },
        );
        MBean {
            can_invoke: Some(true),
            operations: Some(operations),
            operations_by_signature: Some(by_signature),
            ..MBean::default()
        }
    }

    fn sample_tree() -> Arc<MBeanTree> {
        let mut domains = Domains::new();
        let camel = domains.entry("org.apache.camel".into()).or_default();
        camel.insert(
            "context=foo,type=context,name=\"foo\"".into(),
            MBean::default(),
        );
        camel.insert("context=foo,type=routes,name=\"r1\"".into(), route_mbean());
        let java = domains.entry("java.lang".into()).or_default();
        java.insert("type=Memory".into(), MBean::default());
        java.insert(
            "type=GarbageCollector,name=PS Scavenge".into(),
            MBean::default(),
        );
        let hawtio = domains.entry("hawtio".into()).or_default();
        hawtio.insert("type=Registry".into(), MBean::default());
        Arc::new(TreeBuilder::new(&LazyLoaders::new()).build(&domains))
    }

    fn view_at(key: &str) -> SelectionView {
        let tree = sample_tree();
        let id = tree.node_by_key(key);
        assert!(id.is_some(), "no node with key {key}");
        SelectionView::new(tree, id)
    }

    #[test]
    fn operation_override_denies_named_operation() {
        let view = view_at("root-org.apache.camel-foo-routes-\"r1\"");
        assert!(!view.selection_has_invoke_rights(&["stop"]));
        assert!(view.selection_has_invoke_rights(&[]));
        assert!(!view.selection_has_invoke_rights(&["stop()"]));
    }

    #[test]
    fn invoke_rights_by_object_name() {
        let view = SelectionView::new(sample_tree(), None);
        assert!(!view.has_invoke_rights_for_name(
            "org.apache.camel:context=foo,type=routes,name=\"r1\"",
            &["stop"]
        ));
        assert!(view.has_invoke_rights_for_name("org.apache.camel:type=missing", &["stop"]));
        assert!(view.has_invoke_rights_for_name("", &["stop"]));
        assert!(view.has_invoke_rights(None, &["stop"]));
    }

    #[test]
    fn find_with_property_count() {
        let view = SelectionView::new(sample_tree(), None);
        let memory = view.find_mbean_with_properties("java.lang", &[("type", "Memory")], Some(1));
        assert!(memory.is_some());
        assert!(
            view.find_mbean_with_properties("java.lang", &[("type", "Memory")], Some(2))
                .is_none()
        );
        assert_eq!(
            view.find_mbean_with_properties("java.lang", &[("type", "Memory")], Some(0)),
            memory
        );
        let scavenge = view
            .find_mbean_with_properties("java.lang", &[("name", "PS Scavenge")], None)
            .unwrap();
        assert_eq!(view.tree().get(scavenge).unwrap().text, "PS Scavenge");
    }

    #[test]
    fn tree_contains_indicator() {
        let view = SelectionView::new(sample_tree(), None);
        assert!(view.has_mbeans());
        assert!(view.tree_contains_domain_and_properties("hawtio", &[("type", "Registry")]));
        assert!(!view.tree_contains_domain_and_properties("hawtio", &[("type", "TreeWatcher")]));
        assert!(view.tree_contains_domain_and_properties("hawtio", &[]));
        assert!(!view.tree_contains_domain_and_properties("missing", &[]));
        assert!(view.tree_contains_domain_and_properties(
            "org.apache.camel",
            &[("type", "routes"), ("context", "foo")]
        ));
    }

    #[test]
    fn camel_folder_predicates() {
        let routes = view_at("root-org.apache.camel-foo-routes");
        assert!(routes.is_routes_folder());
        assert!(routes.is_camel_folder());
        assert!(!routes.is_route());
        assert!(!routes.is_endpoints_folder());

        let route = view_at("root-org.apache.camel-foo-routes-\"r1\"");
        assert!(route.is_route());
        assert!(!route.is_routes_folder());
        assert!(route.selection_has_domain_and_type("org.apache.camel", "routes"));
        assert_eq!(
            route.selected_mbean_name(),
            Some("org.apache.camel:context=foo,type=routes,name=\"r1\"")
        );

        let context = view_at("root-org.apache.camel-foo-context-\"foo\"");
        assert!(context.is_camel_context());
        assert!(!context.is_osgi_folder());
    }

    #[test]
    fn config_keys_for_leaves_and_folders() {
        let memory = view_at("root-java.lang-Memory");
        assert_eq!(
            memory.selection_view_config_key().as_deref(),
            Some("view/java.lang/Memory")
        );

        let group = view_at("root-java.lang-GarbageCollector");
        assert_eq!(
            group.selection_config_key("").as_deref(),
            Some("java.lang/GarbageCollector/folder")
        );

        let none = SelectionView::new(sample_tree(), None);
        assert_eq!(none.selection_view_config_key(), None);
        assert!(!none.selection_has_domain("java.lang"));
    }

    #[test]
    fn empty_tree_has_no_mbeans() {
        let view = SelectionView::new(Arc::new(MBeanTree::new()), Some(NodeId(42)));
        assert!(!view.has_mbeans());
        assert_eq!(view.selection_id(), None);
    }
}
