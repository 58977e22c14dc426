// ── Tree builder ──
//
// Turns the gateway's flat `domain → identifier → descriptor` listing into
// a folder hierarchy. Each identifier's property values become a path;
// the last value names the leaf, the rest are grouping folders created on
// demand. Type/service indices and category tags are filled in the same
// pass. Nothing in here can fail: unusable identifiers are skipped.

use tracing::{debug, warn};

use super::lazy::LazyLoaders;
use crate::gateway::Domains;
use crate::model::{
    KEY_SEPARATOR, MBean, MBeanTree, NodeId, PropertyList, ROOT_KEY, escape_tags, trim_quotes,
};

/// Icon for childless leaves no lazy loader claims.
pub const DEFAULT_LEAF_ICON: &str = "fa fa-cube";

pub struct TreeBuilder<'a> {
    lazy_loaders: &'a LazyLoaders,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(lazy_loaders: &'a LazyLoaders) -> Self {
        Self { lazy_loaders }
    }

    /// Build a fresh tree, indices included.
    pub fn build(&self, domains: &Domains) -> MBeanTree {
        let mut tree = MBeanTree::new();
        for (domain_name, mbeans) in domains {
            let domain_name = escape_tags(domain_name);
            debug!(domain = %domain_name, mbeans = mbeans.len(), "building domain folder");
            let domain_folder = tree.get_or_create_child(NodeId::ROOT, &domain_name);
            init_folder(
                &mut tree,
                domain_folder,
                &domain_name,
                vec![domain_name.clone()],
            );

            let domain_class = domain_name.replace('.', KEY_SEPARATOR);
            for (identifier, mbean) in mbeans {
                populate_mbean(
                    &mut tree,
                    domain_folder,
                    &domain_name,
                    &domain_class,
                    identifier,
                    mbean,
                );
            }
        }

        tree.sort_children();
        self.mark_lazy_leaves(&mut tree);
        tree
    }

    fn mark_lazy_leaves(&self, tree: &mut MBeanTree) {
        for id in tree.descendants(NodeId::ROOT) {
            let Some(folder) = tree.get(id) else { continue };
            if folder.is_folder() {
                continue;
            }
            let lazy = self.lazy_loaders.find(folder).is_some();
            if let Some(folder) = tree.get_mut(id) {
                if lazy {
                    folder.lazy_load = true;
                } else {
                    folder.icon = Some(DEFAULT_LEAF_ICON.to_string());
                }
            }
        }
    }
}

/// Domain, `folder_names` and (once) the key.
fn init_folder(tree: &mut MBeanTree, id: NodeId, domain: &str, folder_names: Vec<String>) {
    tree.ensure_key(id, || {
        format!("{ROOT_KEY}{KEY_SEPARATOR}{}", folder_names.join(KEY_SEPARATOR))
    });
    if let Some(folder) = tree.get_mut(id) {
        folder.domain = Some(domain.to_string());
        folder.folder_names = folder_names;
        debug!(domain, key = folder.key(), "configured folder");
    }
}

/// Path segments for an identifier: values in declaration order, with the
/// first `type` value that already names a domain child moved to the front.
fn mbean_path(tree: &MBeanTree, domain_folder: NodeId, props: &PropertyList) -> Vec<String> {
    let mut path = props.values();
    let promoted = props.iter().position(|p| {
        p.key.eq_ignore_ascii_case("type")
            && tree.child_named(domain_folder, &p.value).is_some()
    });
    if let Some(pos) = promoted {
        let value = path.remove(pos);
        path.insert(0, value);
    }
    path
}

fn populate_mbean(
    tree: &mut MBeanTree,
    domain_folder: NodeId,
    domain_name: &str,
    domain_class: &str,
    identifier: &str,
    mbean: &MBean,
) {
    debug!(domain = domain_name, mbean = identifier, "adding mbean");
    let props = PropertyList::parse(identifier);
    let mut path = mbean_path(tree, domain_folder, &props);
    let Some(leaf_name) = path.pop() else {
        warn!(domain = domain_name, mbean = identifier, "empty mbean identifier, skipping");
        return;
    };

    let mut folder = domain_folder;
    let mut folder_names = tree
        .get(domain_folder)
        .map(|f| f.folder_names.clone())
        .unwrap_or_default();

    for segment in &path {
        folder = tree.get_or_create_child(folder, segment);
        folder_names.push(segment.clone());
        configure_folder(
            tree,
            folder,
            domain_name,
            domain_class,
            &folder_names,
            segment,
        );
    }

    let leaf = tree.get_or_create_child(folder, &leaf_name);
    if let Some(f) = tree.get_mut(leaf) {
        f.entries = props.to_entries();
    }
    folder_names.push(leaf_name.clone());
    configure_folder(
        tree,
        leaf,
        domain_name,
        domain_class,
        &folder_names,
        &leaf_name,
    );

    let type_name = props.type_name().map(str::to_string);
    let service_name = props.service_name().map(str::to_string);
    if let Some(f) = tree.get_mut(leaf) {
        f.text = trim_quotes(&leaf_name).to_string();
        f.object_name = Some(format!("{domain_name}:{identifier}"));
        f.mbean = Some(mbean.clone());
        f.type_name.clone_from(&type_name);
    }

    let (types, services) = tree.indices_mut();
    if let Some(service) = service_name {
        services.insert(&service, domain_name, leaf);
    }
    if let Some(type_name) = type_name {
        types.insert(&type_name, domain_name, leaf);
    }
}

/// Initialize a touched folder and recompute its category tags.
fn configure_folder(
    tree: &mut MBeanTree,
    id: NodeId,
    domain_name: &str,
    domain_class: &str,
    folder_names: &[String],
    path: &str,
) {
    init_folder(tree, id, domain_name, folder_names.to_vec());
    let Some(folder) = tree.get(id) else { return };

    let type_entries: Vec<(&String, &String)> = folder
        .entries
        .iter()
        .filter(|(k, _)| k.to_ascii_lowercase().contains("type"))
        .collect();

    let classes: Vec<String> = if type_entries.is_empty() {
        folder_names
            .last()
            .map(|kind| {
                if kind == path {
                    format!("{domain_class}{KEY_SEPARATOR}{kind}-folder")
                } else {
                    format!("{domain_class}{KEY_SEPARATOR}{kind}")
                }
            })
            .into_iter()
            .collect()
    } else {
        type_entries
            .into_iter()
            .filter(|(k, v)| !tree.ancestor_has_entry(id, k, v))
            .map(|(_, v)| format!("{domain_class}{KEY_SEPARATOR}{v}"))
            .collect()
    };

    let classes = classes
        .iter()
        .map(String::as_str)
        .map(sanitize_class)
        .collect();
    if let Some(folder) = tree.get_mut(id) {
        folder.class_names = classes;
    }
}

/// Keep tags usable as CSS class names: anything outside
/// `[A-Za-z0-9_-]` becomes `_`.
fn sanitize_class(class: &str) -> String {
    class
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
