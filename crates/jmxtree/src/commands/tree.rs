//! `jmxtree tree`: print the folder hierarchy.

use serde::Serialize;
use tabled::Tabled;

use jmxtree_core::{Gateway, MBeanTree, NodeId, Workspace};

use crate::cli::{GlobalOpts, TreeArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct TreeEntry {
    depth: usize,
    key: String,
    text: String,
    domain: Option<String>,
    type_name: Option<String>,
    object_name: Option<String>,
    class_names: Vec<String>,
    lazy_load: bool,
    children: usize,
}

#[derive(Tabled)]
struct TreeRow {
    #[tabled(rename = "Folder")]
    folder: String,
    #[tabled(rename = "Type")]
    type_name: String,
    #[tabled(rename = "Object Name")]
    object_name: String,
}

impl From<&TreeEntry> for TreeRow {
    fn from(e: &TreeEntry) -> Self {
        Self {
            folder: indented(e),
            type_name: e.type_name.clone().unwrap_or_default(),
            object_name: e.object_name.clone().unwrap_or_default(),
        }
    }
}

fn indented(e: &TreeEntry) -> String {
    let marker = if e.children > 0 { "+ " } else { "  " };
    format!("{}{marker}{}", "  ".repeat(e.depth.saturating_sub(1)), e.text)
}

pub async fn handle<G: Gateway>(
    workspace: &Workspace<G>,
    args: &TreeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let tree = super::load(workspace).await?;

    let starts = match args.domain {
        Some(ref domain) => vec![tree.domain(domain).ok_or_else(|| CliError::NotFound {
            resource_type: "domain".into(),
            identifier: domain.clone(),
            hint: "Run: jmxtree tree --depth 1 to see available domains".into(),
        })?],
        None => tree.children(tree.root()).to_vec(),
    };

    let entries = flatten(&tree, &starts, args.depth);
    let out = output::render_list(global.output, &entries, |e| TreeRow::from(e), indented);
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Pre-order walk from `starts` (domain level = depth 1), stopping below
/// `max_depth`.
fn flatten(tree: &MBeanTree, starts: &[NodeId], max_depth: Option<usize>) -> Vec<TreeEntry> {
    let mut entries = Vec::new();
    let mut stack: Vec<(NodeId, usize)> = starts.iter().rev().map(|&id| (id, 1)).collect();

    while let Some((id, depth)) = stack.pop() {
        let Some(folder) = tree.get(id) else {
            continue;
        };
        entries.push(TreeEntry {
            depth,
            key: folder.key().to_string(),
            text: folder.text.clone(),
            domain: folder.domain.clone(),
            type_name: folder.type_name.clone(),
            object_name: folder.object_name.clone(),
            class_names: folder.class_names.clone(),
            lazy_load: folder.lazy_load,
            children: folder.children().len(),
        });
        if max_depth.is_none_or(|max| depth < max) {
            stack.extend(folder.children().iter().rev().map(|&c| (c, depth + 1)));
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use jmxtree_core::{Domains, LazyLoaders, MBean, TreeBuilder};

    use super::*;

    fn tree() -> MBeanTree {
        let mut domains = Domains::new();
        let java = domains.entry("java.lang".into()).or_default();
        java.insert("type=Memory".into(), MBean::default());
        java.insert(
            "type=GarbageCollector,name=G1 Young".into(),
            MBean::default(),
        );
        domains
            .entry("hawtio".into())
            .or_default()
            .insert("type=TreeWatcher".into(), MBean::default());
        TreeBuilder::new(&LazyLoaders::new()).build(&domains)
    }

    #[test]
    fn flatten_walks_in_display_order() {
        let tree = tree();
        let starts = tree.children(tree.root()).to_vec();
        let texts: Vec<_> = flatten(&tree, &starts, None)
            .into_iter()
            .map(|e| (e.depth, e.text))
            .collect();
        assert_eq!(
            texts,
            vec![
                (1, "hawtio".to_string()),
                (2, "TreeWatcher".to_string()),
                (1, "java.lang".to_string()),
                (2, "GarbageCollector".to_string()),
                (3, "G1 Young".to_string()),
                (2, "Memory".to_string()),
            ]
        );
    }

    #[test]
    fn depth_limit_stops_descent() {
        let tree = tree();
        let starts = tree.children(tree.root()).to_vec();
        let entries = flatten(&tree, &starts, Some(1));
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.depth == 1 && e.children > 0));
    }
}
