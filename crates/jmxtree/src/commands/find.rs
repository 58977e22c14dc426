//! `jmxtree find`: structural search by domain and properties.

use std::fmt::Write as _;

use serde::Serialize;

use jmxtree_core::{Gateway, NodeId, SelectionView, Workspace};

use crate::cli::{FindArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct FoundMBean {
    key: String,
    text: String,
    object_name: Option<String>,
    type_name: Option<String>,
    class_names: Vec<String>,
    attributes: Vec<String>,
    operations: Vec<String>,
    preferred_view: Option<String>,
}

/// Split `key=value` at the first `=`.
pub fn parse_prop(raw: &str) -> Result<(String, String), CliError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(CliError::Validation {
            field: "prop".into(),
            reason: format!("expected KEY=VALUE, got '{raw}'"),
        }),
    }
}

pub async fn handle<G: Gateway>(
    workspace: &Workspace<G>,
    args: &FindArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let props = args
        .props
        .iter()
        .map(|raw| parse_prop(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let pairs: Vec<(&str, &str)> = props
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    super::load(workspace).await?;
    let view = workspace.view();
    let found = view
        .find_mbean_with_properties(&args.domain, &pairs, args.count)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "mbean".into(),
            identifier: describe(&args.domain, &args.props),
            hint: format!("Run: jmxtree tree --domain {} to see what it contains", args.domain),
        })?;

    select_found(workspace, &view, found)?;
    if let Some(ref view_name) = args.remember_view {
        workspace.remember_view(view_name);
    }

    let Some(folder) = workspace.selected_folder() else {
        return Err(CliError::Internal("selected folder vanished".into()));
    };
    let mbean = folder.mbean.as_ref();
    let result = FoundMBean {
        key: folder.key().to_string(),
        text: folder.text.clone(),
        object_name: folder.object_name.clone(),
        type_name: folder.type_name.clone(),
        class_names: folder.class_names.clone(),
        attributes: mbean
            .map(|m| m.attributes.keys().cloned().collect())
            .unwrap_or_default(),
        operations: mbean
            .and_then(|m| m.operations.as_ref())
            .map(|ops| ops.keys().cloned().collect())
            .unwrap_or_default(),
        preferred_view: workspace.preferred_view(),
    };

    let out = output::render_single(global.output, &result, detail, |r| {
        r.object_name.clone().unwrap_or_else(|| r.key.clone())
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Select the match by key; arena ids from `view` may not survive a
/// rebuild that landed since the search.
fn select_found<G: Gateway>(
    workspace: &Workspace<G>,
    view: &SelectionView,
    found: NodeId,
) -> Result<NodeId, CliError> {
    let key = view.tree().get(found).map(|f| f.key().to_string());
    key.as_deref()
        .and_then(|key| workspace.select_by_key(key))
        .ok_or_else(|| CliError::Internal("matched mbean vanished from the tree".into()))
}

fn describe(domain: &str, props: &[String]) -> String {
    if props.is_empty() {
        domain.to_string()
    } else {
        format!("{domain}:{}", props.join(","))
    }
}

fn detail(r: &FoundMBean) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Key:         {}", r.key);
    let _ = writeln!(out, "Name:        {}", r.text);
    if let Some(ref name) = r.object_name {
        let _ = writeln!(out, "Object name: {name}");
    }
    if let Some(ref kind) = r.type_name {
        let _ = writeln!(out, "Type:        {kind}");
    }
    if !r.class_names.is_empty() {
        let _ = writeln!(out, "Tags:        {}", r.class_names.join(" "));
    }
    if !r.attributes.is_empty() {
        let _ = writeln!(out, "Attributes:  {}", r.attributes.join(", "));
    }
    if !r.operations.is_empty() {
        let _ = writeln!(out, "Operations:  {}", r.operations.join(", "));
    }
    if let Some(ref view) = r.preferred_view {
        let _ = writeln!(out, "View:        {view}");
    }
    out.trim_end().to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jmxtree_core::{CoreError, Domains, MBean, WorkspaceConfig};
    use serde_json::Value;

    use super::*;

    struct Offline;

    impl Gateway for Offline {
        async fn list(&self, _max_depth: Option<u32>) -> Result<Domains, CoreError> {
            Ok(Domains::new())
        }

        async fn read(&self, _mbean: &str, _attribute: &str) -> Result<Value, CoreError> {
            Ok(Value::Null)
        }
    }

    fn listing(layout: &[(&str, &[&str])]) -> Domains {
        layout
            .iter()
            .map(|(domain, ids)| {
                let mbeans = ids
                    .iter()
                    .map(|id| ((*id).to_string(), MBean::default()))
                    .collect();
                ((*domain).to_string(), mbeans)
            })
            .collect()
    }

    #[test]
    fn prop_splits_at_first_equals() {
        assert_eq!(
            parse_prop("name=a=b").unwrap(),
            ("name".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_prop("type=").unwrap(),
            ("type".to_string(), String::new())
        );
    }

    #[test]
    fn prop_without_key_is_rejected() {
        assert!(matches!(parse_prop("=Memory"), Err(CliError::Validation { .. })));
        assert!(matches!(parse_prop("Memory"), Err(CliError::Validation { .. })));
    }

    #[test]
    fn describe_joins_props() {
        assert_eq!(
            describe("java.lang", &["type=Memory".into()]),
            "java.lang:type=Memory"
        );
        assert_eq!(describe("hawtio", &[]), "hawtio");
    }

    #[test]
    fn match_is_reselected_by_key_after_rebuild() {
        let config = WorkspaceConfig::new("http://localhost:8778/jolokia/".parse().unwrap());
        let workspace = Workspace::new(config, Offline);
        workspace.populate_tree(&listing(&[("java.lang", &["type=Memory"])]));

        let view = workspace.view();
        let found = view
            .find_mbean_with_properties("java.lang", &[("type", "Memory")], None)
            .unwrap();

        // A rebuild in between shifts every arena id.
        workspace.populate_tree(&listing(&[
            ("hawtio", &["type=TreeWatcher"]),
            ("java.lang", &["type=Memory"]),
        ]));

        let selected = select_found(&workspace, &view, found).unwrap();
        assert_ne!(selected, found);
        assert_eq!(
            workspace.selected_folder().unwrap().key(),
            "root-java.lang-Memory"
        );
    }
}
