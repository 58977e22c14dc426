//! `jmxtree can-invoke`: resolve invoke permissions for an MBean.

use serde::Serialize;
use tabled::Tabled;

use jmxtree_core::{Gateway, ObjectName, Workspace};

use crate::cli::{CanInvokeArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Label used for the resource-level check and the combined check.
const RESOURCE: &str = "*";

#[derive(Debug, Serialize)]
struct InvokeCheck {
    object_name: String,
    operation: String,
    allowed: bool,
    /// Whether the name resolved to a node; unresolved names are permitted.
    resolved: bool,
}

#[derive(Tabled)]
struct InvokeRow {
    #[tabled(rename = "Object Name")]
    object_name: String,
    #[tabled(rename = "Operation")]
    operation: String,
    #[tabled(rename = "Access")]
    access: String,
}

pub async fn handle<G: Gateway>(
    workspace: &Workspace<G>,
    args: &CanInvokeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    super::load(workspace).await?;

    let name = ObjectName::parse(&args.object_name);
    let resolved = workspace
        .view()
        .find_mbean_with_properties(&name.domain, &name.property_pairs(), None)
        .is_some();

    let check = |operation: &str, methods: &[&str]| InvokeCheck {
        object_name: args.object_name.clone(),
        operation: operation.to_string(),
        allowed: workspace.has_invoke_rights_for_name(&args.object_name, methods),
        resolved,
    };

    let methods: Vec<&str> = args.operations.iter().map(String::as_str).collect();
    let mut checks: Vec<InvokeCheck> = methods.iter().map(|&m| check(m, &[m])).collect();
    if methods.len() != 1 {
        checks.push(check(RESOURCE, &methods));
    }

    let color = output::should_color(global.color);
    let out = output::render_list(
        global.output,
        &checks,
        |c| InvokeRow {
            object_name: c.object_name.clone(),
            operation: c.operation.clone(),
            access: if c.resolved {
                output::verdict(c.allowed, color)
            } else {
                format!(
                    "{} {}",
                    output::verdict(c.allowed, color),
                    output::muted("(unknown mbean)", color)
                )
            },
        },
        |c| format!("{}\t{}", c.operation, output::verdict(c.allowed, false)),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
