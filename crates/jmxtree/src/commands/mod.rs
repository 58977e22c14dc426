//! Command dispatch: bridges CLI args -> workspace queries -> output formatting.

pub mod can_invoke;
pub mod config_cmd;
pub mod find;
pub mod tree;
pub mod watch;

use std::sync::Arc;

use jmxtree_config::FilePreferences;
use jmxtree_core::gateway::build_gateway;
use jmxtree_core::{Gateway, MBeanTree, Workspace, WorkspaceConfig};

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Build the HTTP gateway and a workspace whose view preferences persist
/// next to the config file.
pub fn connect(workspace_config: WorkspaceConfig) -> Result<Workspace<impl Gateway>, CliError> {
    let gateway = build_gateway(&workspace_config)?;
    let preferences = Arc::new(FilePreferences::open(config::preferences_path()));
    Ok(Workspace::with_preferences(workspace_config, gateway, preferences))
}

/// Dispatch a gateway-bound command to the appropriate handler.
pub async fn dispatch<G: Gateway>(
    cmd: Command,
    workspace: &Workspace<G>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Tree(args) => tree::handle(workspace, &args, global).await,
        Command::Find(args) => find::handle(workspace, &args, global).await,
        Command::CanInvoke(args) => can_invoke::handle(workspace, &args, global).await,
        Command::Watch(args) => watch::handle(workspace, &args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// Fetch the full listing once, surfacing gateway failures.
pub async fn load<G: Gateway>(workspace: &Workspace<G>) -> Result<Arc<MBeanTree>, CliError> {
    workspace.try_load_tree().await?;
    Ok(workspace.tree())
}
