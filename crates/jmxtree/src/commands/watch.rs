//! `jmxtree watch`: keep the workspace alive and report what changes.
//!
//! The initial load starts whichever counter watchers the agent supports.
//! Tree-watcher bumps refetch on their own; plugin-registry bumps arrive
//! here as `ReloadRequested` and trigger a full reload. Every tree the
//! workspace publishes, including node removals, is reported from the
//! tree stream.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use jmxtree_core::{Gateway, Location, WatcherKind, Workspace, WorkspaceConfig, WorkspaceEvent};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

/// Fold `watch` flags into the workspace config before connecting.
pub fn apply_overrides(config: &mut WorkspaceConfig, args: &WatchArgs) {
    if let Some(rate) = args.update_rate {
        config.update_rate = Duration::from_millis(rate);
    }
    if args.no_auto_refresh {
        config.auto_refresh = false;
    }
}

pub async fn handle<G: Gateway>(
    workspace: &Workspace<G>,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    let mut events = workspace.events();

    let tree = super::load(workspace).await?;
    info!(nodes = tree.len(), "initial tree loaded");

    if let Some(ref target) = args.select {
        let selected = if target.starts_with('#') || target.contains('?') {
            workspace.select_from_location(&Location::parse(target))
        } else {
            workspace.select_by_key(target)
        };
        if selected.is_none() {
            warn!(target = %target, "no node to select");
        }
    }

    for kind in [WatcherKind::PluginRegistry, WatcherKind::TreeWatcher] {
        let state = if workspace.is_watching(kind) { "watching" } else { "not available" };
        report(global, &format!("{kind}: {}", output::muted(state, color)));
    }

    let mut trees = workspace.subscribe_tree().into_stream();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            Some(tree) = trees.next() => {
                let at = workspace
                    .store()
                    .last_rebuild()
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_default();
                let generation = workspace.store().applied_generation();
                let nodes = tree.len();
                report(
                    global,
                    &format!("{at} tree updated (generation {generation}, {nodes} nodes)"),
                );
            }
            event = events.recv() => match event {
                Ok(WorkspaceEvent::TreeUpdated { generation }) => {
                    debug!(generation, "rebuild published");
                }
                Ok(WorkspaceEvent::SelectionChanged(folder)) => {
                    let key = folder.as_deref().map_or("(none)", |f| f.key());
                    report(global, &format!("selected {key}"));
                }
                Ok(WorkspaceEvent::ReloadRequested) => {
                    report(global, "plugins changed, reloading");
                    workspace.load_tree().await;
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    workspace.shutdown();
    Ok(())
}

fn report(global: &GlobalOpts, line: &str) {
    output::print_output(line, global.quiet);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn overrides_only_touch_given_flags() {
        let mut config = WorkspaceConfig::new("http://localhost:8778/jolokia/".parse().unwrap());
        apply_overrides(
            &mut config,
            &WatchArgs {
                update_rate: None,
                select: None,
                no_auto_refresh: false,
            },
        );
        assert_eq!(config.update_rate, Duration::from_millis(5000));
        assert!(config.auto_refresh);

        apply_overrides(
            &mut config,
            &WatchArgs {
                update_rate: Some(250),
                select: None,
                no_auto_refresh: true,
            },
        );
        assert_eq!(config.update_rate, Duration::from_millis(250));
        assert!(!config.auto_refresh);
    }
}
