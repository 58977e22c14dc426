//! MBean tree engine between `jmxtree-api` and UI consumers (CLI / views).
//!
//! This crate owns the domain model and the synchronization logic for a
//! remote JMX gateway:
//!
//! - **[`Workspace`]**: Central facade: [`load_tree()`](Workspace::load_tree)
//!   fetches every domain from the gateway and rebuilds the tree, counter
//!   watchers trigger reloads or refetches, and selection / permission queries
//!   run against the current snapshot.
//!
//! - **[`MBeanTree`]**: Arena-backed folder hierarchy built from flat
//!   `domain:key=value,...` identifiers, with `type` / `service` lookup
//!   indices rebuilt alongside it.
//!
//! - **[`TreeBuilder`]**: The rebuild pass: identifier parsing, path
//!   ordering, category tags, index registration and lazy-load marking.
//!
//! - **[`PostProcessors`]**: Ordered registry of callbacks run against every
//!   freshly built tree, replayed on late registration.
//!
//! - **[`SelectionView`]**: Structural queries and `has_invoke_rights`
//!   resolution over a tree snapshot and the active selection.

pub mod config;
pub mod convert;
pub mod error;
pub mod gateway;
pub mod location;
pub mod model;
pub mod preferences;
pub mod selection;
pub mod store;
pub mod stream;
pub mod tree;
pub mod watch;
pub mod workspace;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{Credentials, TlsVerification, WorkspaceConfig};
pub use error::CoreError;
pub use gateway::{Domains, Gateway};
pub use location::Location;
pub use preferences::{MemoryPreferences, PreferenceStore};
pub use selection::SelectionView;
pub use store::WorkspaceStore;
pub use stream::TreeStream;
pub use tree::{DomainIndex, IndexEntry, LazyLoaders, PostProcessors, TreeBuilder};
pub use watch::{CounterAction, WatchTarget, WatchedCounter, WatcherKind};
pub use workspace::{Workspace, WorkspaceEvent};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Argument, Attribute, Folder, MBean, MBeanTree, NodeId, ObjectName, Operation,
    OperationEntry, OperationPermission, Property, PropertyList,
};
