// ── Domain model ──
//
// Parsed identifiers, MBean descriptors, folders and the tree that
// owns them.

pub mod folder;
pub mod mbean;
pub mod object_name;
pub mod tree;

pub use folder::{Folder, NodeId};
pub use mbean::{Argument, Attribute, MBean, Operation, OperationEntry, OperationPermission};
pub use object_name::{ObjectName, Property, PropertyList, escape_tags, split_property, trim_quotes};
pub use tree::{KEY_SEPARATOR, MBeanTree, ROOT_KEY, ROOT_TEXT};
