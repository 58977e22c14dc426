// ── Folder node ──

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::mbean::MBean;

/// Index of a node in its [`MBeanTree`](super::MBeanTree) arena.
///
/// Only meaningful for the tree that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A tree node: either a grouping folder or a leaf bound to one MBean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub key: Option<String>,
    /// Segment this folder was created under; sibling lookup key.
    pub name: String,
    /// Display text.
    pub text: String,
    pub domain: Option<String>,
    pub folder_names: Vec<String>,
    /// Property entries, populated on resource leaves only.
    pub entries: IndexMap<String, String>,
    pub object_name: Option<String>,
    pub type_name: Option<String>,
    pub mbean: Option<MBean>,
    pub class_names: Vec<String>,
    pub icon: Option<String>,
    pub lazy_load: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            text: name.clone(),
            name,
            ..Self::default()
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// A folder is anything with children; leaves have none.
    pub fn is_folder(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or_default()
    }

    pub fn entry(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn last_folder_name(&self) -> Option<&str> {
        self.folder_names.last().map(String::as_str)
    }

    /// Add a category tag unless already present.
    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.class_names.contains(&class) {
            self.class_names.push(class);
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_names.iter().any(|c| c == class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_folder_uses_name_as_text() {
        let folder = Folder::new("java.lang");
        assert_eq!(folder.text, "java.lang");
        assert!(!folder.is_folder());
        assert_eq!(folder.key(), "");
    }

    #[test]
    fn classes_are_deduplicated() {
        let mut folder = Folder::new("x");
        folder.add_class("java-lang-Memory");
        folder.add_class("java-lang-Memory");
        assert_eq!(folder.class_names.len(), 1);
        assert!(folder.has_class("java-lang-Memory"));
    }
}
