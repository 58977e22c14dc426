// ── MBean descriptor ──
//
// Domain-side metadata for one managed resource: attributes, operations
// and the invoke permissions the gateway attached to them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MBean {
    pub description: Option<String>,
    pub attributes: IndexMap<String, Attribute>,
    /// Operations keyed by simple name.
    pub operations: Option<IndexMap<String, OperationEntry>>,
    /// Permission overrides keyed by full signature, e.g. `"dumpRoutes(boolean)"`.
    pub operations_by_signature: Option<IndexMap<String, OperationPermission>>,
    /// Resource-level permission flag.
    pub can_invoke: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub description: Option<String>,
    pub attr_type: Option<String>,
    pub writable: bool,
    pub can_invoke: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub description: Option<String>,
    pub args: Vec<Argument>,
    pub return_type: Option<String>,
    pub can_invoke: Option<bool>,
}

impl Operation {
    /// `name(type1,type2)` signature as used by the signature map.
    pub fn signature(&self, name: &str) -> String {
        let args: Vec<&str> = self.args.iter().map(|a| a.arg_type.as_str()).collect();
        format!("{name}({})", args.join(","))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub arg_type: String,
    pub description: Option<String>,
}

/// One operation name: a single signature or an overload set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationEntry {
    Single(Operation),
    Overloaded(Vec<Operation>),
}

impl OperationEntry {
    /// Permission override for the name as a whole.
    ///
    /// Overload sets carry no name-level flag; callers must address a
    /// specific signature instead.
    pub fn can_invoke(&self) -> Option<bool> {
        match self {
            Self::Single(op) => op.can_invoke,
            Self::Overloaded(_) => None,
        }
    }

    pub fn overloads(&self) -> &[Operation] {
        match self {
            Self::Single(op) => std::slice::from_ref(op),
            Self::Overloaded(ops) => ops,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationPermission {
    pub can_invoke: Option<bool>,
}

impl MBean {
    /// Resolve whether the named operations may be invoked.
    ///
    /// Starts permitted, seeded by the resource-level flag. Each name ending
    /// in `)` is looked up by signature, any other by simple name; a found
    /// operation with a defined flag replaces the running result. Unknown
    /// names and flagless operations are skipped. Checking stops at the
    /// first `false`.
    pub fn has_invoke_rights(&self, methods: &[&str]) -> bool {
        let mut can_invoke = self.can_invoke.unwrap_or(true);
        if !can_invoke || methods.is_empty() {
            return can_invoke;
        }
        let (Some(by_signature), Some(by_name)) =
            (&self.operations_by_signature, &self.operations)
        else {
            return can_invoke;
        };

        for method in methods {
            if !can_invoke {
                break;
            }
            let flag = if method.ends_with(')') {
                by_signature.get(*method).map(|p| p.can_invoke)
            } else {
                by_name.get(*method).map(OperationEntry::can_invoke)
            };
            match flag {
                Some(Some(allowed)) => can_invoke = allowed,
                Some(None) => {}
                None => debug!(method, "operation not found, skipping permission check"),
            }
        }
        can_invoke
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mbean_with(resource: Option<bool>, ops: &[(&str, Option<bool>)]) -> MBean {
        let operations = ops
            .iter()
            .map(|(name, flag)| {
                (
                    (*name).to_string(),
                    OperationEntry::Single(Operation {
                        can_invoke: *flag,
                        ..Operation::default()
                    }),
                )
            })
            .collect();
        let operations_by_signature = ops
            .iter()
            .map(|(name, flag)| {
                (
                    format!("{name}()"),
                    OperationPermission { can_invoke: *flag },
                )
            })
            .collect();
        MBean {
            operations: Some(operations),
            operations_by_signature: Some(operations_by_signature),
            can_invoke: resource,
            ..MBean::default()
        }
    }

    #[test]
    fn operation_override_replaces_resource_flag() {
        let mbean = mbean_with(Some(true), &[("stop", Some(false))]);
        assert!(!mbean.has_invoke_rights(&["stop"]));
        assert!(mbean.has_invoke_rights(&[]));
    }

    #[test]
    fn signature_lookup_for_names_ending_in_paren() {
        let mbean = mbean_with(Some(true), &[("stop", Some(false))]);
        assert!(!mbean.has_invoke_rights(&["stop()"]));
    }

    #[test]
    fn unknown_and_flagless_operations_are_skipped() {
        let mbean = mbean_with(Some(true), &[("start", None)]);
        assert!(mbean.has_invoke_rights(&["start", "missing"]));
    }

    #[test]
    fn resource_false_short_circuits() {
        let mbean = mbean_with(Some(false), &[("start", Some(true))]);
        assert!(!mbean.has_invoke_rights(&["start"]));
    }

    #[test]
    fn checking_stops_at_first_denial() {
        let mbean = mbean_with(None, &[("stop", Some(false)), ("start", Some(true))]);
        assert!(!mbean.has_invoke_rights(&["stop", "start"]));
        assert!(mbean.has_invoke_rights(&["start", "start"]));
    }

    #[test]
    fn missing_operation_metadata_is_permitted() {
        let mbean = MBean::default();
        assert!(mbean.has_invoke_rights(&["stop"]));
    }

    #[test]
    fn overloads_have_no_name_level_flag() {
        let entry = OperationEntry::Overloaded(vec![Operation::default(), Operation::default()]);
        assert_eq!(entry.can_invoke(), None);
        assert_eq!(entry.overloads().len(), 2);
    }

    #[test]
    fn signature_joins_argument_types() {
        let op = Operation {
            args: vec![
                Argument {
                    arg_type: "boolean".into(),
                    ..Argument::default()
                },
                Argument {
                    arg_type: "java.lang.String".into(),
                    ..Argument::default()
                },
            ],
            ..Operation::default()
        };
        assert_eq!(op.signature("dump"), "dump(boolean,java.lang.String)");
    }
}
