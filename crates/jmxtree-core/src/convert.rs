// ── API-to-domain type conversions ──
//
// Bridges raw `jmxtree_api` listing types into `jmxtree_core::model`
// descriptors. Field names are normalized; missing metadata becomes empty
// collections rather than errors.

use jmxtree_api::{ArgInfo, AttrInfo, ListValue, MBeanInfo, OpInfo, OpInfoEntry, OpPermission};

use crate::gateway::Domains;
use crate::model::{
    Argument, Attribute, MBean, Operation, OperationEntry, OperationPermission,
};

impl From<MBeanInfo> for MBean {
    fn from(info: MBeanInfo) -> Self {
        Self {
            description: info.desc,
            attributes: info
                .attr
                .unwrap_or_default()
                .into_iter()
                .map(|(name, attr)| (name, Attribute::from(attr)))
                .collect(),
            operations: info.op.map(|ops| {
                ops.into_iter()
                    .map(|(name, op)| (name, OperationEntry::from(op)))
                    .collect()
            }),
            operations_by_signature: info.op_by_string.map(|ops| {
                ops.into_iter()
                    .map(|(sig, perm)| (sig, OperationPermission::from(perm)))
                    .collect()
            }),
            can_invoke: info.can_invoke,
        }
    }
}

impl From<AttrInfo> for Attribute {
    fn from(attr: AttrInfo) -> Self {
        Self {
            description: attr.desc,
            attr_type: attr.attr_type,
            writable: attr.rw.unwrap_or(false),
            can_invoke: attr.can_invoke,
        }
    }
}

impl From<OpInfoEntry> for OperationEntry {
    fn from(entry: OpInfoEntry) -> Self {
        match entry {
            OpInfoEntry::Single(op) => Self::Single(op.into()),
            OpInfoEntry::Overloaded(ops) => {
                Self::Overloaded(ops.into_iter().map(Operation::from).collect())
            }
        }
    }
}

impl From<OpInfo> for Operation {
    fn from(op: OpInfo) -> Self {
        Self {
            description: op.desc,
            args: op.args.into_iter().map(Argument::from).collect(),
            return_type: op.ret,
            can_invoke: op.can_invoke,
        }
    }
}

impl From<ArgInfo> for Argument {
    fn from(arg: ArgInfo) -> Self {
        Self {
            name: arg.name,
            arg_type: arg.arg_type,
            description: arg.desc,
        }
    }
}

impl From<OpPermission> for OperationPermission {
    fn from(perm: OpPermission) -> Self {
        Self {
            can_invoke: perm.can_invoke,
        }
    }
}

/// Convert a full `list` payload, preserving gateway order.
pub fn domains_from_listing(listing: ListValue) -> Domains {
    listing
        .into_iter()
        .map(|(domain, mbeans)| {
            let mbeans = mbeans
                .into_iter()
                .map(|(name, info)| (name, MBean::from(info)))
                .collect();
            (domain, mbeans)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn listing_converts_operations_and_permissions() {
        let info = MBeanInfo::from_listing(json!({
            "desc": "Managed Route",
            "canInvoke": true,
            "attr": { "State": { "type": "java.lang.String", "rw": false, "desc": "" } },
            "op": {
                "stop": { "args": [], "ret": "void", "desc": "Stop", "canInvoke": false },
                "dumpRoutes": [
                    { "args": [], "ret": "java.lang.String", "desc": "" },
                    { "args": [{ "name": "p1", "type": "boolean", "desc": "" }], "ret": "java.lang.String", "desc": "" }
                ]
            },
            "opByString": { "stop()": { "canInvoke": false } }
        }));
        let mbean = MBean::from(info);

        assert_eq!(mbean.description.as_deref(), Some("Managed Route"));
        assert_eq!(mbean.can_invoke, Some(true));
        assert!(!mbean.attributes["State"].writable);

        let ops = mbean.operations.as_ref().unwrap();
        assert_eq!(ops["stop"].can_invoke(), Some(false));
        let overloads = ops["dumpRoutes"].overloads();
        assert_eq!(overloads.len(), 2);
        assert_eq!(overloads[1].signature("dumpRoutes"), "dumpRoutes(boolean)");

        assert!(!mbean.has_invoke_rights(&["stop()"]));
    }

    #[test]
    fn truncated_listing_has_no_operations() {
        let mut listing = ListValue::new();
        listing
            .entry("hawtio".into())
            .or_default()
            .insert("type=Registry".into(), MBeanInfo::from_listing(json!(1)));
        let domains = domains_from_listing(listing);
        let registry = &domains["hawtio"]["type=Registry"];
        assert!(registry.operations.is_none());
        assert!(registry.has_invoke_rights(&["reload"]));
    }
}
