// Gateway wire types
//
// Models for the Jolokia-style JSON protocol. Every response is wrapped in
// the `GatewayResponse<T>` envelope. Fields use `#[serde(default)]` liberally
// because agents differ in which metadata they attach to `list` results.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ── Request ──────────────────────────────────────────────────────────

/// A single gateway request, serialized as `{ "type": "list", ... }`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum GatewayRequest<'a> {
    List {
        #[serde(skip_serializing_if = "Option::is_none")]
        config: Option<RequestConfig>,
    },
    Read {
        mbean: &'a str,
        attribute: &'a str,
    },
}

/// Processing parameters attached to a request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestConfig {
    pub max_depth: u32,
}

// ── Response Envelope ────────────────────────────────────────────────

/// Standard gateway response envelope.
///
/// ```json
/// { "request": {...}, "value": ..., "status": 200, "timestamp": 1700000000 }
/// ```
///
/// Errors keep HTTP 200 and carry `status`, `error_type` and `error`
/// inside the body instead.
#[derive(Debug, Deserialize)]
pub struct GatewayResponse<T> {
    #[serde(default = "Option::default")]
    pub value: Option<T>,
    pub status: u16,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
}

// ── List payload ─────────────────────────────────────────────────────

/// `list` result: domain name -> property-list identifier -> metadata.
///
/// Insertion order follows the gateway's JSON order.
pub type ListValue = IndexMap<String, IndexMap<String, MBeanInfo>>;

/// Metadata the gateway reports for one MBean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MBeanInfo {
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub attr: Option<IndexMap<String, AttrInfo>>,
    #[serde(default)]
    pub op: Option<IndexMap<String, OpInfoEntry>>,
    /// Per-signature permissions, keyed like `"dumpRoutes(boolean)"`.
    #[serde(default, rename = "opByString")]
    pub op_by_string: Option<IndexMap<String, OpPermission>>,
    #[serde(default, rename = "canInvoke")]
    pub can_invoke: Option<bool>,
    /// Catch-all for agent-specific fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MBeanInfo {
    /// Decode one MBean listing, tolerating truncated values.
    ///
    /// A depth-limited `list` reports leaves as scalars rather than objects;
    /// those (and anything else that does not decode) become empty metadata.
    pub fn from_listing(value: serde_json::Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value).unwrap_or_else(|e| {
            debug!(error = %e, "undecodable mbean metadata, using empty descriptor");
            Self::default()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrInfo {
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default, rename = "type")]
    pub attr_type: Option<String>,
    #[serde(default)]
    pub rw: Option<bool>,
    #[serde(default, rename = "canInvoke")]
    pub can_invoke: Option<bool>,
}

/// Operation metadata: one entry, or an array when the name is overloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpInfoEntry {
    Overloaded(Vec<OpInfo>),
    Single(OpInfo),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpInfo {
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub args: Vec<ArgInfo>,
    #[serde(default)]
    pub ret: Option<String>,
    #[serde(default, rename = "canInvoke")]
    pub can_invoke: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub arg_type: String,
    #[serde(default)]
    pub desc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpPermission {
    #[serde(default, rename = "canInvoke")]
    pub can_invoke: Option<bool>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_request_serializes_max_depth() {
        let req = GatewayRequest::List {
            config: Some(RequestConfig { max_depth: 2 }),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "type": "list", "config": { "maxDepth": 2 } })
        );
    }

    #[test]
    fn read_request_serializes_target() {
        let req = GatewayRequest::Read {
            mbean: "hawtio:type=Registry",
            attribute: "UpdateCounter",
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "type": "read", "mbean": "hawtio:type=Registry", "attribute": "UpdateCounter" })
        );
    }

    #[test]
    fn decodes_overloaded_operations_and_permissions() {
        let info = MBeanInfo::from_listing(json!({
            "desc": "Camel context",
            "canInvoke": true,
            "op": {
                "stop": { "args": [], "ret": "void", "desc": "stop", "canInvoke": false },
                "dumpRoutes": [
                    { "args": [], "ret": "java.lang.String", "desc": "dump" },
                    { "args": [{ "name": "p0", "type": "boolean", "desc": "" }], "ret": "java.lang.String", "desc": "dump" }
                ]
            },
            "opByString": {
                "stop()": { "canInvoke": false },
                "dumpRoutes(boolean)": { "canInvoke": true }
            },
            "class": "org.apache.camel.management.mbean.ManagedCamelContext"
        }));

        assert_eq!(info.can_invoke, Some(true));
        let ops = info.op.as_ref().unwrap();
        assert!(matches!(ops["stop"], OpInfoEntry::Single(ref op) if op.can_invoke == Some(false)));
        assert!(matches!(ops["dumpRoutes"], OpInfoEntry::Overloaded(ref v) if v.len() == 2));
        assert_eq!(
            info.op_by_string.as_ref().unwrap()["dumpRoutes(boolean)"].can_invoke,
            Some(true)
        );
        assert!(info.extra.contains_key("class"));
    }

    #[test]
    fn truncated_listing_becomes_empty_descriptor() {
        assert_eq!(MBeanInfo::from_listing(json!(1)), MBeanInfo::default());
    }
}
