// jmxtree-api: Async Rust client for Jolokia-style JMX management gateways

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::GatewayClient;
pub use error::Error;
pub use models::{ArgInfo, AttrInfo, ListValue, MBeanInfo, OpInfo, OpInfoEntry, OpPermission};
pub use transport::{TlsMode, TransportConfig};
