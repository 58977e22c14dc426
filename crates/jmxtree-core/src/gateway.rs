// ── Gateway seam ──
//
// The workspace talks to the remote agent only through this trait, so
// the engine can be driven by the HTTP client or by a scripted gateway.

use std::future::Future;

use indexmap::IndexMap;
use serde_json::Value;

use jmxtree_api::GatewayClient;
use jmxtree_api::transport::{TlsMode, TransportConfig};

use crate::config::{Credentials, TlsVerification, WorkspaceConfig};
use crate::convert::domains_from_listing;
use crate::error::CoreError;
use crate::model::MBean;

/// `domain → identifier → descriptor`, in gateway order.
pub type Domains = IndexMap<String, IndexMap<String, MBean>>;

/// Request/response access to a management gateway.
pub trait Gateway: Send + Sync + 'static {
    /// List every domain; `max_depth` bounds metadata expansion.
    fn list(
        &self,
        max_depth: Option<u32>,
    ) -> impl Future<Output = Result<Domains, CoreError>> + Send;

    /// Read one attribute value.
    fn read(
        &self,
        mbean: &str,
        attribute: &str,
    ) -> impl Future<Output = Result<Value, CoreError>> + Send;
}

impl Gateway for GatewayClient {
    async fn list(&self, max_depth: Option<u32>) -> Result<Domains, CoreError> {
        let listing = GatewayClient::list(self, max_depth).await?;
        Ok(domains_from_listing(listing))
    }

    async fn read(&self, mbean: &str, attribute: &str) -> Result<Value, CoreError> {
        Ok(GatewayClient::read(self, mbean, attribute).await?)
    }
}

/// Build the HTTP gateway client described by `config`.
pub fn build_gateway(config: &WorkspaceConfig) -> Result<GatewayClient, CoreError> {
    let transport = TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    };
    let client = GatewayClient::new(config.url.clone(), &transport)?;
    Ok(match &config.credentials {
        Credentials::None => client,
        Credentials::Basic { username, password } => {
            client.with_basic_auth(username.clone(), password.clone())
        }
    })
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
