// ── Runtime workspace configuration ──
//
// These types describe *how* to reach a gateway and how the workspace
// keeps its tree fresh. They carry credential data and tuning, but never
// touch disk. The CLI constructs a `WorkspaceConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::watch::WatchTarget;

/// Default gateway endpoint of a locally attached agent.
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8778/jolokia/";

/// How to authenticate with the gateway.
#[derive(Debug, Clone, Default)]
pub enum Credentials {
    #[default]
    None,
    Basic {
        username: String,
        password: SecretString,
    },
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for one workspace session against a single gateway.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Gateway endpoint (e.g., `http://localhost:8778/jolokia/`).
    pub url: Url,
    pub credentials: Credentials,
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// Act on plugin-registry changes. When off, changes are still tracked
    /// but no reload is requested.
    pub auto_refresh: bool,
    /// Counter polling interval.
    pub update_rate: Duration,
    /// `maxDepth` used when the tree watcher triggers a refetch.
    pub refresh_max_depth: u32,
    pub plugin_registry: WatchTarget,
    pub tree_watcher: WatchTarget,
}

impl WorkspaceConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            credentials: Credentials::None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            auto_refresh: true,
            update_rate: Duration::from_millis(5000),
            refresh_max_depth: 2,
            plugin_registry: WatchTarget::plugin_registry(),
            tree_watcher: WatchTarget::tree_watcher(),
        }
    }
}
