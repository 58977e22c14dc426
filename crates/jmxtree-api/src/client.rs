// Gateway HTTP client
//
// Wraps `reqwest::Client` with envelope unwrapping and optional basic
// auth. Every request is a JSON POST to the gateway root; the gateway
// answers with a `{ value, status, error? }` envelope which is stripped
// before the caller sees it.

use indexmap::IndexMap;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{GatewayRequest, GatewayResponse, ListValue, MBeanInfo, RequestConfig};
use crate::transport::TransportConfig;

/// Raw HTTP client for a Jolokia-style management gateway.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<(String, SecretString)>,
}

impl GatewayClient {
    /// Create a new gateway client from a `TransportConfig`.
    ///
    /// `base_url` is the agent endpoint, e.g. `http://localhost:8778/jolokia/`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            credentials: None,
        })
    }

    /// Create a gateway client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            credentials: None,
        }
    }

    /// Attach HTTP basic credentials to every request.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.credentials = Some((username.into(), password));
        self
    }

    /// The gateway endpoint.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Operations ───────────────────────────────────────────────────

    /// List every domain and MBean the agent knows about.
    ///
    /// `max_depth` bounds how deep the metadata tree is expanded; a depth
    /// of 2 yields domains and identifiers with truncated metadata.
    pub async fn list(&self, max_depth: Option<u32>) -> Result<ListValue, Error> {
        let request = GatewayRequest::List {
            config: max_depth.map(|max_depth| RequestConfig { max_depth }),
        };
        let raw: Option<IndexMap<String, IndexMap<String, serde_json::Value>>> =
            self.send(&request).await?;

        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .map(|(domain, mbeans)| {
                let mbeans = mbeans
                    .into_iter()
                    .map(|(name, value)| (name, MBeanInfo::from_listing(value)))
                    .collect();
                (domain, mbeans)
            })
            .collect())
    }

    /// Read a single attribute value.
    pub async fn read(&self, mbean: &str, attribute: &str) -> Result<serde_json::Value, Error> {
        let request = GatewayRequest::Read { mbean, attribute };
        let value: Option<serde_json::Value> = self.send(&request).await?;
        Ok(value.unwrap_or(serde_json::Value::Null))
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// POST a request and unwrap the gateway envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        request: &GatewayRequest<'_>,
    ) -> Result<Option<T>, Error> {
        debug!(url = %self.base_url, ?request, "POST");

        let mut builder = self.http.post(self.base_url.clone()).json(request);
        if let Some((ref username, ref password)) = self.credentials {
            builder = builder.basic_auth(username, Some(password.expose_secret()));
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        self.parse_envelope(resp).await
    }

    async fn parse_envelope<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<Option<T>, Error> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                message: format!("gateway returned HTTP {}", status.as_u16()),
            });
        }
        let resp = resp.error_for_status().map_err(Error::Transport)?;

        let body = resp.text().await.map_err(Error::Transport)?;
        let envelope: GatewayResponse<T> =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        if envelope.status != 200 {
            return Err(Error::Gateway {
                status: envelope.status,
                error_type: envelope.error_type,
                message: envelope
                    .error
                    .unwrap_or_else(|| "unknown gateway error".into()),
            });
        }

        Ok(envelope.value)
    }
}
