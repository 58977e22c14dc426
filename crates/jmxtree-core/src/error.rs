// ── Core error types ──
//
// User-facing errors from jmxtree-core. These are NOT transport-specific:
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<jmxtree_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants. Tree building itself never fails.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to gateway at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Gateway request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {entity_type} {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Gateway errors (wrapped, not exposed raw) ────────────────────
    #[error("Gateway error: {message}")]
    Gateway {
        message: String,
        /// Exception class reported by the agent, if any.
        error_type: Option<String>,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<jmxtree_api::Error> for CoreError {
    fn from(err: jmxtree_api::Error) -> Self {
        if err.is_not_found() {
            return CoreError::NotFound {
                entity_type: "mbean".into(),
                identifier: err.to_string(),
            };
        }
        match err {
            jmxtree_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            jmxtree_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Gateway {
                        message: e.to_string(),
                        error_type: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            jmxtree_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            jmxtree_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            jmxtree_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            jmxtree_api::Error::Gateway {
                status,
                error_type,
                message,
            } => {
                if matches!(status, 401 | 403) {
                    CoreError::AuthenticationFailed { message }
                } else {
                    CoreError::Gateway {
                        message,
                        error_type,
                        status: Some(status),
                    }
                }
            }
            jmxtree_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
