use std::time::Duration;

use async_trait::async_trait;
use pulse_config::{CollectorSettings, ConfigError, TlsPolicy};
use pulse_models::{MetricsSnapshot, TransportFormat};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use thiserror::Error;
use url::Url;

/// Why a single node could not be collected. Recorded in the poll summary,
/// never propagated out of a cycle.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("node answered with HTTP {0}")]
    Status(u16),

    #[error("undecodable body: {0}")]
    Decode(String),

    #[error("incompatible transport format: {0}")]
    IncompatibleFormat(String),
}

/// Source of one node's statistics.
#[async_trait]
pub trait NodeFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<MetricsSnapshot, CollectError>;
}

/// Fails when the configured transport format has no decoder.
pub fn ensure_supported(format: TransportFormat) -> Result<(), ConfigError> {
    match format {
        TransportFormat::Json => Ok(()),
        other => Err(ConfigError::UnsupportedTransportFormat(other.code().to_string())),
    }
}

/// Fetches statistics over HTTP(S) with reqwest.
#[derive(Clone)]
pub struct HttpNodeFetcher {
    client: reqwest::Client,
    format: TransportFormat,
    timeout: Duration,
}

impl HttpNodeFetcher {
    pub fn new(
        format: TransportFormat,
        timeout: Duration,
        tls_policy: TlsPolicy,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pulse-collector/", env!("CARGO_PKG_VERSION")));
        if tls_policy == TlsPolicy::AcceptInvalidCertificates {
            tracing::warn!("TLS certificate verification is disabled for collection endpoints");
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(Self {
            client: builder.build()?,
            format,
            timeout,
        })
    }

    pub fn from_settings(settings: &CollectorSettings) -> Result<Self, reqwest::Error> {
        Self::new(
            settings.transport_format,
            settings.node_timeout,
            settings.tls_policy,
        )
    }

    fn map_error(&self, error: reqwest::Error) -> CollectError {
        if error.is_timeout() {
            CollectError::Timeout(self.timeout)
        } else if error.is_decode() {
            CollectError::Decode(error.to_string())
        } else {
            CollectError::Connection(error.to_string())
        }
    }
}

#[async_trait]
impl NodeFetcher for HttpNodeFetcher {
    async fn fetch(&self, url: &Url) -> Result<MetricsSnapshot, CollectError> {
        if self.format != TransportFormat::Json {
            return Err(CollectError::IncompatibleFormat(self.format.code().to_string()));
        }

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, self.format.mime_type())
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::Status(status.as_u16()));
        }

        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or_default();
            if !content_type.contains("json") {
                return Err(CollectError::IncompatibleFormat(content_type.to_string()));
            }
        }

        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        serde_json::from_slice(&body).map_err(|e| CollectError::Decode(e.to_string()))
    }
}
