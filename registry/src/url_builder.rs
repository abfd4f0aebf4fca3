//! Conversion between base webapp URLs and live collection endpoints.
//!
//! `http://host:8080/app` becomes
//! `http://host:8080/app/monitoring?collector=stop&format=json`.
//! Only the base form is ever persisted.

use pulse_config::CollectorSettings;
use pulse_models::TransportFormat;
use url::Url;

use crate::error::RegistryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    monitoring_path: String,
    transport_format: TransportFormat,
}

impl UrlBuilder {
    pub fn new(monitoring_path: impl Into<String>, transport_format: TransportFormat) -> Self {
        Self {
            monitoring_path: monitoring_path.into(),
            transport_format,
        }
    }

    pub fn from_settings(settings: &CollectorSettings) -> Self {
        Self::new(settings.monitoring_path.clone(), settings.transport_format)
    }

    pub fn monitoring_path(&self) -> &str {
        &self.monitoring_path
    }

    pub fn transport_format(&self) -> TransportFormat {
        self.transport_format
    }

    /// Text appended to every base URL.
    pub fn suffix(&self) -> String {
        format!(
            "{}?collector=stop&format={}",
            self.monitoring_path,
            self.transport_format.code()
        )
    }

    /// Splits a comma-separated list of base URLs (one per cluster node) into
    /// collection endpoints, keeping the given order.
    pub fn parse_urls(&self, raw: &str) -> Result<Vec<Url>, RegistryError> {
        raw.split(',').map(|part| self.endpoint(part)).collect()
    }

    pub fn endpoint(&self, base: &str) -> Result<Url, RegistryError> {
        let trimmed = base.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(RegistryError::validation(
                "url",
                format!("empty URL in '{}'", base),
            ));
        }
        let candidate = format!("{}{}", trimmed, self.suffix());
        Url::parse(&candidate).map_err(|source| RegistryError::MalformedUrl {
            value: trimmed.to_string(),
            source,
        })
    }

    /// Inverse of [`endpoint`](Self::endpoint): cuts the URL at the last
    /// occurrence of the monitoring path.
    ///
    /// Lossy when the monitoring path text also appears after the point where
    /// the suffix was appended; such URLs are not produced by `endpoint` with
    /// the same settings.
    pub fn base_url(&self, url: &Url) -> Result<String, RegistryError> {
        let text = url.as_str();
        let index = text.rfind(&self.monitoring_path).ok_or_else(|| {
            RegistryError::validation(
                "url",
                format!("'{}' does not contain '{}'", text, self.monitoring_path),
            )
        })?;
        let base = &text[..index];
        if base.contains(',') {
            return Err(RegistryError::validation(
                "url",
                format!("'{}' should not contain a comma", base),
            ));
        }
        Ok(base.to_string())
    }
}

/// Free-standing form of [`UrlBuilder::parse_urls`].
pub fn parse_urls(
    raw: &str,
    transport_format: TransportFormat,
    monitoring_path: &str,
) -> Result<Vec<Url>, RegistryError> {
    UrlBuilder::new(monitoring_path, transport_format).parse_urls(raw)
}
