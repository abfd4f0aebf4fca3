use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Wire encoding requested from a monitored node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportFormat {
    Serialized,
    Xml,
    Json,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown transport format '{0}' (expected one of: serialized, xml, json)")]
pub struct UnknownTransportFormat(pub String);

impl TransportFormat {
    pub const ALL: [TransportFormat; 3] = [Self::Serialized, Self::Xml, Self::Json];

    /// Code sent in the `format` query parameter of a collection endpoint.
    pub fn code(&self) -> &'static str {
        match self {
            TransportFormat::Serialized => "serialized",
            TransportFormat::Xml => "xml",
            TransportFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            TransportFormat::Serialized => "application/octet-stream",
            TransportFormat::Xml => "application/xml",
            TransportFormat::Json => "application/json",
        }
    }
}

impl Default for TransportFormat {
    fn default() -> Self {
        TransportFormat::Json
    }
}

impl fmt::Display for TransportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TransportFormat {
    type Err = UnknownTransportFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|format| format.code().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownTransportFormat(s.to_string()))
    }
}
