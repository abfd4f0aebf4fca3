use serde::{Deserialize, Serialize};
use url::Url;

/// A registered application, already told apart from its on-disk form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplicationEntry {
    /// One live collection endpoint per cluster node, in display order.
    Direct { urls: Vec<Url> },
    /// Names of the applications combined for display.
    Aggregation { members: Vec<String> },
}

impl ApplicationEntry {
    pub fn is_direct(&self) -> bool {
        matches!(self, ApplicationEntry::Direct { .. })
    }

    pub fn is_aggregation(&self) -> bool {
        matches!(self, ApplicationEntry::Aggregation { .. })
    }

    pub fn urls(&self) -> &[Url] {
        match self {
            ApplicationEntry::Direct { urls } => urls,
            ApplicationEntry::Aggregation { .. } => &[],
        }
    }

    pub fn members(&self) -> &[String] {
        match self {
            ApplicationEntry::Direct { .. } => &[],
            ApplicationEntry::Aggregation { members } => members,
        }
    }
}
