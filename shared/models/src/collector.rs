use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Action that removes nodes from a direct application instead of adding it.
pub const UNREGISTER_NODE_ACTION: &str = "unregisterNode";

/// Body of `POST /applications`.
///
/// Exactly one of `app_urls` (a direct application, comma-separated base
/// URLs) or `aggregated_apps` (an aggregation) is expected, unless `action`
/// is [`UNREGISTER_NODE_ACTION`].
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddApplicationRequest {
    #[validate(length(min = 1, max = 200, message = "Application name is required"))]
    pub app_name: String,
    pub app_urls: Option<String>,
    #[validate(length(min = 1, message = "At least one aggregated application is required"))]
    pub aggregated_apps: Option<Vec<String>>,
    pub action: Option<String>,
}

impl AddApplicationRequest {
    pub fn is_unregister_node(&self) -> bool {
        self.action.as_deref() == Some(UNREGISTER_NODE_ACTION)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationsResponse {
    /// Direct applications with their base URLs.
    pub direct: BTreeMap<String, Vec<String>>,
    pub aggregations: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub application: String,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
    pub application: String,
    pub message: String,
}
