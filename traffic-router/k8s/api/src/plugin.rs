use crate::labels::{Labels, Map};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The key under which the router's configuration is stored in a Rollout's
/// `trafficRouting.plugins`.
pub const PLUGIN_NAME: &str = "solo-io/glooedge";

/// The router's per-rollout configuration.
///
/// Exactly one of the two selectors must be set. `routes` names the routes to
/// manage and is required whenever a selected object has more than one route.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_table_selector: Option<ObjectSelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_service_selector: Option<ObjectSelector>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<String>,
}

/// Selects routing objects either by name or by labels.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ObjectSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Defaults to the rollout's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub labels: Map,
}

// === impl ObjectSelector ===

impl ObjectSelector {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    pub fn labels(&self) -> Labels {
        Labels::from(self.labels.clone())
    }
}
