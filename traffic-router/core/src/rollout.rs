use crate::error::Error;
use glooedge_traffic_router_k8s_api::{plugin::PLUGIN_NAME, PluginConfig, ResourceExt, Rollout};

/// Everything the router needs to know about the rollout it is acting for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RolloutContext {
    pub namespace: String,
    pub name: String,
    pub stable_service: String,
    pub canary_service: String,
    pub config: PluginConfig,
}

// === impl RolloutContext ===

impl RolloutContext {
    /// Reads the service names and the router's plugin configuration from a
    /// canary rollout.
    pub fn from_rollout(rollout: &Rollout) -> Result<Self, Error> {
        let namespace = rollout.namespace().unwrap_or_default();
        let name = rollout.name_any();
        let invalid = |reason: String| Error::InvalidRollout {
            rollout: format!("{namespace}/{name}"),
            reason,
        };

        let Some(canary) = rollout.spec.strategy.canary.as_ref() else {
            return Err(invalid("only the canary strategy is supported".to_string()));
        };
        let blob = rollout
            .traffic_router_plugin(PLUGIN_NAME)
            .ok_or_else(|| invalid(format!("missing {PLUGIN_NAME} traffic router configuration")))?;
        let config = serde_json::from_value::<PluginConfig>(blob.clone())
            .map_err(|error| invalid(format!("invalid {PLUGIN_NAME} configuration: {error}")))?;

        Ok(Self {
            stable_service: canary.stable_service.clone(),
            canary_service: canary.canary_service.clone(),
            config,
            namespace,
            name,
        })
    }
}
