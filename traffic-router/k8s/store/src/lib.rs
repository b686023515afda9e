#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Reads and patches Gloo Edge routing objects through the Kubernetes API.

use anyhow::Context;
use glooedge_traffic_router_core::{
    k8s::{self, Api, Client, Labels, ListParams, Patch, PatchParams, Resource, ResourceExt},
    RoutingObject, Store, StoreError,
};
use json_patch::PatchOperation;
use k8s_openapi::NamespaceResourceScope;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// The field manager recorded on every patch.
pub const FIELD_MANAGER: &str = "glooedge-traffic-router";

const RESOURCE_VERSION_PATH: &str = "/metadata/resourceVersion";

/// A [`Store`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

// === impl KubeStore ===

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl<K> Store<K> for KubeStore
where
    K: RoutingObject + Resource<Scope = NamespaceResourceScope> + Serialize + DeserializeOwned,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        let kind = K::kind(&());
        self.api::<K>(namespace)
            .get_opt(name)
            .await
            .map_err(|error| store_error(error, format!("getting {kind} {namespace}/{name}")))
    }

    async fn list(&self, namespace: &str, labels: &Labels) -> Result<Vec<K>, StoreError> {
        let kind = K::kind(&());
        let params = ListParams::default().labels(&labels.to_string());
        let list = self
            .api::<K>(namespace)
            .list(&params)
            .await
            .map_err(|error| store_error(error, format!("listing {kind}s in {namespace}")))?;
        Ok(list.items)
    }

    async fn patch(&self, obj: &K, original: &K) -> Result<K, StoreError> {
        let namespace = obj.namespace().unwrap_or_default();
        let name = obj.name_any();

        let modified = serde_json::to_value(obj).context("serializing routing object")?;
        let snapshot = serde_json::to_value(original).context("serializing snapshot")?;
        let patch = versioned_patch(&snapshot, &modified, original.resource_version())
            .context("building patch")?;
        tracing::debug!(%namespace, %name, ?patch, "Patching routing object");

        let kind = K::kind(&());
        let params = PatchParams::apply(FIELD_MANAGER);
        self.api::<K>(&namespace)
            .patch(&name, &params, &Patch::Json::<()>(patch))
            .await
            .map_err(|error| store_error(error, format!("patching {kind} {namespace}/{name}")))
    }
}

/// Computes the JSON patch that turns `original` into `modified`.
///
/// When the snapshot has a resource version, the patch starts with a `test`
/// of it, so the API server rejects the whole patch if the object changed
/// after the snapshot was taken.
pub fn versioned_patch(
    original: &Value,
    modified: &Value,
    resource_version: Option<String>,
) -> serde_json::Result<json_patch::Patch> {
    let json_patch::Patch(changes) = json_patch::diff(original, modified);
    let mut ops = Vec::with_capacity(changes.len() + 1);
    if let Some(version) = resource_version {
        ops.push(serde_json::from_value::<PatchOperation>(serde_json::json!({
            "op": "test",
            "path": RESOURCE_VERSION_PATH,
            "value": version,
        }))?);
    }
    ops.extend(changes);
    Ok(json_patch::Patch(ops))
}

/// Classifies an API error.
///
/// A stale write is reported either as a 409 from the update precondition or
/// as a 422 naming the failed resource version test.
fn store_error(error: k8s::Error, context: String) -> StoreError {
    match error {
        k8s::Error::Api(response)
            if response.code == 409
                || (response.code == 422 && response.message.contains(RESOURCE_VERSION_PATH)) =>
        {
            StoreError::Conflict(response.message)
        }
        error => StoreError::Other(anyhow::Error::new(error).context(context)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn api_error(code: u16, reason: &str, message: &str) -> k8s::Error {
        k8s::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn patches_only_changed_fields() {
        let original = json!({
            "metadata": { "name": "rt", "resourceVersion": "42" },
            "spec": {
                "routes": [{
                    "name": "route-1",
                    "matchers": [{ "prefix": "/" }],
                    "routeAction": {
                        "multi": {
                            "destinations": [
                                { "destination": { "upstream": { "name": "stable" } }, "weight": 90 },
                                { "destination": { "upstream": { "name": "canary" } }, "weight": 10 },
                            ],
                        },
                    },
                }],
            },
        });
        let mut modified = original.clone();
        let destinations =
            &mut modified["spec"]["routes"][0]["routeAction"]["multi"]["destinations"];
        destinations[0]["weight"] = json!(60);
        destinations[1]["weight"] = json!(40);

        let patch = versioned_patch(&original, &modified, Some("42".to_string())).unwrap();
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!([
                { "op": "test", "path": "/metadata/resourceVersion", "value": "42" },
                {
                    "op": "replace",
                    "path": "/spec/routes/0/routeAction/multi/destinations/0/weight",
                    "value": 60,
                },
                {
                    "op": "replace",
                    "path": "/spec/routes/0/routeAction/multi/destinations/1/weight",
                    "value": 40,
                },
            ])
        );
    }

    #[test]
    fn patch_applies_to_snapshot() {
        let original = json!({
            "metadata": { "name": "rt", "resourceVersion": "7" },
            "spec": {
                "routes": [{
                    "name": "route-1",
                    "routeAction": {
                        "clusterNotFoundResponseCode": "NOT_FOUND",
                        "single": { "upstream": { "name": "stable" } },
                    },
                }],
            },
        });
        let modified = json!({
            "metadata": { "name": "rt", "resourceVersion": "7" },
            "spec": {
                "routes": [{
                    "name": "route-1",
                    "routeAction": {
                        "clusterNotFoundResponseCode": "NOT_FOUND",
                        "multi": {
                            "destinations": [
                                { "destination": { "upstream": { "name": "stable" } }, "weight": 75 },
                                { "destination": { "upstream": { "name": "canary" } }, "weight": 25 },
                            ],
                        },
                    },
                }],
            },
        });

        let patch = versioned_patch(&original, &modified, Some("7".to_string())).unwrap();
        let mut patched = original.clone();
        json_patch::patch(&mut patched, &patch).unwrap();
        assert_eq!(patched, modified);

        // A newer object fails the version test.
        let mut stale = original;
        stale["metadata"]["resourceVersion"] = json!("8");
        assert!(json_patch::patch(&mut stale, &patch).is_err());
    }

    #[test]
    fn unversioned_patch_has_no_test() {
        let obj = json!({ "spec": { "routes": [] } });
        let patch = versioned_patch(&obj, &obj, None).unwrap();
        assert!(patch.0.is_empty());
    }

    #[test]
    fn conflicts_are_classified() {
        let conflict = store_error(
            api_error(
                409,
                "Conflict",
                "Operation cannot be fulfilled on routetables.gateway.solo.io \"rt\": the object has been modified",
            ),
            "patching RouteTable ns/rt".to_string(),
        );
        assert!(
            matches!(
                &conflict,
                StoreError::Conflict(message) if message.contains("has been modified")
            ),
            "{conflict}"
        );

        let failed_test = store_error(
            api_error(422, "", "testing value /metadata/resourceVersion failed: test failed"),
            "patching RouteTable ns/rt".to_string(),
        );
        assert!(matches!(failed_test, StoreError::Conflict(_)), "{failed_test}");
    }

    #[test]
    fn other_errors_keep_context() {
        for error in [
            api_error(403, "Forbidden", "routetables.gateway.solo.io is forbidden"),
            api_error(422, "Invalid", "spec.routes[0]: Invalid value"),
        ] {
            let error = store_error(error, "patching RouteTable ns/rt".to_string());
            assert!(matches!(error, StoreError::Other(_)), "{error}");
            assert_eq!(error.to_string(), "patching RouteTable ns/rt");
        }
    }
}
