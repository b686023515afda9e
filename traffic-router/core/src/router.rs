//! The traffic router operations invoked by the rollouts controller.

use crate::{
    error::Error,
    normalize,
    patch::apply_patch,
    rollout::RolloutContext,
    routes::{self, DestinationPair, RoutingObject},
    selector,
    store::Store,
    weight::{self, Weights},
    ROUTER_TYPE,
};
use glooedge_traffic_router_k8s_api::{ObjectSelector, RouteTable, VirtualService};
use tracing::{debug, info};

/// A traffic router as seen by the rollouts controller.
#[async_trait::async_trait]
pub trait TrafficRouter: Send + Sync {
    /// Sends `desired` percent of the rollout's traffic to the canary.
    async fn set_weight(&self, rollout: &RolloutContext, desired: i32) -> Result<(), Error>;

    /// Reports whether the routing objects already carry `desired`.
    async fn verify_weight(&self, rollout: &RolloutContext, desired: i32) -> Result<bool, Error>;

    /// Routing is by service name, so pod template hashes are irrelevant.
    async fn update_hash(
        &self,
        _rollout: &RolloutContext,
        _canary_hash: &str,
        _stable_hash: &str,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// The canary destination is left in place with a zero weight once the
    /// rollout completes, so there is nothing to remove.
    async fn remove_managed_routes(&self, _rollout: &RolloutContext) -> Result<(), Error> {
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        ROUTER_TYPE
    }
}

/// Manages weights in either Gloo Edge route tables or virtual services,
/// depending on which selector a rollout configures.
#[derive(Clone, Debug)]
pub struct GlooEdgeRouter<R, V> {
    pub(crate) route_tables: R,
    pub(crate) virtual_services: V,
}

/// A routing object working copy alongside its snapshot and matched pairs.
struct Matched<K> {
    obj: K,
    original: K,
    pairs: Vec<DestinationPair>,
}

// === impl GlooEdgeRouter ===

impl<R, V> GlooEdgeRouter<R, V>
where
    R: Store<RouteTable>,
    V: Store<VirtualService>,
{
    pub fn new(route_tables: R, virtual_services: V) -> Self {
        Self {
            route_tables,
            virtual_services,
        }
    }
}

#[async_trait::async_trait]
impl<R, V> TrafficRouter for GlooEdgeRouter<R, V>
where
    R: Store<RouteTable>,
    V: Store<VirtualService>,
{
    async fn set_weight(&self, rollout: &RolloutContext, desired: i32) -> Result<(), Error> {
        let weights = Weights::for_canary(desired);
        match selected(rollout)? {
            Selected::RouteTables(selector) => {
                set_weight(&self.route_tables, selector, rollout, weights).await
            }
            Selected::VirtualServices(selector) => {
                set_weight(&self.virtual_services, selector, rollout, weights).await
            }
        }
    }

    async fn verify_weight(&self, rollout: &RolloutContext, desired: i32) -> Result<bool, Error> {
        let weights = Weights::for_canary(desired);
        match selected(rollout)? {
            Selected::RouteTables(selector) => {
                verify_weight(&self.route_tables, selector, rollout, weights).await
            }
            Selected::VirtualServices(selector) => {
                verify_weight(&self.virtual_services, selector, rollout, weights).await
            }
        }
    }
}

enum Selected<'a> {
    RouteTables(&'a ObjectSelector),
    VirtualServices(&'a ObjectSelector),
}

fn selected(rollout: &RolloutContext) -> Result<Selected<'_>, Error> {
    match (
        rollout.config.route_table_selector.as_ref(),
        rollout.config.virtual_service_selector.as_ref(),
    ) {
        (Some(rts), None) => Ok(Selected::RouteTables(rts)),
        (None, Some(vss)) => Ok(Selected::VirtualServices(vss)),
        _ => Err(Error::InvalidSelector(
            "exactly one of routeTableSelector or virtualServiceSelector must be configured"
                .to_string(),
        )),
    }
}

/// Fetches the selected objects, snapshots them, and matches their
/// destinations. Objects without matches are dropped.
async fn matched<K, S>(
    store: &S,
    selector: &ObjectSelector,
    rollout: &RolloutContext,
) -> Result<Vec<Matched<K>>, Error>
where
    K: RoutingObject,
    S: Store<K> + ?Sized,
{
    if selector.namespace().is_none() {
        debug!(
            namespace = %rollout.namespace,
            rollout = %rollout.name,
            "Defaulting selector namespace to the rollout namespace"
        );
    }
    let objs = selector::resolve(store, selector, &rollout.namespace).await?;

    let mut matched = Vec::with_capacity(objs.len());
    for obj in objs {
        let original = obj.clone();
        let pairs = routes::match_object(
            &obj,
            &rollout.stable_service,
            &rollout.canary_service,
            &rollout.config.routes,
        )?;
        if pairs.is_empty() {
            continue;
        }
        matched.push(Matched {
            obj,
            original,
            pairs,
        });
    }

    if matched.is_empty() {
        return Err(Error::NoMatchFound {
            kind: K::kind(&()).to_string(),
            selector: selector::describe(selector, &rollout.namespace),
            routes: rollout.config.routes.clone(),
        });
    }
    Ok(matched)
}

async fn set_weight<K, S>(
    store: &S,
    selector: &ObjectSelector,
    rollout: &RolloutContext,
    weights: Weights,
) -> Result<(), Error>
where
    K: RoutingObject,
    S: Store<K> + ?Sized,
{
    let mut matched = matched(store, selector, rollout).await?;

    for Matched { obj, pairs, .. } in &mut matched {
        normalize::normalize(obj.routes_mut(), pairs, &rollout.canary_service);
    }

    for Matched { obj, pairs, .. } in &mut matched {
        weight::assign(obj.routes_mut(), pairs, weights);
    }

    for Matched { obj, original, .. } in &matched {
        apply_patch(store, obj, original).await?;
    }

    info!(
        rollout = %rollout.name,
        namespace = %rollout.namespace,
        stable = weights.stable,
        canary = weights.canary,
        objects = matched.len(),
        "Set weights"
    );
    Ok(())
}

async fn verify_weight<K, S>(
    store: &S,
    selector: &ObjectSelector,
    rollout: &RolloutContext,
    weights: Weights,
) -> Result<bool, Error>
where
    K: RoutingObject,
    S: Store<K> + ?Sized,
{
    let matched = matched(store, selector, rollout).await?;
    let verified = matched.iter().all(|Matched { obj, pairs, .. }| {
        pairs
            .iter()
            .all(|pair| weight::verify(obj.routes(), pair, weights))
    });
    debug!(rollout = %rollout.name, verified, "Verified weights");
    Ok(verified)
}
