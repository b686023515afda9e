//! Brings every matched route into the multi-destination form with both a
//! stable and a canary destination, so weights can be assigned uniformly.

use crate::routes::{self, DestinationPair};
use glooedge_traffic_router_k8s_api::gloo::{MultiDestination, Route};
use tracing::debug;

/// Rewrites `single` routes as `multi` and appends a zero-weight canary,
/// cloned from the stable destination, wherever one is missing.
///
/// Pairs are updated to point at the rewritten destinations. Routes that are
/// already normalized are left untouched.
pub fn normalize(routes: &mut [Route], pairs: &mut [DestinationPair], canary: &str) {
    for pair in pairs.iter_mut() {
        let Some(route) = routes.get_mut(pair.route) else {
            continue;
        };

        let name = route.name().to_string();
        if let Some(action) = route.route_action.as_mut() {
            if let Some(dst) = action.single.take() {
                debug!(route = %name, "Converting single destination to multi");
                pair.stable = 0;
                action.multi = Some(MultiDestination {
                    destinations: vec![dst.into()],
                    ..Default::default()
                });
            }
        }

        if pair.canary.is_some() {
            continue;
        }

        let Some(destinations) = routes::destinations_mut(route) else {
            continue;
        };
        let Some(mut dst) = destinations.get(pair.stable).cloned() else {
            continue;
        };
        if let Some(d) = dst.destination.as_mut() {
            d.set_backend_name(canary);
        }
        dst.weight = Some(0);
        debug!(route = %name, %canary, "Adding canary destination");
        destinations.push(dst);
        pair.canary = Some(destinations.len() - 1);
    }
}
