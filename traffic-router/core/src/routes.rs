//! Finds the stable and canary destinations within a routing object's routes.
//!
//! Destinations are matched by upstream name only, ignoring case. The
//! controller knows the logical service names, not which slot of a route
//! they occupy.

use crate::error::{Error, ObjectId};
use glooedge_traffic_router_k8s_api::{
    gloo::{Route, RouteAction, RouteTable, VirtualService, WeightedDestination},
    Resource,
};
use tracing::debug;

/// A resource holding an ordered list of routes.
pub trait RoutingObject: Resource<DynamicType = ()> + Clone + std::fmt::Debug + Send + Sync {
    fn routes(&self) -> &[Route];

    fn routes_mut(&mut self) -> &mut [Route];
}

/// Locates a matched stable destination, and its canary when one exists,
/// within a routing object's working copy.
///
/// Positions are indices rather than references so that the routes can be
/// rewritten in place while pairs are held.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DestinationPair {
    /// The route's position in the object's route list.
    pub route: usize,

    /// The stable destination's position in the route's destination list. A
    /// `single` route's destination is at position 0.
    pub stable: usize,

    pub canary: Option<usize>,
}

// === impl RoutingObject ===

impl RoutingObject for RouteTable {
    fn routes(&self) -> &[Route] {
        &self.spec.routes
    }

    fn routes_mut(&mut self) -> &mut [Route] {
        &mut self.spec.routes
    }
}

impl RoutingObject for VirtualService {
    fn routes(&self) -> &[Route] {
        match self.spec.virtual_host.as_ref() {
            Some(vh) => vh.routes.as_slice(),
            None => &[],
        }
    }

    fn routes_mut(&mut self) -> &mut [Route] {
        match self.spec.virtual_host.as_mut() {
            Some(vh) => vh.routes.as_mut_slice(),
            None => &mut [],
        }
    }
}

// === impl DestinationPair ===

impl DestinationPair {
    fn single(route: usize) -> Self {
        Self {
            route,
            stable: 0,
            canary: None,
        }
    }
}

/// Matches the stable/canary destinations of every eligible route in `obj`.
///
/// An object without routes yields no pairs. When `allowed` is empty the
/// object must hold exactly one route; otherwise only the named routes are
/// considered and each of them must yield a pair.
pub fn match_object<K: RoutingObject>(
    obj: &K,
    stable: &str,
    canary: &str,
    allowed: &[String],
) -> Result<Vec<DestinationPair>, Error> {
    let id = ObjectId::of(obj);
    let routes = obj.routes();

    if routes.is_empty() {
        debug!(%id, "Skipping routing object without routes");
        return Ok(Vec::new());
    }

    if routes.len() > 1 && allowed.is_empty() {
        return Err(Error::AmbiguousRoutes(id));
    }

    let pairs = match_routes(routes, stable, canary, allowed);
    if !allowed.is_empty() && pairs.len() != allowed.len() {
        return Err(Error::IncompleteRouteMatch {
            id,
            routes: allowed.to_vec(),
            matched: pairs.len(),
        });
    }

    debug!(%id, pairs = pairs.len(), "Matched destinations");
    Ok(pairs)
}

/// Scans routes in order, skipping those outside a non-empty allow-list and
/// those without a stable destination.
pub fn match_routes(
    routes: &[Route],
    stable: &str,
    canary: &str,
    allowed: &[String],
) -> Vec<DestinationPair> {
    let mut pairs = Vec::new();
    for (idx, route) in routes.iter().enumerate() {
        if !allowed.is_empty() && !allowed.iter().any(|name| name == route.name()) {
            debug!(route = %route.name(), "Skipping route not in the configured route list");
            continue;
        }

        match route.route_action.as_ref() {
            Some(RouteAction {
                single: Some(dst), ..
            }) => {
                if dst
                    .backend_name()
                    .is_some_and(|name| name.eq_ignore_ascii_case(stable))
                {
                    pairs.push(DestinationPair::single(idx));
                }
            }
            Some(RouteAction {
                multi: Some(multi), ..
            }) => {
                if let Some(pair) = match_destinations(idx, &multi.destinations, stable, canary) {
                    pairs.push(pair);
                }
            }
            _ => {
                debug!(route = %route.name(), "Skipping route without weighted destinations");
            }
        }
    }
    pairs
}

fn match_destinations(
    route: usize,
    destinations: &[WeightedDestination],
    stable: &str,
    canary: &str,
) -> Option<DestinationPair> {
    let mut stable_idx = None;
    let mut canary_idx = None;
    for (idx, dst) in destinations.iter().enumerate() {
        let Some(name) = dst.backend_name() else {
            continue;
        };
        if name.eq_ignore_ascii_case(canary) {
            canary_idx = canary_idx.or(Some(idx));
        } else if name.eq_ignore_ascii_case(stable) {
            stable_idx = stable_idx.or(Some(idx));
        }
    }

    Some(DestinationPair {
        route,
        stable: stable_idx?,
        canary: canary_idx,
    })
}

/// The destination list a pair indexes into, once the route is in multi form.
pub(crate) fn destinations_mut(route: &mut Route) -> Option<&mut Vec<WeightedDestination>> {
    let multi = route.route_action.as_mut()?.multi.as_mut()?;
    Some(&mut multi.destinations)
}

pub(crate) fn destinations(route: &Route) -> Option<&[WeightedDestination]> {
    let multi = route.route_action.as_ref()?.multi.as_ref()?;
    Some(&multi.destinations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{mk_multi, mk_route, mk_route_table, mk_single};
    use pretty_assertions::assert_eq;

    fn routes(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn matches_stable_and_canary() {
        let rts = vec![mk_route(
            "route-1",
            mk_multi(&[("stable", Some(90)), ("canary", Some(10))]),
        )];
        assert_eq!(
            match_routes(&rts, "stable", "canary", &[]),
            vec![DestinationPair {
                route: 0,
                stable: 0,
                canary: Some(1),
            }]
        );
    }

    #[test]
    fn matches_case_insensitively() {
        let rts = vec![mk_route(
            "route-1",
            mk_multi(&[("Canary-Svc", None), ("Stable-Svc", None)]),
        )];
        assert_eq!(
            match_routes(&rts, "stable-svc", "canary-svc", &[]),
            vec![DestinationPair {
                route: 0,
                stable: 1,
                canary: Some(0),
            }]
        );
    }

    #[test]
    fn first_matching_destination_wins() {
        let rts = vec![mk_route(
            "route-1",
            mk_multi(&[
                ("other", Some(5)),
                ("stable", Some(45)),
                ("canary", Some(5)),
                ("stable", Some(40)),
                ("canary", Some(5)),
            ]),
        )];
        assert_eq!(
            match_routes(&rts, "stable", "canary", &[]),
            vec![DestinationPair {
                route: 0,
                stable: 1,
                canary: Some(2),
            }]
        );
    }

    #[test]
    fn canary_alone_is_not_a_match() {
        let rts = vec![mk_route("route-1", mk_multi(&[("canary", Some(100))]))];
        assert!(match_routes(&rts, "stable", "canary", &[]).is_empty());

        let rts = vec![mk_route("route-1", mk_single("canary"))];
        assert!(match_routes(&rts, "stable", "canary", &[]).is_empty());
    }

    #[test]
    fn single_destination_has_no_canary() {
        let rts = vec![mk_route("route-1", mk_single("STABLE"))];
        assert_eq!(
            match_routes(&rts, "stable", "canary", &[]),
            vec![DestinationPair {
                route: 0,
                stable: 0,
                canary: None,
            }]
        );
    }

    #[test]
    fn skips_nameless_destinations_and_actionless_routes() {
        let mut multi = mk_multi(&[("stable", Some(100))]);
        if let Some(m) = multi.multi.as_mut() {
            m.destinations.insert(0, WeightedDestination::default());
        }
        let rts = vec![
            mk_route("route-1", multi),
            Route {
                name: Some("route-2".to_string()),
                ..Default::default()
            },
            mk_route("route-3", RouteAction::default()),
        ];
        assert_eq!(
            match_routes(
                &rts,
                "stable",
                "canary",
                &routes(&["route-1", "route-2", "route-3"])
            ),
            vec![DestinationPair {
                route: 0,
                stable: 1,
                canary: None,
            }]
        );
    }

    #[test]
    fn allow_list_is_case_sensitive() {
        let rts = vec![
            mk_route("Route-1", mk_single("stable")),
            mk_route("route-2", mk_single("stable")),
        ];
        assert_eq!(
            match_routes(&rts, "stable", "canary", &routes(&["route-1", "route-2"])),
            vec![DestinationPair::single(1)]
        );
    }

    #[test]
    fn rejects_ambiguous_routes() {
        // The destinations are irrelevant: two routes without an allow-list
        // are always ambiguous.
        for rts in [
            vec![
                mk_route("route-1", mk_single("stable")),
                mk_route("route-2", mk_single("stable")),
            ],
            vec![mk_route("route-1", mk_single("a")), Route::default()],
        ] {
            let rt = mk_route_table("ns", "rt", rts);
            assert!(matches!(
                match_object(&rt, "stable", "canary", &[]),
                Err(Error::AmbiguousRoutes(id)) if id == ObjectId::new("RouteTable", "ns", "rt")
            ));
        }
    }

    #[test]
    fn object_without_routes_yields_nothing() {
        let rt = mk_route_table("ns", "rt", vec![]);
        assert!(match_object(&rt, "stable", "canary", &routes(&["route-1"]))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn every_allowed_route_must_match() {
        let rt = mk_route_table(
            "ns",
            "rt",
            vec![
                mk_route("route-1", mk_single("stable")),
                mk_route("route-2", mk_multi(&[("other", Some(100))])),
            ],
        );
        match match_object(&rt, "stable", "canary", &routes(&["route-1", "route-2"])) {
            Err(Error::IncompleteRouteMatch { matched, routes, .. }) => {
                assert_eq!(matched, 1);
                assert_eq!(routes, vec!["route-1", "route-2"]);
            }
            res => panic!("unexpected result: {res:?}"),
        }
    }
}
