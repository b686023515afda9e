use crate::routes::{self, DestinationPair};
use glooedge_traffic_router_k8s_api::gloo::Route;

/// The stable/canary split for a desired canary percentage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Weights {
    pub stable: u32,
    pub canary: u32,
}

// === impl Weights ===

impl Weights {
    /// The rollouts controller only sends weights in `[0, 100]`; other values
    /// are passed through as-is and wrap when cast to the unsigned weight.
    pub fn for_canary(desired: i32) -> Self {
        Self {
            stable: 100i32.wrapping_sub(desired) as u32,
            canary: desired as u32,
        }
    }
}

/// Sets the weights of every normalized pair.
pub fn assign(routes: &mut [Route], pairs: &[DestinationPair], weights: Weights) {
    for pair in pairs {
        let Some(canary) = pair.canary else {
            continue;
        };
        let Some(destinations) = routes
            .get_mut(pair.route)
            .and_then(routes::destinations_mut)
        else {
            continue;
        };
        if let Some(dst) = destinations.get_mut(pair.stable) {
            dst.weight = Some(weights.stable);
        }
        if let Some(dst) = destinations.get_mut(canary) {
            dst.weight = Some(weights.canary);
        }
    }
}

/// Checks that a pair already carries `weights`.
///
/// A route without a canary destination only sends all traffic to stable, so
/// it is verified exactly when no canary traffic is desired.
pub fn verify(routes: &[Route], pair: &DestinationPair, weights: Weights) -> bool {
    let Some(canary) = pair.canary else {
        return weights.canary == 0;
    };
    let Some(destinations) = routes.get(pair.route).and_then(routes::destinations) else {
        return false;
    };
    let weight = |idx: usize| destinations.get(idx).and_then(|dst| dst.weight);
    weight(pair.stable) == Some(weights.stable) && weight(canary) == Some(weights.canary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{mk_multi, mk_route};
    use pretty_assertions::assert_eq;

    #[test]
    fn weights_sum_to_100() {
        for desired in 0..=100 {
            let Weights { stable, canary } = Weights::for_canary(desired);
            assert_eq!(stable + canary, 100, "desired weight {desired}");
            assert_eq!(canary, desired as u32);
        }
    }

    #[test]
    fn assigns_pair_weights() {
        let mut routes = vec![mk_route(
            "route-1",
            mk_multi(&[("other", Some(7)), ("stable", Some(90)), ("canary", Some(10))]),
        )];
        let pairs = [DestinationPair {
            route: 0,
            stable: 1,
            canary: Some(2),
        }];

        assign(&mut routes, &pairs, Weights::for_canary(40));

        assert_eq!(
            routes[0].route_action,
            Some(mk_multi(&[
                ("other", Some(7)),
                ("stable", Some(60)),
                ("canary", Some(40)),
            ]))
        );
        assert!(verify(&routes, &pairs[0], Weights::for_canary(40)));
        assert!(!verify(&routes, &pairs[0], Weights::for_canary(50)));
    }

    #[test]
    fn missing_canary_verifies_only_at_zero() {
        let routes = vec![mk_route("route-1", mk_multi(&[("stable", None)]))];
        let pair = DestinationPair {
            route: 0,
            stable: 0,
            canary: None,
        };
        assert!(verify(&routes, &pair, Weights::for_canary(0)));
        assert!(!verify(&routes, &pair, Weights::for_canary(10)));
    }
}
