#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod error;
pub mod normalize;
mod patch;
pub mod rollout;
pub mod router;
pub mod routes;
mod selector;
mod store;
pub mod weight;


pub use self::{
    error::{Error, ObjectId},
    patch::apply_patch,
    rollout::RolloutContext,
    router::{GlooEdgeRouter, TrafficRouter},
    routes::{DestinationPair, RoutingObject},
    selector::resolve,
    store::{Store, StoreError},
};
pub use glooedge_traffic_router_k8s_api as k8s;

/// The traffic router type reported to the rollouts controller.
pub const ROUTER_TYPE: &str = "GlooEdgeAPI";
