#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use glooedge_traffic_router_core as core;
pub use glooedge_traffic_router_k8s_api as k8s;
pub use glooedge_traffic_router_k8s_store as store;

mod args;

pub use self::args::Args;
