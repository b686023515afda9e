#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod gloo;
pub mod labels;
pub mod plugin;
pub mod rollout;

pub use self::{
    gloo::{RouteTable, VirtualService},
    labels::Labels,
    plugin::{ObjectSelector, PluginConfig},
    rollout::Rollout,
};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
pub use kube::{
    api::{Api, ListParams, Patch, PatchParams},
    Client, Error, Resource, ResourceExt,
};
