//! The subset of Gloo Edge's `gateway.solo.io/v1` API that carries weighted
//! routing decisions.
//!
//! Only the fields the router reads or writes are modeled. Everything else on
//! a route, route action or destination is kept in a flattened `extra` map so
//! that a round-trip through these types never loses configuration.

pub mod route_table;
pub mod virtual_service;

pub use self::{
    route_table::{RouteTable, RouteTableSpec},
    virtual_service::{VirtualHost, VirtualService, VirtualServiceSpec},
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const API_GROUP: &str = "gateway.solo.io";

/// Unmodeled fields, carried through unchanged.
pub type Extra = BTreeMap<String, serde_json::Value>;

/// A named rule within a routing object.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_action: Option<RouteAction>,

    /// Matchers, options and the non-routing actions (delegate, redirect,
    /// direct response).
    #[serde(flatten)]
    pub extra: Extra,
}

/// Where a route forwards matching traffic.
///
/// Gloo accepts one of several destination kinds here. Only `single` and
/// `multi` are modeled; upstream groups, cluster headers and settings such as
/// `clusterNotFoundResponseCode` stay in `extra`. An action with neither
/// `single` nor `multi` is not weighted by the router.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteAction {
    /// A single destination; the shorthand for a one-entry `multi`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single: Option<Destination>,

    /// A weighted set of destinations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi: Option<MultiDestination>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MultiDestination {
    #[serde(default)]
    pub destinations: Vec<WeightedDestination>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeightedDestination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,

    /// Per-destination options.
    #[serde(flatten)]
    pub extra: Extra,
}

/// A traffic target. The router only understands upstream references; kube
/// service and consul destinations are preserved but never matched.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<ResourceRef>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ResourceRef {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

// === impl Route ===

impl Route {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

// === impl RouteAction ===

impl From<Destination> for RouteAction {
    fn from(single: Destination) -> Self {
        Self {
            single: Some(single),
            ..Default::default()
        }
    }
}

impl From<MultiDestination> for RouteAction {
    fn from(multi: MultiDestination) -> Self {
        Self {
            multi: Some(multi),
            ..Default::default()
        }
    }
}

// === impl WeightedDestination ===

impl WeightedDestination {
    pub fn upstream(name: impl ToString, weight: Option<u32>) -> Self {
        Self {
            destination: Some(Destination::upstream(name)),
            weight,
            extra: Extra::default(),
        }
    }

    /// The name of the upstream this destination forwards to, if it has one.
    pub fn backend_name(&self) -> Option<&str> {
        self.destination.as_ref()?.backend_name()
    }
}

impl From<Destination> for WeightedDestination {
    fn from(destination: Destination) -> Self {
        Self {
            destination: Some(destination),
            weight: None,
            extra: Extra::default(),
        }
    }
}

// === impl Destination ===

impl Destination {
    pub fn upstream(name: impl ToString) -> Self {
        Self {
            upstream: Some(ResourceRef {
                name: name.to_string(),
                namespace: None,
            }),
            extra: Extra::default(),
        }
    }

    pub fn backend_name(&self) -> Option<&str> {
        let name = self.upstream.as_ref()?.name.as_str();
        if name.is_empty() {
            return None;
        }
        Some(name)
    }

    /// Points this destination at a different upstream, keeping the upstream
    /// namespace and every other setting.
    pub fn set_backend_name(&mut self, name: impl ToString) {
        self.upstream.get_or_insert_with(ResourceRef::default).name = name.to_string();
    }
}
