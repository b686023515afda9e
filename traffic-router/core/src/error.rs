use crate::{routes::RoutingObject, store::StoreError};
use glooedge_traffic_router_k8s_api::ResourceExt;
use std::fmt;

/// Errors that end a single reconciliation. None of these are retried here;
/// the rollouts controller calls again on its next pass.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("invalid rollout {rollout}: {reason}")]
    InvalidRollout { rollout: String, reason: String },

    #[error("{0} not found")]
    NotFound(ObjectId),

    #[error("{0} has multiple routes but canary config doesn't specify which routes to use")]
    AmbiguousRoutes(ObjectId),

    #[error(
        "some/all routes specified in canary rollout configuration do not have stable destinations in {id}: matched {matched} of {routes:?}"
    )]
    IncompleteRouteMatch {
        id: ObjectId,
        routes: Vec<String>,
        matched: usize,
    },

    #[error("couldn't find stable destinations in {kind}s selected with {selector}, with route names in {routes:?}")]
    NoMatchFound {
        kind: String,
        selector: String,
        routes: Vec<String>,
    },

    #[error("conflict while patching {id}: {message}")]
    PatchConflict { id: ObjectId, message: String },

    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },
}

/// Identifies a routing object in error messages and logs.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ObjectId {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

// === impl ObjectId ===

impl ObjectId {
    pub fn new(kind: impl ToString, namespace: impl ToString, name: impl ToString) -> Self {
        Self {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn of<K: RoutingObject>(obj: &K) -> Self {
        Self::new(
            K::kind(&()),
            obj.namespace().unwrap_or_default(),
            obj.name_any(),
        )
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}
