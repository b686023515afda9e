use crate::{
    error::{Error, ObjectId},
    routes::RoutingObject,
    store::Store,
};
use glooedge_traffic_router_k8s_api::ObjectSelector;
use tracing::debug;

/// Fetches the routing objects `selector` refers to, in store order.
///
/// `namespace` is the namespace to search when the selector names none.
pub async fn resolve<K, S>(
    store: &S,
    selector: &ObjectSelector,
    namespace: &str,
) -> Result<Vec<K>, Error>
where
    K: RoutingObject,
    S: Store<K> + ?Sized,
{
    let kind = K::kind(&());
    let labels = selector.labels();
    if selector.name().is_none() && labels.is_empty() {
        return Err(Error::InvalidSelector(format!(
            "name or labels field must be set in {kind} selector"
        )));
    }

    let namespace = selector.namespace().unwrap_or(namespace);

    if let Some(name) = selector.name() {
        debug!(%namespace, %name, %kind, "Getting routing object");
        let obj = store.get(namespace, name).await.map_err(|source| Error::Store {
            context: format!("failed to get {kind} {namespace}/{name}"),
            source,
        })?;
        return match obj {
            Some(obj) => Ok(vec![obj]),
            None => Err(Error::NotFound(ObjectId::new(kind, namespace, name))),
        };
    }

    debug!(%namespace, %labels, %kind, "Listing routing objects");
    let objs = store
        .list(namespace, &labels)
        .await
        .map_err(|source| Error::Store {
            context: format!("failed to list {kind}s in {namespace} with labels {labels}"),
            source,
        })?;
    debug!(%namespace, %labels, %kind, found = objs.len(), "Listed routing objects");
    Ok(objs)
}

/// Describes a selector for error messages.
pub(crate) fn describe(selector: &ObjectSelector, namespace: &str) -> String {
    format!(
        "Name: '{}', Namespace: '{}', Labels: '{}'",
        selector.name().unwrap_or_default(),
        selector.namespace().unwrap_or(namespace),
        selector.labels(),
    )
}
