use crate::{
    error::{Error, ObjectId},
    routes::RoutingObject,
    store::{Store, StoreError},
};
use tracing::info;

/// Writes the changes made to `obj` since `original` was snapshotted.
///
/// Conflicts are reported as [`Error::PatchConflict`] so the caller can retry
/// the whole reconciliation against fresh copies.
pub async fn apply_patch<K, S>(store: &S, obj: &K, original: &K) -> Result<K, Error>
where
    K: RoutingObject,
    S: Store<K> + ?Sized,
{
    let id = ObjectId::of(obj);
    match store.patch(obj, original).await {
        Ok(patched) => {
            info!(%id, "Patched routing object");
            Ok(patched)
        }
        Err(StoreError::Conflict(message)) => Err(Error::PatchConflict { id, message }),
        Err(source) => Err(Error::Store {
            context: format!("failed to patch {id}"),
            source,
        }),
    }
}
