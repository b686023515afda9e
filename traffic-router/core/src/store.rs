use glooedge_traffic_router_k8s_api::Labels;

/// Reads and patches routing objects of type `K`.
///
/// Each call is atomic for a single object; nothing spans objects.
#[async_trait::async_trait]
pub trait Store<K>: Send + Sync {
    /// Fetches a single object, returning `None` if it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError>;

    /// Lists the objects in `namespace` that carry all of `labels`.
    async fn list(&self, namespace: &str, labels: &Labels) -> Result<Vec<K>, StoreError>;

    /// Writes the difference between `obj` and `original`, the snapshot taken
    /// when `obj` was fetched.
    async fn patch(&self, obj: &K, original: &K) -> Result<K, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The object changed since it was read.
    #[error("the object has been modified: {0}")]
    Conflict(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
