//! Pool management.

use serde::Serialize;
use serde_json::Value;

use crate::client::Client;
use crate::error::Result;
use crate::http::Verb;

impl Client {
    pub async fn list_pools(&self) -> Result<Option<Value>> {
        self.dispatch(Verb::Get, "pools", None, None).await
    }

    pub async fn get_pool(&self, name: &str) -> Result<Option<Value>> {
        self.dispatch(Verb::Get, &format!("pools/{name}"), None, None)
            .await
    }

    /// Delete a pool. Resolves to the deleted pool as reported by the service.
    pub async fn delete_pool(&self, name: &str) -> Result<Option<Value>> {
        self.dispatch(Verb::Delete, &format!("pools/{name}"), None, None)
            .await
    }

    /// Create a pool, or update it if the name already exists.
    ///
    /// See [`PoolRequest`](crate::PoolRequest) for the body shape.
    pub async fn create_pool<T: Serialize + ?Sized>(&self, body: &T) -> Result<Option<Value>> {
        self.send_json(Verb::Post, "pools", body).await
    }
}
