//! Service health.

use serde_json::Value;

use crate::client::Client;
use crate::error::Result;
use crate::http::Verb;

impl Client {
    /// Health check against the API's `test` route.
    pub async fn check_health(&self) -> Result<Option<Value>> {
        self.dispatch(Verb::Get, "test", None, None).await
    }
}
