//! Request payloads for the endpoints that take a body.
//!
//! Endpoint methods accept any `Serialize` value; these types spell out the
//! fields the service understands. Responses are passed through untyped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body for triggering a DAG run. Omitted fields are left to the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DagRunRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conf: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_microseconds: Option<bool>,
}

impl DagRunRequest {
    pub fn with_conf(conf: Value) -> Self {
        Self {
            conf: Some(conf),
            ..Self::default()
        }
    }
}

/// Body for creating (or updating) a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRequest {
    pub name: String,
    pub slots: u32,
    #[serde(default)]
    pub description: String,
}
