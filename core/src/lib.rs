//! Typed async client for a workflow orchestration REST API (DAG runs,
//! tasks, pools).
//!
//! # Overview
//! Every operation funnels through one gateway, [`Client::dispatch`], which
//! builds the request from the resolved configuration (base URL, Basic auth,
//! timeout), hands it to a [`Transport`], and normalizes the outcome:
//!
//! - success resolves to the decoded body, or `None` when there is none;
//! - failure rejects with [`ClientError::Remote`], whose payload is the
//!   service's error body, or absent when no response was received.
//!
//! # Example
//!
//! ```no_run
//! use airflow_client::{Client, ClientConfig, ClientError};
//!
//! # async fn example() -> Result<(), ClientError> {
//! let client = Client::new(ClientConfig::new("http://localhost:8080"))?;
//!
//! match client.get_pool("default_pool").await {
//!     Ok(pool) => println!("{pool:?}"),
//!     Err(e) => println!("rejected with {:?}", e.payload()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
mod dags;
pub mod error;
pub mod http;
mod pools;
mod service;
mod tasks;
pub mod transport;
pub mod types;

pub use client::{normalize, Client};
pub use config::{ClientConfig, Credentials, ResolvedConfig};
pub use error::{ClientError, RemoteError, Result, TransportError};
pub use http::{HttpRequest, HttpResponse, RequestOptions, Verb};
pub use transport::{ReqwestTransport, Transport};
pub use types::{DagRunRequest, PoolRequest};
