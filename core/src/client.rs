//! The dispatch gateway every endpoint goes through.
//!
//! # Design
//! `Client` owns one resolved configuration and one transport. A call is
//! three steps: `build_request` turns (verb, path, body, options) into an
//! `HttpRequest`, the transport executes it, and `normalize` reduces the
//! response to its payload or a `RemoteError`. The first and last steps are
//! pure, so they are tested without a network.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ClientConfig, ResolvedConfig};
use crate::error::{RemoteError, Result};
use crate::http::{HttpRequest, HttpResponse, RequestOptions, Verb};
use crate::transport::{ReqwestTransport, Transport};

/// Typed client for the workflow orchestration REST API.
///
/// # Example
///
/// ```no_run
/// use airflow_client::{Client, ClientConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new(
///     ClientConfig::new("http://localhost:8080").with_credentials("admin", "admin"),
/// )?;
///
/// let pools = client.list_pools().await?;
/// println!("{pools:?}");
/// # Ok(())
/// # }
/// ```
pub struct Client {
    config: ResolvedConfig,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Create a client that talks HTTP through `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if `host` is empty or the HTTP
    /// client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let config = config.resolve()?;
        let transport = ReqwestTransport::new(config.timeout())?;
        Ok(Self {
            config,
            transport: Arc::new(transport),
        })
    }

    /// Create a client over a caller-supplied transport.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if `host` is empty.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self {
            config: config.resolve()?,
            transport,
        })
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Build the request for one call without sending it.
    ///
    /// GET and DELETE ignore `body` and `options`. POST and PUT encode `body`
    /// as JSON and apply `options`' headers and timeout.
    pub fn build_request(
        &self,
        verb: Verb,
        path: &str,
        body: Option<&Value>,
        options: Option<&RequestOptions>,
    ) -> HttpRequest {
        let mut request = HttpRequest {
            method: verb,
            url: self.config.url(path),
            headers: Vec::new(),
            body: None,
            timeout: self.config.timeout(),
        };

        match verb {
            Verb::Get | Verb::Delete => {}
            Verb::Post | Verb::Put => {
                if let Some(body) = body {
                    request
                        .headers
                        .push(("content-type".to_string(), "application/json".to_string()));
                    request.body = Some(body.to_string());
                }
                if let Some(options) = options {
                    request.headers.extend(options.headers.iter().cloned());
                    if let Some(timeout) = options.timeout {
                        request.timeout = timeout;
                    }
                }
            }
        }

        if let Some(credentials) = self.config.credentials() {
            request
                .headers
                .push(("authorization".to_string(), credentials.header_value()));
        }

        request
    }

    /// Send one request and normalize its outcome.
    ///
    /// Resolves to the decoded response payload, or `None` when the response
    /// carried none.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Remote` for any non-2xx response (payload = the
    /// error body) or transport failure (no payload).
    pub async fn dispatch(
        &self,
        verb: Verb,
        path: &str,
        body: Option<&Value>,
        options: Option<&RequestOptions>,
    ) -> Result<Option<Value>> {
        let request = self.build_request(verb, path, body, options);
        debug!(verb = %verb, url = %request.url, "dispatching request");

        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(cause) => {
                warn!(verb = %verb, path, error = %cause, "transport failure");
                return Err(RemoteError::from_transport(cause).into());
            }
        };

        let status = response.status;
        match normalize(response) {
            Ok(payload) => {
                debug!(verb = %verb, path, status, "request succeeded");
                Ok(payload)
            }
            Err(err) => {
                warn!(verb = %verb, path, status, "request rejected");
                Err(err.into())
            }
        }
    }

    /// Serialize `body` and dispatch it with POST or PUT.
    pub(crate) async fn send_json<T: Serialize + ?Sized>(
        &self,
        verb: Verb,
        path: &str,
        body: &T,
    ) -> Result<Option<Value>> {
        let body = serde_json::to_value(body)?;
        self.dispatch(verb, path, Some(&body), None).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Reduce a response to its payload.
///
/// 2xx: `None` for an empty body or JSON `null`, otherwise the decoded JSON,
/// or the raw text if it is not JSON. Anything else is a `RemoteError` whose
/// payload is decoded the same way.
pub fn normalize(response: HttpResponse) -> std::result::Result<Option<Value>, RemoteError> {
    let success = response.is_success();
    let payload = decode_payload(response.body);
    if success {
        Ok(payload)
    } else {
        Err(RemoteError::from_response(response.status, payload))
    }
}

fn decode_payload(body: String) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(body)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::{ClientError, TransportError};

    /// Records every request and replays a canned outcome.
    struct Recorder {
        outcome: std::result::Result<HttpResponse, TransportError>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn execute(
            &self,
            request: HttpRequest,
        ) -> std::result::Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.outcome.clone()
        }
    }

    fn respond(status: u16, body: &str) -> Arc<Recorder> {
        Arc::new(Recorder {
            outcome: Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            }),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn client_with(config: ClientConfig, transport: Arc<Recorder>) -> Client {
        Client::with_transport(config, transport).unwrap()
    }

    fn client() -> Client {
        client_with(ClientConfig::new("http://af.local"), respond(200, ""))
    }

    #[test]
    fn get_never_carries_a_body() {
        let req = client().build_request(
            Verb::Get,
            "test",
            Some(&json!({"ignored": true})),
            Some(&RequestOptions::new().with_header("x-extra", "1")),
        );
        assert_eq!(req.method, Verb::Get);
        assert_eq!(req.url, "http://af.local/api/v1/test");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
        assert_eq!(req.timeout, Duration::from_millis(10_000));
    }

    #[test]
    fn delete_ignores_options() {
        let req = client().build_request(
            Verb::Delete,
            "pools/p1",
            Some(&json!({})),
            Some(&RequestOptions::new().with_timeout(Duration::from_millis(5))),
        );
        assert!(req.body.is_none());
        assert_eq!(req.timeout, Duration::from_millis(10_000));
    }

    #[test]
    fn post_encodes_body_and_applies_options() {
        let options = RequestOptions::new()
            .with_header("x-request-id", "abc")
            .with_timeout(Duration::from_millis(250));
        let req = client().build_request(
            Verb::Post,
            "dags/dag1/dag_runs",
            Some(&json!({"conf": {}})),
            Some(&options),
        );
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("x-request-id"), Some("abc"));
        assert_eq!(req.timeout, Duration::from_millis(250));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"conf": {}}));
    }

    #[test]
    fn put_without_body_sends_none() {
        let req = client().build_request(Verb::Put, "pools", None, None);
        assert!(req.body.is_none());
        assert!(req.header("content-type").is_none());
    }

    #[test]
    fn auth_header_attached_to_every_verb() {
        let client = client_with(
            ClientConfig::new("http://af.local").with_credentials("admin", "secret"),
            respond(200, ""),
        );
        for verb in [Verb::Get, Verb::Post, Verb::Put, Verb::Delete] {
            let req = client.build_request(verb, "pools", None, None);
            assert_eq!(req.header("authorization"), Some("Basic YWRtaW46c2VjcmV0"));
        }
    }

    #[test]
    fn partial_credentials_attach_nothing() {
        let client = client_with(
            ClientConfig::new("http://af.local").with_username("admin"),
            respond(200, ""),
        );
        let req = client.build_request(Verb::Get, "pools", None, None);
        assert!(req.header("authorization").is_none());
    }

    #[test]
    fn construction_without_host_fails() {
        let err = Client::with_transport(ClientConfig::default(), respond(200, "")).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn normalize_returns_payload_unchanged() {
        let response = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: r#"{"status":"ok","nested":[1,2,{"a":null}]}"#.to_string(),
        };
        assert_eq!(
            normalize(response).unwrap(),
            Some(json!({"status": "ok", "nested": [1, 2, {"a": null}]}))
        );
    }

    #[test]
    fn normalize_empty_success_is_none() {
        for body in ["", "  \n", "null"] {
            let response = HttpResponse {
                status: 204,
                headers: Vec::new(),
                body: body.to_string(),
            };
            assert_eq!(normalize(response).unwrap(), None, "body {body:?}");
        }
    }

    #[test]
    fn normalize_keeps_falsy_json_scalars() {
        let response = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: "false".to_string(),
        };
        assert_eq!(normalize(response).unwrap(), Some(json!(false)));
    }

    #[test]
    fn normalize_non_json_success_is_text() {
        let response = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: "OK".to_string(),
        };
        assert_eq!(normalize(response).unwrap(), Some(json!("OK")));
    }

    #[test]
    fn normalize_error_carries_body() {
        let response = HttpResponse {
            status: 404,
            headers: Vec::new(),
            body: r#"{"detail":"not found"}"#.to_string(),
        };
        let err = normalize(response).unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.payload(), Some(&json!({"detail": "not found"})));
    }

    #[test]
    fn normalize_error_without_body_has_no_payload() {
        let response = HttpResponse {
            status: 500,
            headers: Vec::new(),
            body: String::new(),
        };
        assert!(normalize(response).unwrap_err().payload().is_none());
    }

    #[tokio::test]
    async fn dispatch_sends_built_request() {
        let recorder = respond(200, r#"{"status":"OK"}"#);
        let client = client_with(ClientConfig::new("http://af.local"), recorder.clone());

        let payload = client.dispatch(Verb::Get, "test", None, None).await.unwrap();
        assert_eq!(payload, Some(json!({"status": "OK"})));

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url, "http://af.local/api/v1/test");
    }

    #[tokio::test]
    async fn dispatch_rejects_with_remote_payload() {
        let client = client_with(
            ClientConfig::new("http://af.local"),
            respond(400, r#"{"error":"bad request"}"#),
        );
        let err = client
            .dispatch(Verb::Post, "pools", Some(&json!({"name": ""})), None)
            .await
            .unwrap_err();
        assert_eq!(err.payload(), Some(&json!({"error": "bad request"})));
    }

    #[tokio::test]
    async fn dispatch_transport_failure_has_no_payload() {
        let recorder = Arc::new(Recorder {
            outcome: Err(TransportError::Connect("refused".to_string())),
            seen: Mutex::new(Vec::new()),
        });
        let client = client_with(ClientConfig::new("http://af.local"), recorder);

        let err = client.dispatch(Verb::Get, "pools", None, None).await.unwrap_err();
        match err {
            ClientError::Remote(remote) => {
                assert!(remote.payload().is_none());
                assert!(remote.status().is_none());
                assert_eq!(
                    remote.cause(),
                    Some(&TransportError::Connect("refused".to_string()))
                );
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }
}
