//! Construction-time settings and their resolution.
//!
//! `ClientConfig` is what callers hand over; `ResolvedConfig` is what the
//! gateway works with. Resolution runs once per client and is the only place
//! defaults are applied.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

pub const DEFAULT_API_VERSION: &str = "v1";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Caller-supplied client settings.
///
/// Deserializes from camelCase keys (`host`, `apiVersion`, `username`,
/// `password`, `timeoutMs`); every key is optional on the wire so that a
/// missing host surfaces as a configuration error rather than a parse error.
/// The password is never serialized.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    #[must_use]
    pub fn with_credentials(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.with_username(username).with_password(password)
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Validate and apply defaults.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` when `host` is empty. Nothing else
    /// is validated: partial credentials are dropped, not rejected.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        if self.host.is_empty() {
            return Err(ClientError::Configuration("host is required".to_string()));
        }
        let host = self.host.trim_end_matches('/');

        let api_version = self
            .api_version
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_API_VERSION);

        let timeout_ms = self
            .timeout_ms
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        let credentials = match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(Credentials::new(username, password))
            }
            _ => None,
        };

        Ok(ResolvedConfig {
            base_url: format!("{host}/api/{api_version}"),
            timeout: Duration::from_millis(timeout_ms),
            credentials,
        })
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("api_version", &self.api_version)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Settings after defaults and validation. Immutable for the client's life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    base_url: String,
    timeout: Duration,
    credentials: Option<Credentials>,
}

impl ResolvedConfig {
    /// `{host}/api/{version}`, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Join a route onto the base URL.
    pub fn url(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/{}", self.base_url, path)
    }
}

/// HTTP Basic credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.username, self.password));
        format!("Basic {encoded}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
