//! Client configuration
//!
//! Resolved from the `OPIK_*` environment variables or built explicitly:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `OPIK_URL_OVERRIDE` | Base API URL, e.g. `http://localhost:5173/api` |
//! | `OPIK_API_KEY` | Raw API key sent as `Authorization` (no prefix) |
//! | `OPIK_WORKSPACE` | Workspace sent as `Comet-Workspace` |

use std::fmt;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::error::{Error, Result};
use crate::experiment::MAX_BATCH_BYTES;

/// Base URL of a local open-source deployment.
pub const LOCAL_BASE_URL: &str = "http://localhost:5173/api";

/// Base URL of the hosted deployment.
pub const CLOUD_BASE_URL: &str = "https://www.comet.com/opik/api";

/// Path of the bulk endpoint, relative to the base URL.
pub const BULK_ITEMS_PATH: &str = "v1/private/experiments/items/bulk";

/// Environment variable holding the base URL.
pub const ENV_URL_OVERRIDE: &str = "OPIK_URL_OVERRIDE";
/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "OPIK_API_KEY";
/// Environment variable holding the workspace name.
pub const ENV_WORKSPACE: &str = "OPIK_WORKSPACE";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry behaviour for failed bulk requests.
///
/// Disabled by default: each request is sent exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay, including `Retry-After`.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Never retry.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Retry up to `max_retries` times with the default backoff.
    #[must_use]
    pub const fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::none()
        }
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        retry_after.unwrap_or(exp).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Settings for talking to one Opik deployment.
#[derive(Clone)]
pub struct ClientConfig {
    base_url: Url,
    api_key: Option<String>,
    workspace: Option<String>,
    timeout: Duration,
    max_batch_bytes: usize,
    retry: RetryPolicy,
}

impl ClientConfig {
    /// Create a builder with default settings (local deployment, no auth).
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if `OPIK_URL_OVERRIDE` is not a valid URL.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    ///
    /// Empty values count as unset. Without `OPIK_URL_OVERRIDE` the base URL
    /// is the hosted deployment when an API key is present, the local one
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the resolved base URL is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::builder_from_lookup(lookup).build()
    }

    /// A builder pre-filled from a variable lookup, not yet validated.
    ///
    /// Lets callers override individual settings before [`ClientConfigBuilder::build`]
    /// runs, so a malformed `OPIK_URL_OVERRIDE` replaced by an explicit URL
    /// never fails.
    #[must_use]
    pub fn builder_from_lookup<F>(lookup: F) -> ClientConfigBuilder
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get(ENV_API_KEY);
        let base_url = get(ENV_URL_OVERRIDE).unwrap_or_else(|| {
            if api_key.is_some() {
                CLOUD_BASE_URL.to_string()
            } else {
                LOCAL_BASE_URL.to_string()
            }
        });

        let mut builder = Self::builder().base_url(base_url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        if let Some(workspace) = get(ENV_WORKSPACE) {
            builder = builder.workspace(workspace);
        }
        builder
    }

    /// Base API URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL of the bulk endpoint.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the base URL cannot be joined (e.g. `data:` URLs).
    pub fn endpoint(&self) -> Result<Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join(BULK_ITEMS_PATH)?)
    }

    /// API key, if configured.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Workspace, if configured.
    #[must_use]
    pub fn workspace(&self) -> Option<&str> {
        self.workspace.as_deref()
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Largest request body the client will send.
    #[must_use]
    pub const fn max_batch_bytes(&self) -> usize {
        self.max_batch_bytes
    }

    /// Retry policy.
    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        self.retry
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("workspace", &self.workspace)
            .field("timeout", &self.timeout)
            .field("max_batch_bytes", &self.max_batch_bytes)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Builder for `ClientConfig`.
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    base_url: String,
    api_key: Option<String>,
    workspace: Option<String>,
    timeout: Duration,
    max_batch_bytes: usize,
    retry: RetryPolicy,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self {
            base_url: LOCAL_BASE_URL.to_string(),
            api_key: None,
            workspace: None,
            timeout: DEFAULT_TIMEOUT,
            max_batch_bytes: MAX_BATCH_BYTES,
            retry: RetryPolicy::none(),
        }
    }
}

impl ClientConfigBuilder {
    /// Set the base API URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the workspace.
    #[must_use]
    pub fn workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Lower the request body limit.
    #[must_use]
    pub const fn max_batch_bytes(mut self, max: usize) -> Self {
        self.max_batch_bytes = max;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the `ClientConfig`.
    ///
    /// # Errors
    ///
    /// - `InvalidUrl` if the base URL does not parse
    /// - `Config` for a non-HTTP(S) URL, a zero timeout, or a body limit of
    ///   zero or above 4 MiB
    pub fn build(self) -> Result<ClientConfig> {
        let base_url = Url::parse(self.base_url.trim())?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "base URL must be http or https, got `{}`",
                base_url.scheme()
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".to_string()));
        }
        if self.max_batch_bytes == 0 || self.max_batch_bytes > MAX_BATCH_BYTES {
            return Err(Error::Config(format!(
                "max_batch_bytes must be in 1..={MAX_BATCH_BYTES}, got {}",
                self.max_batch_bytes
            )));
        }
        if self.api_key.is_some() && self.workspace.is_none() {
            warn!("API key set without a workspace; the server will use the key's default workspace");
        }

        Ok(ClientConfig {
            base_url,
            api_key: self.api_key,
            workspace: self.workspace,
            timeout: self.timeout,
            max_batch_bytes: self.max_batch_bytes,
            retry: self.retry,
        })
    }
}
