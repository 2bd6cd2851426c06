//! Client configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Production API root
pub const DEFAULT_API_URL: &str = "https://api.funkybit.fun";

/// Supplies the auth token appended to the websocket endpoint
///
/// Queried on every connection attempt, so a token reissued between
/// reconnects is picked up automatically.
pub trait AuthTokenSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

impl AuthTokenSource for String {
    fn token(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl<F> AuthTokenSource for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// How long to wait between reconnection attempts
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffPolicy {
    /// Same delay every time
    Fixed(Duration),
    /// Delay grows by `multiplier` per failed attempt up to `max_delay`;
    /// with `jitter`, up to half the delay is added at random
    Exponential {
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        jitter: bool,
    },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Exponential {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Configuration for reconnection behavior
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    pub policy: BackoffPolicy,
    /// Maximum number of consecutive failed connection attempts (None = infinite)
    pub max_attempts: Option<u32>,
    /// Fixed delay used while the server reports maintenance
    pub maintenance_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            policy: BackoffPolicy::default(),
            max_attempts: None,
            maintenance_delay: Duration::from_secs(1),
        }
    }
}

/// Configuration for [`ReconnectingClient`](crate::websocket::ReconnectingClient)
#[derive(Clone)]
pub struct ClientConfig {
    /// REST API root; the websocket endpoint is derived from it
    pub api_url: String,
    pub auth: Option<Arc<dyn AuthTokenSource>>,
    pub reconnect: ReconnectConfig,
    /// Interval between client heartbeat pings
    pub heartbeat_interval: Duration,
    /// A session with no inbound frame for this long is considered dead
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    /// Consecutive undecodable frames tolerated before forcing a reconnect
    pub max_consecutive_decode_failures: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth: None,
            reconnect: ReconnectConfig::default(),
            heartbeat_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(10),
            max_consecutive_decode_failures: 5,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("auth", &self.auth.as_ref().map(|_| "<redacted>"))
            .field("reconnect", &self.reconnect)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("idle_timeout", &self.idle_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field(
                "max_consecutive_decode_failures",
                &self.max_consecutive_decode_failures,
            )
            .finish()
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(Arc::new(token.into()));
        self
    }

    pub fn with_auth_source(mut self, source: impl AuthTokenSource + 'static) -> Self {
        self.auth = Some(Arc::new(source));
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.reconnect.policy = policy;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_decode_failures(mut self, count: u32) -> Self {
        self.max_consecutive_decode_failures = count;
        self
    }

    /// Check that every setting can drive a client
    ///
    /// Does not query the auth token source.
    pub fn validate(&self) -> Result<()> {
        self.base_endpoint()?;

        for (name, value) in [
            ("heartbeat_interval", self.heartbeat_interval),
            ("idle_timeout", self.idle_timeout),
            ("connect_timeout", self.connect_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::InvalidConfig(format!("{name} must be non-zero")));
            }
        }

        if self.max_consecutive_decode_failures == 0 {
            return Err(Error::InvalidConfig(
                "max_consecutive_decode_failures must be at least 1".to_string(),
            ));
        }

        if let BackoffPolicy::Exponential {
            initial_delay,
            max_delay,
            multiplier,
            ..
        } = &self.reconnect.policy
        {
            if !multiplier.is_finite() || *multiplier < 1.0 {
                return Err(Error::InvalidConfig(format!(
                    "backoff multiplier must be finite and >= 1.0, got {multiplier}"
                )));
            }
            if initial_delay > max_delay {
                return Err(Error::InvalidConfig(
                    "backoff initial_delay exceeds max_delay".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Websocket endpoint for the current auth token
    ///
    /// `http` becomes `ws`, `https` becomes `wss`, `/connect` is appended and
    /// the token, when present, is passed as the `auth` query parameter.
    pub fn websocket_endpoint(&self) -> Result<String> {
        let mut url = self.base_endpoint()?;
        if let Some(token) = self.auth.as_ref().and_then(|auth| auth.token()) {
            url.query_pairs_mut().append_pair("auth", &token);
        }

        Ok(url.to_string())
    }

    fn base_endpoint(&self) -> Result<Url> {
        let mut url =
            Url::parse(&self.api_url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.api_url)))?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(Error::InvalidUrl(format!("unsupported scheme `{other}`"))),
        };
        url.set_scheme(scheme)
            .map_err(|_| Error::InvalidUrl(self.api_url.clone()))?;

        let path = format!("{}/connect", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(None);

        Ok(url)
    }
}
