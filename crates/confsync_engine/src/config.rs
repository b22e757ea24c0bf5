//! Configuration for the client and the background component.

use confsync_protocol::ClientTracer;
use std::time::Duration;
use uuid::Uuid;

/// Default interval between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default bound on how long `Component::barrier` blocks.
pub const DEFAULT_BARRIER_TIMEOUT: Duration = Duration::from_secs(1);

/// Environment variable overriding the poll interval, in (fractional) seconds.
pub const POLL_INTERVAL_ENV: &str = "DD_REMOTE_CONFIG_POLL_INTERVAL_SECONDS";

/// Configuration for the background component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentConfig {
    /// Maximum time the worker sleeps between two cycles.
    pub poll_interval: Duration,
    /// Bound on barrier waits.
    pub barrier_timeout: Duration,
    /// Name of the worker thread.
    pub thread_name: String,
}

impl ComponentConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            barrier_timeout: DEFAULT_BARRIER_TIMEOUT,
            thread_name: "confsync-worker".to_string(),
        }
    }

    /// Creates a configuration with the poll interval taken from
    /// [`POLL_INTERVAL_ENV`] when it is set and valid.
    pub fn from_env() -> Self {
        let config = Self::new();
        match std::env::var(POLL_INTERVAL_ENV) {
            Ok(raw) => match parse_interval(&raw) {
                Some(interval) => config.with_poll_interval(interval),
                None => {
                    tracing::warn!(value = %raw, "ignoring invalid {}", POLL_INTERVAL_ENV);
                    config
                }
            },
            Err(_) => config,
        }
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the barrier timeout.
    pub fn with_barrier_timeout(mut self, timeout: Duration) -> Self {
        self.barrier_timeout = timeout;
        self
    }

    /// Sets the worker thread name.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a positive, finite number of seconds.
///
/// Zero is rejected: the worker would poll without pause.
fn parse_interval(raw: &str) -> Option<Duration> {
    let seconds: f64 = raw.trim().parse().ok()?;
    Duration::try_from_secs_f64(seconds)
        .ok()
        .filter(|interval| !interval.is_zero())
}

/// Identity the client reports to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Identifier of the running process.
    pub runtime_id: String,
    /// Implementation language.
    pub language: String,
    /// Library version.
    pub tracer_version: String,
    /// Service name.
    pub service: String,
    /// Deployment environment.
    pub env: String,
    /// Free-form `key:value` tags.
    pub tags: Vec<String>,
    /// Application version.
    pub app_version: Option<String>,
}

impl ClientIdentity {
    /// Creates an identity with a fresh runtime id.
    pub fn new(service: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            runtime_id: Uuid::new_v4().to_string(),
            language: "rust".to_string(),
            tracer_version: env!("CARGO_PKG_VERSION").to_string(),
            service: service.into(),
            env: env.into(),
            tags: Vec::new(),
            app_version: None,
        }
    }

    /// Sets the runtime id.
    pub fn with_runtime_id(mut self, runtime_id: impl Into<String>) -> Self {
        self.runtime_id = runtime_id.into();
        self
    }

    /// Adds a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Replaces the tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the application version.
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    pub(crate) fn client_tracer(&self) -> ClientTracer {
        ClientTracer {
            runtime_id: self.runtime_id.clone(),
            language: self.language.clone(),
            tracer_version: self.tracer_version.clone(),
            service: self.service.clone(),
            env: self.env.clone(),
            tags: self.tags.clone(),
            app_version: self.app_version.clone(),
        }
    }
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self::new("unnamed-service", "none")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ComponentConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.barrier_timeout, Duration::from_secs(1));
        assert!(!config.thread_name.is_empty());
    }

    #[test]
    fn builder_overrides() {
        let config = ComponentConfig::new()
            .with_poll_interval(Duration::from_millis(250))
            .with_barrier_timeout(Duration::from_secs(3))
            .with_thread_name("rc");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.barrier_timeout, Duration::from_secs(3));
        assert_eq!(config.thread_name, "rc");
    }

    #[test]
    fn interval_parsing() {
        assert_eq!(parse_interval("2"), Some(Duration::from_secs(2)));
        assert_eq!(parse_interval(" 0.5 "), Some(Duration::from_millis(500)));
        assert_eq!(parse_interval("-1"), None);
        assert_eq!(parse_interval("NaN"), None);
        assert_eq!(parse_interval("soon"), None);
        assert_eq!(parse_interval("0"), None);
        assert_eq!(parse_interval("0.0"), None);
    }

    #[test]
    fn identity_runtime_ids_are_unique() {
        let a = ClientIdentity::new("svc", "prod");
        let b = ClientIdentity::new("svc", "prod");
        assert_ne!(a.runtime_id, b.runtime_id);
        assert_eq!(a.language, "rust");
    }

    #[test]
    fn identity_maps_to_client_tracer() {
        let tracer = ClientIdentity::new("svc", "staging")
            .with_runtime_id("rid")
            .with_tag("team:core")
            .with_app_version("1.2.3")
            .client_tracer();
        assert_eq!(tracer.runtime_id, "rid");
        assert_eq!(tracer.service, "svc");
        assert_eq!(tracer.env, "staging");
        assert_eq!(tracer.tags, vec!["team:core".to_string()]);
        assert_eq!(tracer.app_version.as_deref(), Some("1.2.3"));
    }
}
