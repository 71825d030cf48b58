//! Client construction options.

use std::time::Duration;

use serde::Deserialize;

use crate::error::QueryError;
use crate::options::Defaults;

/// Which transport a client drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Server-style: relative targets, streamed bodies.
    #[default]
    Stream,
    /// Browser-style: absolute targets, finished bodies.
    Buffered,
}

/// Tuning for the connection-pooling agent shared by a client's requests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentOptions {
    /// Keep idle connections for reuse.
    pub keep_alive: bool,
    /// Idle connections kept per host when `keep_alive` is on.
    pub max_idle_per_host: usize,
    /// Close pooled connections idle for longer than this.
    pub idle_timeout_secs: Option<u64>,
    /// Honour `HTTP_PROXY`-style environment variables.
    pub proxy_from_env: bool,
}

impl AgentOptions {
    /// Pool size after applying `keep_alive`.
    pub fn pool_size(&self) -> usize {
        if self.keep_alive {
            self.max_idle_per_host
        } else {
            0
        }
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            keep_alive: true,
            max_idle_per_host: 8,
            idle_timeout_secs: Some(90),
            proxy_from_env: true,
        }
    }
}

/// Everything needed to construct a `QueryClient`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub transport: TransportKind,
    pub agent: AgentOptions,
    /// Overrides layered on the built-in defaults.
    pub defaults: Defaults,
}

impl ClientConfig {
    pub fn from_json(text: &str) -> Result<Self, QueryError> {
        serde_json::from_str(text).map_err(|e| QueryError::Config(e.to_string()))
    }

    pub fn transport(mut self, kind: TransportKind) -> Self {
        self.transport = kind;
        self
    }

    pub fn defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn agent(mut self, agent: AgentOptions) -> Self {
        self.agent = agent;
        self
    }
}
