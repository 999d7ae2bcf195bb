//! Process defaults and per-call query options.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(48 * 60 * 60);

/// How raw WHOIS text is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Speak the WHOIS protocol directly over TCP port 43.
    #[default]
    Socket,
    /// Run the system `whois` tool.
    Command,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "socket" | "tcp" => Ok(Backend::Socket),
            "command" | "cmd" | "whois" => Ok(Backend::Command),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

/// Defaults shared by every query issued through one [`crate::Whois`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhoisConfig {
    /// Persist the lookup cache to this file in addition to memory.
    pub cache_file: Option<PathBuf>,
    /// Pause after each uncached query when the caller gives none.
    pub slow_down: Duration,
    /// Bound on a single network attempt.
    pub timeout: Duration,
    pub backend: Backend,
    /// Age after which a cached response is fetched again.
    pub cache_ttl: Duration,
}

impl Default for WhoisConfig {
    fn default() -> Self {
        Self {
            cache_file: None,
            slow_down: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
            backend: Backend::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl WhoisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(path.into());
        self
    }

    pub fn with_slow_down(mut self, delay: Duration) -> Self {
        self.slow_down = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

/// Options for a single query. Anything left unset falls back to the
/// [`WhoisConfig`] and then to the TLD's registry hints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Bypass the cache.
    pub force: bool,
    pub cache_file: Option<PathBuf>,
    pub slow_down: Duration,
    /// Accept output from a `whois` process that exited non-zero.
    pub ignore_returncode: bool,
    pub server: Option<String>,
    /// Log TLD hints and retries at info level.
    pub verbose: bool,
    /// Drop comment and redaction lines before parsing.
    pub with_cleanup_results: bool,
    /// Punycode labels before querying.
    pub internationalized: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(path.into());
        self
    }

    pub fn slow_down(mut self, delay: Duration) -> Self {
        self.slow_down = delay;
        self
    }

    pub fn ignore_returncode(mut self, ignore: bool) -> Self {
        self.ignore_returncode = ignore;
        self
    }

    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_cleanup_results(mut self, cleanup: bool) -> Self {
        self.with_cleanup_results = cleanup;
        self
    }

    pub fn internationalized(mut self, idn: bool) -> Self {
        self.internationalized = idn;
        self
    }
}
