//! Query entry point.

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::adapter;
use crate::config::{Backend, QueryOptions, WhoisConfig};
use crate::engine::{
    CachePolicy, Engine, LookupExecutor, LookupRequest, QueryTarget, RecordParser, RunOptions,
};
use crate::error::Result;
use crate::idn;
use crate::labels::{normalize_domain, LabelSequence};
use crate::params::{verbose_event, QueryParams};
use crate::tld::{self, Classification, TldRegistry, BUILTIN_REGISTRY};
use crate::whois::{CachingExecutor, CommandExecutor, Domain, RegexParser, SocketExecutor};

/// The executor selected by [`WhoisConfig::backend`].
#[derive(Debug, Clone)]
pub enum BackendExecutor {
    Socket(SocketExecutor),
    Command(CommandExecutor),
}

impl BackendExecutor {
    pub fn from_config(config: &WhoisConfig) -> Self {
        match config.backend {
            Backend::Socket => Self::Socket(SocketExecutor::new().with_timeout(config.timeout)),
            Backend::Command => Self::Command(CommandExecutor::new().with_timeout(config.timeout)),
        }
    }
}

impl LookupExecutor for BackendExecutor {
    async fn lookup(&self, request: &LookupRequest) -> Result<String> {
        match self {
            Self::Socket(executor) => executor.lookup(request).await,
            Self::Command(executor) => executor.lookup(request).await,
        }
    }
}

/// Resolves domains to registration records.
///
/// Holds the process defaults, the TLD registry and the engine. One value can
/// serve any number of queries; the response cache is shared between them.
pub struct Whois<E = CachingExecutor<BackendExecutor>, P = RegexParser> {
    config: WhoisConfig,
    registry: TldRegistry,
    engine: Engine<E, P>,
}

impl Whois {
    pub fn new() -> Self {
        Self::with_config(WhoisConfig::default())
    }

    pub fn with_config(config: WhoisConfig) -> Self {
        let executor = CachingExecutor::new(BackendExecutor::from_config(&config), config.cache_ttl);
        Self::from_parts(config, executor, RegexParser::new())
    }
}

impl Default for Whois {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: LookupExecutor, P: RecordParser> Whois<E, P> {
    pub fn from_parts(config: WhoisConfig, executor: E, parser: P) -> Self {
        Self {
            config,
            registry: BUILTIN_REGISTRY.clone(),
            engine: Engine::new(executor, parser),
        }
    }

    /// Replace the built-in TLD table.
    pub fn with_registry(mut self, registry: TldRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &WhoisConfig {
        &self.config
    }

    pub fn registry(&self) -> &TldRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &Engine<E, P> {
        &self.engine
    }

    /// Look up `domain`.
    ///
    /// `Ok(None)` means no record was found, including for inputs with a
    /// single label. Unknown and private TLDs fail before any lookup.
    #[instrument(skip_all, fields(domain = %domain))]
    pub async fn query(&self, domain: &str, options: &QueryOptions) -> Result<Option<Domain>> {
        let text = normalize_domain(domain);
        let labels = LabelSequence::normalize(domain);
        if !labels.is_queryable() {
            debug!(labels = labels.len(), "Not a queryable domain");
            return Ok(None);
        }

        let Classification { tld, name_hint } = tld::classify(&text, &labels);
        let meta = tld::ensure_known(&self.registry, &tld)?;
        verbose_event!(options.verbose, tld = %tld, "Classified domain");

        let params = QueryParams::resolve(&tld, meta, options, &self.config)?;

        let labels = if options.internationalized {
            idn::to_ascii_labels(&labels)
        } else {
            labels
        };

        let run = RunOptions {
            cache: CachePolicy {
                force: options.force,
                file: options
                    .cache_file
                    .clone()
                    .or_else(|| self.config.cache_file.clone()),
            },
            ignore_returncode: options.ignore_returncode,
            cleanup: options.with_cleanup_results,
            verbose: options.verbose,
        };

        let target = QueryTarget {
            tld: tld.clone(),
            labels,
            name_hint,
        };

        match self.engine.run(target, &params, &run).await? {
            Some(record) => Domain::from_parsed(&record, &tld).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`Whois::query`], as a plain key/value map. No record gives an
    /// empty map.
    pub async fn get(&self, domain: &str, options: &QueryOptions) -> Result<Map<String, Value>> {
        let domain = self.query(domain, options).await?;
        adapter::into_map(domain)
    }

    /// Supported suffixes, as written in domain names.
    pub fn valid_tlds(&self) -> Vec<String> {
        self.registry.valid_tlds()
    }
}

static DEFAULT_WHOIS: Lazy<Whois> = Lazy::new(Whois::new);

/// [`Whois::query`] on a process-wide default instance.
pub async fn query(domain: &str, options: &QueryOptions) -> Result<Option<Domain>> {
    DEFAULT_WHOIS.query(domain, options).await
}

/// [`Whois::get`] on a process-wide default instance.
pub async fn get(domain: &str, options: &QueryOptions) -> Result<Map<String, Value>> {
    DEFAULT_WHOIS.get(domain, options).await
}

/// Suffixes supported by the built-in registry.
pub fn valid_tlds() -> Vec<String> {
    BUILTIN_REGISTRY.valid_tlds()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Datelike;

    use super::*;
    use crate::engine::testing::{EchoParser, RecordingExecutor};
    use crate::error::WhoisError;
    use crate::tld::TldMeta;

    type TestWhois = Whois<RecordingExecutor, EchoParser>;

    fn whois(executor: RecordingExecutor) -> TestWhois {
        Whois::from_parts(WhoisConfig::default(), executor, EchoParser)
    }

    fn calls(whois: &TestWhois) -> usize {
        whois.engine().executor().calls()
    }

    #[tokio::test]
    async fn test_single_label_is_absent() {
        let whois = whois(RecordingExecutor::new());
        for input in ["localhost", "www", "", "com."] {
            assert!(whois.query(input, &QueryOptions::new()).await.unwrap().is_none());
        }
        assert_eq!(calls(&whois), 0);
    }

    #[tokio::test]
    async fn test_unknown_tld() {
        let whois = whois(RecordingExecutor::new());
        let err = whois
            .query("nonexistent.faketld", &QueryOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, WhoisError::UnknownTld(ref t) if t == "faketld"));
        assert_eq!(calls(&whois), 0);
    }

    #[tokio::test]
    async fn test_private_registry() {
        let whois = whois(RecordingExecutor::new());
        let err = whois
            .query("myhost.duckdns.org", &QueryOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, WhoisError::PrivateRegistry(ref t) if t == "duckdns_org"));
        assert_eq!(calls(&whois), 0);
    }

    #[tokio::test]
    async fn test_www_prefix_first_attempt_succeeds() {
        let whois = whois(RecordingExecutor::new().respond("google.com", "google.com"));
        let domain = whois
            .query("WWW.Google.com.", &QueryOptions::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(domain.name, "google.com");
        assert_eq!(domain.tld, "com");
        assert_eq!(whois.engine().executor().queried(), vec!["google.com"]);
    }

    #[tokio::test]
    async fn test_compound_suffix_shortening() {
        let whois = whois(RecordingExecutor::new());
        let result = whois
            .query("sub.example.co.uk", &QueryOptions::new())
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(
            whois.engine().executor().queried(),
            vec!["sub.example.co.uk", "example.co.uk"]
        );
    }

    #[tokio::test]
    async fn test_server_hint_and_caller_override() {
        let whois = whois(RecordingExecutor::new().respond("example.com", "example.com"));
        whois.query("example.com", &QueryOptions::new()).await.unwrap();
        whois
            .query("example.com", &QueryOptions::new().server("whois.example.net"))
            .await
            .unwrap();

        let requests = whois.engine().executor().requests.lock().unwrap().clone();
        assert_eq!(requests[0].server.as_deref(), Some("whois.verisign-grs.com"));
        assert_eq!(requests[1].server.as_deref(), Some("whois.example.net"));
    }

    #[tokio::test]
    async fn test_options_reach_request() {
        let config = WhoisConfig::new().with_cache_file("/tmp/whoisq-test-cache.json");
        let whois = Whois::from_parts(config, RecordingExecutor::new(), EchoParser);
        let options = QueryOptions::new()
            .force(true)
            .ignore_returncode(true)
            .slow_down(Duration::from_secs(1));

        whois.query("example.com", &options).await.unwrap();

        let requests = whois.engine().executor().requests.lock().unwrap().clone();
        assert!(requests[0].cache.force);
        assert!(requests[0].ignore_returncode);
        assert_eq!(requests[0].delay, Duration::from_secs(1));
        assert_eq!(
            requests[0].cache.file.as_deref(),
            Some(std::path::Path::new("/tmp/whoisq-test-cache.json"))
        );
    }

    #[tokio::test]
    async fn test_internationalized_labels_sent_as_punycode() {
        let whois = whois(RecordingExecutor::new());
        whois
            .query("пример.рф", &QueryOptions::new().internationalized(true))
            .await
            .unwrap();

        assert_eq!(
            whois.engine().executor().queried(),
            vec!["xn--e1afmkfd.xn--p1ai"]
        );
    }

    #[tokio::test]
    async fn test_name_registry_query_form() {
        let whois = whois(RecordingExecutor::new());
        whois.query("john.smith.name", &QueryOptions::new()).await.unwrap();

        assert_eq!(
            whois.engine().executor().queried(),
            vec!["domain=john.smith.name", "domain=smith.name"]
        );
    }

    #[tokio::test]
    async fn test_custom_registry() {
        let mut registry = TldRegistry::new();
        registry.insert("test", TldMeta::new().with_server("whois.nic.test"));
        let whois = whois(RecordingExecutor::new()).with_registry(registry);

        assert!(whois.query("example.test", &QueryOptions::new()).await.is_ok());
        assert!(matches!(
            whois.query("example.com", &QueryOptions::new()).await,
            Err(WhoisError::UnknownTld(_))
        ));
        assert_eq!(whois.valid_tlds(), vec!["test"]);
    }

    #[tokio::test]
    async fn test_get_absent_is_empty_map() {
        let whois = whois(RecordingExecutor::new());
        let map = whois.get("missing.com", &QueryOptions::new()).await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_get_found() {
        let whois = whois(RecordingExecutor::new().respond("example.com", "example.com"));
        let map = whois.get("example.com", &QueryOptions::new()).await.unwrap();
        assert_eq!(map["name"], "example.com");
        assert_eq!(map["tld"], "com");
    }

    #[tokio::test]
    async fn test_get_passes_errors_through() {
        let whois = whois(RecordingExecutor::failing());
        let err = whois.get("example.com", &QueryOptions::new()).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_regex_parser_end_to_end() {
        let raw = "Domain Name: EXAMPLE.COM\nRegistrar: RESERVED-Internet Assigned Numbers Authority\nCreation Date: 1995-08-14T04:00:00Z\nName Server: A.IANA-SERVERS.NET\n";
        let whois = Whois::from_parts(
            WhoisConfig::default(),
            RecordingExecutor::new().respond("example.com", raw),
            RegexParser::new(),
        );

        let domain = whois
            .query("www.example.com", &QueryOptions::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(domain.name, "example.com");
        assert_eq!(domain.name_servers, vec!["a.iana-servers.net"]);
        assert!(domain.creation_date.is_some());
    }

    #[tokio::test]
    async fn test_registrar_offset_dates() {
        let raw = "Domain Name: google.com\nRegistrar: MarkMonitor, Inc.\nUpdated Date: 2019-09-09T15:39:04+0000\nCreation Date: 1997-09-15T07:00:00+0000\nRegistrar Registration Expiration Date: 2028-09-13T07:00:00+0000\n";
        let whois = Whois::from_parts(
            WhoisConfig::default(),
            RecordingExecutor::new().respond("google.com", raw),
            RegexParser::new(),
        );

        let domain = whois
            .query("www.google.com", &QueryOptions::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(domain.creation_date.map(|d| d.year()), Some(1997));
        assert_eq!(domain.expiration_date.map(|d| d.year()), Some(2028));
        assert_eq!(domain.last_updated.map(|d| d.year()), Some(2019));
    }

    #[tokio::test]
    async fn test_unparseable_response_is_not_retried() {
        let whois = Whois::from_parts(
            WhoisConfig::default(),
            RecordingExecutor::new()
                .respond("sub.example.com", "Error: invalid query syntax\n")
                .respond("example.com", "Domain Name: example.com\n"),
            RegexParser::new(),
        );

        let err = whois
            .query("sub.example.com", &QueryOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, WhoisError::FailedParsing(ref text) if text.contains("invalid query")));
        assert_eq!(whois.engine().executor().queried(), vec!["sub.example.com"]);
    }

    #[test]
    fn test_valid_tlds() {
        let tlds = valid_tlds();
        assert!(tlds.contains(&"com".to_string()));
        assert!(tlds.contains(&"co.uk".to_string()));
        assert!(!tlds.iter().any(|t| t.contains('_')));
    }

    #[test]
    fn test_backend_from_config() {
        let config = WhoisConfig::new().with_backend(Backend::Command);
        assert!(matches!(
            BackendExecutor::from_config(&config),
            BackendExecutor::Command(_)
        ));
        assert!(matches!(
            BackendExecutor::from_config(&WhoisConfig::default()),
            BackendExecutor::Socket(_)
        ));
    }
}
