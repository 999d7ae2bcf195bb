use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use super::check_quota;
use crate::engine::{LookupExecutor, LookupRequest};
use crate::error::{Result, WhoisError};

const WHOIS_PORT: u16 = 43;
const IANA_WHOIS: &str = "whois.iana.org";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RESPONSE_SIZE: usize = 1024 * 1024; // 1MB
const MAX_REFERRAL_DEPTH: u8 = 3;

static IANA_REFER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^refer:\s*(\S+)").expect("Invalid IANA refer regex"));

static REFERRAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)^\s*Registrar WHOIS Server:\s*(\S+)",
        r"(?im)^\s*Whois Server:\s*(\S+)",
        r"(?im)^\s*ReferralServer:\s*whois://(\S+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid referral regex"))
    .collect()
});

type BoxedLookup<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// WHOIS over TCP port 43.
///
/// Without a server in the request, the TLD's registry is discovered through
/// the IANA referral and remembered for later lookups on the same TLD.
/// Clones share what was discovered. Registrar referrals in thin-registry
/// answers are followed; if a referral fails, the registry answer is
/// returned instead.
#[derive(Debug, Clone)]
pub struct SocketExecutor {
    timeout: Duration,
    port: u16,
    iana_server: String,
    discovered: Arc<RwLock<HashMap<String, String>>>,
}

impl Default for SocketExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketExecutor {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            port: WHOIS_PORT,
            iana_server: IANA_WHOIS.to_string(),
            discovered: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Server asked for a TLD's registry when the request names none.
    pub fn with_iana_server(mut self, server: impl Into<String>) -> Self {
        self.iana_server = server.into();
        self
    }

    fn known_server(&self, tld: &str) -> Option<String> {
        let discovered = match self.discovered.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Discovered server lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        discovered.get(tld).cloned()
    }

    fn remember_server(&self, tld: &str, server: &str) {
        let mut discovered = match self.discovered.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Discovered server lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        discovered.insert(tld.to_string(), server.to_string());
    }

    async fn discover_server(&self, tld: &str) -> Result<String> {
        let tld = tld.to_lowercase();
        if let Some(server) = self.known_server(&tld) {
            debug!(tld = %tld, server = %server, "Using discovered WHOIS server");
            return Ok(server);
        }

        let response = self.query_server(&self.iana_server, &tld).await?;
        let server = IANA_REFER
            .captures(&response)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_lowercase())
            .ok_or_else(|| WhoisError::ServerNotFound(tld.clone()))?;

        debug!(tld = %tld, server = %server, "Discovered WHOIS server");
        self.remember_server(&tld, &server);
        Ok(server)
    }

    fn query_with_referrals<'a>(
        &'a self,
        query: &'a str,
        server: String,
        depth: u8,
        visited: &'a mut HashSet<String>,
    ) -> BoxedLookup<'a> {
        Box::pin(async move {
            visited.insert(server.to_lowercase());
            debug!(server = %server, depth, "Querying WHOIS server");

            let response = self.query_server(&server, query).await?;
            check_quota(&response)?;

            if depth + 1 >= MAX_REFERRAL_DEPTH {
                return Ok(response);
            }

            let Some(referral) = extract_referral(&response) else {
                return Ok(response);
            };
            if visited.contains(&referral) {
                warn!(server = %referral, "Circular WHOIS referral detected");
                return Ok(response);
            }

            debug!(referral = %referral, "Following referral");
            match self
                .query_with_referrals(query, referral, depth + 1, visited)
                .await
            {
                Ok(referred) if !referred.trim().is_empty() => Ok(referred),
                Ok(_) => Ok(response),
                Err(e) if e.is_transport() && !matches!(e, WhoisError::QuotaExceeded(_)) => {
                    warn!(error = %e, "Referral failed, using registry response");
                    Ok(response)
                }
                Err(e) => Err(e),
            }
        })
    }

    async fn query_server(&self, server: &str, query: &str) -> Result<String> {
        let addr = format!("{}:{}", server, self.port);

        let mut stream = timeout(self.timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| WhoisError::Timeout(format!("Connection to {} timed out", server)))?
            .map_err(|e| WhoisError::Connection(format!("Failed to connect to {}: {}", server, e)))?;

        let query_bytes = format!("{}\r\n", query);
        timeout(self.timeout, stream.write_all(query_bytes.as_bytes()))
            .await
            .map_err(|_| WhoisError::Timeout("Write timed out".to_string()))?
            .map_err(|e| WhoisError::Connection(format!("Failed to send query: {}", e)))?;

        let mut response = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            match timeout(self.timeout, stream.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    response.extend_from_slice(&buf[..n]);
                    if response.len() > MAX_RESPONSE_SIZE {
                        return Err(WhoisError::Connection("Response too large".to_string()));
                    }
                }
                Ok(Err(e)) => {
                    return Err(WhoisError::Connection(format!("Read error: {}", e)));
                }
                // Some servers never close the connection
                Err(_) if !response.is_empty() => break,
                Err(_) => return Err(WhoisError::Timeout("Read timed out".to_string())),
            }
        }

        Ok(decode_response(response))
    }
}

impl LookupExecutor for SocketExecutor {
    #[instrument(skip(self, request), fields(query = %request.query_string()))]
    async fn lookup(&self, request: &LookupRequest) -> Result<String> {
        let query = request.query_string();
        let server = match &request.server {
            Some(server) => server.clone(),
            None => self.discover_server(request.tld_label()).await?,
        };

        let mut visited = HashSet::new();
        self.query_with_referrals(&query, server, 0, &mut visited)
            .await
    }
}

/// UTF-8, falling back to Latin-1 for registries that still send it.
fn decode_response(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|e| e.into_bytes().iter().map(|&b| b as char).collect())
}

fn extract_referral(response: &str) -> Option<String> {
    REFERRAL_PATTERNS.iter().find_map(|re| {
        let server = re.captures(response)?.get(1)?.as_str().trim().to_lowercase();
        let server = server.trim_end_matches('/').to_string();
        (!server.is_empty() && server.contains('.')).then_some(server)
    })
}
