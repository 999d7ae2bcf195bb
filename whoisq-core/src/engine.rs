//! Progressive resolution.
//!
//! A hostname can carry more labels than the registrable domain. The engine
//! queries the full label sequence first and, while the parse comes back
//! empty, drops the left-most label and tries again. It never goes below
//! one label more than the TLD itself.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::labels::LabelSequence;
use crate::params::{verbose_event, QueryParams};
use crate::tld::TldId;
use crate::whois::ParsedRecord;

/// Cache behaviour requested for one lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Skip the cache and always query.
    pub force: bool,
    /// Also persist cached responses to this file.
    pub file: Option<PathBuf>,
}

/// Everything an executor needs to fetch raw WHOIS text for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub labels: LabelSequence,
    /// Render the query as `domain=<name>` (the `.name` registry).
    pub name_hint: bool,
    pub server: Option<String>,
    pub delay: Duration,
    pub cache: CachePolicy,
    pub ignore_returncode: bool,
}

impl LookupRequest {
    /// The text sent to the WHOIS server.
    pub fn query_string(&self) -> String {
        if self.name_hint {
            format!("domain={}", self.labels)
        } else {
            self.labels.to_domain()
        }
    }

    /// The TLD label, used when the executor has to find a server itself.
    pub fn tld_label(&self) -> &str {
        self.labels.last().unwrap_or_default()
    }
}

/// Fetches raw WHOIS text.
pub trait LookupExecutor: Send + Sync {
    fn lookup(&self, request: &LookupRequest) -> impl Future<Output = Result<String>> + Send;
}

/// Turns raw WHOIS text into fields for a given TLD.
pub trait RecordParser: Send + Sync {
    /// `Ok(None)` when the text holds no record for the candidate, an error
    /// when the text is neither a record nor a recognisable absence.
    fn parse(
        &self,
        raw: &str,
        tld: &TldId,
        labels: &LabelSequence,
        cleanup: bool,
    ) -> Result<Option<ParsedRecord>>;
}

/// The classified domain the engine works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    pub tld: TldId,
    pub labels: LabelSequence,
    pub name_hint: bool,
}

/// Per-call switches passed through to the collaborators.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub cache: CachePolicy,
    pub ignore_returncode: bool,
    pub cleanup: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Engine<E, P> {
    executor: E,
    parser: P,
}

impl<E: LookupExecutor, P: RecordParser> Engine<E, P> {
    pub fn new(executor: E, parser: P) -> Self {
        Self { executor, parser }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Query candidates until one parses to a record with a domain name.
    ///
    /// Executor and parser errors end the run immediately; an empty parse
    /// only moves on to the next, shorter candidate.
    #[instrument(skip_all, fields(tld = %target.tld, domain = %target.labels))]
    pub async fn run(
        &self,
        target: QueryTarget,
        params: &QueryParams,
        options: &RunOptions,
    ) -> Result<Option<ParsedRecord>> {
        let floor = target.tld.depth() + 1;
        let mut labels = target.labels;

        loop {
            let request = LookupRequest {
                labels: labels.clone(),
                name_hint: target.name_hint,
                server: params.server.clone(),
                delay: params.delay,
                cache: options.cache.clone(),
                ignore_returncode: options.ignore_returncode,
            };

            let raw = self.executor.lookup(&request).await?;

            if let Some(record) = self.parser.parse(&raw, &target.tld, &labels, options.cleanup)? {
                if record.has_domain_name() {
                    debug!(candidate = %labels, "Lookup succeeded");
                    return Ok(Some(record));
                }
            }

            if labels.len() > floor {
                labels = labels.without_first();
                verbose_event!(
                    options.verbose,
                    candidate = %labels,
                    remaining = labels.len(),
                    floor,
                    "No record, retrying with shorter domain"
                );
                continue;
            }

            debug!(candidate = %labels, "No record and no shorter candidate");
            return Ok(None);
        }
    }
}
