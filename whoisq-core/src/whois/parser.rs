//! Regex-driven WHOIS text parser.
//!
//! Every registry format is a set of per-field patterns. Patterns capture the
//! value in group 1; all matches of all patterns for a field are collected.
//! Registry formats override only the fields they spell differently.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::record::ParsedRecord;
use crate::engine::RecordParser;
use crate::error::{Result, WhoisError};
use crate::labels::LabelSequence;
use crate::tld::TldId;

/// How registries say "no such domain". Anchored at line start (after any
/// comment marker) so the same words inside a value or a disclaimer do not
/// count.
static NOT_FOUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[\s%#>]*(?:no match|not found|no data found|no entries found|no object found|domain not found|object does not exist|this domain name has not been registered|this query returned 0 objects|status:\s*(?:free|available|invalid)\s*$)|^[^\n]*\bis available for registration",
    )
    .expect("Invalid not-found regex")
});

/// A response this short with neither a record nor a not-found answer is a
/// registry error rather than an absent domain.
const MAX_ERROR_LINES: usize = 5;

type FieldPatterns = Vec<(&'static str, Vec<Regex>)>;

fn compile(fields: &[(&'static str, &[&str])]) -> FieldPatterns {
    fields
        .iter()
        .map(|(field, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("Invalid WHOIS field regex"))
                .collect();
            (*field, compiled)
        })
        .collect()
}

const GENERIC_FIELDS: &[(&str, &[&str])] = &[
    (
        "domain_name",
        &[r"(?im)^\s*Domain Name:\s*(\S+)", r"(?im)^\s*domain:\s*(\S+)"],
    ),
    (
        "registrar",
        &[
            r"(?im)^\s*Registrar:\s*(.+)$",
            r"(?im)^\s*Registrar Name:\s*(.+)$",
            r"(?im)^\s*Sponsoring Registrar:\s*(.+)$",
        ],
    ),
    (
        "registrant_country",
        &[r"(?im)^\s*Registrant Country:\s*(.+)$"],
    ),
    (
        "creation_date",
        &[
            r"(?im)^\s*Creation Date:\s*(.+)$",
            r"(?im)^\s*Created On:\s*(.+)$",
            r"(?im)^\s*Registration Date:\s*(.+)$",
            r"(?im)^\s*created:\s*(.+)$",
        ],
    ),
    (
        "expiration_date",
        &[
            r"(?im)^\s*Registry Expiry Date:\s*(.+)$",
            r"(?im)^\s*Registrar Registration Expiration Date:\s*(.+)$",
            r"(?im)^\s*Expiration Date:\s*(.+)$",
            r"(?im)^\s*Expiry Date:\s*(.+)$",
            r"(?im)^\s*paid-till:\s*(.+)$",
        ],
    ),
    (
        "updated_date",
        &[
            r"(?im)^\s*Updated Date:\s*(.+)$",
            r"(?im)^\s*Last Updated On:\s*(.+)$",
            r"(?im)^\s*Last Modified:\s*(.+)$",
        ],
    ),
    (
        "name_servers",
        &[r"(?im)^\s*Name Server:\s*(\S+)", r"(?im)^\s*nserver:\s*(\S+)"],
    ),
    (
        "status",
        &[r"(?im)^\s*Domain Status:\s*(.+)$", r"(?im)^\s*Status:\s*(.+)$"],
    ),
    ("dnssec", &[r"(?im)^\s*DNSSEC:\s*(.+)$"]),
    (
        "emails",
        &[r"(?i)([a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,})"],
    ),
];

static GENERIC: Lazy<FieldPatterns> = Lazy::new(|| compile(GENERIC_FIELDS));

/// Nominet: labels on their own line, values indented below.
const NOMINET_FIELDS: &[(&str, &[&str])] = &[
    ("domain_name", &[r"(?im)^\s*Domain name:\s*\n\s*(\S+)"]),
    ("registrar", &[r"(?im)^\s*Registrar:\s*\n\s*(.+)$"]),
    ("creation_date", &[r"(?im)^\s*Registered on:\s*(.+)$"]),
    ("expiration_date", &[r"(?im)^\s*Expiry date:\s*(.+)$"]),
    ("updated_date", &[r"(?im)^\s*Last updated:\s*(.+)$"]),
    ("status", &[r"(?im)^\s*Registration status:\s*\n\s*(.+)$"]),
];

static NOMINET: Lazy<FieldPatterns> = Lazy::new(|| compile(NOMINET_FIELDS));

/// DENIC.
const DENIC_FIELDS: &[(&str, &[&str])] = &[
    ("domain_name", &[r"(?im)^Domain:\s*(\S+)"]),
    ("updated_date", &[r"(?im)^Changed:\s*(.+)$"]),
    ("name_servers", &[r"(?im)^Nserver:\s*(\S+)"]),
    ("status", &[r"(?im)^Status:\s*(.+)$"]),
];

static DENIC: Lazy<FieldPatterns> = Lazy::new(|| compile(DENIC_FIELDS));

/// JPRS: bracketed field names.
const JPRS_FIELDS: &[(&str, &[&str])] = &[
    ("domain_name", &[r"(?im)^\s*\[Domain Name\]\s*(\S+)", r"(?im)^a\. \[Domain Name\]\s*(\S+)"]),
    ("registrar", &[r"(?im)^\s*\[Registrant\]\s*(.+)$"]),
    ("creation_date", &[r"(?im)^\s*\[Created on\]\s*(.+)$", r"(?im)^\s*\[Registered Date\]\s*(.+)$"]),
    ("expiration_date", &[r"(?im)^\s*\[Expires on\]\s*(.+)$"]),
    ("updated_date", &[r"(?im)^\s*\[Last Updated?\]\s*(.+)$"]),
    ("name_servers", &[r"(?im)^\s*(?:p\. )?\[Name Server\]\s*(\S+)"]),
    ("status", &[r"(?im)^\s*\[(?:Status|State)\]\s*(.+)$"]),
];

static JPRS: Lazy<FieldPatterns> = Lazy::new(|| compile(JPRS_FIELDS));

/// TCI (.ru, .su, .рф).
const TCI_FIELDS: &[(&str, &[&str])] = &[
    ("domain_name", &[r"(?im)^domain:\s*(\S+)"]),
    ("registrar", &[r"(?im)^registrar:\s*(.+)$"]),
    ("creation_date", &[r"(?im)^created:\s*(.+)$"]),
    ("expiration_date", &[r"(?im)^paid-till:\s*(.+)$"]),
    ("status", &[r"(?im)^state:\s*(.+)$"]),
];

static TCI: Lazy<FieldPatterns> = Lazy::new(|| compile(TCI_FIELDS));

fn registry_format(tld: &TldId) -> Option<&'static FieldPatterns> {
    let id = tld.as_str();
    match id {
        "uk" => Some(&*NOMINET),
        _ if id.ends_with("_uk") => Some(&*NOMINET),
        "jp" => Some(&*JPRS),
        _ if id.ends_with("_jp") => Some(&*JPRS),
        "de" => Some(&*DENIC),
        "ru" | "su" | "ru_rf" => Some(&*TCI),
        _ => None,
    }
}

/// Drop comment lines and privacy redaction noise.
pub fn cleanup_response(raw: &str) -> String {
    raw.lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !trimmed.starts_with('%')
                && !trimmed.starts_with('#')
                && !line.contains("REDACTED FOR PRIVACY")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_not_found(raw: &str) -> bool {
    NOT_FOUND.is_match(raw)
}

#[derive(Debug, Clone, Default)]
pub struct RegexParser;

impl RegexParser {
    pub fn new() -> Self {
        Self
    }

    fn extract(text: &str, patterns: &[Regex], record: &mut ParsedRecord, field: &str) {
        for re in patterns {
            for caps in re.captures_iter(text) {
                if let Some(m) = caps.get(1) {
                    let value = m.as_str().trim();
                    if !value.is_empty() && !value.eq_ignore_ascii_case("redacted") {
                        record.push(field, value);
                    }
                }
            }
        }
    }
}

impl RecordParser for RegexParser {
    fn parse(
        &self,
        raw: &str,
        tld: &TldId,
        labels: &LabelSequence,
        cleanup: bool,
    ) -> Result<Option<ParsedRecord>> {
        let text = if cleanup {
            cleanup_response(raw)
        } else {
            raw.to_string()
        };

        if text.trim().is_empty() || is_not_found(&text) {
            debug!(domain = %labels, "No record in response");
            return Ok(None);
        }

        let overrides: HashMap<&str, &Vec<Regex>> = registry_format(tld)
            .map(|format| format.iter().map(|(f, p)| (*f, p)).collect())
            .unwrap_or_default();

        let mut record = ParsedRecord::new();
        for (field, generic) in GENERIC.iter() {
            let patterns = overrides.get(field).copied().unwrap_or(generic);
            Self::extract(&text, patterns, &mut record, field);
        }

        if !record.has_domain_name() {
            let lines: Vec<&str> = text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect();
            if lines.len() <= MAX_ERROR_LINES {
                return Err(WhoisError::FailedParsing(lines.join(" ")));
            }
            debug!(domain = %labels, tld = %tld, "Response has no domain name");
            return Ok(None);
        }

        Ok(Some(record))
    }
}
