use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WhoisError};
use crate::tld::TldId;

/// Raw field values pulled out of a WHOIS response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedRecord {
    fields: BTreeMap<String, Vec<String>>,
}

impl ParsedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, skipping duplicates.
    pub fn push(&mut self, field: &str, value: impl Into<String>) {
        let value = value.into();
        let values = self.fields.entry(field.to_string()).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field).first().map(String::as_str)
    }

    pub fn domain_name(&self) -> Option<&str> {
        self.first("domain_name")
    }

    /// A record counts as found when its first domain name is non-empty.
    pub fn has_domain_name(&self) -> bool {
        self.domain_name().is_some_and(|name| !name.is_empty())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.fields.iter()
    }
}

/// Typed registration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    pub tld: String,
    pub registrar: Option<String>,
    pub registrant_country: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub statuses: Vec<String>,
    pub dnssec: Option<String>,
    pub name_servers: Vec<String>,
    pub emails: Vec<String>,
}

impl Domain {
    /// Build the typed record. Fails on a date no known format can read.
    pub fn from_parsed(record: &ParsedRecord, tld: &TldId) -> Result<Self> {
        let name = record.domain_name().unwrap_or_default().to_lowercase();

        let mut name_servers: Vec<String> = Vec::new();
        for ns in record.get("name_servers") {
            let ns = ns
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .trim_end_matches('.')
                .to_lowercase();
            if !ns.is_empty() && !name_servers.contains(&ns) {
                name_servers.push(ns);
            }
        }

        let statuses: Vec<String> = record
            .get("status")
            .iter()
            .map(|s| s.split_whitespace().next().unwrap_or_default().to_string())
            .filter(|s| !s.is_empty())
            .fold(Vec::new(), |mut acc, s| {
                if !acc.contains(&s) {
                    acc.push(s);
                }
                acc
            });

        Ok(Domain {
            name,
            tld: tld.suffix(),
            registrar: record.first("registrar").map(str::to_string),
            registrant_country: record.first("registrant_country").map(str::to_string),
            creation_date: date_field(record, "creation_date")?,
            expiration_date: date_field(record, "expiration_date")?,
            last_updated: date_field(record, "updated_date")?,
            status: statuses.first().cloned(),
            statuses,
            dnssec: record.first("dnssec").map(str::to_string),
            name_servers,
            emails: record.get("emails").iter().map(|e| e.to_lowercase()).collect(),
        })
    }
}

fn date_field(record: &ParsedRecord, field: &str) -> Result<Option<DateTime<Utc>>> {
    match record.first(field) {
        Some(raw) if !raw.trim().is_empty() => parse_date(raw)
            .map(Some)
            .ok_or_else(|| WhoisError::UnknownDateFormat(raw.to_string())),
        _ => Ok(None),
    }
}

/// Timestamps carrying a numeric offset without a colon (`+0000`, `-0700`).
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d-%b-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d %B %Y",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%b %d %Y",
];

/// Parse the date formats registries are known to emit.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let mut cleaned = date_str.trim().to_string();

    // "2001/01/01 00:00:00 (JST)", "2020-01-01 (UTC)"
    if let Some(idx) = cleaned.find(" (") {
        cleaned.truncate(idx);
    }
    let cleaned = cleaned
        .trim_end_matches(" UTC")
        .trim_end_matches(" GMT")
        .trim_end_matches(" +0000")
        .trim();

    // Nominet's legacy "before Aug-1996"
    if let Some(month_year) = cleaned.strip_prefix("before ") {
        let d = NaiveDate::parse_from_str(&format!("01-{}", month_year.trim()), "%d-%b-%Y").ok()?;
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(cleaned, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(cleaned, fmt) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}
