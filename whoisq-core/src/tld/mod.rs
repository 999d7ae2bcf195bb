//! TLD classification.
//!
//! Maps a normalized domain onto the canonical identifier used to index the
//! [`TldRegistry`]. Compound suffixes are joined with `_` (`co.uk` becomes
//! `co_uk`), identifiers that collide with reserved words carry a trailing
//! `_` (`is_`), and punycode suffixes get a readable name (`ru_rf`).

mod registry;

use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WhoisError};
use crate::labels::LabelSequence;

pub use registry::{TldMeta, TldRegistry, BUILTIN_REGISTRY};

/// Multi-label suffixes, consulted only for domains with more than two labels.
const COMPOUND_SUFFIXES: &[(&str, &str)] = &[
    // uk
    (".ac.uk", "ac_uk"),
    (".co.uk", "co_uk"),
    (".org.uk", "org_uk"),
    (".me.uk", "me_uk"),
    (".ltd.uk", "ltd_uk"),
    (".plc.uk", "plc_uk"),
    (".co.il", "co_il"),
    // uganda
    (".ca.ug", "ca_ug"),
    (".co.ug", "co_ug"),
    // th
    (".ac.th", "ac_th"),
    (".co.th", "co_th"),
    (".go.th", "go_th"),
    (".in.th", "in_th"),
    // jp
    (".ac.jp", "ac_jp"),
    (".ad.jp", "ad_jp"),
    (".co.jp", "co_jp"),
    (".ed.jp", "ed_jp"),
    (".go.jp", "go_jp"),
    (".gr.jp", "gr_jp"),
    (".lg.jp", "lg_jp"),
    (".ne.jp", "ne_jp"),
    (".or.jp", "or_jp"),
    (".geo.jp", "geo_jp"),
    (".com.au", "com_au"),
    (".com.sg", "com_sg"),
    // Türkiye
    (".com.tr", "com_tr"),
    (".edu.tr", "edu_tr"),
    (".org.tr", "org_tr"),
    (".edu.ua", "edu_ua"),
    (".lviv.ua", "lviv_ua"),
    (".co.ke", "co_ke"),
    (".com.bo", "com_bo"),
    (".com.ec", "com_ec"),
    (".gob.ec", "gob_ec"),
    (".com.ly", "com_ly"),
    (".com.np", "com_np"),
    (".com.py", "com_py"),
    (".com.tw", "com_tw"),
    (".co.zw", "co_zw"),
    (".org.zw", "org_zw"),
    // dynamic dns, no whois
    (".hopto.org", "hopto_org"),
    (".duckdns.org", "duckdns_org"),
    (".no-ip.com", "noip_com"),
    (".no-ip.org", "noip_org"),
];

/// Single-label suffixes whose text is a reserved word in some ecosystems.
const RESERVED_SUFFIXES: &[(&str, &str)] = &[
    ("global", "global_"),
    ("id", "id_"),
    ("in", "in_"),
    ("is", "is_"),
    ("as", "as_"),
];

/// Punycode suffixes and their native-script spelling.
const NON_ASCII_SUFFIXES: &[(&str, &str)] = &[(".xn--p1ai", "ru_rf"), (".рф", "ru_rf")];

/// Compound table sorted longest suffix first so overlapping entries resolve
/// to the most specific one regardless of declaration order.
static COMPOUND_BY_LENGTH: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    let mut entries = COMPOUND_SUFFIXES.to_vec();
    entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    entries
});

/// Canonical key into the TLD registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TldId(String);

impl TldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The suffix as it appears in a domain, without the leading dot.
    ///
    /// `co_uk` maps to `co.uk`, `is_` to `is`, `ru_rf` to `xn--p1ai`.
    /// Identifiers not produced by a special table are their own suffix.
    pub fn suffix(&self) -> String {
        let mapped = COMPOUND_SUFFIXES
            .iter()
            .chain(NON_ASCII_SUFFIXES)
            .find(|(_, id)| *id == self.0)
            .map(|(suffix, _)| suffix.trim_start_matches('.'));

        if let Some(suffix) = mapped {
            return suffix.to_string();
        }

        RESERVED_SUFFIXES
            .iter()
            .find(|(_, id)| *id == self.0)
            .map(|(suffix, _)| suffix.to_string())
            .unwrap_or_else(|| self.0.clone())
    }

    /// Number of labels the suffix consumes, counted from the identifier's
    /// `_`-separated parts (`co_uk` is 2, `is_` is 1).
    pub fn depth(&self) -> usize {
        self.0.split('_').filter(|part| !part.is_empty()).count()
    }
}

impl fmt::Display for TldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TldId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TldId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Result of classifying a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub tld: TldId,
    /// The `.name` registry expects `domain=<name>` queries.
    pub name_hint: bool,
}

impl Classification {
    fn plain(id: &str) -> Self {
        Self {
            tld: TldId::new(id),
            name_hint: false,
        }
    }
}

/// Resolve the TLD identifier for `domain`.
///
/// `domain` is the normalized text (see [`crate::labels::normalize_domain`]);
/// `labels` its split form. Tables are checked in priority order and the
/// first match wins.
pub fn classify(domain: &str, labels: &LabelSequence) -> Classification {
    if labels.len() > 2 {
        if let Some((_, id)) = COMPOUND_BY_LENGTH
            .iter()
            .find(|(suffix, _)| domain.ends_with(suffix))
        {
            return Classification::plain(id);
        }
    }

    let last = labels.last().unwrap_or_default();

    if let Some((_, id)) = RESERVED_SUFFIXES.iter().find(|(suffix, _)| *suffix == last) {
        return Classification::plain(id);
    }

    if let Some((_, id)) = NON_ASCII_SUFFIXES
        .iter()
        .find(|(suffix, _)| domain.ends_with(suffix))
    {
        return Classification::plain(id);
    }

    if domain.ends_with(".name") {
        return Classification {
            tld: TldId::new("name"),
            name_hint: true,
        };
    }

    Classification::plain(last)
}

/// Fail with [`WhoisError::UnknownTld`] when the identifier has no registry entry.
pub fn ensure_known<'a>(registry: &'a TldRegistry, tld: &TldId) -> Result<&'a TldMeta> {
    registry
        .get(tld)
        .ok_or_else(|| WhoisError::UnknownTld(tld.to_string()))
}
