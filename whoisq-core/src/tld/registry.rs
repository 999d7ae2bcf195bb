use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::TldId;

/// Per-TLD lookup hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TldMeta {
    /// WHOIS server to use instead of the executor's default.
    pub server: Option<String>,
    /// Minimum pause after each query against this registry.
    pub slow_down: Option<Duration>,
    /// The registry has no usable public WHOIS service.
    pub private_registry: bool,
}

impl TldMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_slow_down(mut self, delay: Duration) -> Self {
        self.slow_down = Some(delay);
        self
    }

    pub fn private(mut self) -> Self {
        self.private_registry = true;
        self
    }
}

/// Read-only table of supported TLD identifiers.
#[derive(Debug, Clone, Default)]
pub struct TldRegistry {
    entries: HashMap<TldId, TldMeta>,
}

impl TldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tld: impl Into<TldId>, meta: TldMeta) -> &mut Self {
        self.entries.insert(tld.into(), meta);
        self
    }

    pub fn get(&self, tld: &TldId) -> Option<&TldMeta> {
        self.entries.get(tld)
    }

    pub fn contains(&self, tld: &TldId) -> bool {
        self.entries.contains_key(tld)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All canonical identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&TldId> {
        let mut ids: Vec<&TldId> = self.entries.keys().collect();
        ids.sort();
        ids
    }

    /// Supported suffixes as they are written in domain names, sorted.
    pub fn valid_tlds(&self) -> Vec<String> {
        let mut tlds: Vec<String> = self.entries.keys().map(TldId::suffix).collect();
        tlds.sort();
        tlds
    }
}

/// Registries reached through their own WHOIS host rather than the IANA referral.
const SERVERS: &[(&str, &str)] = &[
    // gTLDs
    ("com", "whois.verisign-grs.com"),
    ("net", "whois.verisign-grs.com"),
    ("org", "whois.pir.org"),
    ("info", "whois.nic.info"),
    ("biz", "whois.nic.biz"),
    ("name", "whois.nic.name"),
    ("mobi", "whois.nic.mobi"),
    ("pro", "whois.nic.pro"),
    ("aero", "whois.aero"),
    ("asia", "whois.nic.asia"),
    ("cat", "whois.nic.cat"),
    ("coop", "whois.nic.coop"),
    ("edu", "whois.educause.edu"),
    ("gov", "whois.dotgov.gov"),
    ("int", "whois.iana.org"),
    ("museum", "whois.nic.museum"),
    ("tel", "whois.nic.tel"),
    ("travel", "whois.nic.travel"),
    ("app", "whois.nic.google"),
    ("dev", "whois.nic.google"),
    ("page", "whois.nic.google"),
    ("xyz", "whois.nic.xyz"),
    ("online", "whois.nic.online"),
    ("site", "whois.nic.site"),
    ("shop", "whois.nic.shop"),
    ("top", "whois.nic.top"),
    ("global_", "whois.nic.global"),
    // ccTLDs
    ("ai", "whois.nic.ai"),
    ("as_", "whois.nic.as"),
    ("at", "whois.nic.at"),
    ("au", "whois.auda.org.au"),
    ("be", "whois.dns.be"),
    ("br", "whois.registro.br"),
    ("ca", "whois.cira.ca"),
    ("cc", "ccwhois.verisign-grs.com"),
    ("ch", "whois.nic.ch"),
    ("cn", "whois.cnnic.cn"),
    ("co", "whois.nic.co"),
    ("cz", "whois.nic.cz"),
    ("de", "whois.denic.de"),
    ("dk", "whois.dk-hostmaster.dk"),
    ("ee", "whois.tld.ee"),
    ("eu", "whois.eu"),
    ("fi", "whois.fi"),
    ("fr", "whois.nic.fr"),
    ("id_", "whois.id"),
    ("ie", "whois.weare.ie"),
    ("il", "whois.isoc.org.il"),
    ("in_", "whois.registry.in"),
    ("io", "whois.nic.io"),
    ("is_", "whois.isnic.is"),
    ("it", "whois.nic.it"),
    ("jp", "whois.jprs.jp"),
    ("kr", "whois.kr"),
    ("me", "whois.nic.me"),
    ("mx", "whois.mx"),
    ("nl", "whois.domain-registry.nl"),
    ("no", "whois.norid.no"),
    ("nz", "whois.irs.net.nz"),
    ("pl", "whois.dns.pl"),
    ("pt", "whois.dns.pt"),
    ("ru", "whois.tcinet.ru"),
    ("ru_rf", "whois.tcinet.ru"),
    ("se", "whois.iis.se"),
    ("sg", "whois.sgnic.sg"),
    ("su", "whois.tcinet.ru"),
    ("tr", "whois.trabis.gov.tr"),
    ("tv", "tvwhois.verisign-grs.com"),
    ("tw", "whois.twnic.net.tw"),
    ("ua", "whois.ua"),
    ("uk", "whois.nic.uk"),
    ("us", "whois.nic.us"),
    // second-level registries
    ("ac_uk", "whois.nic.ac.uk"),
    ("co_uk", "whois.nic.uk"),
    ("org_uk", "whois.nic.uk"),
    ("me_uk", "whois.nic.uk"),
    ("ltd_uk", "whois.nic.uk"),
    ("plc_uk", "whois.nic.uk"),
    ("co_il", "whois.isoc.org.il"),
    ("com_au", "whois.auda.org.au"),
    ("com_sg", "whois.sgnic.sg"),
    ("com_tr", "whois.trabis.gov.tr"),
    ("edu_tr", "whois.trabis.gov.tr"),
    ("org_tr", "whois.trabis.gov.tr"),
    ("com_tw", "whois.twnic.net.tw"),
    ("edu_ua", "whois.ua"),
    ("lviv_ua", "whois.ua"),
];

/// TLDs known to the IANA referral with no hints needed.
const REFERRAL_ONLY: &[&str] = &[
    "ac", "ae", "ag", "am", "ar", "aw", "ax", "bg", "bj", "bo", "by", "bz", "cl", "cr", "cx",
    "cy", "do", "ec", "es", "fo", "ga", "gd", "ge", "gg", "gl", "gs", "hk", "hn", "hr", "ht",
    "hu", "im", "ir", "je", "ke", "kg", "ki", "kz", "la", "li", "lt", "lu", "lv", "ly", "ma",
    "md", "mk", "ml", "mn", "ms", "mu", "my", "na", "nc", "nf", "ng", "np", "nu", "pe", "pf",
    "ph", "pk", "pm", "pr", "pw", "py", "qa", "re", "ro", "rs", "sa", "sb", "sc", "sh", "si",
    "sk", "sm", "sn", "so", "st", "sx", "tc", "tf", "th", "tk", "tl", "tm", "tn", "to", "tz",
    "ug", "uy", "uz", "vc", "ve", "vg", "vn", "wf", "ws", "yt", "za", "zm", "zw",
    "academy", "agency", "art", "bar", "best", "bike", "blog", "cafe", "care", "center",
    "chat", "city", "cloud", "club", "company", "cool", "design", "digital", "email",
    "events", "expert", "fun", "games", "group", "guru", "host", "icu", "live", "link",
    "ltd", "media", "network", "news", "ninja", "one", "photo", "pub", "rocks", "run",
    "services", "social", "software", "solutions", "space", "store", "studio", "systems",
    "team", "tech", "today", "tools", "vip", "website", "wiki", "work", "world", "zone",
    "ca_ug", "co_ug", "ac_th", "co_th", "go_th", "in_th", "ac_jp", "ad_jp", "co_jp", "ed_jp",
    "go_jp", "gr_jp", "lg_jp", "ne_jp", "or_jp", "geo_jp", "co_ke", "com_bo", "com_ec",
    "gob_ec", "com_ly", "com_np", "com_py", "co_zw", "org_zw",
];

/// Registries that rate-limit aggressively.
const SLOW_DOWN: &[(&str, u64)] = &[("jp", 2), ("co_jp", 2), ("ne_jp", 2), ("or_jp", 2), ("de", 1)];

/// No public WHOIS at all.
const PRIVATE: &[&str] = &["hopto_org", "duckdns_org", "noip_com", "noip_org", "gr"];

pub static BUILTIN_REGISTRY: Lazy<TldRegistry> = Lazy::new(|| {
    let mut registry = TldRegistry::new();

    for tld in REFERRAL_ONLY {
        registry.insert(*tld, TldMeta::new());
    }

    for (tld, server) in SERVERS {
        registry.insert(*tld, TldMeta::new().with_server(*server));
    }

    for (tld, secs) in SLOW_DOWN {
        let id = TldId::new(*tld);
        let meta = registry.get(&id).cloned().unwrap_or_default();
        registry.insert(id, meta.with_slow_down(Duration::from_secs(*secs)));
    }

    for tld in PRIVATE {
        registry.insert(*tld, TldMeta::new().private());
    }

    registry
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_common_tlds() {
        for tld in ["com", "net", "org", "uk", "co_uk", "is_", "ru_rf", "name"] {
            assert!(BUILTIN_REGISTRY.contains(&TldId::new(tld)), "missing {tld}");
        }
        assert!(!BUILTIN_REGISTRY.contains(&TldId::new("faketld")));
    }

    #[test]
    fn test_builtin_hints() {
        let com = BUILTIN_REGISTRY.get(&TldId::new("com")).unwrap();
        assert_eq!(com.server.as_deref(), Some("whois.verisign-grs.com"));
        assert!(!com.private_registry);

        let jp = BUILTIN_REGISTRY.get(&TldId::new("co_jp")).unwrap();
        assert_eq!(jp.slow_down, Some(Duration::from_secs(2)));

        let de = BUILTIN_REGISTRY.get(&TldId::new("de")).unwrap();
        assert_eq!(de.server.as_deref(), Some("whois.denic.de"));
        assert_eq!(de.slow_down, Some(Duration::from_secs(1)));

        assert!(BUILTIN_REGISTRY.get(&TldId::new("duckdns_org")).unwrap().private_registry);
    }

    #[test]
    fn test_valid_tlds_uses_literal_suffixes() {
        let tlds = BUILTIN_REGISTRY.valid_tlds();
        assert!(tlds.contains(&"co.uk".to_string()));
        assert!(tlds.contains(&"is".to_string()));
        assert!(tlds.contains(&"xn--p1ai".to_string()));
        assert!(tlds.contains(&"no-ip.com".to_string()));
        assert!(!tlds.iter().any(|t| t.contains('_')));

        let mut sorted = tlds.clone();
        sorted.sort();
        assert_eq!(tlds, sorted);
    }

    #[test]
    fn test_custom_registry() {
        let mut registry = TldRegistry::new();
        registry
            .insert("test", TldMeta::new().with_server("whois.test"))
            .insert("hidden", TldMeta::new().private());

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.identifiers(),
            vec![&TldId::new("hidden"), &TldId::new("test")]
        );
    }
}
