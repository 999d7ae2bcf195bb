use chrono::{DateTime, Utc};
use colored::Colorize;
use serde_json::{Map, Value};

use super::OutputFormatter;
use crate::colors::CatppuccinExt;
use crate::whois::Domain;

pub struct HumanFormatter {
    use_colors: bool,
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    fn label(&self, text: &str) -> String {
        if self.use_colors {
            text.sky().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn value(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_white().to_string()
        } else {
            text.to_string()
        }
    }

    fn warning(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_yellow().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn error(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_red().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn header(&self, text: &str) -> String {
        if self.use_colors {
            format!("\n{}\n{}", text.lavender().bold(), "─".repeat(text.len()).subtext0())
        } else {
            format!("\n{}\n{}", text, "-".repeat(text.len()))
        }
    }

    fn field(&self, output: &mut Vec<String>, name: &str, value: Option<&str>) {
        if let Some(value) = value {
            output.push(format!("  {}: {}", self.label(name), self.value(value)));
        }
    }

    fn date(&self, output: &mut Vec<String>, name: &str, date: Option<DateTime<Utc>>) {
        let formatted = date.map(|d| d.format("%Y-%m-%d").to_string());
        self.field(output, name, formatted.as_deref());
    }

    fn list(&self, output: &mut Vec<String>, name: &str, values: &[String]) {
        if values.is_empty() {
            return;
        }
        output.push(format!("  {}:", self.label(name)));
        for value in values {
            output.push(format!("    - {}", self.value(value)));
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_domain(&self, domain: &Domain) -> String {
        let mut output = Vec::new();

        output.push(self.header(&format!("WHOIS: {}", domain.name)));

        self.field(&mut output, "TLD", Some(domain.tld.as_str()));
        self.field(&mut output, "Registrar", domain.registrar.as_deref());
        self.field(&mut output, "Registrant Country", domain.registrant_country.as_deref());
        self.date(&mut output, "Created", domain.creation_date);

        if let Some(expires) = domain.expiration_date {
            let days_until = (expires - Utc::now()).num_days();
            let expiry_str = expires.format("%Y-%m-%d").to_string();
            let status = if days_until < 30 {
                self.error(&format!("{} (expires in {} days!)", expiry_str, days_until))
            } else if days_until < 90 {
                self.warning(&format!("{} ({} days)", expiry_str, days_until))
            } else {
                self.value(&format!("{} ({} days)", expiry_str, days_until))
            };
            output.push(format!("  {}: {}", self.label("Expires"), status));
        }

        self.date(&mut output, "Updated", domain.last_updated);
        self.list(&mut output, "Nameservers", &domain.name_servers);
        self.list(&mut output, "Status", &domain.statuses);
        self.field(&mut output, "DNSSEC", domain.dnssec.as_deref());
        self.list(&mut output, "Emails", &domain.emails);

        output.join("\n")
    }

    fn format_absent(&self, query: &str) -> String {
        format!("{} {}", self.warning("No WHOIS record found for"), self.value(query))
    }

    fn format_map(&self, map: &Map<String, Value>) -> String {
        let mut output = Vec::new();
        for (key, value) in map {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    let items: Vec<String> = items.iter().map(plain).collect();
                    self.list(&mut output, key, &items);
                }
                other => self.field(&mut output, key, Some(plain(other).as_str())),
            }
        }
        output.join("\n")
    }

    fn format_tlds(&self, tlds: &[String]) -> String {
        tlds.join("\n")
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> Domain {
        Domain {
            name: "example.com".to_string(),
            tld: "com".to_string(),
            registrar: Some("Example Registrar".to_string()),
            registrant_country: None,
            creation_date: DateTime::parse_from_rfc3339("1995-08-14T04:00:00Z")
                .ok()
                .map(|d| d.with_timezone(&Utc)),
            expiration_date: None,
            last_updated: None,
            status: Some("clientTransferProhibited".to_string()),
            statuses: vec!["clientTransferProhibited".to_string()],
            dnssec: None,
            name_servers: vec!["a.iana-servers.net".to_string()],
            emails: Vec::new(),
        }
    }

    #[test]
    fn test_format_domain_plain() {
        let out = HumanFormatter::new().without_colors().format_domain(&domain());

        assert!(out.contains("WHOIS: example.com"));
        assert!(out.contains("Registrar: Example Registrar"));
        assert!(out.contains("Created: 1995-08-14"));
        assert!(out.contains("    - a.iana-servers.net"));
        assert!(!out.contains("DNSSEC"));
    }

    #[test]
    fn test_format_absent() {
        let out = HumanFormatter::new().without_colors().format_absent("missing.com");
        assert_eq!(out, "No WHOIS record found for missing.com");
    }

    #[test]
    fn test_format_map_skips_nulls() {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::from("example.com"));
        map.insert("dnssec".to_string(), Value::Null);
        let out = HumanFormatter::new().without_colors().format_map(&map);
        assert_eq!(out, "  name: example.com");
    }
}
