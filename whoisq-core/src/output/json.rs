use serde_json::{Map, Value};

use super::OutputFormatter;
use crate::whois::Domain;

pub struct JsonFormatter {
    pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    fn to_json<T: serde::Serialize + ?Sized>(&self, value: &T) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value)
                .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        } else {
            serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_domain(&self, domain: &Domain) -> String {
        self.to_json(domain)
    }

    fn format_absent(&self, _query: &str) -> String {
        self.to_json(&Value::Null)
    }

    fn format_map(&self, map: &Map<String, Value>) -> String {
        self.to_json(map)
    }

    fn format_tlds(&self, tlds: &[String]) -> String {
        self.to_json(tlds)
    }
}
