//! Flat key/value view of a query result.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::whois::Domain;

/// Record fields as a JSON object, or an empty object when there is no record.
pub fn into_map(domain: Option<Domain>) -> Result<Map<String, Value>> {
    let Some(domain) = domain else {
        return Ok(Map::new());
    };

    match serde_json::to_value(domain)? {
        Value::Object(map) => Ok(map),
        // Domain always serializes to an object
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            Ok(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tld::TldId;
    use crate::whois::ParsedRecord;

    #[test]
    fn test_absent_is_empty() {
        assert!(into_map(None).unwrap().is_empty());
    }

    #[test]
    fn test_fields_present() {
        let mut record = ParsedRecord::new();
        record.push("domain_name", "example.co.uk");
        record.push("registrar", "Nominet");
        record.push("creation_date", "2001-02-03");
        let domain = Domain::from_parsed(&record, &TldId::new("co_uk")).unwrap();

        let map = into_map(Some(domain)).unwrap();

        assert_eq!(map["name"], "example.co.uk");
        assert_eq!(map["tld"], "co.uk");
        assert_eq!(map["registrar"], "Nominet");
        assert_eq!(map["creation_date"], "2001-02-03T00:00:00Z");
        assert!(map["expiration_date"].is_null());
        assert!(map["name_servers"].as_array().unwrap().is_empty());
    }
}
