mod cache;
mod client;
mod command;
mod parser;
mod record;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, WhoisError};

pub use cache::{CachingExecutor, LookupCache};
pub use client::SocketExecutor;
pub use command::CommandExecutor;
pub use parser::{cleanup_response, RegexParser};
pub use record::{parse_date, Domain, ParsedRecord};

static QUOTA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(quota exceeded|query rate limit exceeded|connection limit exceeded|too many (queries|requests)|limit exceeded)",
    )
    .expect("Invalid quota regex")
});

/// Fail when the registry refused to answer because of rate limiting.
pub(crate) fn check_quota(raw: &str) -> Result<()> {
    match QUOTA_PATTERN.find(raw) {
        Some(m) => Err(WhoisError::QuotaExceeded(m.as_str().to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_quota() {
        assert!(check_quota("Domain Name: example.com\n").is_ok());

        let err = check_quota("%% Query rate limit exceeded. Try later.\n").unwrap_err();
        assert!(matches!(err, WhoisError::QuotaExceeded(_)));

        assert!(check_quota("WHOIS LIMIT EXCEEDED - SEE WWW.PIR.ORG").is_err());
        assert!(check_quota("Too many requests from your IP").is_err());
    }
}
