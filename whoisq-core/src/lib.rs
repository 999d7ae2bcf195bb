pub mod adapter;
pub mod colors;
pub mod config;
pub mod engine;
pub mod error;
pub mod idn;
pub mod labels;
pub mod output;
pub mod params;
pub mod query;
pub mod tld;
pub mod whois;

pub use error::{Result, WhoisError};
pub use labels::{normalize_domain, LabelSequence};

pub use config::{Backend, QueryOptions, WhoisConfig};
pub use engine::{Engine, LookupExecutor, LookupRequest, RecordParser};
pub use params::QueryParams;
pub use query::{get, query, valid_tlds, BackendExecutor, Whois};
pub use tld::{classify, Classification, TldId, TldMeta, TldRegistry};
pub use whois::{
    CachingExecutor, CommandExecutor, Domain, ParsedRecord, RegexParser, SocketExecutor,
};

pub use output::{OutputFormat, OutputFormatter};
