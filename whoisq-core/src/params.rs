//! Effective server and delay for one query.

use std::time::Duration;

use crate::config::{QueryOptions, WhoisConfig};
use crate::error::{Result, WhoisError};
use crate::tld::{TldId, TldMeta};

/// Emit at info when the caller asked for verbose output, debug otherwise.
macro_rules! verbose_event {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

pub(crate) use verbose_event;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryParams {
    /// `None` leaves server selection to the executor.
    pub server: Option<String>,
    pub delay: Duration,
}

impl QueryParams {
    /// Combine caller options, process defaults and registry hints.
    ///
    /// Private registries are rejected here, before any lookup happens.
    pub fn resolve(
        tld: &TldId,
        meta: &TldMeta,
        options: &QueryOptions,
        config: &WhoisConfig,
    ) -> Result<Self> {
        if meta.private_registry {
            return Err(WhoisError::PrivateRegistry(tld.to_string()));
        }

        let server = match (&options.server, &meta.server) {
            (Some(server), _) => Some(server.clone()),
            (None, Some(hint)) => {
                verbose_event!(options.verbose, server = %hint, tld = %tld, "Using server hint");
                Some(hint.clone())
            }
            (None, None) => None,
        };

        let requested = if options.slow_down.is_zero() {
            config.slow_down
        } else {
            options.slow_down
        };

        let delay = match meta.slow_down {
            Some(hint) if requested.is_zero() && !hint.is_zero() => {
                verbose_event!(options.verbose, delay_secs = hint.as_secs(), tld = %tld, "Using slow-down hint");
                hint
            }
            _ => requested,
        };

        Ok(Self { server, delay })
    }
}
