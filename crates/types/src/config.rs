// Path: crates/types/src/config.rs

//! Operator configuration for the filler.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A transaction filter, scoping which rows the filler materializes.
///
/// Filters are written as `[+|-]contract[:action]` on the command line; a
/// missing sign means include. The delta stream carries state rows rather
/// than actions, so the filter is applied to what rows have: `contract`
/// names an announced table, and the `action` part, when present, narrows
/// the filter to rows whose key begins with it.
///
/// When any include filter is configured, only rows admitted by an include
/// filter are materialized; a matching exclude filter always drops a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrxFilter {
    /// `true` to include matches, `false` to exclude them.
    pub include: bool,
    /// The announced table (contract data set) the filter applies to.
    pub contract: String,
    /// Narrows the filter to rows whose key starts with this scope, when
    /// set.
    pub action: Option<String>,
}

impl TrxFilter {
    /// True when this filter applies to rows of `table`.
    pub fn applies_to(&self, table: &str) -> bool {
        self.contract == table
    }

    /// True when the filter's action scope covers this row key. A filter
    /// without an action scope covers every row of its table.
    pub fn matches_key(&self, row_key: &[u8]) -> bool {
        match &self.action {
            Some(scope) => row_key.starts_with(scope.as_bytes()),
            None => true,
        }
    }
}

impl FromStr for TrxFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (include, rest) = match s.strip_prefix('-') {
            Some(rest) => (false, rest),
            None => (true, s.strip_prefix('+').unwrap_or(s)),
        };
        let mut parts = rest.splitn(2, ':');
        let contract = parts.next().unwrap_or_default();
        if contract.is_empty() {
            return Err(ConfigError::InvalidFilter(s.to_string()));
        }
        let action = parts.next().filter(|a| !a.is_empty()).map(str::to_string);
        Ok(Self { include, contract: contract.to_string(), action })
    }
}

/// Configuration for one fill session, shared by the supervisor and every
/// session it creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillConfig {
    /// The upstream state-history endpoint, `host:port`.
    pub connect_to: String,
    /// Start no earlier than this block.
    #[serde(default)]
    pub skip_to: u32,
    /// Exit cleanly when reaching this block; `0` disables.
    #[serde(default)]
    pub stop_before: u32,
    /// Transaction filters, applied by the row codecs during
    /// materialization.
    #[serde(default)]
    pub trx_filters: Vec<TrxFilter>,
}

impl FillConfig {
    /// Splits and validates the configured endpoint.
    ///
    /// Fails fast at startup on a missing colon or an unparseable port, the
    /// only malformed endpoints we can detect before dialing.
    pub fn endpoint(&self) -> Result<(String, u16), ConfigError> {
        let (host, port) = self
            .connect_to
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::InvalidEndpoint(self.connect_to.clone()))?;
        if host.is_empty() {
            return Err(ConfigError::InvalidEndpoint(self.connect_to.clone()));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| ConfigError::InvalidEndpoint(self.connect_to.clone()))?;
        Ok((host.to_string(), port))
    }
}
