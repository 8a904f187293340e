//! Configuration for the indexing engine.

/// Stable identifier of the index contributor.
pub const INDEX_CONTRIBUTOR: &str = "index";

/// Stable identifier of the broker timestamp contributor.
pub const BROKER_TIMESTAMP_CONTRIBUTOR: &str = "broker-timestamp";

/// Configuration for opening an [`IndexedLog`](crate::IndexedLog).
///
/// The contributor list is ordered: contributors run in the configured order
/// on every append. Unknown identifiers are skipped with a warning rather
/// than failing the open, so a configuration written for a newer version
/// still opens on an older one.
///
/// The default configuration activates no contributors, in which case
/// entries are stored without a metadata header.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Ordered list of metadata contributor identifiers to activate.
    pub contributors: Vec<String>,
}

impl Config {
    /// Configuration with the standard contributor set: index assignment
    /// followed by broker timestamps.
    pub fn standard() -> Self {
        Self {
            contributors: vec![
                INDEX_CONTRIBUTOR.to_string(),
                BROKER_TIMESTAMP_CONTRIBUTOR.to_string(),
            ],
        }
    }

    /// Configuration with only index assignment active.
    pub fn index_only() -> Self {
        Self {
            contributors: vec![INDEX_CONTRIBUTOR.to_string()],
        }
    }
}
