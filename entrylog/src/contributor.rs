//! Metadata contributors and the chain that runs them.
//!
//! A contributor adds one or more fields to an entry's metadata header at
//! append time. Contributors are independent: each fills only its own
//! fields, and a contributor that is not configured simply contributes
//! nothing — readers treat missing optional fields as absent. The chain
//! invokes contributors in the configured order, once per append, under the
//! append path's mutual exclusion.
//!
//! Contributors are registered by stable identifier (see
//! [`INDEX_CONTRIBUTOR`] and [`BROKER_TIMESTAMP_CONTRIBUTOR`]); unknown
//! identifiers in the configuration are skipped with a warning.

use std::sync::Arc;

use common::Clock;

use crate::assigner::IndexAssigner;
use crate::codec::EntryMetadata;
use crate::config::{BROKER_TIMESTAMP_CONTRIBUTOR, INDEX_CONTRIBUTOR};
use crate::error::Result;

/// A pluggable unit that adds fields to an entry's metadata header.
pub trait MetadataContributor: Send + Sync {
    /// The contributor's stable identifier.
    fn name(&self) -> &'static str;

    /// Produces this contributor's fields for the entry being appended and
    /// advances its internal state.
    ///
    /// Called exactly once per physical append, serialized with other
    /// appends on the same log instance.
    fn contribute(&self, batch_size: u64, meta: &mut EntryMetadata) -> Result<()>;
}

/// Contributes the broker-assigned logical index.
struct IndexContributor {
    assigner: Arc<IndexAssigner>,
}

impl MetadataContributor for IndexContributor {
    fn name(&self) -> &'static str {
        INDEX_CONTRIBUTOR
    }

    fn contribute(&self, batch_size: u64, meta: &mut EntryMetadata) -> Result<()> {
        meta.index = Some(self.assigner.on_append(batch_size)?);
        Ok(())
    }
}

/// Contributes the broker wall-clock timestamp.
struct BrokerTimestampContributor {
    clock: Arc<dyn Clock>,
}

impl MetadataContributor for BrokerTimestampContributor {
    fn name(&self) -> &'static str {
        BROKER_TIMESTAMP_CONTRIBUTOR
    }

    fn contribute(&self, _batch_size: u64, meta: &mut EntryMetadata) -> Result<()> {
        meta.broker_time_ms = Some(self.clock.now_millis());
        Ok(())
    }
}

/// An ordered chain of metadata contributors.
pub struct ContributorChain {
    contributors: Vec<Box<dyn MetadataContributor>>,
    assigner: Option<Arc<IndexAssigner>>,
}

impl ContributorChain {
    /// Builds a chain from configured contributor identifiers.
    ///
    /// Identifiers are resolved against the built-in registry in the order
    /// given. Unknown or duplicate identifiers are skipped with a warning;
    /// they never fail the build.
    pub fn from_names(names: &[String], clock: Arc<dyn Clock>) -> Self {
        let mut contributors: Vec<Box<dyn MetadataContributor>> = Vec::new();
        let mut assigner = None;

        for name in names {
            if contributors.iter().any(|c| c.name() == name) {
                tracing::warn!(contributor = %name, "duplicate contributor id, skipping");
                continue;
            }
            match name.as_str() {
                INDEX_CONTRIBUTOR => {
                    let shared = Arc::new(IndexAssigner::new());
                    assigner = Some(Arc::clone(&shared));
                    contributors.push(Box::new(IndexContributor { assigner: shared }));
                }
                BROKER_TIMESTAMP_CONTRIBUTOR => {
                    contributors.push(Box::new(BrokerTimestampContributor {
                        clock: Arc::clone(&clock),
                    }));
                }
                _ => {
                    tracing::warn!(contributor = %name, "unknown contributor id, skipping");
                }
            }
        }

        Self {
            contributors,
            assigner,
        }
    }

    /// Returns true if no contributor is active.
    ///
    /// An empty chain writes no metadata header at all.
    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty()
    }

    /// Returns the index assigner, if the index contributor is active.
    pub fn index_assigner(&self) -> Option<&Arc<IndexAssigner>> {
        self.assigner.as_ref()
    }

    /// Runs every contributor in order and returns the combined header
    /// fields for one appended entry.
    pub fn contribute(&self, batch_size: u64) -> Result<EntryMetadata> {
        let mut meta = EntryMetadata::default();
        for contributor in &self.contributors {
            contributor.contribute(batch_size, &mut meta)?;
        }
        Ok(meta)
    }
}
