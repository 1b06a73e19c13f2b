//! The vendor adapter capability.
//!
//! An adapter is built with the game it ingests data for and the data folder
//! it reads from. Its single operation walks the vendor's raw corpus and
//! returns one [`IngestRecord`] per valid run. Independent units of work
//! inside an adapter run concurrently; any unit failing fails the whole call.

use async_trait::async_trait;

use crate::error::IngestResult;
use crate::experiment::Experiment;
use crate::histogram::RawHistogram;

/// An experiment and, when the vendor provides raw counts, its histogram.
pub type IngestRecord = (Experiment, Option<RawHistogram>);

/// Source of experiment records for one hardware vendor.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Short name used in logs and configuration.
    fn name(&self) -> &str;

    /// Parse every valid run under the adapter's data root.
    ///
    /// Runs excluded by the adapter's filters are skipped silently.
    async fn ingest(&self) -> IngestResult<Vec<IngestRecord>>;
}
