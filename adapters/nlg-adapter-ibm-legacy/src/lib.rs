//! Adapter for the 2023 IBM Quantum G14 runs.
//!
//! The export in `raw_data/ibm_2023` consists of two CSV files:
//!
//! - `ibm_processed.csv`: one row per circuit with columns
//!   `job, backend, shots, time, qtype, q_winrate, va, vb`
//! - `ibm_results.csv`: raw counts with columns `va, vb, ca, cb, n`
//!
//! Rows are grouped by job; the counts of a question are joined on `(va, vb)`.

mod adapter;
mod error;
mod records;

pub use adapter::IbmLegacyAdapter;
pub use error::{LegacyError, LegacyResult};
