//! Rigetti adapter for the 2024 Ankaa exports.
//!
//! Each backend folder under `raw_data/rigetti_2024/<strategy>/` holds two
//! CSV files sharing seven key columns: one with per-bitstring counts, one
//! with per-circuit win rates. Rows are joined on those keys and grouped by
//! `dataID` into one experiment per run.

mod adapter;
mod error;
pub mod table;

pub use adapter::{DATA_DIR, RigettiAdapter, STRATEGIES, StrategyLayout};
pub use error::{RigettiError, RigettiResult};
