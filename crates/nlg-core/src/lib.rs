//! Core types for nonlocal game experiment data.
//!
//! This crate defines the record schema shared by every vendor adapter, the
//! win-rate statistics, and the [`Adapter`] contract.
//!
//! # Overview
//!
//! - [`NonlocalGame`], [`Experiment`], [`Device`], [`CircuitData`] and
//!   [`Winrate`] describe one run of a game on one device.
//! - [`RawHistogram`] holds the per-circuit outcome counts exported next to
//!   an experiment.
//! - [`stats`] computes the confidence interval and p-value of a run.
//! - [`outcome`] decodes vendor histogram keys and scores questions.
//!
//! # Example
//!
//! ```ignore
//! use nlg_core::{NonlocalGame, Winrate};
//!
//! let g14 = NonlocalGame::new("G14", 86.0 / 88.0, 1.0);
//! let win_rate = Winrate::from_circuit_winrates(&g14, &[0.95, 0.80], 2000)?;
//! println!("{}", win_rate.to_str(1));
//! ```

pub mod adapter;
pub mod blocking;
pub mod error;
pub mod experiment;
pub mod game;
pub mod histogram;
pub mod outcome;
pub mod papers;
pub mod path;
pub mod stats;
pub mod winrate;

pub use adapter::{Adapter, IngestRecord};
pub use blocking::run_blocking;
pub use error::{IngestError, IngestResult};
pub use experiment::{AttributeValue, CircuitData, Device, Experiment, circuit_cutoff};
pub use game::{NonlocalGame, Object, Publication};
pub use histogram::{CircuitResult, Counts, HistogramRow, Outcome, RawHistogram};
pub use outcome::{OutcomeEncoding, QuestionKind, QuestionTally};
pub use path::RelPath;
pub use winrate::Winrate;
