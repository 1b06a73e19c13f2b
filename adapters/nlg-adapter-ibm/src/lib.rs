//! Adapter for the 2024 IBM Quantum G14 batches.
//!
//! Each batch under `raw_data/ibm_2024/<experiment_id>/` was submitted as a
//! set of jobs and downloaded as `raw.zip`. The archive expands to one folder
//! per job:
//!
//! ```text
//! <job_id>/
//!   game/<strategy>/<va>_<vb>/counts.json
//!   noise/spam_matrix/<B>basis_SPAM_<bits>/counts.json
//!   noise/mirror/<strategy>/counts.json
//!   calibration_data.json
//! ```
//!
//! Besides the win rates, every experiment carries readout-mitigated win
//! rates, SPAM fidelities, the mirror-circuit fidelity and a crosstalk
//! estimate when the noise data allows it.
//!
//! Job status and creation dates come from a [`JobService`]; use
//! [`IbmRuntimeClient`] against IBM Quantum or [`StaticJobService`] offline.

mod adapter;
mod archive;
pub mod discovery;
mod error;
mod files;
pub mod game_result;
pub mod job_service;
pub mod noise;

pub use adapter::{DATA_DIR, IbmAdapter};
pub use error::{IbmError, IbmResult};
pub use job_service::{
    DEFAULT_ENDPOINT, IbmRuntimeClient, JobInfo, JobService, JobStatus, StaticJobService,
};
