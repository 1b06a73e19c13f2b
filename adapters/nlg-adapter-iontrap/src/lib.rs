//! Trapped-ion data adapter.
//!
//! Ingests the 2024 Duke collaboration exports and the IonQ Aria win rates
//! found under `raw_data/duke_collab`:
//!
//! | Source | File | Counts |
//! |--------|------|--------|
//! | Duke silver | `silver_unmitigated.csv` | no |
//! | Duke gold | `Gold data.json` | yes, bitstring keys |
//! | Duke blue | `Blue data.txt` | yes, packed index keys |
//! | IonQ Aria | `ionq_winrates.json` | no |
//!
//! Circuit numbers map to questions through the file names in
//! `raw_data/duke_collab/circuits`.

mod adapter;
mod error;
pub mod literal;
mod mapping;
mod sources;

pub use adapter::IonTrapAdapter;
pub use error::{IonTrapError, IonTrapResult};
pub use mapping::CircuitMapping;
pub use sources::Source;
