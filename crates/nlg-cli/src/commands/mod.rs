//! CLI command implementations.

pub mod common;
pub mod experiments;
pub mod games;
pub mod ingest;
pub mod init;
