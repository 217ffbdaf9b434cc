//! Offline replay of recorded face metadata.
//!
//! This crate provides:
//! - JSON-lines frame records and decision output
//! - A replayer driving one stream processor per recording
//! - Environment-driven defaults and tracing setup

pub mod config;
pub mod error;
pub mod logging;
pub mod replay;

pub use config::ReplayConfig;
pub use error::{ReplayError, ReplayResult};
pub use replay::{DecisionLine, FrameRecord, ReplaySummary, Replayer};
