//! Core scanning logic for sealwatch
//! Decodes aggregated-seal bitmaps and tracks per-validator downtime

pub mod bitmap;
pub mod cancel;
pub mod poller;
pub mod record;
pub mod registry;
pub mod tracker;

use sealwatch_chain::ChainError;
use thiserror::Error;

/// Errors that end a scan. Transient fetch failures are retried inside the
/// poller and never surface here.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("chain error while {context}: {source}")]
    Chain {
        context: String,
        #[source]
        source: ChainError,
    },

    #[error("invalid scan range: {0}")]
    Range(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;

pub use cancel::CancelFlag;
pub use poller::{BlockScanPoller, PollerConfig, ScanOutcome, ScanReport, ScanState};
pub use record::BlockRecord;
pub use registry::{EpochValidatorRegistry, OrderedValidatorSet};
pub use tracker::DowntimeTracker;
