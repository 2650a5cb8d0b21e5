//! Per-block scan output consumed by renderers

use {
    sealwatch_common::types::{BlockNumber, EpochNumber, ValidatorId},
    serde::{Deserialize, Serialize},
};

/// Incremental record describing one fully processed block.
///
/// `signed` is the display vector (block-producer override applied);
/// `raw_signed` is the seal exactly as decoded. Both align index for
/// index with `validators`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRecord {
    pub epoch: EpochNumber,
    pub block: BlockNumber,
    pub validators: Vec<ValidatorId>,
    pub signed: Vec<bool>,
    pub raw_signed: Vec<bool>,
    pub down: Vec<ValidatorId>,
    pub down_count: usize,
    pub epoch_change: bool,
}
