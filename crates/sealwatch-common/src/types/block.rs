//! Block data and scan range types

use {
    super::validator::{BlockNumber, SignerId},
    serde::{Deserialize, Serialize},
    std::fmt::{Debug, Formatter, Result as FmtResult},
};

/// Sentinel used for an open-ended scan.
pub const UNBOUNDED_END: BlockNumber = 10_000_000_000;

#[derive(Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub number: BlockNumber,
    pub miner: SignerId,
    pub timestamp: i64,
    /// Raw extra metadata as the node returned it. Deployment dependent;
    /// some chains embed the aggregated seal here.
    pub extra_data: Option<String>,
}

impl Debug for BlockInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BlockInfo")
            .field("number", &self.number)
            .field("miner", &self.miner)
            .field("timestamp", &self.timestamp)
            .field("extra_data_len", &self.extra_data.as_ref().map_or(0, |d| d.len()))
            .finish()
    }
}

/// Requested scan bounds before resolution against the chain head.
///
/// A negative start is relative to the head; an unset start means the last
/// 100 blocks. An unset end leaves the scan open-ended.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RangeSpec {
    pub start: Option<i64>,
    pub end: Option<BlockNumber>,
}

impl RangeSpec {
    /// Whether resolving these bounds requires the current chain head.
    pub fn needs_head(&self) -> bool {
        !matches!(self.start, Some(s) if s >= 0)
    }

    pub fn resolve(&self, head: BlockNumber) -> ScanRange {
        let start = match self.start {
            Some(s) if s >= 0 => s as BlockNumber,
            Some(s) => head.saturating_sub(s.unsigned_abs()),
            None => head.saturating_sub(100),
        };
        ScanRange {
            start,
            end: self.end.unwrap_or(UNBOUNDED_END),
        }
    }
}

/// Inclusive block range a scan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRange {
    pub start: BlockNumber,
    pub end: BlockNumber,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_defaults_to_last_hundred() {
        let spec = RangeSpec::default();
        assert!(spec.needs_head());
        let range = spec.resolve(5000);
        assert_eq!(range, ScanRange { start: 4900, end: UNBOUNDED_END });
    }

    #[test]
    fn test_negative_start_is_relative_to_head() {
        let spec = RangeSpec { start: Some(-250), end: Some(6000) };
        assert!(spec.needs_head());
        assert_eq!(spec.resolve(5000), ScanRange { start: 4750, end: 6000 });
    }

    #[test]
    fn test_explicit_range_ignores_head() {
        let spec = RangeSpec { start: Some(100), end: Some(200) };
        assert!(!spec.needs_head());
        assert_eq!(spec.resolve(0), ScanRange { start: 100, end: 200 });
    }

    #[test]
    fn test_start_saturates_at_genesis() {
        let spec = RangeSpec { start: Some(-250), end: None };
        assert_eq!(spec.resolve(100).start, 0);
    }
}
