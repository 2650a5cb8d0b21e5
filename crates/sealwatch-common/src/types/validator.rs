//! Validator identity and statistics types
//!
//! A validator is identified by its stable account address; the key it
//! signs blocks with may rotate without changing that identity.

use {
    serde::{Deserialize, Serialize},
    std::fmt,
};

pub type BlockNumber = u64;
pub type EpochNumber = u64;

/// Stable account address of a validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatorId(pub String);

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ValidatorId {
    fn from(s: &str) -> Self {
        ValidatorId(s.to_string())
    }
}

/// Address of the key a validator currently signs with. Rotates rarely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignerId(pub String);

impl fmt::Display for SignerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SignerId {
    fn from(s: &str) -> Self {
        SignerId(s.to_string())
    }
}

impl SignerId {
    /// Identity fallback used when a signer has no registered account.
    pub fn as_validator_id(&self) -> ValidatorId {
        ValidatorId(self.0.clone())
    }
}

/// Running signing statistics for one validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorStat {
    pub address: ValidatorId,
    pub missed_blocks: u64,
    pub total_blocks: u64,
    pub current_miss_streak: u64,
}

impl ValidatorStat {
    pub fn new(address: ValidatorId) -> Self {
        Self {
            address,
            missed_blocks: 0,
            total_blocks: 0,
            current_miss_streak: 0,
        }
    }

    /// Fraction of observed blocks this validator missed. Zero until the
    /// first block is observed.
    pub fn miss_ratio(&self) -> f64 {
        if self.total_blocks == 0 {
            0.0
        } else {
            self.missed_blocks as f64 / self.total_blocks as f64
        }
    }
}
