//! The read-only client interface the scanner is written against

use {
    async_trait::async_trait,
    num_bigint::BigUint,
    sealwatch_common::types::{BlockInfo, BlockNumber, EpochNumber, SignerId, ValidatorId},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("missing {what} for block {block}")]
    MissingData { block: BlockNumber, what: &'static str },

    #[error("malformed chain data: {0}")]
    Malformed(String),
}

impl ChainError {
    /// Transient failures are retried by the scanner; anything else means
    /// statistics past this point would be unreliable and ends the scan.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::Transport(_) | ChainError::Rpc { .. })
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;

/// Read-only view of an epoch-based PoS chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn current_height(&self) -> Result<BlockNumber>;

    async fn get_block(&self, number: BlockNumber) -> Result<BlockInfo>;

    async fn epoch_of_block(&self, number: BlockNumber) -> Result<EpochNumber>;

    /// Ordered signer set active at `block`. The ordering fixes the seal
    /// bitmap's bit positions for that block's epoch.
    async fn validator_signers_at(&self, block: BlockNumber) -> Result<Vec<SignerId>>;

    /// Reverse lookup from a signing key to its owning account. `Ok(None)`
    /// means the signer is not registered to any account.
    async fn account_for_signer(&self, signer: &SignerId) -> Result<Option<ValidatorId>>;

    /// Aggregated-seal bitmap recording who signed block `number`. Where
    /// the bitmap comes from (a contract view, the next block's parent
    /// seal, raw extra metadata) is a deployment detail behind this trait.
    async fn seal_bitmap_for_block(&self, number: BlockNumber) -> Result<BigUint>;

    /// Human-readable name registered for an account, if any.
    async fn display_name_of(&self, account: &ValidatorId) -> Result<Option<String>>;
}
