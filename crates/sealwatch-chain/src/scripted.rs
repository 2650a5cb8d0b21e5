//! Scripted in-memory chain backing the test suites
//!
//! Tests control the height, per-block bitmaps, signer sets, and failure
//! behavior, and can observe how many signer-set fetches were issued.

use {
    async_trait::async_trait,
    num_bigint::BigUint,
    sealwatch_common::types::{BlockInfo, BlockNumber, EpochNumber, SignerId, ValidatorId},
    std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    },
};

use crate::client::{ChainClient, ChainError, Result};

#[derive(Clone, Default)]
pub struct ScriptedChain {
    state: Arc<Mutex<ScriptedState>>,
}

#[derive(Default)]
struct ScriptedState {
    height: BlockNumber,
    epoch_length: u64,
    blocks: HashMap<BlockNumber, BlockInfo>,
    bitmaps: HashMap<BlockNumber, BigUint>,
    signers_by_epoch: HashMap<EpochNumber, Vec<SignerId>>,
    accounts: HashMap<SignerId, ValidatorId>,
    names: HashMap<ValidatorId, String>,
    signer_set_fetches: u64,
    transient_failures: u32,
    fail_account_lookups: bool,
    malformed_bitmap_at: Option<BlockNumber>,
}

impl ScriptedState {
    fn epoch_of(&self, number: BlockNumber) -> EpochNumber {
        number / self.epoch_length.max(1)
    }

    fn take_transient(&mut self) -> Result<()> {
        if self.transient_failures > 0 {
            self.transient_failures -= 1;
            return Err(ChainError::Rpc {
                code: -32000,
                message: "scripted transient failure".into(),
            });
        }
        Ok(())
    }
}

impl ScriptedChain {
    pub fn new(epoch_length: u64) -> Self {
        let chain = Self::default();
        chain.state.lock().unwrap().epoch_length = epoch_length;
        chain
    }

    pub fn set_height(&self, height: BlockNumber) {
        self.state.lock().unwrap().height = height;
    }

    pub fn add_block(&self, number: BlockNumber, miner: &str, timestamp: i64) {
        self.state.lock().unwrap().blocks.insert(
            number,
            BlockInfo {
                number,
                miner: SignerId::from(miner),
                timestamp,
                extra_data: None,
            },
        );
    }

    pub fn set_bitmap(&self, number: BlockNumber, bits: u64) {
        self.state
            .lock()
            .unwrap()
            .bitmaps
            .insert(number, BigUint::from(bits));
    }

    pub fn set_signers(&self, epoch: EpochNumber, signers: &[&str]) {
        self.state.lock().unwrap().signers_by_epoch.insert(
            epoch,
            signers.iter().map(|s| SignerId::from(*s)).collect(),
        );
    }

    pub fn map_signer(&self, signer: &str, account: &str) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(SignerId::from(signer), ValidatorId::from(account));
    }

    pub fn set_name(&self, account: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .names
            .insert(ValidatorId::from(account), name.to_string());
    }

    /// Fail the next `count` fetch calls with a transient RPC error.
    pub fn inject_transient_failures(&self, count: u32) {
        self.state.lock().unwrap().transient_failures = count;
    }

    pub fn fail_account_lookups(&self, fail: bool) {
        self.state.lock().unwrap().fail_account_lookups = fail;
    }

    pub fn malformed_bitmap_at(&self, number: BlockNumber) {
        self.state.lock().unwrap().malformed_bitmap_at = Some(number);
    }

    pub fn signer_set_fetches(&self) -> u64 {
        self.state.lock().unwrap().signer_set_fetches
    }
}

#[async_trait]
impl ChainClient for ScriptedChain {
    async fn current_height(&self) -> Result<BlockNumber> {
        let mut state = self.state.lock().unwrap();
        state.take_transient()?;
        Ok(state.height)
    }

    async fn get_block(&self, number: BlockNumber) -> Result<BlockInfo> {
        let mut state = self.state.lock().unwrap();
        state.take_transient()?;
        state
            .blocks
            .get(&number)
            .cloned()
            .ok_or(ChainError::MissingData { block: number, what: "block" })
    }

    async fn epoch_of_block(&self, number: BlockNumber) -> Result<EpochNumber> {
        let mut state = self.state.lock().unwrap();
        state.take_transient()?;
        Ok(state.epoch_of(number))
    }

    async fn validator_signers_at(&self, block: BlockNumber) -> Result<Vec<SignerId>> {
        let mut state = self.state.lock().unwrap();
        state.take_transient()?;
        state.signer_set_fetches += 1;
        let epoch = state.epoch_of(block);
        state
            .signers_by_epoch
            .get(&epoch)
            .cloned()
            .ok_or(ChainError::MissingData { block, what: "validator signers" })
    }

    async fn account_for_signer(&self, signer: &SignerId) -> Result<Option<ValidatorId>> {
        let state = self.state.lock().unwrap();
        if state.fail_account_lookups {
            return Err(ChainError::Rpc {
                code: -32000,
                message: "scripted account lookup failure".into(),
            });
        }
        Ok(state.accounts.get(signer).cloned())
    }

    async fn seal_bitmap_for_block(&self, number: BlockNumber) -> Result<BigUint> {
        let mut state = self.state.lock().unwrap();
        state.take_transient()?;
        if state.malformed_bitmap_at == Some(number) {
            return Err(ChainError::Malformed(format!(
                "scripted malformed bitmap at block {}",
                number
            )));
        }
        state
            .bitmaps
            .get(&number)
            .cloned()
            .ok_or(ChainError::MissingData { block: number, what: "seal bitmap" })
    }

    async fn display_name_of(&self, account: &ValidatorId) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().names.get(account).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_chain_basics() {
        let chain = ScriptedChain::new(10);
        chain.set_height(42);
        chain.add_block(41, "signer_a", 1_700_000_000);
        chain.set_bitmap(41, 0b101);
        chain.set_signers(4, &["signer_a", "signer_b"]);
        chain.map_signer("signer_a", "account_a");

        assert_eq!(chain.current_height().await.unwrap(), 42);
        assert_eq!(chain.epoch_of_block(41).await.unwrap(), 4);
        assert_eq!(chain.get_block(41).await.unwrap().miner, SignerId::from("signer_a"));
        assert_eq!(chain.seal_bitmap_for_block(41).await.unwrap(), BigUint::from(5u8));
        assert_eq!(chain.validator_signers_at(41).await.unwrap().len(), 2);
        assert_eq!(
            chain.account_for_signer(&SignerId::from("signer_a")).await.unwrap(),
            Some(ValidatorId::from("account_a"))
        );
        assert_eq!(
            chain.account_for_signer(&SignerId::from("signer_b")).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_transient_injection_drains() {
        let chain = ScriptedChain::new(10);
        chain.set_height(7);
        chain.inject_transient_failures(2);

        assert!(chain.current_height().await.unwrap_err().is_transient());
        assert!(chain.current_height().await.unwrap_err().is_transient());
        assert_eq!(chain.current_height().await.unwrap(), 7);
    }
}
