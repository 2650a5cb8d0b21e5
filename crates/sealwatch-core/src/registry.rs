//! Epoch-scoped validator set resolution and caching

use {
    sealwatch_chain::{ChainClient, ChainError},
    sealwatch_common::types::{BlockNumber, EpochNumber, SignerId, ValidatorId},
    std::{collections::HashMap, sync::Arc},
    tracing::{debug, warn},
};

/// Immutable, insertion-ordered validator account list for one epoch.
pub type OrderedValidatorSet = Arc<Vec<ValidatorId>>;

/// Resolves and caches the ordered validator account list per epoch.
///
/// Epoch validator sets are immutable history: the first successful
/// resolution for an epoch wins and later calls never refetch. Signer to
/// account mappings are cached alongside since key rotation is rare within
/// one monitoring session.
pub struct EpochValidatorRegistry {
    epochs: HashMap<EpochNumber, OrderedValidatorSet>,
    signer_accounts: HashMap<SignerId, ValidatorId>,
    account_signers: HashMap<ValidatorId, SignerId>,
}

impl EpochValidatorRegistry {
    pub fn new() -> Self {
        Self {
            epochs: HashMap::new(),
            signer_accounts: HashMap::new(),
            account_signers: HashMap::new(),
        }
    }

    /// Ordered validator set for `epoch`, resolved via the signer set
    /// active at `at_block` on a cache miss.
    ///
    /// Account lookups that fail, or signers registered to no account,
    /// degrade to the signer's own identifier as the validator identity.
    /// They never end the scan.
    pub async fn get_validators<C: ChainClient>(
        &mut self,
        client: &C,
        epoch: EpochNumber,
        at_block: BlockNumber,
    ) -> Result<OrderedValidatorSet, ChainError> {
        if let Some(set) = self.epochs.get(&epoch) {
            return Ok(set.clone());
        }

        let signers = client.validator_signers_at(at_block).await?;
        let mut accounts = Vec::with_capacity(signers.len());
        for signer in signers {
            if let Some(known) = self.signer_accounts.get(&signer) {
                accounts.push(known.clone());
                continue;
            }
            let account = match client.account_for_signer(&signer).await {
                Ok(Some(account)) => account,
                Ok(None) => {
                    debug!("signer {} has no registered account, using signer as identity", signer);
                    signer.as_validator_id()
                }
                Err(e) => {
                    warn!("account lookup for signer {} failed, using signer as identity: {}", signer, e);
                    signer.as_validator_id()
                }
            };
            self.signer_accounts.insert(signer.clone(), account.clone());
            self.account_signers.insert(account.clone(), signer);
            accounts.push(account);
        }

        let set: OrderedValidatorSet = Arc::new(accounts);
        debug!("resolved {} validators for epoch {}", set.len(), epoch);
        self.epochs.insert(epoch, set.clone());
        Ok(set)
    }

    pub fn account_of_signer(&self, signer: &SignerId) -> Option<&ValidatorId> {
        self.signer_accounts.get(signer)
    }

    pub fn signer_of_account(&self, account: &ValidatorId) -> Option<&SignerId> {
        self.account_signers.get(account)
    }

    /// Snapshot of the account-to-signer mapping discovered so far.
    pub fn known_signers(&self) -> HashMap<ValidatorId, SignerId> {
        self.account_signers.clone()
    }
}

impl Default for EpochValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealwatch_chain::ScriptedChain;

    fn chain_with_epoch_zero() -> ScriptedChain {
        let chain = ScriptedChain::new(10);
        chain.set_signers(0, &["signer_a", "signer_b", "signer_c"]);
        chain.map_signer("signer_a", "account_a");
        chain.map_signer("signer_b", "account_b");
        chain
    }

    #[tokio::test]
    async fn test_resolution_preserves_signer_order() {
        let chain = chain_with_epoch_zero();
        let mut registry = EpochValidatorRegistry::new();

        let set = registry.get_validators(&chain, 0, 5).await.unwrap();
        assert_eq!(
            *set,
            vec![
                ValidatorId::from("account_a"),
                ValidatorId::from("account_b"),
                // signer_c has no account and falls back to itself
                ValidatorId::from("signer_c"),
            ]
        );
        assert_eq!(
            registry.signer_of_account(&ValidatorId::from("account_a")),
            Some(&SignerId::from("signer_a"))
        );
    }

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let chain = chain_with_epoch_zero();
        let mut registry = EpochValidatorRegistry::new();

        let first = registry.get_validators(&chain, 0, 5).await.unwrap();
        let second = registry.get_validators(&chain, 0, 9).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(chain.signer_set_fetches(), 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades_to_identity() {
        let chain = chain_with_epoch_zero();
        chain.fail_account_lookups(true);
        let mut registry = EpochValidatorRegistry::new();

        let set = registry.get_validators(&chain, 0, 5).await.unwrap();
        assert_eq!(
            *set,
            vec![
                ValidatorId::from("signer_a"),
                ValidatorId::from("signer_b"),
                ValidatorId::from("signer_c"),
            ]
        );
    }

    #[tokio::test]
    async fn test_distinct_epochs_fetch_separately() {
        let chain = chain_with_epoch_zero();
        chain.set_signers(1, &["signer_a", "signer_b"]);
        let mut registry = EpochValidatorRegistry::new();

        let epoch0 = registry.get_validators(&chain, 0, 5).await.unwrap();
        let epoch1 = registry.get_validators(&chain, 1, 15).await.unwrap();

        assert_eq!(epoch0.len(), 3);
        assert_eq!(epoch1.len(), 2);
        assert_eq!(chain.signer_set_fetches(), 2);
    }
}
