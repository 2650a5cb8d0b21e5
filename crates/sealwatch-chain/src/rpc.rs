// crates/sealwatch-chain/src/rpc.rs

use {
    async_trait::async_trait,
    num_bigint::BigUint,
    num_traits::Num,
    reqwest::Client,
    sealwatch_common::types::{BlockInfo, BlockNumber, EpochNumber, SignerId, ValidatorId},
    serde::{de::DeserializeOwned, Deserialize},
    tracing::info,
};

use crate::client::{ChainClient, ChainError, Result};

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// JSON-RPC client for a node exposing an Istanbul-style consensus
/// namespace.
///
/// Methods used: `eth_blockNumber`, `eth_getBlockByNumber` (hex-quantity
/// results), and `istanbul_getEpochNumberOfBlock`, `istanbul_getValidators`,
/// `istanbul_getAccountOfSigner`, `istanbul_getParentSealBitmap`,
/// `istanbul_getAccountName` (plain JSON results). The parent-seal bitmap
/// recorded in block `n + 1` is the seal for block `n`.
#[derive(Debug, Clone)]
pub struct HttpChainClient {
    client: Client,
    rpc_url: String,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorDetail {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
    number: String,
    miner: String,
    timestamp: String,
    #[serde(rename = "extraData")]
    extra_data: Option<String>,
}

impl HttpChainClient {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        let rpc_url = rpc_url.into();
        info!("Initializing chain client for {}", rpc_url);
        Self {
            client: Client::new(),
            rpc_url,
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>> {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?;

        let envelope: RpcEnvelope<T> = response.json().await?;
        if let Some(error) = envelope.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(envelope.result)
    }
}

fn hex_quantity(n: BlockNumber) -> String {
    format!("0x{:x}", n)
}

fn parse_hex_u64(raw: &str) -> Result<u64> {
    let digits = raw.trim_start_matches("0x");
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainError::Malformed(format!("bad hex quantity {:?}: {}", raw, e)))
}

fn parse_hex_bitmap(raw: &str) -> Result<BigUint> {
    let digits = raw.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(BigUint::default());
    }
    BigUint::from_str_radix(digits, 16)
        .map_err(|e| ChainError::Malformed(format!("bad bitmap {:?}: {}", raw, e)))
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn current_height(&self) -> Result<BlockNumber> {
        let raw: String = self
            .call("eth_blockNumber", serde_json::json!([]))
            .await?
            .ok_or_else(|| ChainError::Malformed("null result for eth_blockNumber".into()))?;
        parse_hex_u64(&raw)
    }

    async fn get_block(&self, number: BlockNumber) -> Result<BlockInfo> {
        let block: RpcBlock = self
            .call("eth_getBlockByNumber", serde_json::json!([hex_quantity(number), false]))
            .await?
            .ok_or(ChainError::MissingData { block: number, what: "block" })?;
        Ok(BlockInfo {
            number: parse_hex_u64(&block.number)?,
            miner: SignerId(block.miner),
            timestamp: parse_hex_u64(&block.timestamp)? as i64,
            extra_data: block.extra_data,
        })
    }

    async fn epoch_of_block(&self, number: BlockNumber) -> Result<EpochNumber> {
        self.call("istanbul_getEpochNumberOfBlock", serde_json::json!([number]))
            .await?
            .ok_or(ChainError::MissingData { block: number, what: "epoch number" })
    }

    async fn validator_signers_at(&self, block: BlockNumber) -> Result<Vec<SignerId>> {
        let signers: Vec<String> = self
            .call("istanbul_getValidators", serde_json::json!([block]))
            .await?
            .ok_or(ChainError::MissingData { block, what: "validator signers" })?;
        Ok(signers.into_iter().map(SignerId).collect())
    }

    async fn account_for_signer(&self, signer: &SignerId) -> Result<Option<ValidatorId>> {
        let account: Option<String> = self
            .call("istanbul_getAccountOfSigner", serde_json::json!([signer.0]))
            .await?;
        Ok(account
            .filter(|a| a.as_str() != ZERO_ADDRESS)
            .map(ValidatorId))
    }

    async fn seal_bitmap_for_block(&self, number: BlockNumber) -> Result<BigUint> {
        let raw: String = self
            .call(
                "istanbul_getParentSealBitmap",
                serde_json::json!([number + 1]),
            )
            .await?
            .ok_or(ChainError::MissingData { block: number, what: "seal bitmap" })?;
        parse_hex_bitmap(&raw)
    }

    async fn display_name_of(&self, account: &ValidatorId) -> Result<Option<String>> {
        let name: Option<String> = self
            .call("istanbul_getAccountName", serde_json::json!([account.0]))
            .await?;
        Ok(name.filter(|n| !n.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_quantity_roundtrip() {
        assert_eq!(hex_quantity(0), "0x0");
        assert_eq!(hex_quantity(5000), "0x1388");
        assert_eq!(parse_hex_u64("0x1388").unwrap(), 5000);
    }

    #[test]
    fn test_parse_hex_u64_rejects_garbage() {
        assert!(parse_hex_u64("0xzz").is_err());
        assert!(parse_hex_u64("").is_err());
    }

    #[test]
    fn test_parse_hex_bitmap() {
        assert_eq!(parse_hex_bitmap("0x").unwrap(), BigUint::default());
        assert_eq!(parse_hex_bitmap("0x5").unwrap(), BigUint::from(5u8));
        assert!(parse_hex_bitmap("0xnope").is_err());
    }
}
