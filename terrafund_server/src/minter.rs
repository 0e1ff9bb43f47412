use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::time::{Instant, sleep};

/// TerraToken has 18 decimal places on chain.
const TOKEN_DECIMALS_FACTOR: u128 = 1_000_000_000_000_000_000;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Token-mint capability injected into the settlement core. `mint` returns
/// the transaction hash only after the mint is confirmed; any error or
/// timeout means "not yet rewarded" and the caller may retry on the next
/// callback delivery.
#[async_trait]
pub trait RewardMinter: Send + Sync {
    async fn mint(&self, wallet_address: &str, reward_quantity: i64) -> anyhow::Result<String>;
}

/// JSON-RPC client for the TerraToken custodian service, which holds the
/// contract signing key and exposes `ttk_mintReward` / `ttk_getReceipt`.
pub struct RpcMinter {
    client: reqwest::Client,
    rpc_url: String,
    contract_address: String,
    confirm_timeout: Duration,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct MintReceipt {
    confirmations: u64,
}

impl RpcMinter {
    pub fn new(
        rpc_url: &str,
        contract_address: &str,
        confirm_timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build minter HTTP client")?;
        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
            contract_address: contract_address.to_lowercase(),
            confirm_timeout: Duration::from_secs(confirm_timeout_secs),
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> anyhow::Result<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .context(format!("RPC request {} failed", method))?
            .error_for_status()
            .context(format!("RPC endpoint rejected {}", method))?
            .json::<RpcResponse<T>>()
            .await
            .context(format!("RPC {} returned an unexpected payload", method))?;

        if let Some(err) = response.error {
            anyhow::bail!("RPC {} error {}: {}", method, err.code, err.message);
        }
        response
            .result
            .with_context(|| format!("RPC {} returned no result", method))
    }

    /// Polls for the mint receipt until one confirmation or the deadline.
    async fn wait_for_confirmation(&self, tx_hash: &str) -> anyhow::Result<()> {
        let deadline = Instant::now() + self.confirm_timeout;
        loop {
            let receipt: Option<MintReceipt> = self
                .call("ttk_getReceipt", json!([tx_hash]))
                .await
                .context("Failed to poll mint receipt")?;

            if let Some(receipt) = receipt {
                if receipt.confirmations >= 1 {
                    return Ok(());
                }
            }

            if Instant::now() >= deadline {
                anyhow::bail!(
                    "Mint {} not confirmed within {:?}",
                    tx_hash,
                    self.confirm_timeout
                );
            }
            sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl RewardMinter for RpcMinter {
    async fn mint(&self, wallet_address: &str, reward_quantity: i64) -> anyhow::Result<String> {
        if !is_hex_address(wallet_address) {
            anyhow::bail!("Invalid wallet address: {}", wallet_address);
        }
        if reward_quantity <= 0 {
            anyhow::bail!("Reward quantity must be positive, got {}", reward_quantity);
        }

        let scaled = scale_token_amount(reward_quantity);
        let tx_hash: String = self
            .call(
                "ttk_mintReward",
                json!([self.contract_address, wallet_address, scaled]),
            )
            .await
            .context("Mint call failed")?;

        log::info!(
            "Mint submitted for {} ({} TTK), waiting for confirmation: {}",
            wallet_address,
            reward_quantity,
            tx_hash
        );

        self.wait_for_confirmation(&tx_hash).await?;
        Ok(tx_hash)
    }
}

/// Whole reward tokens -> on-chain decimal string (scaled by 10^18).
/// Integer arithmetic only; floats would lose precision above 2^53.
pub fn scale_token_amount(reward_quantity: i64) -> String {
    let scaled = reward_quantity as u128 * TOKEN_DECIMALS_FACTOR;
    scaled.to_string()
}

pub fn is_hex_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_whole_tokens_to_eighteen_decimals() {
        assert_eq!(scale_token_amount(1), "1000000000000000000");
        assert_eq!(scale_token_amount(500), "500000000000000000000");
        // Near i64::MAX still fits in u128.
        assert_eq!(
            scale_token_amount(i64::MAX),
            "9223372036854775807000000000000000000"
        );
    }

    #[test]
    fn validates_wallet_addresses() {
        assert!(is_hex_address("0x92ce9d53356860e8004ff527a414b82b810bd7fd"));
        assert!(!is_hex_address("92ce9d53356860e8004ff527a414b82b810bd7fd"));
        assert!(!is_hex_address("0x92CE9D53356860E8004FF527A414B82B810BD7FD"));
        assert!(!is_hex_address("0x1234"));
    }
}
