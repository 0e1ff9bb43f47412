use std::sync::Arc;

use anyhow::Context;

use crate::gateway::SnapGateway;
use crate::minter::RpcMinter;
use crate::state::{AppState, SettlementConfig};

pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    pub bind_port: u16,
    pub gateway_url: String,
    pub gateway_server_key: String,
    pub rpc_url: String,
    pub contract_address: String,
    pub min_donation_amount: i64,
    pub reward_conversion_rate: i64,
    pub mint_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1".to_string());

        let bind_port = std::env::var("BIND_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("BIND_PORT must be a valid port number")?;

        let gateway_url = std::env::var("GATEWAY_URL").context("GATEWAY_URL must be set")?;

        let gateway_server_key =
            std::env::var("GATEWAY_SERVER_KEY").context("GATEWAY_SERVER_KEY must be set")?;

        let rpc_url = std::env::var("RPC_URL").context("RPC_URL must be set")?;

        let contract_address =
            std::env::var("CONTRACT_ADDRESS").context("CONTRACT_ADDRESS must be set")?;

        let min_donation_amount = std::env::var("MIN_DONATION_AMOUNT")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .context("MIN_DONATION_AMOUNT must be an integer")?;

        let reward_conversion_rate = std::env::var("REWARD_CONVERSION_RATE")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .context("REWARD_CONVERSION_RATE must be an integer")?;

        if reward_conversion_rate <= 0 {
            anyhow::bail!("REWARD_CONVERSION_RATE must be positive");
        }

        let mint_timeout_secs = std::env::var("MINT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .context("MINT_TIMEOUT_SECS must be an integer")?;

        Ok(Self {
            database_url,
            bind_address,
            bind_port,
            gateway_url,
            gateway_server_key,
            rpc_url,
            contract_address,
            min_donation_amount,
            reward_conversion_rate,
            mint_timeout_secs,
        })
    }

    pub async fn create_app_state(&self) -> anyhow::Result<AppState> {
        let gateway = SnapGateway::new(&self.gateway_url, &self.gateway_server_key)?;
        let minter = RpcMinter::new(&self.rpc_url, &self.contract_address, self.mint_timeout_secs)?;

        AppState::new(
            &self.database_url,
            Arc::new(gateway),
            Arc::new(minter),
            SettlementConfig {
                min_donation_amount: self.min_donation_amount,
                reward_conversion_rate: self.reward_conversion_rate,
            },
        )
        .await
        .context("Failed to initialize AppState")
    }
}
