use std::sync::Arc;

use anyhow::Result;
use common::Database;

use crate::gateway::PaymentGateway;
use crate::minter::RewardMinter;

#[derive(Debug, Clone, Copy)]
pub struct SettlementConfig {
    /// Smallest accepted donation, in the smallest currency unit.
    pub min_donation_amount: i64,
    /// Currency units per reward token (floor division).
    pub reward_conversion_rate: i64,
}

pub struct AppState {
    pub db: Database,
    pub gateway: Arc<dyn PaymentGateway>,
    pub minter: Arc<dyn RewardMinter>,
    pub settlement: SettlementConfig,
}

impl AppState {
    pub async fn new(
        database_url: &str,
        gateway: Arc<dyn PaymentGateway>,
        minter: Arc<dyn RewardMinter>,
        settlement: SettlementConfig,
    ) -> Result<Self> {
        let db = Database::new(database_url).await?;
        log::info!("Database initialized successfully!");

        Ok(AppState {
            db,
            gateway,
            minter,
            settlement,
        })
    }
}
