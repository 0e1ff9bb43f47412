use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const TX_REWARD: &str = "reward";
pub const TX_WITHDRAW: &str = "withdraw";
pub const TX_DONATION: &str = "donation";

pub const TX_STATUS_PENDING: &str = "pending";
pub const TX_STATUS_PAID: &str = "paid";

/// Append-only reward/withdrawal ledger row. Reward rows reference the
/// donation order id through `tx_code` and are unique per order.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WalletTransaction {
    pub id: i64,
    pub user_id: i64,
    pub tx_code: String,
    pub tx_type: String, // "reward", "withdraw", "donation"
    pub amount: i64,
    pub description: Option<String>,
    pub status: String, // "pending", "paid"
    pub created_at: Option<NaiveDateTime>,
}
