use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const REWARD_NONE: &str = "none";
pub const REWARD_IN_PROGRESS: &str = "in_progress";
pub const REWARD_COMPLETED: &str = "completed";
pub const REWARD_FAILED: &str = "failed";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Donation {
    pub id: i64,
    pub order_id: String,
    pub user_id: i64,
    pub project_id: i64,
    pub amount: i64,
    pub payment_method: String,
    pub payment_status: String, // "pending", "paid", "failed"
    pub mint_tx_hash: Option<String>,
    pub reward_status: String, // "none", "in_progress", "completed", "failed"
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Donation {
    pub fn new(order_id: String, user_id: i64, project_id: i64, amount: i64) -> Self {
        Donation {
            id: 0, // set by DB
            order_id,
            user_id,
            project_id,
            amount,
            payment_method: "snap".to_string(),
            payment_status: PaymentStatus::Pending.as_str().to_string(),
            mint_tx_hash: None,
            reward_status: REWARD_NONE.to_string(),
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

/// Maps a provider notification onto a donation payment status.
///
/// Total over all inputs: anything the provider sends that is not listed
/// below leaves the donation `pending`. A `capture` with a fraud status
/// other than `accept` also stays `pending` (mirrors the provider's own
/// recommendation; the fraud check may still flip to accept later).
pub fn map_provider_status(transaction_status: &str, fraud_status: Option<&str>) -> PaymentStatus {
    match transaction_status {
        "capture" => match fraud_status {
            Some("accept") => PaymentStatus::Paid,
            _ => PaymentStatus::Pending,
        },
        "settlement" => PaymentStatus::Paid,
        "cancel" | "deny" | "expire" => PaymentStatus::Failed,
        _ => PaymentStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_status_mapping_table() {
        assert_eq!(
            map_provider_status("capture", Some("accept")),
            PaymentStatus::Paid
        );
        assert_eq!(
            map_provider_status("capture", Some("challenge")),
            PaymentStatus::Pending
        );
        assert_eq!(map_provider_status("settlement", None), PaymentStatus::Paid);
        assert_eq!(map_provider_status("cancel", None), PaymentStatus::Failed);
        assert_eq!(map_provider_status("deny", None), PaymentStatus::Failed);
        assert_eq!(map_provider_status("expire", None), PaymentStatus::Failed);
        assert_eq!(
            map_provider_status("authorize", None),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn capture_without_fraud_status_stays_pending() {
        assert_eq!(map_provider_status("capture", None), PaymentStatus::Pending);
    }
}
