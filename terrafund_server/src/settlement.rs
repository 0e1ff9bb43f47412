use common::{Donation, PaymentStatus, generate_order_code, map_provider_status};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::SessionRequest;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum IntentError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Payment gateway error: {0}")]
    Gateway(#[source] anyhow::Error),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// What the donor's client gets back: the order handle plus the hosted
/// checkout session to redirect into.
#[derive(Debug, Serialize)]
pub struct DonationIntent {
    pub order_id: String,
    pub token: String,
    pub redirect_url: String,
}

/// Asynchronous status callback from the payment provider. Unknown extra
/// fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderNotification {
    pub order_id: String,
    pub transaction_status: String,
    #[serde(default)]
    pub fraud_status: Option<String>,
}

/// Creates a donation intent: validates, opens a gateway session, and only
/// then persists the `pending` donation. A gateway failure leaves no row
/// behind.
pub async fn create_intent(
    state: &AppState,
    user_id: i64,
    project_id: i64,
    amount: i64,
) -> Result<DonationIntent, IntentError> {
    if amount < state.settlement.min_donation_amount {
        return Err(IntentError::Validation(format!(
            "Minimum donation is {}",
            state.settlement.min_donation_amount
        )));
    }

    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| IntentError::NotFound(format!("Donor {} not found", user_id)))?;

    let project = state
        .db
        .get_project(project_id)
        .await?
        .ok_or_else(|| IntentError::NotFound(format!("Project {} not found", project_id)))?;

    if !project.is_published() {
        return Err(IntentError::Validation(
            "Project is not open for donations".to_string(),
        ));
    }

    let order_id = generate_order_code();

    // The external call comes first so a gateway failure aborts the intent
    // with no partial state.
    let session = state
        .gateway
        .create_session(&SessionRequest {
            order_id: order_id.clone(),
            gross_amount: amount,
            payer_name: user.name.clone(),
            payer_email: user.email.clone(),
        })
        .await
        .map_err(IntentError::Gateway)?;

    state
        .db
        .save_donation(&Donation::new(order_id.clone(), user_id, project_id, amount))
        .await?;

    log::info!(
        "Donation intent created: order={} user={} project={} amount={}",
        order_id,
        user_id,
        project_id,
        amount
    );

    Ok(DonationIntent {
        order_id,
        token: session.token,
        redirect_url: session.redirect_url,
    })
}

/// Reconciles a provider callback against stored donation state.
///
/// Safe under redelivery: the status mapping is a pure function, terminal
/// payment states are sticky, and the reward gate is advanced only through
/// the `reward_status` compare-and-swap. Returns `Ok` for every processed
/// notification, including unknown orders; only storage failures bubble up.
pub async fn handle_notification(
    state: &AppState,
    notification: &ProviderNotification,
) -> anyhow::Result<()> {
    let order_id = notification.order_id.as_str();

    let Some(donation) = state.db.get_donation_by_order(order_id).await? else {
        log::warn!("Notification for unknown order {}, acknowledging", order_id);
        return Ok(());
    };

    let target = map_provider_status(
        &notification.transaction_status,
        notification.fraud_status.as_deref(),
    );

    log::info!(
        "Notification for order {}: provider status {} -> {}",
        order_id,
        notification.transaction_status,
        target.as_str()
    );

    match target {
        PaymentStatus::Pending => {
            state.db.touch_donation(order_id).await?;
        }
        PaymentStatus::Failed => {
            let transitioned = state.db.settle_donation(order_id, target).await?;
            if !transitioned && donation.payment_status == PaymentStatus::Paid.as_str() {
                log::warn!(
                    "Ignoring failure notification for already-paid order {}",
                    order_id
                );
            }
        }
        PaymentStatus::Paid => {
            let transitioned = state.db.settle_donation(order_id, target).await?;
            if !transitioned && donation.payment_status == PaymentStatus::Failed.as_str() {
                log::warn!(
                    "Ignoring paid notification for already-failed order {}",
                    order_id
                );
                return Ok(());
            }
            credit_reward(state, order_id).await?;
        }
    }

    Ok(())
}

/// Mints the reward for a paid donation and appends the single reward ledger
/// row. Exactly-once is guaranteed by the claim CAS; a failed mint releases
/// into `failed` so the next redelivery retries.
async fn credit_reward(state: &AppState, order_id: &str) -> anyhow::Result<()> {
    if !state.db.claim_reward(order_id).await? {
        log::debug!(
            "Reward for order {} already completed or in flight, skipping",
            order_id
        );
        return Ok(());
    }

    let Some((donation, wallet)) = state.db.get_donation_with_wallet(order_id).await? else {
        log::error!("Donation for order {} vanished after claim", order_id);
        state.db.release_reward_claim(order_id).await?;
        return Ok(());
    };

    if donation.mint_tx_hash.is_some() {
        // A hash without a completed reward_status can only come from an
        // older database; the mint already happened, close the gate.
        log::warn!("Order {} already carries a mint hash, skipping mint", order_id);
        state.db.mark_reward_completed(order_id).await?;
        return Ok(());
    }

    let Some(wallet) = wallet else {
        log::warn!(
            "User {} has no wallet address, skipping mint for order {} (donation stays paid)",
            donation.user_id,
            order_id
        );
        state.db.release_reward_claim(order_id).await?;
        return Ok(());
    };

    let reward_quantity = donation.amount / state.settlement.reward_conversion_rate;
    if reward_quantity == 0 {
        log::warn!(
            "Donation {} is below the conversion rate, nothing to mint",
            order_id
        );
        state.db.mark_reward_completed(order_id).await?;
        return Ok(());
    }

    match state.minter.mint(&wallet, reward_quantity).await {
        Ok(tx_hash) => {
            state
                .db
                .complete_reward(order_id, &tx_hash, donation.user_id, reward_quantity)
                .await?;
            log::info!(
                "Reward minted for order {}: {} TTK to {} (tx {})",
                order_id,
                reward_quantity,
                wallet,
                tx_hash
            );
        }
        Err(e) => {
            log::error!(
                "Mint failed for order {} (will retry on redelivery): {:#}",
                order_id,
                e
            );
            state.db.fail_reward_claim(order_id).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use common::{
        Database, ProjectInput, REWARD_COMPLETED, REWARD_FAILED, REWARD_NONE, ROLE_DONOR,
        ROLE_NGO, User, generate_wallet_address, slugify,
    };

    use super::*;
    use crate::gateway::{PaymentGateway, PaymentSession};
    use crate::minter::RewardMinter;
    use crate::state::SettlementConfig;

    struct MockGateway {
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockGateway {
        fn ok() -> Self {
            MockGateway {
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            MockGateway {
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_session(
            &self,
            request: &SessionRequest,
        ) -> anyhow::Result<PaymentSession> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("gateway unreachable");
            }
            Ok(PaymentSession {
                token: format!("tok-{}", request.order_id),
                redirect_url: "https://pay.example/redirect".to_string(),
            })
        }
    }

    struct MockMinter {
        // Front of the queue is the next mint outcome; empty means success.
        outcomes: Mutex<VecDeque<Result<String, String>>>,
        calls: Mutex<Vec<(String, i64)>>,
    }

    impl MockMinter {
        fn succeeding() -> Self {
            MockMinter {
                outcomes: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn scripted(outcomes: Vec<Result<String, String>>) -> Self {
            MockMinter {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn last_call(&self) -> Option<(String, i64)> {
            self.calls.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl RewardMinter for MockMinter {
        async fn mint(&self, wallet_address: &str, reward_quantity: i64) -> anyhow::Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((wallet_address.to_string(), reward_quantity));
            match self.outcomes.lock().unwrap().pop_front() {
                Some(Ok(hash)) => Ok(hash),
                Some(Err(msg)) => anyhow::bail!("{msg}"),
                None => Ok("0xminthash".to_string()),
            }
        }
    }

    async fn test_state(gateway: Arc<MockGateway>, minter: Arc<MockMinter>) -> AppState {
        AppState {
            db: Database::new_in_memory().await.unwrap(),
            gateway,
            minter,
            settlement: SettlementConfig {
                min_donation_amount: 1000,
                reward_conversion_rate: 1000,
            },
        }
    }

    /// Inserts a donor (with the given wallet) and a published project,
    /// returning (donor_id, project_id).
    async fn seed(state: &AppState, wallet: Option<String>) -> (i64, i64) {
        let donor = User::new(
            "Donatur Satu",
            "donatur1@gmail.com",
            "Password123",
            None,
            ROLE_DONOR,
            wallet,
        )
        .unwrap();
        let donor_id = state.db.save_user(&donor).await.unwrap();

        let ngo = User::new(
            "Green Earth Foundation",
            "ngo@gmail.com",
            "Password123",
            None,
            ROLE_NGO,
            None,
        )
        .unwrap();
        let ngo_id = state.db.save_user(&ngo).await.unwrap();

        state.db.save_category("Lingkungan", None).await.unwrap();

        let input = ProjectInput {
            title: "Reboisasi Hutan Kalimantan".to_string(),
            category_id: 1,
            description: "Menanam pohon".to_string(),
            location: None,
            duration_months: None,
            target_amount: 100_000_000,
            thumbnail: None,
            banner_image: None,
            start_date: None,
            end_date: None,
        };
        let project_id = state
            .db
            .save_project(ngo_id, &slugify(&input.title), "submitted", &input)
            .await
            .unwrap();
        state
            .db
            .review_project(project_id, true, Some(100))
            .await
            .unwrap();

        (donor_id, project_id)
    }

    fn settlement_notification(order_id: &str) -> ProviderNotification {
        ProviderNotification {
            order_id: order_id.to_string(),
            transaction_status: "settlement".to_string(),
            fraud_status: None,
        }
    }

    #[actix_web::test]
    async fn intent_creates_single_pending_donation() {
        let state = test_state(
            Arc::new(MockGateway::ok()),
            Arc::new(MockMinter::succeeding()),
        )
        .await;
        let (donor_id, project_id) = seed(&state, Some(generate_wallet_address())).await;

        let intent = create_intent(&state, donor_id, project_id, 500_000)
            .await
            .unwrap();
        assert!(intent.order_id.starts_with("ORDER-"));
        assert_eq!(intent.token, format!("tok-{}", intent.order_id));

        let donation = state
            .db
            .get_donation_by_order(&intent.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(donation.payment_status, "pending");
        assert_eq!(donation.amount, 500_000);
        assert!(donation.mint_tx_hash.is_none());
        assert_eq!(state.db.get_donations_by_user(donor_id).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn intent_rejects_bad_input_without_side_effects() {
        let state = test_state(
            Arc::new(MockGateway::ok()),
            Arc::new(MockMinter::succeeding()),
        )
        .await;
        let (donor_id, project_id) = seed(&state, None).await;

        let below_min = create_intent(&state, donor_id, project_id, 500).await;
        assert!(matches!(below_min, Err(IntentError::Validation(_))));

        let no_donor = create_intent(&state, 9999, project_id, 5000).await;
        assert!(matches!(no_donor, Err(IntentError::NotFound(_))));

        let no_project = create_intent(&state, donor_id, 9999, 5000).await;
        assert!(matches!(no_project, Err(IntentError::NotFound(_))));

        assert!(state.db.get_donations_by_user(donor_id).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn gateway_failure_persists_nothing() {
        let state = test_state(
            Arc::new(MockGateway::failing()),
            Arc::new(MockMinter::succeeding()),
        )
        .await;
        let (donor_id, project_id) = seed(&state, None).await;

        let result = create_intent(&state, donor_id, project_id, 5000).await;
        assert!(matches!(result, Err(IntentError::Gateway(_))));
        assert!(state.db.get_donations_by_user(donor_id).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn settlement_mints_and_credits_exactly_once() {
        let gateway = Arc::new(MockGateway::ok());
        let minter = Arc::new(MockMinter::succeeding());
        let state = test_state(gateway, minter.clone()).await;
        let wallet = generate_wallet_address();
        let (donor_id, project_id) = seed(&state, Some(wallet.clone())).await;

        let intent = create_intent(&state, donor_id, project_id, 500_000)
            .await
            .unwrap();
        handle_notification(&state, &settlement_notification(&intent.order_id))
            .await
            .unwrap();

        // 500000 at rate 1000 => 500 TTK to the donor's wallet.
        assert_eq!(minter.call_count(), 1);
        assert_eq!(minter.last_call(), Some((wallet, 500)));

        let donation = state
            .db
            .get_donation_by_order(&intent.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(donation.payment_status, "paid");
        assert_eq!(donation.reward_status, REWARD_COMPLETED);
        assert_eq!(donation.mint_tx_hash.as_deref(), Some("0xminthash"));

        let rows = state.db.get_wallet_transactions(donor_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tx_type, "reward");
        assert_eq!(rows[0].status, "paid");
        assert_eq!(rows[0].amount, 500);
        assert_eq!(rows[0].tx_code, intent.order_id);

        let project = state.db.get_project(project_id).await.unwrap().unwrap();
        assert_eq!(project.current_amount, 500_000);
        assert_eq!(project.donor_count, 1);
    }

    #[actix_web::test]
    async fn duplicate_settlement_is_a_noop() {
        let minter = Arc::new(MockMinter::succeeding());
        let state = test_state(Arc::new(MockGateway::ok()), minter.clone()).await;
        let (donor_id, project_id) = seed(&state, Some(generate_wallet_address())).await;

        let intent = create_intent(&state, donor_id, project_id, 500_000)
            .await
            .unwrap();
        let notification = settlement_notification(&intent.order_id);
        handle_notification(&state, &notification).await.unwrap();
        handle_notification(&state, &notification).await.unwrap();

        assert_eq!(minter.call_count(), 1);
        assert_eq!(state.db.get_wallet_transactions(donor_id).await.unwrap().len(), 1);

        // Project totals were folded in exactly once as well.
        let project = state.db.get_project(project_id).await.unwrap().unwrap();
        assert_eq!(project.current_amount, 500_000);
        assert_eq!(project.donor_count, 1);
    }

    #[actix_web::test]
    async fn unknown_order_is_acknowledged_without_rows() {
        let minter = Arc::new(MockMinter::succeeding());
        let state = test_state(Arc::new(MockGateway::ok()), minter.clone()).await;
        let (donor_id, _) = seed(&state, Some(generate_wallet_address())).await;

        handle_notification(&state, &settlement_notification("ORDER-does-not-exist"))
            .await
            .unwrap();

        assert_eq!(minter.call_count(), 0);
        assert!(state.db.get_donations_by_user(donor_id).await.unwrap().is_empty());
        assert!(state.db.get_wallet_transactions(donor_id).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn failed_mint_is_retried_on_redelivery() {
        let minter = Arc::new(MockMinter::scripted(vec![
            Err("rpc timeout".to_string()),
            Ok("0xsecondtry".to_string()),
        ]));
        let state = test_state(Arc::new(MockGateway::ok()), minter.clone()).await;
        let (donor_id, project_id) = seed(&state, Some(generate_wallet_address())).await;

        let intent = create_intent(&state, donor_id, project_id, 10_000)
            .await
            .unwrap();
        let notification = settlement_notification(&intent.order_id);

        handle_notification(&state, &notification).await.unwrap();
        let donation = state
            .db
            .get_donation_by_order(&intent.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(donation.payment_status, "paid");
        assert_eq!(donation.reward_status, REWARD_FAILED);
        assert!(donation.mint_tx_hash.is_none());
        assert!(state.db.get_wallet_transactions(donor_id).await.unwrap().is_empty());

        handle_notification(&state, &notification).await.unwrap();
        assert_eq!(minter.call_count(), 2);
        let donation = state
            .db
            .get_donation_by_order(&intent.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(donation.reward_status, REWARD_COMPLETED);
        assert_eq!(donation.mint_tx_hash.as_deref(), Some("0xsecondtry"));
        assert_eq!(state.db.get_wallet_transactions(donor_id).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn missing_wallet_skips_mint_but_keeps_paid() {
        let minter = Arc::new(MockMinter::succeeding());
        let state = test_state(Arc::new(MockGateway::ok()), minter.clone()).await;
        let (donor_id, project_id) = seed(&state, None).await;

        let intent = create_intent(&state, donor_id, project_id, 10_000)
            .await
            .unwrap();
        handle_notification(&state, &settlement_notification(&intent.order_id))
            .await
            .unwrap();

        assert_eq!(minter.call_count(), 0);
        let donation = state
            .db
            .get_donation_by_order(&intent.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(donation.payment_status, "paid");
        // Claim released so a later redelivery can reward once a wallet exists.
        assert_eq!(donation.reward_status, REWARD_NONE);
    }

    #[actix_web::test]
    async fn terminal_failure_is_sticky() {
        let minter = Arc::new(MockMinter::succeeding());
        let state = test_state(Arc::new(MockGateway::ok()), minter.clone()).await;
        let (donor_id, project_id) = seed(&state, Some(generate_wallet_address())).await;

        let intent = create_intent(&state, donor_id, project_id, 10_000)
            .await
            .unwrap();

        let cancel = ProviderNotification {
            order_id: intent.order_id.clone(),
            transaction_status: "cancel".to_string(),
            fraud_status: None,
        };
        handle_notification(&state, &cancel).await.unwrap();
        handle_notification(&state, &settlement_notification(&intent.order_id))
            .await
            .unwrap();

        let donation = state
            .db
            .get_donation_by_order(&intent.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(donation.payment_status, "failed");
        assert_eq!(minter.call_count(), 0);

        let project = state.db.get_project(project_id).await.unwrap().unwrap();
        assert_eq!(project.current_amount, 0);
    }

    #[actix_web::test]
    async fn capture_requires_fraud_accept() {
        let minter = Arc::new(MockMinter::succeeding());
        let state = test_state(Arc::new(MockGateway::ok()), minter.clone()).await;
        let (donor_id, project_id) = seed(&state, Some(generate_wallet_address())).await;

        let intent = create_intent(&state, donor_id, project_id, 10_000)
            .await
            .unwrap();

        let challenge = ProviderNotification {
            order_id: intent.order_id.clone(),
            transaction_status: "capture".to_string(),
            fraud_status: Some("challenge".to_string()),
        };
        handle_notification(&state, &challenge).await.unwrap();
        let donation = state
            .db
            .get_donation_by_order(&intent.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(donation.payment_status, "pending");
        assert_eq!(minter.call_count(), 0);

        let accept = ProviderNotification {
            fraud_status: Some("accept".to_string()),
            ..challenge
        };
        handle_notification(&state, &accept).await.unwrap();
        let donation = state
            .db
            .get_donation_by_order(&intent.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(donation.payment_status, "paid");
        assert_eq!(minter.call_count(), 1);
    }
}
