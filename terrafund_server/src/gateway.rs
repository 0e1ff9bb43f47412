use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the gateway needs to open a hosted checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRequest {
    pub order_id: String,
    pub gross_amount: i64,
    pub payer_name: String,
    pub payer_email: String,
}

/// Hosted checkout session handle returned to the donor's client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentSession {
    pub token: String,
    pub redirect_url: String,
}

/// Payment provider capability injected into the settlement core.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(&self, request: &SessionRequest) -> anyhow::Result<PaymentSession>;
}

/// Snap-style hosted checkout client. The server key authenticates the
/// backend through HTTP basic auth, as the provider's sandbox expects.
pub struct SnapGateway {
    client: reqwest::Client,
    base_url: String,
    server_key: String,
}

#[derive(Serialize)]
struct SnapTransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: i64,
}

#[derive(Serialize)]
struct SnapCustomerDetails<'a> {
    first_name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct SnapRequest<'a> {
    transaction_details: SnapTransactionDetails<'a>,
    customer_details: SnapCustomerDetails<'a>,
}

impl SnapGateway {
    pub fn new(base_url: &str, server_key: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build gateway HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            server_key: server_key.to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for SnapGateway {
    async fn create_session(&self, request: &SessionRequest) -> anyhow::Result<PaymentSession> {
        let url = format!("{}/snap/v1/transactions", self.base_url);
        let body = SnapRequest {
            transaction_details: SnapTransactionDetails {
                order_id: &request.order_id,
                gross_amount: request.gross_amount,
            },
            customer_details: SnapCustomerDetails {
                first_name: &request.payer_name,
                email: &request.payer_email,
            },
        };

        let session = self
            .client
            .post(&url)
            .basic_auth(&self.server_key, Some(""))
            .json(&body)
            .send()
            .await
            .context("Gateway session request failed")?
            .error_for_status()
            .context("Gateway rejected the session request")?
            .json::<PaymentSession>()
            .await
            .context("Gateway returned an unexpected session payload")?;

        Ok(session)
    }
}
