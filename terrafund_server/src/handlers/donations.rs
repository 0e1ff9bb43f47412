use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{Error, HttpResponse, post, web};
use common::AuthUser;
use serde::Deserialize;

use crate::handlers::require_self;
use crate::settlement::{self, IntentError, ProviderNotification};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DonateData {
    pub user_id: i64,
    pub project_id: i64,
    pub amount: i64,
}

/// Opens a hosted checkout session and records the pending donation.
#[post("/donate")]
pub async fn donate(
    app_state: web::Data<AppState>,
    user: AuthUser,
    data: web::Json<DonateData>,
) -> Result<HttpResponse, Error> {
    let data = data.into_inner();
    require_self(&user, data.user_id, common::ROLE_DONOR)?;

    let intent = settlement::create_intent(&app_state, data.user_id, data.project_id, data.amount)
        .await
        .map_err(|e| match e {
            IntentError::Validation(msg) => InternalError::new(msg, StatusCode::BAD_REQUEST),
            IntentError::NotFound(msg) => InternalError::new(msg, StatusCode::NOT_FOUND),
            IntentError::Gateway(err) => {
                log::error!("Gateway session failed: {:?}", err);
                InternalError::new(
                    "Payment gateway is unavailable".to_string(),
                    StatusCode::BAD_GATEWAY,
                )
            }
            IntentError::Storage(err) => {
                log::error!("Failed to persist donation intent: {:?}", err);
                InternalError::new(
                    "Failed to create donation".to_string(),
                    StatusCode::INTERNAL_SERVER_ERROR,
                )
            }
        })?;

    Ok(HttpResponse::Created().json(intent))
}

/// Asynchronous payment status callback from the provider.
///
/// Always answers 200 once the notification is durably reconciled, so the
/// provider stops redelivering; only a storage failure returns 500 and
/// triggers a retry on their side.
#[post("/notification")]
pub async fn payment_notification(
    app_state: web::Data<AppState>,
    notification: web::Json<ProviderNotification>,
) -> Result<HttpResponse, Error> {
    settlement::handle_notification(&app_state, &notification)
        .await
        .map_err(|e| {
            log::error!(
                "Failed to process notification for order {}: {:?}",
                notification.order_id,
                e
            );
            InternalError::new(
                "Failed to process notification",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        })?;

    Ok(HttpResponse::Ok().body("OK"))
}
