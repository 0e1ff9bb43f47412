use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{Error, HttpResponse, get, post, web};
use common::PROJECT_SUBMITTED;
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyData {
    pub action: String,
    pub token_reward: Option<i64>,
}

#[get("/admin/projects/pending")]
pub async fn pending_projects(app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let projects = app_state
        .db
        .get_projects_by_status(PROJECT_SUBMITTED)
        .await
        .map_err(|e| {
            log::error!("Failed to list pending projects: {:?}", e);
            InternalError::new(
                "Failed to list pending projects",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        })?;
    Ok(HttpResponse::Ok().json(projects))
}

/// Approve publishes the project and opens its active phase; reject parks it.
#[post("/admin/projects/{project_id}/verify")]
pub async fn verify_project(
    app_state: web::Data<AppState>,
    path: web::Path<i64>,
    data: web::Json<VerifyData>,
) -> Result<HttpResponse, Error> {
    let project_id = path.into_inner();
    let data = data.into_inner();

    let approve = match data.action.as_str() {
        "approve" => true,
        "reject" => false,
        other => {
            return Err(InternalError::new(
                format!("Unknown action: {}", other),
                StatusCode::BAD_REQUEST,
            )
            .into());
        }
    };

    let affected = app_state
        .db
        .review_project(project_id, approve, data.token_reward)
        .await
        .map_err(|e| {
            log::error!("Failed to review project {}: {:?}", project_id, e);
            InternalError::new("Failed to review project", StatusCode::INTERNAL_SERVER_ERROR)
        })?;

    if affected == 0 {
        return Err(InternalError::new(
            "Project not found or not awaiting review",
            StatusCode::NOT_FOUND,
        )
        .into());
    }

    log::info!(
        "Project {} {}",
        project_id,
        if approve { "approved" } else { "rejected" }
    );
    Ok(HttpResponse::Ok().json(json!({
        "project_id": project_id,
        "status": if approve { "published" } else { "rejected" },
    })))
}

#[get("/admin/withdrawals/pending")]
pub async fn pending_withdrawals(app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let withdrawals = app_state.db.get_pending_withdrawals().await.map_err(|e| {
        log::error!("Failed to list pending withdrawals: {:?}", e);
        InternalError::new(
            "Failed to list pending withdrawals",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    })?;
    Ok(HttpResponse::Ok().json(withdrawals))
}

#[post("/admin/withdrawals/{withdrawal_id}/approve")]
pub async fn approve_withdrawal(
    app_state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let withdrawal_id = path.into_inner();

    let affected = app_state
        .db
        .approve_withdrawal(withdrawal_id)
        .await
        .map_err(|e| {
            log::error!("Failed to approve withdrawal {}: {:?}", withdrawal_id, e);
            InternalError::new(
                "Failed to approve withdrawal",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        })?;

    if affected == 0 {
        return Err(InternalError::new(
            "Withdrawal not found or already settled",
            StatusCode::NOT_FOUND,
        )
        .into());
    }

    log::info!("Withdrawal {} approved", withdrawal_id);
    Ok(HttpResponse::Ok().json(json!({
        "withdrawal_id": withdrawal_id,
        "status": "paid",
    })))
}
