use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{Error, HttpResponse, get, put, web};
use common::{AuthUser, ProfileUpdate, ROLE_DONOR};
use serde_json::json;

use crate::handlers::require_self;
use crate::state::AppState;

#[get("/donatur/{user_id}/dashboard")]
pub async fn donor_dashboard(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_DONOR)?;

    let profile = app_state
        .db
        .get_user_with_role(user_id, ROLE_DONOR)
        .await
        .map_err(|e| {
            log::error!("Failed to load donor {}: {:?}", user_id, e);
            InternalError::new("Failed to load dashboard", StatusCode::INTERNAL_SERVER_ERROR)
        })?
        .ok_or_else(|| InternalError::new("Donor not found", StatusCode::NOT_FOUND))?;

    let stats = app_state.db.get_donor_stats(user_id).await.map_err(|e| {
        log::error!("Failed to load donor stats {}: {:?}", user_id, e);
        InternalError::new("Failed to load dashboard", StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    let total_reward = app_state.db.get_reward_total(user_id).await.map_err(|e| {
        log::error!("Failed to load reward total {}: {:?}", user_id, e);
        InternalError::new("Failed to load dashboard", StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    let projects = app_state
        .db
        .get_supported_projects(user_id)
        .await
        .map_err(|e| {
            log::error!("Failed to load supported projects {}: {:?}", user_id, e);
            InternalError::new("Failed to load dashboard", StatusCode::INTERNAL_SERVER_ERROR)
        })?;

    Ok(HttpResponse::Ok().json(json!({
        "name": profile.name,
        "level": profile.level,
        "xp": profile.xp,
        "wallet_address": profile.wallet_address,
        "total_donation": stats.total_donation,
        "total_projects": stats.total_projects,
        "total_reward": total_reward,
        "supported_projects": projects,
    })))
}

#[get("/donatur/{user_id}/donations")]
pub async fn donor_donations(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_DONOR)?;

    let donations = app_state
        .db
        .get_donations_by_user(user_id)
        .await
        .map_err(|e| {
            log::error!("Failed to list donations for {}: {:?}", user_id, e);
            InternalError::new("Failed to list donations", StatusCode::INTERNAL_SERVER_ERROR)
        })?;
    Ok(HttpResponse::Ok().json(donations))
}

#[get("/donatur/{user_id}/transactions")]
pub async fn donor_transactions(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_DONOR)?;

    let transactions = app_state
        .db
        .get_wallet_transactions(user_id)
        .await
        .map_err(|e| {
            log::error!("Failed to list transactions for {}: {:?}", user_id, e);
            InternalError::new(
                "Failed to list transactions",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        })?;
    Ok(HttpResponse::Ok().json(transactions))
}

#[get("/donatur/{user_id}/profile")]
pub async fn donor_profile(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_DONOR)?;

    let profile = app_state
        .db
        .get_user_with_role(user_id, ROLE_DONOR)
        .await
        .map_err(|e| {
            log::error!("Failed to load profile {}: {:?}", user_id, e);
            InternalError::new("Failed to load profile", StatusCode::INTERNAL_SERVER_ERROR)
        })?
        .ok_or_else(|| InternalError::new("Donor not found", StatusCode::NOT_FOUND))?;
    Ok(HttpResponse::Ok().json(profile))
}

#[put("/donatur/{user_id}/profile")]
pub async fn update_donor_profile(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    data: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_DONOR)?;

    app_state
        .db
        .update_profile(user_id, &data)
        .await
        .map_err(|e| {
            log::error!("Failed to update profile {}: {:?}", user_id, e);
            InternalError::new("Failed to update profile", StatusCode::INTERNAL_SERVER_ERROR)
        })?;

    let profile = app_state
        .db
        .get_user(user_id)
        .await
        .map_err(|e| {
            log::error!("Failed to reload profile {}: {:?}", user_id, e);
            InternalError::new("Failed to update profile", StatusCode::INTERNAL_SERVER_ERROR)
        })?
        .ok_or_else(|| InternalError::new("Donor not found", StatusCode::NOT_FOUND))?;
    Ok(HttpResponse::Ok().json(profile))
}
