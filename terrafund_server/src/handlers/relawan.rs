use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{Error, HttpResponse, get, post, put, web};
use common::{AuthUser, ProfileUpdate, ROLE_VOLUNTEER};
use serde::Deserialize;
use serde_json::json;

use crate::handlers::require_self;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JoinData {
    pub project_id: i64,
    pub motivation: String,
}

/// Volunteer signs up for a project mission. One membership per project.
#[post("/relawan/{user_id}/projects")]
pub async fn join_project(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    data: web::Json<JoinData>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_VOLUNTEER)?;
    let data = data.into_inner();

    let project = app_state
        .db
        .get_project(data.project_id)
        .await
        .map_err(|e| {
            log::error!("Failed to load project {}: {:?}", data.project_id, e);
            InternalError::new("Failed to join project", StatusCode::INTERNAL_SERVER_ERROR)
        })?
        .ok_or_else(|| InternalError::new("Project not found", StatusCode::NOT_FOUND))?;

    if !project.accepts_volunteers() {
        return Err(InternalError::new(
            "Project is not accepting volunteers",
            StatusCode::BAD_REQUEST,
        )
        .into());
    }

    let existing = app_state
        .db
        .get_mission(user_id, data.project_id)
        .await
        .map_err(|e| {
            log::error!(
                "Failed to check mission for user {} project {}: {:?}",
                user_id,
                data.project_id,
                e
            );
            InternalError::new("Failed to join project", StatusCode::INTERNAL_SERVER_ERROR)
        })?;
    if existing.is_some() {
        return Err(InternalError::new(
            "You have already joined this project",
            StatusCode::CONFLICT,
        )
        .into());
    }

    let mission_id = app_state
        .db
        .save_mission(user_id, data.project_id, &data.motivation)
        .await
        .map_err(|e| {
            log::error!(
                "Failed to save mission for user {} project {}: {:?}",
                user_id,
                data.project_id,
                e
            );
            InternalError::new("Failed to join project", StatusCode::INTERNAL_SERVER_ERROR)
        })?;

    log::info!(
        "Volunteer {} joined project {} (mission {})",
        user_id,
        data.project_id,
        mission_id
    );

    Ok(HttpResponse::Created().json(json!({
        "mission_id": mission_id,
        "project_id": data.project_id,
        "status": "active",
    })))
}

#[get("/relawan/{user_id}/dashboard")]
pub async fn volunteer_dashboard(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_VOLUNTEER)?;

    let profile = app_state
        .db
        .get_user_with_role(user_id, ROLE_VOLUNTEER)
        .await
        .map_err(|e| {
            log::error!("Failed to load volunteer {}: {:?}", user_id, e);
            InternalError::new("Failed to load dashboard", StatusCode::INTERNAL_SERVER_ERROR)
        })?
        .ok_or_else(|| InternalError::new("Volunteer not found", StatusCode::NOT_FOUND))?;

    let stats = app_state.db.get_mission_stats(user_id).await.map_err(|e| {
        log::error!("Failed to load mission stats {}: {:?}", user_id, e);
        InternalError::new("Failed to load dashboard", StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    let wallet_total = app_state.db.get_wallet_total(user_id).await.map_err(|e| {
        log::error!("Failed to load wallet total {}: {:?}", user_id, e);
        InternalError::new("Failed to load dashboard", StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "name": profile.name,
        "level": profile.level,
        "xp": profile.xp,
        "wallet_address": profile.wallet_address,
        "missions_done": stats.missions_done,
        "missions_active": stats.missions_active,
        "total_hours": stats.total_hours,
        "wallet_total": wallet_total,
    })))
}

#[get("/relawan/{user_id}/projects")]
pub async fn volunteer_missions(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_VOLUNTEER)?;

    let missions = app_state
        .db
        .get_missions_by_user(user_id)
        .await
        .map_err(|e| {
            log::error!("Failed to list missions for {}: {:?}", user_id, e);
            InternalError::new("Failed to list missions", StatusCode::INTERNAL_SERVER_ERROR)
        })?;
    Ok(HttpResponse::Ok().json(missions))
}

/// Volunteer profile together with lifetime mission and wallet totals.
#[get("/relawan/{user_id}/profile")]
pub async fn volunteer_profile(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_VOLUNTEER)?;

    let profile = app_state
        .db
        .get_user_with_role(user_id, ROLE_VOLUNTEER)
        .await
        .map_err(|e| {
            log::error!("Failed to load profile {}: {:?}", user_id, e);
            InternalError::new("Failed to load profile", StatusCode::INTERNAL_SERVER_ERROR)
        })?
        .ok_or_else(|| InternalError::new("Volunteer not found", StatusCode::NOT_FOUND))?;

    let stats = app_state.db.get_mission_stats(user_id).await.map_err(|e| {
        log::error!("Failed to load mission stats {}: {:?}", user_id, e);
        InternalError::new("Failed to load profile", StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    let wallet_total = app_state.db.get_wallet_total(user_id).await.map_err(|e| {
        log::error!("Failed to load wallet total {}: {:?}", user_id, e);
        InternalError::new("Failed to load profile", StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    let mut body = json!(profile);
    if let Some(map) = body.as_object_mut() {
        map.insert("missions_done".to_string(), json!(stats.missions_done));
        map.insert("total_hours".to_string(), json!(stats.total_hours));
        map.insert("wallet_total".to_string(), json!(wallet_total));
    }
    Ok(HttpResponse::Ok().json(body))
}

#[put("/relawan/{user_id}/profile")]
pub async fn update_volunteer_profile(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    data: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_VOLUNTEER)?;

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
        .ok_or_else(|| InternalError::new("Volunteer not found", StatusCode::NOT_FOUND))?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Per-mission verification status, most recently finished first.
#[get("/relawan/{user_id}/verifications")]
pub async fn volunteer_verifications(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_VOLUNTEER)?;

    let rows = app_state
        .db
        .get_verification_status(user_id)
        .await
        .map_err(|e| {
            log::error!("Failed to list verifications for {}: {:?}", user_id, e);
            InternalError::new(
                "Failed to list verifications",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        })?;
    Ok(HttpResponse::Ok().json(rows))
}

#[get("/relawan/{user_id}/wallet")]
pub async fn volunteer_wallet(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_VOLUNTEER)?;

    let total = app_state.db.get_wallet_total(user_id).await.map_err(|e| {
        log::error!("Failed to load wallet total {}: {:?}", user_id, e);
        InternalError::new("Failed to load wallet", StatusCode::INTERNAL_SERVER_ERROR)
    })?;
    let transactions = app_state
        .db
        .get_wallet_transactions(user_id)
        .await
        .map_err(|e| {
            log::error!("Failed to list transactions for {}: {:?}", user_id, e);
            InternalError::new("Failed to load wallet", StatusCode::INTERNAL_SERVER_ERROR)
        })?;

    Ok(HttpResponse::Ok().json(json!({
        "total": total,
        "transactions": transactions,
    })))
}
