use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{Error, HttpResponse, delete, get, post, put, web};
use common::{
    AuthUser, PROJECT_SUBMITTED, ProjectInput, ROLE_NGO, generate_withdraw_code, slugify,
};
use serde::Deserialize;
use serde_json::json;

use crate::handlers::require_self;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WithdrawData {
    pub amount: i64,
    pub description: Option<String>,
}

#[get("/ngo/{user_id}/dashboard")]
pub async fn ngo_dashboard(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_NGO)?;

    let summary = app_state.db.get_ngo_summary(user_id).await.map_err(|e| {
        log::error!("Failed to load NGO summary {}: {:?}", user_id, e);
        InternalError::new("Failed to load dashboard", StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    let mut projects = app_state
        .db
        .get_projects_by_organization(user_id)
        .await
        .map_err(|e| {
            log::error!("Failed to load NGO projects {}: {:?}", user_id, e);
            InternalError::new("Failed to load dashboard", StatusCode::INTERNAL_SERVER_ERROR)
        })?;
    projects.truncate(5);

    Ok(HttpResponse::Ok().json(json!({
        "total_projects": summary.total_projects,
        "funds_raised": summary.funds_raised,
        "active_volunteers": summary.active_volunteers,
        "recent_projects": projects,
    })))
}

#[get("/ngo/{user_id}/projects")]
pub async fn ngo_projects(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_NGO)?;

    let projects = app_state
        .db
        .get_projects_by_organization(user_id)
        .await
        .map_err(|e| {
            log::error!("Failed to list NGO projects {}: {:?}", user_id, e);
            InternalError::new("Failed to list projects", StatusCode::INTERNAL_SERVER_ERROR)
        })?;
    Ok(HttpResponse::Ok().json(projects))
}

/// New projects always enter the admin review queue as `submitted`.
#[post("/ngo/{user_id}/projects")]
pub async fn create_project(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    data: web::Json<ProjectInput>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_NGO)?;
    let input = data.into_inner();

    if input.title.trim().is_empty() || input.target_amount <= 0 {
        return Err(InternalError::new(
            "Project needs a title and a positive target amount",
            StatusCode::BAD_REQUEST,
        )
        .into());
    }

    let slug = slugify(&input.title);
    let project_id = app_state
        .db
        .save_project(user_id, &slug, PROJECT_SUBMITTED, &input)
        .await
        .map_err(|e| {
            log::error!("Failed to save project for NGO {}: {:?}", user_id, e);
            InternalError::new("Failed to create project", StatusCode::INTERNAL_SERVER_ERROR)
        })?;

    log::info!("NGO {} submitted project {} ({})", user_id, project_id, slug);

    Ok(HttpResponse::Created().json(json!({
        "project_id": project_id,
        "slug": slug,
        "status": PROJECT_SUBMITTED,
    })))
}

#[put("/ngo/{user_id}/projects/{project_id}")]
pub async fn update_project(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(i64, i64)>,
    data: web::Json<ProjectInput>,
) -> Result<HttpResponse, Error> {
    let (user_id, project_id) = path.into_inner();
    require_self(&user, user_id, ROLE_NGO)?;
    let input = data.into_inner();

    let slug = slugify(&input.title);
    let affected = app_state
        .db
        .update_project(project_id, user_id, &slug, &input)
        .await
        .map_err(|e| {
            log::error!("Failed to update project {}: {:?}", project_id, e);
            InternalError::new("Failed to update project", StatusCode::INTERNAL_SERVER_ERROR)
        })?;

    if affected == 0 {
        return Err(InternalError::new("Project not found", StatusCode::NOT_FOUND).into());
    }
    Ok(HttpResponse::Ok().json(json!({ "project_id": project_id, "slug": slug })))
}

#[delete("/ngo/{user_id}/projects/{project_id}")]
pub async fn delete_project(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, Error> {
    let (user_id, project_id) = path.into_inner();
    require_self(&user, user_id, ROLE_NGO)?;

    let affected = app_state
        .db
        .delete_project(project_id, user_id)
        .await
        .map_err(|e| {
            log::error!("Failed to delete project {}: {:?}", project_id, e);
            InternalError::new("Failed to delete project", StatusCode::INTERNAL_SERVER_ERROR)
        })?;

    if affected == 0 {
        return Err(InternalError::new("Project not found", StatusCode::NOT_FOUND).into());
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Funding status and claimability per project.
#[get("/ngo/{user_id}/financial")]
pub async fn ngo_financial(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_NGO)?;

    let financials = app_state
        .db
        .get_project_financials(user_id)
        .await
        .map_err(|e| {
            log::error!("Failed to load financials for NGO {}: {:?}", user_id, e);
            InternalError::new("Failed to load financials", StatusCode::INTERNAL_SERVER_ERROR)
        })?;
    Ok(HttpResponse::Ok().json(financials))
}

#[get("/ngo/{user_id}/volunteers")]
pub async fn ngo_volunteers(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_NGO)?;

    let volunteers = app_state
        .db
        .get_volunteers_by_organization(user_id)
        .await
        .map_err(|e| {
            log::error!("Failed to list volunteers for NGO {}: {:?}", user_id, e);
            InternalError::new("Failed to list volunteers", StatusCode::INTERNAL_SERVER_ERROR)
        })?;
    Ok(HttpResponse::Ok().json(volunteers))
}

/// Requests a payout of raised funds; it stays `pending` until an admin
/// approves it.
#[post("/ngo/{user_id}/withdraw")]
pub async fn request_withdrawal(
    app_state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    data: web::Json<WithdrawData>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();
    require_self(&user, user_id, ROLE_NGO)?;
    let data = data.into_inner();

    if data.amount <= 0 {
        return Err(InternalError::new(
            "Withdrawal amount must be positive",
            StatusCode::BAD_REQUEST,
        )
        .into());
    }

    let summary = app_state.db.get_ngo_summary(user_id).await.map_err(|e| {
        log::error!("Failed to load NGO summary {}: {:?}", user_id, e);
        InternalError::new(
            "Failed to request withdrawal",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    })?;
    if data.amount > summary.funds_raised {
        return Err(InternalError::new(
            "Withdrawal exceeds raised funds",
            StatusCode::BAD_REQUEST,
        )
        .into());
    }

    let tx_code = generate_withdraw_code();
    let description = data.description.unwrap_or_else(|| "Fund withdrawal".to_string());
    let withdrawal_id = app_state
        .db
        .save_withdrawal(user_id, &tx_code, data.amount, &description)
        .await
        .map_err(|e| {
            log::error!("Failed to save withdrawal for NGO {}: {:?}", user_id, e);
            InternalError::new(
                "Failed to request withdrawal",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        })?;

    log::info!(
        "NGO {} requested withdrawal {} ({}, amount {})",
        user_id,
        withdrawal_id,
        tx_code,
        data.amount
    );

    Ok(HttpResponse::Created().json(json!({
        "withdrawal_id": withdrawal_id,
        "tx_code": tx_code,
        "status": "pending",
    })))
}
