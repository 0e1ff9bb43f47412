use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{Error, HttpResponse, get, web};
use chrono::{NaiveDate, Utc};
use common::Project;
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProjectFilter {
    pub category_id: Option<i64>,
}

#[get("/projects")]
pub async fn list_projects(
    app_state: web::Data<AppState>,
    filter: web::Query<ProjectFilter>,
) -> Result<HttpResponse, Error> {
    let projects = match filter.category_id {
        Some(category_id) => app_state.db.get_projects_by_category(category_id).await,
        None => app_state.db.get_published_projects().await,
    }
    .map_err(|e| {
        log::error!("Failed to list projects: {:?}", e);
        InternalError::new("Failed to list projects", StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    let body: Vec<_> = projects.iter().map(project_card).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[get("/projects/{project_id}")]
pub async fn get_project(
    app_state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let project_id = path.into_inner();
    let project = app_state
        .db
        .get_project(project_id)
        .await
        .map_err(|e| {
            log::error!("Failed to get project {}: {:?}", project_id, e);
            InternalError::new("Failed to get project", StatusCode::INTERNAL_SERVER_ERROR)
        })?
        .filter(Project::is_published)
        .ok_or_else(|| InternalError::new("Project not found", StatusCode::NOT_FOUND))?;

    Ok(HttpResponse::Ok().json(project_card(&project)))
}

#[get("/categories")]
pub async fn list_categories(app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let categories = app_state.db.get_categories().await.map_err(|e| {
        log::error!("Failed to list categories: {:?}", e);
        InternalError::new(
            "Failed to list categories",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    })?;
    Ok(HttpResponse::Ok().json(categories))
}

/// The stored project plus the two derived fields the clients render.
fn project_card(project: &Project) -> serde_json::Value {
    let mut value = json!(project);
    if let Some(map) = value.as_object_mut() {
        map.insert(
            "progress_percentage".to_string(),
            json!(progress_percentage(project)),
        );
        map.insert("days_remaining".to_string(), json!(days_remaining(project)));
    }
    value
}

fn progress_percentage(project: &Project) -> i64 {
    if project.target_amount <= 0 {
        return 0;
    }
    (project.current_amount * 100 / project.target_amount).min(100)
}

/// Days until the end date, clamped at zero; `None` for open-ended projects
/// or unparseable dates.
fn days_remaining(project: &Project) -> Option<i64> {
    let end = NaiveDate::parse_from_str(project.end_date.as_deref()?, "%Y-%m-%d").ok()?;
    let today = Utc::now().date_naive();
    Some((end - today).num_days().max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{PHASE_ACTIVE, PROJECT_PUBLISHED};

    fn sample_project() -> Project {
        Project {
            id: 1,
            title: "Reboisasi Hutan".to_string(),
            slug: "reboisasi-hutan".to_string(),
            organization_id: 1,
            category_id: 1,
            description: "".to_string(),
            location: None,
            duration_months: None,
            target_amount: 1_000_000,
            current_amount: 250_000,
            donor_count: 3,
            token_reward: None,
            thumbnail: None,
            banner_image: None,
            start_date: None,
            end_date: None,
            status: PROJECT_PUBLISHED.to_string(),
            phase: PHASE_ACTIVE.to_string(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn progress_is_floored_and_capped() {
        let mut project = sample_project();
        assert_eq!(progress_percentage(&project), 25);

        project.current_amount = 2_000_000;
        assert_eq!(progress_percentage(&project), 100);

        project.target_amount = 0;
        assert_eq!(progress_percentage(&project), 0);
    }

    #[test]
    fn days_remaining_clamps_past_dates_to_zero() {
        let mut project = sample_project();
        assert_eq!(days_remaining(&project), None);

        project.end_date = Some("2000-01-01".to_string());
        assert_eq!(days_remaining(&project), Some(0));

        project.end_date = Some("not-a-date".to_string());
        assert_eq!(days_remaining(&project), None);
    }
}
