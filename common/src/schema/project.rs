use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const PROJECT_DRAFT: &str = "draft";
pub const PROJECT_SUBMITTED: &str = "submitted";
pub const PROJECT_PUBLISHED: &str = "published";
pub const PROJECT_REJECTED: &str = "rejected";

pub const PHASE_ACTIVE: &str = "active";
pub const PHASE_CLOSED: &str = "closed";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub organization_id: i64,
    pub category_id: i64,
    pub description: String,
    pub location: Option<String>,
    pub duration_months: Option<i64>,
    pub target_amount: i64,
    pub current_amount: i64,
    pub donor_count: i64,
    pub token_reward: Option<i64>,
    pub thumbnail: Option<String>,
    pub banner_image: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: String, // "draft", "submitted", "published", "rejected"
    pub phase: String,  // "active", "closed"
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Project {
    pub fn is_published(&self) -> bool {
        self.status == PROJECT_PUBLISHED
    }

    /// Volunteers may only join a published project that is still running.
    pub fn accepts_volunteers(&self) -> bool {
        self.is_published() && self.phase == PHASE_ACTIVE
    }
}

/// Fields an NGO may set when creating or updating a project.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectInput {
    pub title: String,
    pub category_id: i64,
    pub description: String,
    pub location: Option<String>,
    pub duration_months: Option<i64>,
    pub target_amount: i64,
    pub thumbnail: Option<String>,
    pub banner_image: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}
