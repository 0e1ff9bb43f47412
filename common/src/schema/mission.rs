use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const MISSION_ACTIVE: &str = "active";
pub const MISSION_COMPLETED: &str = "completed";

/// A volunteer's membership in a project.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Mission {
    pub id: i64,
    pub user_id: i64,
    pub project_id: i64,
    pub motivation: String,
    pub status: String, // "active", "completed"
    pub hours: i64,
    pub verification_status: String, // "pending", "verified", "rejected"
    pub joined_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}
