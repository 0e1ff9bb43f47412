mod admin;
mod auth;
mod donations;
mod donatur;
mod ngo;
mod projects;
mod relawan;

use actix_web::{Error, HttpResponse, Responder, error::InternalError, get, http::StatusCode};
use common::AuthUser;

pub use admin::*;
pub use auth::*;
pub use donations::*;
pub use donatur::*;
pub use ngo::*;
pub use projects::*;
pub use relawan::*;

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("TerraFund Server is Running!")
}

/// Path user id must match the authenticated user, and the user must hold
/// the given role.
pub(crate) fn require_self(user: &AuthUser, user_id: i64, role: &str) -> Result<(), Error> {
    if user.role != role {
        return Err(InternalError::new("Forbidden", StatusCode::FORBIDDEN).into());
    }
    if user.id != user_id {
        return Err(InternalError::new(
            "You may not access another user's data",
            StatusCode::FORBIDDEN,
        )
        .into());
    }
    Ok(())
}
