use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{Error, HttpResponse, post, web};
use actix_jwt_auth_middleware::TokenSigner;
use jwt_compact::alg::Ed25519;
use serde::Deserialize;
use serde_json::json;

use common::{
    AuthUser, REGISTRABLE_ROLES, ROLE_DONOR, ROLE_VOLUNTEER, User, generate_wallet_address,
};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterData {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub email: String,
    pub password: String,
}

#[post("/register")]
pub async fn register(
    app_state: web::Data<AppState>,
    data: web::Json<RegisterData>,
) -> Result<HttpResponse, Error> {
    let data = data.into_inner();

    if !REGISTRABLE_ROLES.contains(&data.role.as_str()) {
        return Err(InternalError::new(
            format!("Unknown role: {}", data.role),
            StatusCode::BAD_REQUEST,
        )
        .into());
    }

    let existing = app_state
        .db
        .get_user_by_email(&data.email)
        .await
        .map_err(|e| {
            log::error!("Failed to check email {}: {:?}", data.email, e);
            InternalError::new("Failed to register user", StatusCode::INTERNAL_SERVER_ERROR)
        })?;
    if existing.is_some() {
        return Err(InternalError::new(
            "Email is already registered",
            StatusCode::CONFLICT,
        )
        .into());
    }

    // Donors and volunteers get a reward wallet at sign-up; NGOs are paid
    // out through bank withdrawals instead.
    let wallet_address = if data.role == ROLE_DONOR || data.role == ROLE_VOLUNTEER {
        Some(generate_wallet_address())
    } else {
        None
    };

    let user = User::new(
        &data.name,
        &data.email,
        &data.password,
        data.phone.as_deref(),
        &data.role,
        wallet_address.clone(),
    )
    .map_err(|e| InternalError::new(e.to_string(), StatusCode::BAD_REQUEST))?;

    let user_id = app_state.db.save_user(&user).await.map_err(|e| {
        log::error!("Failed to save user {}: {:?}", data.email, e);
        InternalError::new("Failed to register user", StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    log::info!("Registered {} {} ({})", data.role, user_id, data.email);

    Ok(HttpResponse::Created().json(json!({
        "user_id": user_id,
        "role": data.role,
        "wallet_address": wallet_address,
    })))
}

#[post("/login")]
pub async fn login(
    app_state: web::Data<AppState>,
    signer: web::Data<TokenSigner<AuthUser, Ed25519>>,
    data: web::Json<LoginData>,
) -> Result<HttpResponse, Error> {
    let data = data.into_inner();

    let user = app_state
        .db
        .get_user_by_email(&data.email)
        .await
        .map_err(|e| {
            log::error!("Failed to look up user {}: {:?}", data.email, e);
            InternalError::new("Login failed", StatusCode::INTERNAL_SERVER_ERROR)
        })?
        .ok_or_else(|| {
            InternalError::new("Invalid email or password", StatusCode::UNAUTHORIZED)
        })?;

    if user.verify_password(&data.password).is_err() {
        return Err(InternalError::new(
            "Invalid email or password",
            StatusCode::UNAUTHORIZED,
        )
        .into());
    }

    let claims = user.claims();
    let access_cookie = signer.create_access_cookie(&claims).map_err(|e| {
        log::error!("Failed to create access cookie: {:?}", e);
        InternalError::new("Login failed", StatusCode::INTERNAL_SERVER_ERROR)
    })?;
    let refresh_cookie = signer.create_refresh_cookie(&claims).map_err(|e| {
        log::error!("Failed to create refresh cookie: {:?}", e);
        InternalError::new("Login failed", StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    log::info!("User {} logged in", user.id);

    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .json(user))
}
