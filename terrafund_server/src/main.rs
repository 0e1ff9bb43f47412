mod config;
mod gateway;
mod handlers;
mod minter;
mod settlement;
mod state;

use actix_jwt_auth_middleware::{Authority, TokenSigner, use_jwt::UseJWTOnApp};
use actix_state_guards::UseStateGuardOnScope;
use actix_web::{
    App, HttpServer, error::InternalError, http::StatusCode, middleware::Logger, web,
};
use common::{AuthUser, ROLE_ADMIN};
use dotenv::dotenv;
use ed25519_compact::KeyPair;
use jwt_compact::alg::Ed25519;
use pretty_env_logger::env_logger::{Builder, Env};

use crate::config::AppConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    if cli::run_cli().await {
        return Ok(());
    }

    let logger_env = Env::default().default_filter_or("debug");
    let mut logger_builder = Builder::from_env(logger_env);
    logger_builder.init();

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Application initialization failed: {:#}", e);
        std::io::Error::other(e.to_string())
    })?;

    let state = config.create_app_state().await.map_err(|e| {
        log::error!("Application initialization failed: {:#}", e);
        std::io::Error::other(e.to_string())
    })?;

    log::info!("App state initialized successfully");

    let data = web::Data::new(state);
    let bind = (config.bind_address.clone(), config.bind_port);

    // Fresh signing keys on every boot; a restart logs everyone out.
    let KeyPair {
        pk: public_key,
        sk: secret_key,
    } = KeyPair::generate();

    HttpServer::new(move || {
        let authority = Authority::<AuthUser, Ed25519, _, _>::new()
            .refresh_authorizer(|| async move { Ok(()) })
            .token_signer(Some(
                TokenSigner::new()
                    .signing_key(secret_key.clone())
                    .algorithm(Ed25519)
                    .build()
                    .expect("Failed to generate TokenSigner"),
            ))
            .verifying_key(public_key)
            .build()
            .expect("Failed to create Authority");

        App::new()
            .app_data(data.clone())
            .wrap(Logger::new("%a %t %r %s  %{Referer}i %Dms"))
            .service(handlers::index)
            .service(handlers::register)
            .service(handlers::login)
            .service(handlers::payment_notification)
            .service(handlers::list_projects)
            .service(handlers::get_project)
            .service(handlers::list_categories)
            .use_jwt(
                authority,
                web::scope("")
                    .service(handlers::donate)
                    .service(handlers::donor_dashboard)
                    .service(handlers::donor_donations)
                    .service(handlers::donor_transactions)
                    .service(handlers::donor_profile)
                    .service(handlers::update_donor_profile)
                    .service(handlers::join_project)
                    .service(handlers::volunteer_dashboard)
                    .service(handlers::volunteer_missions)
                    .service(handlers::volunteer_profile)
                    .service(handlers::update_volunteer_profile)
                    .service(handlers::volunteer_verifications)
                    .service(handlers::volunteer_wallet)
                    .service(handlers::ngo_dashboard)
                    .service(handlers::ngo_financial)
                    .service(handlers::ngo_projects)
                    .service(handlers::create_project)
                    .service(handlers::update_project)
                    .service(handlers::delete_project)
                    .service(handlers::ngo_volunteers)
                    .service(handlers::request_withdrawal)
                    .use_state_guard(
                        |user: AuthUser| async move {
                            if user.role == ROLE_ADMIN {
                                Ok(())
                            } else {
                                Err(InternalError::new(
                                    "You are not an Admin",
                                    StatusCode::FORBIDDEN,
                                ))
                            }
                        },
                        web::scope("")
                            .service(handlers::pending_projects)
                            .service(handlers::verify_project)
                            .service(handlers::pending_withdrawals)
                            .service(handlers::approve_withdrawal),
                    ),
            )
    })
    .bind(bind)?
    .run()
    .await
}
