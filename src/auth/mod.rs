use crate::state::AppState;
use axum::{routing::post, Router};

pub mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        .route("/account-lookup", post(handlers::account_lookup))
        .route("/update-details", post(handlers::update_details))
        .route("/update-password", post(handlers::update_password))
}
