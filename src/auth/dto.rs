use serde::{Deserialize, Serialize};

use crate::auth::repo_types::User;

/// Request bodies keep every field optional so a missing field maps to the
/// domain's InvalidInput error instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub fullname: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLookupRequest {
    pub uid: Option<u64>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub uid: Option<u64>,
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDetailsRequest {
    pub uid: Option<u64>,
    pub fullname: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// Success envelope carrying the user (password hash stripped by the
/// row type's serialization rules).
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub user: User,
}

impl UserResponse {
    pub fn new(message: &'static str, user: User) -> Self {
        Self {
            status: "success",
            message,
            user,
        }
    }
}

/// Success envelope without a payload (update-details).
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

impl StatusResponse {
    pub fn new(message: &'static str) -> Self {
        Self {
            status: "success",
            message,
        }
    }
}
