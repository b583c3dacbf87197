use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, Date, PrimitiveDateTime};
use tracing::{info, instrument, warn};

use crate::auth::{
    claims::Claims,
    dto::{
        AccountLookupRequest, LoginRequest, SignupRequest, StatusResponse, UpdateDetailsRequest,
        UpdatePasswordRequest, UserResponse,
    },
    extractors::AuthUser,
    jwt::{mint_refresh_token, JwtKeys},
    password::{hash_password, verify_password},
    repo_types::{now_utc_seconds, store_datetime, NewUser, User},
};
use crate::country::country_details;
use crate::error::ApiError;
use crate::state::AppState;

const USER_CREATED: &str = "New user successfully created.";
const USER_LOGGED_IN: &str = "User successfully logged in.";
const USER_ALREADY_LOGGED_IN: &str = "User already logged in.";
const USER_DETAILS_UPDATED: &str = "User details updated successfully.";
const USER_PASSWORD_UPDATED: &str = "Password updated successfully.";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_signup(payload: &SignupRequest) -> Result<(&str, &str, &str, &str), ApiError> {
    let fields = (
        payload.fullname.as_deref().filter(|v| !v.is_empty()),
        payload.username.as_deref().filter(|v| !v.is_empty()),
        payload.email.as_deref().filter(|v| !v.is_empty()),
        payload.password.as_deref().filter(|v| !v.is_empty()),
    );
    let (Some(fullname), Some(username), Some(email), Some(password)) = fields else {
        return Err(ApiError::InvalidInput(
            "Please attach required data. Required field names: [fullname, username, email, password]".into(),
        ));
    };
    if username.chars().count() < 8 {
        return Err(ApiError::InvalidInput(
            "Username must be at least 8 characters long.".into(),
        ));
    }
    if !is_valid_email(email) {
        return Err(ApiError::InvalidInput("Email is invalid.".into()));
    }
    if password.len() < 8 {
        return Err(ApiError::InvalidInput(
            "Password too short. (min 8 chars).".into(),
        ));
    }
    Ok((fullname, username, email, password))
}

fn validate_login(payload: &LoginRequest) -> Result<(&str, &str), ApiError> {
    let fields = (
        payload.email.as_deref().filter(|v| !v.is_empty()),
        payload.password.as_deref().filter(|v| !v.is_empty()),
    );
    let (Some(email), Some(password)) = fields else {
        return Err(ApiError::InvalidInput(
            "Please attach email and password.".into(),
        ));
    };
    if !is_valid_email(email) {
        return Err(ApiError::InvalidInput("Email is invalid.".into()));
    }
    Ok((email, password))
}

fn validate_password_change(payload: &UpdatePasswordRequest) -> Result<(u64, &str, &str), ApiError> {
    let fields = (
        payload.uid,
        payload.old_password.as_deref().filter(|v| !v.is_empty()),
        payload.new_password.as_deref().filter(|v| !v.is_empty()),
    );
    let (Some(uid), Some(old_password), Some(new_password)) = fields else {
        return Err(ApiError::InvalidInput(
            "Please attach required data. Required field names: [uid, oldPassword, newPassword]".into(),
        ));
    };
    if new_password.len() < 8 {
        return Err(ApiError::InvalidInput(
            "Password too short. (min 8 chars).".into(),
        ));
    }
    Ok((uid, old_password, new_password))
}

fn validate_account_lookup(payload: &AccountLookupRequest) -> Result<(u64, &str), ApiError> {
    let fields = (
        payload.uid,
        payload.refresh_token.as_deref().filter(|v| !v.is_empty()),
    );
    let (Some(uid), Some(presented)) = fields else {
        return Err(ApiError::InvalidInput(
            "Please attach uid and refresh token.".into(),
        ));
    };
    Ok((uid, presented))
}

/// Valid only when the stored token matches and its expiry is strictly in
/// the future. Mismatch and expiry are indistinguishable outward.
fn refresh_token_valid(user: &User, presented: &str, now: PrimitiveDateTime) -> bool {
    user.refresh_token.as_deref() == Some(presented)
        && user.refresh_token_expires_at.is_some_and(|exp| exp > now)
}

/// The token's identity must own the target row.
fn caller_owns_row(claims: &Claims, user: &User) -> bool {
    user.email == claims.email
}

fn parse_birth_date(raw: &str) -> Result<PrimitiveDateTime, ApiError> {
    if let Ok(dt) = PrimitiveDateTime::parse(raw, store_datetime::FORMAT) {
        return Ok(dt);
    }
    let date = Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| ApiError::InvalidInput("birthDate must be formatted as YYYY-MM-DD.".into()))?;
    Ok(date.midnight())
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let (fullname, username, email, password) = validate_signup(&payload)?;

    // Pre-checks; the store's unique constraints still backstop the race.
    if User::find_by_email(&state.db, email).await?.is_some()
        || User::find_by_username_or_phone(&state.db, username)
            .await?
            .is_some()
    {
        warn!(email = %email, "signup rejected, identifier taken");
        return Err(ApiError::DuplicateEntry);
    }

    let password_hash = hash_password(password)?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_access(username, email)?;
    let refresh_token = mint_refresh_token();
    let refresh_token_expires_at = keys.refresh_expiry();

    let user = User::create(
        &state.db,
        &NewUser {
            fullname: fullname.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            token,
            refresh_token,
            refresh_token_expires_at,
        },
    )
    .await?;

    info!(uid = user.uid, email = %user.email, "user created");
    Ok((
        StatusCode::CREATED,
        Json(UserResponse::new(USER_CREATED, user)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let (email, password) = validate_login(&payload)?;

    let mut user = User::find_by_email(&state.db, email)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    if !verify_password(password, &user.password_hash) {
        warn!(uid = user.uid, "login with invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_access(&user.username, &user.email)?;
    let refresh_token = mint_refresh_token();
    let expires_at = keys.refresh_expiry();

    User::update_refresh_token(&state.db, user.uid, &token, &refresh_token, expires_at).await?;

    user.token = Some(token);
    user.refresh_token = Some(refresh_token);
    user.refresh_token_expires_at = Some(expires_at);

    info!(uid = user.uid, "user logged in");
    Ok(Json(UserResponse::new(USER_LOGGED_IN, user)))
}

#[instrument(skip(state, payload))]
pub async fn account_lookup(
    State(state): State<AppState>,
    Json(payload): Json<AccountLookupRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let (uid, presented) = validate_account_lookup(&payload)?;

    let mut user = User::find_by_uid(&state.db, uid)
        .await?
        .ok_or_else(ApiError::unknown_account)?;

    if !refresh_token_valid(&user, presented, now_utc_seconds()) {
        warn!(uid = user.uid, "refresh token rejected");
        return Err(ApiError::InvalidRefreshToken);
    }

    // Rotate even on a pure refresh so a captured token cannot be replayed.
    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_access(&user.username, &user.email)?;
    let refresh_token = mint_refresh_token();
    let expires_at = keys.refresh_expiry();

    User::update_refresh_token(&state.db, user.uid, &token, &refresh_token, expires_at).await?;

    user.token = Some(token);
    user.refresh_token = Some(refresh_token);
    user.refresh_token_expires_at = Some(expires_at);

    info!(uid = user.uid, "session refreshed");
    Ok(Json(UserResponse::new(USER_ALREADY_LOGGED_IN, user)))
}

#[instrument(skip(state, claims, payload))]
pub async fn update_details(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<UpdateDetailsRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Some(uid) = payload.uid else {
        return Err(ApiError::InvalidInput(
            "Please attach uid and data to update.".into(),
        ));
    };

    // Another user owning the supplied username or phone is a conflict;
    // the same uid re-submitting its own values is not.
    if let Some(username) = payload.username.as_deref() {
        if let Some(other) = User::find_by_username_or_phone(&state.db, username).await? {
            if other.uid != uid {
                return Err(ApiError::DuplicateUsername);
            }
        }
    }
    if let Some(phone) = payload.phone.as_deref() {
        if let Some(other) = User::find_by_username_or_phone(&state.db, phone).await? {
            if other.uid != uid {
                return Err(ApiError::DuplicatePhone);
            }
        }
    }

    let mut user = User::find_by_uid(&state.db, uid)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    if !caller_owns_row(&claims, &user) {
        warn!(uid = user.uid, "details update for a row the caller does not own");
        return Err(ApiError::Unauthorized);
    }

    if let Some(fullname) = payload.fullname {
        user.fullname = fullname;
    }
    if let Some(username) = payload.username {
        user.username = username;
    }
    // Carried-over asymmetry: phone is always overwritten with the payload
    // value, so omitting it clears the stored number.
    user.phone = payload.phone;
    if let Some(raw) = payload.birth_date.as_deref() {
        user.birth_date = Some(parse_birth_date(raw)?);
    }
    if let Some(v) = payload.address_line_1 {
        user.address_line_1 = Some(v);
    }
    if let Some(v) = payload.address_line_2 {
        user.address_line_2 = Some(v);
    }
    if let Some(v) = payload.city {
        user.city = Some(v);
    }
    if let Some(v) = payload.state {
        user.state = Some(v);
    }
    if let Some(v) = payload.postal_code {
        user.postal_code = Some(v);
    }
    if let Some(country) = payload.country {
        if let Some((iso, region)) = country_details(&country) {
            user.country_iso = Some(iso.to_string());
            user.region = Some(region.to_string());
        }
        user.country = Some(country);
    }
    user.updated_at = Some(now_utc_seconds());

    User::update_details(&state.db, &user).await?;

    info!(uid = user.uid, "user details updated");
    Ok(Json(StatusResponse::new(USER_DETAILS_UPDATED)))
}

#[instrument(skip(state, claims, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let (uid, old_password, new_password) = validate_password_change(&payload)?;

    let mut user = User::find_by_uid(&state.db, uid)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    if !caller_owns_row(&claims, &user) {
        warn!(uid = user.uid, "password change for a row the caller does not own");
        return Err(ApiError::Unauthorized);
    }

    if !verify_password(old_password, &user.password_hash) {
        warn!(uid = user.uid, "password change with invalid old password");
        return Err(ApiError::InvalidCredentials);
    }

    let password_hash = hash_password(new_password)?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_access(&user.username, &user.email)?;
    let refresh_token = mint_refresh_token();
    let expires_at = keys.refresh_expiry();
    let updated_at = now_utc_seconds();

    User::update_password_and_rotate(
        &state.db,
        user.uid,
        &password_hash,
        &token,
        &refresh_token,
        expires_at,
        updated_at,
    )
    .await?;

    user.password_hash = password_hash;
    user.token = Some(token);
    user.refresh_token = Some(refresh_token);
    user.refresh_token_expires_at = Some(expires_at);
    user.updated_at = Some(updated_at);

    info!(uid = user.uid, "password updated");
    Ok((
        StatusCode::CREATED,
        Json(UserResponse::new(USER_PASSWORD_UPDATED, user)),
    ))
}
