use sqlx::MySqlPool;
use time::PrimitiveDateTime;

use crate::auth::repo_types::{NewUser, User};
use crate::error::ApiError;

const SELECT_USER: &str = r#"
    SELECT uid, fullname, username, email, password_hash, phone, birth_date,
           address_line_1, address_line_2, city, state, postal_code,
           country, country_iso, region, token, refresh_token,
           refresh_token_expires_at, created_at, updated_at
    FROM users
"#;

impl User {
    pub async fn find_by_uid(db: &MySqlPool, uid: u64) -> Result<Option<User>, ApiError> {
        let sql = format!("{SELECT_USER} WHERE uid = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(uid)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &MySqlPool, email: &str) -> Result<Option<User>, ApiError> {
        let sql = format!("{SELECT_USER} WHERE email = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    /// Conflict pre-checks probe username and phone with one call since a
    /// supplied value may collide with either column.
    pub async fn find_by_username_or_phone(
        db: &MySqlPool,
        value: &str,
    ) -> Result<Option<User>, ApiError> {
        let sql = format!("{SELECT_USER} WHERE username = ? OR phone = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .bind(value)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    /// Inserts the signup row and re-reads it so the caller gets the
    /// store-assigned uid and created_at. A unique-constraint violation
    /// surfaces as DuplicateEntry even when the pre-checks passed; the
    /// store has the final word on the check-then-insert race.
    pub async fn create(db: &MySqlPool, new: &NewUser) -> Result<User, ApiError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users
                (fullname, username, email, password_hash, token,
                 refresh_token, refresh_token_expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.fullname)
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.token)
        .bind(&new.refresh_token)
        .bind(new.refresh_token_expires_at)
        .execute(db)
        .await?;

        let uid = result.last_insert_id();
        Self::find_by_uid(db, uid)
            .await?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("inserted user row vanished")))
    }

    /// Rotation: overwrites the single live refresh token for the user.
    pub async fn update_refresh_token(
        db: &MySqlPool,
        uid: u64,
        token: &str,
        refresh_token: &str,
        expires_at: PrimitiveDateTime,
    ) -> Result<(), ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET token = ?, refresh_token = ?, refresh_token_expires_at = ?
            WHERE uid = ?
            "#,
        )
        .bind(token)
        .bind(refresh_token)
        .bind(expires_at)
        .bind(uid)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::user_not_found());
        }
        Ok(())
    }

    /// Full-row profile update; the handler decides field retention before
    /// calling this.
    pub async fn update_details(db: &MySqlPool, user: &User) -> Result<(), ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET fullname = ?, username = ?, phone = ?, birth_date = ?,
                address_line_1 = ?, address_line_2 = ?, city = ?, state = ?,
                postal_code = ?, country = ?, country_iso = ?, region = ?,
                updated_at = ?
            WHERE uid = ?
            "#,
        )
        .bind(&user.fullname)
        .bind(&user.username)
        .bind(&user.phone)
        .bind(user.birth_date)
        .bind(&user.address_line_1)
        .bind(&user.address_line_2)
        .bind(&user.city)
        .bind(&user.state)
        .bind(&user.postal_code)
        .bind(&user.country)
        .bind(&user.country_iso)
        .bind(&user.region)
        .bind(user.updated_at)
        .bind(user.uid)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::user_not_found());
        }
        Ok(())
    }

    /// Single combined statement: new hash plus refresh-token rotation, so
    /// a password change always invalidates the previous refresh token.
    pub async fn update_password_and_rotate(
        db: &MySqlPool,
        uid: u64,
        password_hash: &str,
        token: &str,
        refresh_token: &str,
        expires_at: PrimitiveDateTime,
        updated_at: PrimitiveDateTime,
    ) -> Result<(), ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?, token = ?, refresh_token = ?,
                refresh_token_expires_at = ?, updated_at = ?
            WHERE uid = ?
            "#,
        )
        .bind(password_hash)
        .bind(token)
        .bind(refresh_token)
        .bind(expires_at)
        .bind(updated_at)
        .bind(uid)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::user_not_found());
        }
        Ok(())
    }
}
