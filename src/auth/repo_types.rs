use serde::Serialize;
use sqlx::FromRow;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

/// Current UTC time truncated to whole seconds, the resolution of the
/// store's DATETIME columns. All expiry comparisons use this clock.
pub fn now_utc_seconds() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    let now = now - Duration::nanoseconds(now.nanosecond() as i64);
    PrimitiveDateTime::new(now.date(), now.time())
}

/// Serde adapter for naive `YYYY-MM-DD HH:MM:SS` store timestamps.
pub mod store_datetime {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{format_description::FormatItem, macros::format_description, PrimitiveDateTime};

    pub const FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

    pub fn serialize<S: Serializer>(dt: &PrimitiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        let out = dt.format(FORMAT).map_err(serde::ser::Error::custom)?;
        s.serialize_str(&out)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PrimitiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        PrimitiveDateTime::parse(&raw, FORMAT).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use time::PrimitiveDateTime;

        pub fn serialize<S: Serializer>(
            dt: &Option<PrimitiveDateTime>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => super::serialize(dt, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<PrimitiveDateTime>, D::Error> {
            let raw = Option::<String>::deserialize(d)?;
            raw.map(|raw| {
                PrimitiveDateTime::parse(&raw, super::FORMAT).map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }
}

/// User row. The password hash never leaves the service; everything else
/// is part of the outward representation.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: u64,
    pub fullname: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    #[serde(with = "store_datetime::option")]
    pub birth_date: Option<PrimitiveDateTime>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub country_iso: Option<String>,
    pub region: Option<String>,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(with = "store_datetime::option")]
    pub refresh_token_expires_at: Option<PrimitiveDateTime>,
    #[serde(with = "store_datetime")]
    pub created_at: PrimitiveDateTime,
    #[serde(with = "store_datetime::option")]
    pub updated_at: Option<PrimitiveDateTime>,
}

/// Fields persisted at signup; the store assigns uid and created_at.
#[derive(Debug)]
pub struct NewUser {
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub token: String,
    pub refresh_token: String,
    pub refresh_token_expires_at: PrimitiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample_user() -> User {
        User {
            uid: 7,
            fullname: "A B".into(),
            username: "abcdefgh".into(),
            email: "a@b.com".into(),
            password_hash: "$argon2id$secret".into(),
            phone: None,
            birth_date: Some(datetime!(1990-05-01 00:00:00)),
            address_line_1: Some("1 Main St".into()),
            address_line_2: None,
            city: None,
            state: None,
            postal_code: None,
            country: Some("Germany".into()),
            country_iso: Some("DE".into()),
            region: Some("Europe".into()),
            token: Some("jwt".into()),
            refresh_token: Some("aa".repeat(64)),
            refresh_token_expires_at: Some(datetime!(2024-01-02 03:04:05)),
            created_at: datetime!(2024-01-01 12:00:00),
            updated_at: None,
        }
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2id"));
    }

    #[test]
    fn outward_fields_are_camel_case_with_naive_timestamps() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert_eq!(json["uid"], 7);
        assert_eq!(json["email"], "a@b.com");
        assert_eq!(json["birthDate"], "1990-05-01 00:00:00");
        assert_eq!(json["addressLine1"], "1 Main St");
        assert_eq!(json["refreshTokenExpiresAt"], "2024-01-02 03:04:05");
        assert_eq!(json["createdAt"], "2024-01-01 12:00:00");
        assert_eq!(json["updatedAt"], serde_json::Value::Null);
    }

    #[test]
    fn now_utc_seconds_has_no_subsecond_part() {
        assert_eq!(now_utc_seconds().nanosecond(), 0);
    }

    #[test]
    fn store_datetime_parses_what_it_formats() {
        let dt = datetime!(2023-11-30 23:59:59);
        let raw = dt.format(store_datetime::FORMAT).unwrap();
        assert_eq!(raw, "2023-11-30 23:59:59");
        let parsed = PrimitiveDateTime::parse(&raw, store_datetime::FORMAT).unwrap();
        assert_eq!(parsed, dt);
    }
}
