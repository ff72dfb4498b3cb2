use std::io::Write;

use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mentora_shared::types::auth::AccountRole;

use crate::schema::{accounts, availability_slots, majors, payments, sessions};

/// Money is stored in minor units and crosses the API in major units.
pub mod money {
    use serde::Serializer;

    pub fn to_minor(major: f64) -> i32 {
        (major * 100.0).round() as i32
    }

    pub fn to_major(minor: i32) -> f64 {
        f64::from(minor) / 100.0
    }

    pub fn serialize<S: Serializer>(minor: &i32, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(to_major(*minor))
    }

    pub fn serialize_opt<S: Serializer>(minor: &Option<i32>, s: S) -> Result<S::Ok, S::Error> {
        match minor {
            Some(m) => serialize(m, s),
            None => s.serialize_none(),
        }
    }
}

// --- Account ---

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = accounts)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub role: String,
    pub major_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub image_url: Option<String>,
    pub linkedin_url: Option<String>,
    #[serde(rename = "sessionPrice", serialize_with = "money::serialize_opt")]
    pub session_price_minor: Option<i32>,
    pub bio: Option<String>,
    pub rating: f64,
    pub mentee_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn role(&self) -> AccountRole {
        self.role.parse().unwrap_or(AccountRole::Mentee)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = accounts)]
pub struct NewAccount {
    pub id: Uuid,
    pub role: String,
    pub major_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub password_hash: String,
    pub linkedin_url: Option<String>,
    pub session_price_minor: Option<i32>,
    pub bio: Option<String>,
}

/// What other users may see of a mentor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub major_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub linkedin_url: Option<String>,
    #[serde(rename = "sessionPrice", serialize_with = "money::serialize_opt")]
    pub session_price_minor: Option<i32>,
    pub bio: Option<String>,
    pub rating: f64,
    pub mentee_count: i32,
}

impl From<Account> for MentorProfile {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            first_name: a.first_name,
            last_name: a.last_name,
            major_id: a.major_id,
            image_url: a.image_url,
            linkedin_url: a.linkedin_url,
            session_price_minor: a.session_price_minor,
            bio: a.bio,
            rating: a.rating,
            mentee_count: a.mentee_count,
        }
    }
}

// --- Major ---

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = majors)]
pub struct Major {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

// --- Availability slot ---

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = availability_slots)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub is_booked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = availability_slots)]
pub struct NewAvailabilitySlot {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub is_booked: bool,
}

// --- Session ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Upcoming,
    Past,
    Completed,
    Cancelled,
    Rescheduled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Upcoming => "upcoming",
            SessionStatus::Past => "past",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Rescheduled => "rescheduled",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(SessionStatus::Upcoming),
            "past" => Ok(SessionStatus::Past),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" => Ok(SessionStatus::Cancelled),
            "rescheduled" => Ok(SessionStatus::Rescheduled),
            _ => Err(format!("unknown session status: {s}")),
        }
    }
}

impl ToSql<Text, Pg> for SessionStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for SessionStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        raw.parse().map_err(Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = sessions)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub mentee_id: Uuid,
    pub slot_id: Option<Uuid>,
    pub status: SessionStatus,
    #[serde(rename = "price", serialize_with = "money::serialize")]
    pub price_minor: i32,
    #[serde(rename = "zoomUrl")]
    pub meeting_url: String,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSession {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub mentee_id: Uuid,
    pub slot_id: Option<Uuid>,
    pub status: SessionStatus,
    pub price_minor: i32,
    pub meeting_url: String,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
}

// --- Payment ---

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = payments)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub session_id: Uuid,
    pub mentee_id: Uuid,
    #[serde(rename = "amount", serialize_with = "money::serialize")]
    pub amount_minor: i32,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPayment {
    pub id: Uuid,
    pub session_id: Uuid,
    pub mentee_id: Uuid,
    pub amount_minor: i32,
    pub currency: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_status_parses_known_values_only() {
        for status in [
            SessionStatus::Upcoming,
            SessionStatus::Past,
            SessionStatus::Completed,
            SessionStatus::Cancelled,
            SessionStatus::Rescheduled,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
        assert!("archived".parse::<SessionStatus>().is_err());
        assert!("Cancelled".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn session_serializes_meeting_url_as_zoom_url() {
        let now = Utc::now();
        let session = Session {
            id: Uuid::now_v7(),
            mentor_id: Uuid::now_v7(),
            mentee_id: Uuid::now_v7(),
            slot_id: None,
            status: SessionStatus::Upcoming,
            price_minor: 5000,
            meeting_url: "https://zoom.us/j/1?pwd=abc".into(),
            scheduled_start: now,
            scheduled_end: now,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["zoomUrl"], "https://zoom.us/j/1?pwd=abc");
        assert_eq!(json["status"], "upcoming");
        assert!(json["slotId"].is_null());
        assert_eq!(json["price"], 50.0);
        assert!(json.get("priceMinor").is_none());
    }

    #[test]
    fn money_crosses_the_api_in_major_units() {
        assert_eq!(money::to_minor(49.99), 4999);
        assert_eq!(money::to_minor(50.0), 5000);
        assert_eq!(money::to_major(4999), 49.99);

        let payment = Payment {
            id: Uuid::now_v7(),
            session_id: Uuid::now_v7(),
            mentee_id: Uuid::now_v7(),
            amount_minor: 5000,
            currency: "USD".into(),
            status: "completed".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["amount"], 50.0);

        let profile = MentorProfile {
            id: Uuid::now_v7(),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            major_id: None,
            image_url: None,
            linkedin_url: None,
            session_price_minor: Some(5000),
            bio: None,
            rating: 0.0,
            mentee_count: 0,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["sessionPrice"], 50.0);
        assert!(json.get("sessionPriceMinor").is_none());
    }
}
