//! Mapping between the shared domain models and SQLite rows.
//!
//! Ids are stored as hyphenated UUID text. Timestamps are RFC 3339 UTC
//! with a fixed microsecond width, so ordering by the text column is
//! chronological.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::Row;
use rusqlite::types::{Type, Value};
use uuid::Uuid;

use tubechat_types::models::{Chat, Gender, Message, Sender, Transcript, User};

/// A table-backed record. `COLUMNS[0]` is the primary key and `values`
/// yields one value per column in the same order.
pub trait Entity: Sized {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
    fn values(&self) -> Vec<Value>;
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "user_id",
        "name",
        "email",
        "password_hash",
        "age",
        "gender",
        "birth_date",
        "is_admin",
        "created_at",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            user_id: uuid_at(row, 0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            age: row.get(4)?,
            gender: row
                .get::<_, Option<String>>(5)?
                .map(|g| g.parse::<Gender>().map_err(|e| conversion(5, e)))
                .transpose()?,
            birth_date: row
                .get::<_, Option<String>>(6)?
                .map(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT).map_err(|e| conversion(6, e)))
                .transpose()?,
            is_admin: row.get(7)?,
            created_at: timestamp_at(row, 8)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            uuid_value(self.user_id),
            Value::Text(self.name.clone()),
            Value::Text(self.email.clone()),
            Value::Text(self.password_hash.clone()),
            self.age.map_or(Value::Null, |a| Value::Integer(a.into())),
            self.gender.map_or(Value::Null, |g| Value::Text(g.as_str().into())),
            self.birth_date
                .map_or(Value::Null, |d| Value::Text(d.format(DATE_FORMAT).to_string())),
            Value::Integer(self.is_admin.into()),
            timestamp_value(&self.created_at),
        ]
    }
}

impl Entity for Transcript {
    const TABLE: &'static str = "transcripts";
    const COLUMNS: &'static [&'static str] = &[
        "transcript_id",
        "video_url",
        "transcript_text",
        "language",
        "duration",
        "created_at",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Transcript {
            transcript_id: uuid_at(row, 0)?,
            video_url: row.get(1)?,
            transcript_text: row.get(2)?,
            language: row.get(3)?,
            duration: row.get(4)?,
            created_at: timestamp_at(row, 5)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            uuid_value(self.transcript_id),
            Value::Text(self.video_url.clone()),
            self.transcript_text.clone().map_or(Value::Null, Value::Text),
            self.language.clone().map_or(Value::Null, Value::Text),
            self.duration.map_or(Value::Null, Value::Real),
            timestamp_value(&self.created_at),
        ]
    }
}

impl Entity for Chat {
    const TABLE: &'static str = "chats";
    const COLUMNS: &'static [&'static str] = &["chat_id", "user_id", "transcript_id", "created_at"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Chat {
            chat_id: uuid_at(row, 0)?,
            user_id: uuid_at(row, 1)?,
            transcript_id: row
                .get::<_, Option<String>>(2)?
                .map(|id| id.parse::<Uuid>().map_err(|e| conversion(2, e)))
                .transpose()?,
            created_at: timestamp_at(row, 3)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            uuid_value(self.chat_id),
            uuid_value(self.user_id),
            self.transcript_id.map_or(Value::Null, uuid_value),
            timestamp_value(&self.created_at),
        ]
    }
}

impl Entity for Message {
    const TABLE: &'static str = "messages";
    const COLUMNS: &'static [&'static str] =
        &["message_id", "chat_id", "sender", "message_text", "created_at"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Message {
            message_id: uuid_at(row, 0)?,
            chat_id: uuid_at(row, 1)?,
            sender: row
                .get::<_, String>(2)?
                .parse::<Sender>()
                .map_err(|e| conversion(2, e))?,
            message_text: row.get(3)?,
            created_at: timestamp_at(row, 4)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            uuid_value(self.message_id),
            uuid_value(self.chat_id),
            Value::Text(self.sender.as_str().into()),
            Value::Text(self.message_text.clone()),
            timestamp_value(&self.created_at),
        ]
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current time at the precision the database keeps.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn uuid_value(id: Uuid) -> Value {
    Value::Text(id.to_string())
}

pub(crate) fn timestamp_value(ts: &DateTime<Utc>) -> Value {
    Value::Text(ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    row.get::<_, String>(idx)?
        .parse::<Uuid>()
        .map_err(|e| conversion(idx, e))
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion(idx, e))
}

fn conversion<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}
