use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(format!("unknown gender '{}'", other)),
        }
    }
}

/// A registered account. The password hash never leaves the server:
/// it is skipped on serialization.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Cached caption text for one video. `video_url` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub transcript_id: Uuid,
    pub video_url: String,
    pub transcript_text: Option<String>,
    pub language: Option<String>,
    pub duration: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub transcript_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    System,
    Llm,
}

impl Sender {
    pub const ALL: [Sender; 3] = [Sender::User, Sender::System, Sender::Llm];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::System => "system",
            Sender::Llm => "llm",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sender::ALL
            .into_iter()
            .find(|sender| sender.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Sender::ALL.iter().map(|s| s.as_str()).collect();
                format!("Invalid sender. Must be one of: {}", valid.join(", "))
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: Uuid,
    pub chat_id: Uuid,
    pub sender: Sender,
    pub message_text: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_parses_only_known_tags() {
        assert_eq!("llm".parse::<Sender>().unwrap(), Sender::Llm);
        assert_eq!("user".parse::<Sender>().unwrap(), Sender::User);
        let err = "assistant".parse::<Sender>().unwrap_err();
        assert_eq!(err, "Invalid sender. Must be one of: user, system, llm");
        assert!("LLM".parse::<Sender>().is_err());
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let user = User {
            user_id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            age: None,
            gender: Some(Gender::Female),
            birth_date: None,
            is_admin: false,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["gender"], "female");
    }
}
