use anyhow::Result;
use rusqlite::types::Value;
use uuid::Uuid;

use tubechat_types::models::{Chat, Message, Transcript, User};

use crate::Repo;
use crate::models::uuid_value;

// -- Users --

impl Repo<'_, User> {
    pub fn by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email = ?1", vec![Value::Text(email.to_string())])
    }
}

// -- Transcripts --

impl Repo<'_, Transcript> {
    /// Exact match on the stored URL.
    pub fn by_video_url(&self, video_url: &str) -> Result<Option<Transcript>> {
        self.find_one("video_url = ?1", vec![Value::Text(video_url.to_string())])
    }
}

// -- Chats --

impl Repo<'_, Chat> {
    /// Newest first.
    pub fn by_owner(&self, user_id: Uuid) -> Result<Vec<Chat>> {
        self.find_many(
            "user_id = ?1",
            "created_at DESC, rowid DESC",
            vec![uuid_value(user_id)],
        )
    }

    /// Newest first.
    pub fn by_transcript(&self, transcript_id: Uuid) -> Result<Vec<Chat>> {
        self.find_many(
            "transcript_id = ?1",
            "created_at DESC, rowid DESC",
            vec![uuid_value(transcript_id)],
        )
    }
}

// -- Messages --

impl Repo<'_, Message> {
    /// Chat history, oldest first. Equal timestamps keep insertion order.
    pub fn for_chat(&self, chat_id: Uuid) -> Result<Vec<Message>> {
        self.find_many("chat_id = ?1", "created_at ASC, rowid ASC", vec![uuid_value(chat_id)])
    }

    pub fn last_for_chat(&self, chat_id: Uuid) -> Result<Option<Message>> {
        self.find_one(
            "chat_id = ?1 ORDER BY created_at DESC, rowid DESC",
            vec![uuid_value(chat_id)],
        )
    }

    pub fn count_for_chat(&self, chat_id: Uuid) -> Result<i64> {
        self.scalar(
            "SELECT COUNT(*) FROM messages WHERE chat_id = ?1",
            vec![uuid_value(chat_id)],
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use tubechat_types::models::Sender;

    use super::*;
    use crate::{Database, timestamp_now};

    fn user(db: &Database, email: &str) -> User {
        db.repo::<User>()
            .create(User {
                user_id: Uuid::new_v4(),
                name: "Test User".into(),
                email: email.into(),
                password_hash: "hash".into(),
                age: None,
                gender: None,
                birth_date: None,
                is_admin: false,
                created_at: timestamp_now(),
            })
            .unwrap()
    }

    fn chat(db: &Database, owner: Uuid, transcript_id: Option<Uuid>) -> Chat {
        db.repo::<Chat>()
            .create(Chat {
                chat_id: Uuid::new_v4(),
                user_id: owner,
                transcript_id,
                created_at: timestamp_now(),
            })
            .unwrap()
    }

    fn message(chat_id: Uuid, text: &str, created_at: chrono::DateTime<Utc>) -> Message {
        Message {
            message_id: Uuid::new_v4(),
            chat_id,
            sender: Sender::User,
            message_text: text.into(),
            created_at,
        }
    }

    #[test]
    fn user_lookup_by_email() {
        let db = Database::open_in_memory().unwrap();
        let created = user(&db, "a@example.com");

        let found = db.repo::<User>().by_email("a@example.com").unwrap().unwrap();
        assert_eq!(found.user_id, created.user_id);
        assert!(db.repo::<User>().by_email("b@example.com").unwrap().is_none());
    }

    #[test]
    fn history_sorted_by_creation_time() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "a@example.com");
        let c = chat(&db, owner.user_id, None);
        let base = timestamp_now();
        let repo = db.repo::<Message>();

        repo.create(message(c.chat_id, "third", base + Duration::seconds(2))).unwrap();
        repo.create(message(c.chat_id, "first", base)).unwrap();
        repo.create(message(c.chat_id, "second", base + Duration::seconds(1))).unwrap();

        let texts: Vec<String> = repo
            .for_chat(c.chat_id)
            .unwrap()
            .into_iter()
            .map(|m| m.message_text)
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(repo.last_for_chat(c.chat_id).unwrap().unwrap().message_text, "third");
        assert_eq!(repo.count_for_chat(c.chat_id).unwrap(), 3);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "a@example.com");
        let c = chat(&db, owner.user_id, None);
        let at = timestamp_now();
        let repo = db.repo::<Message>();

        for text in ["a", "b", "c"] {
            repo.create(message(c.chat_id, text, at)).unwrap();
        }

        let texts: Vec<String> = repo
            .for_chat(c.chat_id)
            .unwrap()
            .into_iter()
            .map(|m| m.message_text)
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn deleting_chat_cascades_to_messages() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "a@example.com");
        let c = chat(&db, owner.user_id, None);
        db.repo::<Message>().create(message(c.chat_id, "hi", timestamp_now())).unwrap();

        assert!(db.repo::<Chat>().delete(c.chat_id).unwrap());
        assert_eq!(db.repo::<Message>().count_for_chat(c.chat_id).unwrap(), 0);
    }

    #[test]
    fn deleting_transcript_detaches_chats() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "a@example.com");
        let transcript = db
            .repo::<Transcript>()
            .create(Transcript {
                transcript_id: Uuid::new_v4(),
                video_url: "https://youtu.be/x".into(),
                transcript_text: Some("text".into()),
                language: Some("en".into()),
                duration: None,
                created_at: timestamp_now(),
            })
            .unwrap();
        let c = chat(&db, owner.user_id, Some(transcript.transcript_id));
        assert_eq!(db.repo::<Chat>().by_transcript(transcript.transcript_id).unwrap().len(), 1);

        assert!(db.repo::<Transcript>().delete(transcript.transcript_id).unwrap());
        let reloaded = db.repo::<Chat>().get(c.chat_id).unwrap().unwrap();
        assert_eq!(reloaded.transcript_id, None);
    }

    #[test]
    fn chats_listed_per_owner() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice@example.com");
        let bob = user(&db, "bob@example.com");
        chat(&db, alice.user_id, None);
        chat(&db, alice.user_id, None);
        chat(&db, bob.user_id, None);

        assert_eq!(db.repo::<Chat>().by_owner(alice.user_id).unwrap().len(), 2);
        assert_eq!(db.repo::<Chat>().by_owner(bob.user_id).unwrap().len(), 1);
    }
}
