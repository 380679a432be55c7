use tracing::info;
use uuid::Uuid;

use tubechat_db::{Database, timestamp_now};
use tubechat_types::api::{RegisterRequest, UpdateProfileRequest};
use tubechat_types::models::User;

use crate::credentials::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};

const MIN_PASSWORD_LEN: usize = 8;

pub struct UserService<'a> {
    db: &'a Database,
}

impl<'a> UserService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn register(&self, req: RegisterRequest) -> ApiResult<User> {
        let name = required("Name", &req.name)?;
        let email = validate_email(&req.email)?;
        validate_password(&req.password)?;
        validate_age(req.age)?;
        self.ensure_email_free(&email, None)?;

        let user = User {
            user_id: Uuid::new_v4(),
            name,
            email,
            password_hash: hash_password(&req.password)?,
            age: req.age,
            gender: req.gender,
            birth_date: req.birth_date,
            is_admin: false,
            created_at: timestamp_now(),
        };

        let user = self.db.repo::<User>().create(user)?;
        info!("Registered user {} ({})", user.user_id, user.email);
        Ok(user)
    }

    /// `None` for an unknown email or a wrong password; the caller cannot
    /// tell which.
    pub fn authenticate(&self, email: &str, password: &str) -> ApiResult<Option<User>> {
        let user = self.db.repo::<User>().by_email(email.trim())?;
        Ok(user.filter(|u| verify_password(password, &u.password_hash)))
    }

    pub fn get(&self, user_id: Uuid) -> ApiResult<User> {
        self.db
            .repo::<User>()
            .get(user_id)?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    pub fn update_profile(&self, user_id: Uuid, req: UpdateProfileRequest) -> ApiResult<User> {
        let mut user = self.get(user_id)?;

        if let Some(name) = req.name {
            user.name = required("Name", &name)?;
        }
        if let Some(email) = req.email {
            let email = validate_email(&email)?;
            self.ensure_email_free(&email, Some(user_id))?;
            user.email = email;
        }
        if let Some(password) = req.password {
            validate_password(&password)?;
            user.password_hash = hash_password(&password)?;
        }
        if req.age.is_some() {
            validate_age(req.age)?;
            user.age = req.age;
        }
        if req.gender.is_some() {
            user.gender = req.gender;
        }
        if req.birth_date.is_some() {
            user.birth_date = req.birth_date;
        }

        if !self.db.repo::<User>().update(&user)? {
            return Err(ApiError::not_found("User not found"));
        }
        Ok(user)
    }

    /// Removes the account along with its chats and their messages.
    pub fn delete(&self, user_id: Uuid) -> ApiResult<()> {
        if !self.db.repo::<User>().delete(user_id)? {
            return Err(ApiError::not_found("User not found"));
        }
        info!("Deleted user {}", user_id);
        Ok(())
    }

    /// Creates the admin account unless one with this email already exists.
    pub fn seed_admin(&self, email: &str, password: &str, name: &str) -> ApiResult<User> {
        if let Some(existing) = self.db.repo::<User>().by_email(email.trim())? {
            return Ok(existing);
        }

        let mut user = self.register(RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            age: None,
            gender: None,
            birth_date: None,
        })?;
        user.is_admin = true;
        self.db.repo::<User>().update(&user)?;
        info!("Seeded admin user {}", user.email);
        Ok(user)
    }

    fn ensure_email_free(&self, email: &str, owner: Option<Uuid>) -> ApiResult<()> {
        match self.db.repo::<User>().by_email(email)? {
            Some(other) if Some(other.user_id) != owner => {
                Err(ApiError::validation("Email already registered"))
            }
            _ => Ok(()),
        }
    }
}

fn required(field: &str, value: &str) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

fn validate_email(email: &str) -> ApiResult<String> {
    let email = required("Email", email)?;
    if !email.contains('@') {
        return Err(ApiError::validation("Invalid email address"));
    }
    Ok(email)
}

fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn validate_age(age: Option<i32>) -> ApiResult<()> {
    match age {
        Some(a) if a < 0 => Err(ApiError::validation("Age must not be negative")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use tubechat_types::models::{Chat, Gender};

    use super::*;

    fn request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ada".into(),
            email: email.into(),
            password: "analytical-engine".into(),
            age: Some(36),
            gender: Some(Gender::Female),
            birth_date: None,
        }
    }

    #[test]
    fn register_then_authenticate() {
        let db = Database::open_in_memory().unwrap();
        let users = UserService::new(&db);

        let user = users.register(request("ada@example.com")).unwrap();
        assert!(!user.is_admin);
        assert_ne!(user.password_hash, "analytical-engine");

        let found = users.authenticate("ada@example.com", "analytical-engine").unwrap();
        assert_eq!(found.unwrap().user_id, user.user_id);
        assert!(users.authenticate("ada@example.com", "wrong-password").unwrap().is_none());
        assert!(users.authenticate("nobody@example.com", "analytical-engine").unwrap().is_none());
    }

    #[test]
    fn register_validation() {
        let db = Database::open_in_memory().unwrap();
        let users = UserService::new(&db);

        let mut req = request("ada@example.com");
        req.name = "   ".into();
        assert!(matches!(users.register(req), Err(ApiError::Validation(_))));

        assert!(matches!(users.register(request("no-at-sign")), Err(ApiError::Validation(_))));

        let mut req = request("ada@example.com");
        req.password = "short".into();
        assert!(matches!(users.register(req), Err(ApiError::Validation(_))));

        let mut req = request("ada@example.com");
        req.age = Some(-1);
        assert!(matches!(users.register(req), Err(ApiError::Validation(_))));

        assert!(db.repo::<User>().by_email("ada@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_rejected() {
        let db = Database::open_in_memory().unwrap();
        let users = UserService::new(&db);

        users.register(request("ada@example.com")).unwrap();
        let err = users.register(request("ada@example.com")).unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[test]
    fn partial_update_touches_only_given_fields() {
        let db = Database::open_in_memory().unwrap();
        let users = UserService::new(&db);
        let user = users.register(request("ada@example.com")).unwrap();

        let updated = users
            .update_profile(
                user.user_id,
                UpdateProfileRequest {
                    name: Some("Ada Lovelace".into()),
                    password: Some("difference-engine".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Ada Lovelace");
        assert_eq!(updated.email, "ada@example.com");
        assert_eq!(updated.age, Some(36));

        assert!(users.authenticate("ada@example.com", "difference-engine").unwrap().is_some());
        assert!(users.authenticate("ada@example.com", "analytical-engine").unwrap().is_none());
    }

    #[test]
    fn update_to_taken_email_rejected() {
        let db = Database::open_in_memory().unwrap();
        let users = UserService::new(&db);
        let ada = users.register(request("ada@example.com")).unwrap();
        users.register(request("charles@example.com")).unwrap();

        let taken = UpdateProfileRequest {
            email: Some("charles@example.com".into()),
            ..Default::default()
        };
        assert!(matches!(users.update_profile(ada.user_id, taken), Err(ApiError::Validation(_))));

        // Re-submitting one's own email is fine.
        let same = UpdateProfileRequest {
            email: Some("ada@example.com".into()),
            ..Default::default()
        };
        assert!(users.update_profile(ada.user_id, same).is_ok());
    }

    #[test]
    fn delete_cascades_to_chats() {
        let db = Database::open_in_memory().unwrap();
        let users = UserService::new(&db);
        let user = users.register(request("ada@example.com")).unwrap();
        let chat = db
            .repo::<Chat>()
            .create(Chat {
                chat_id: Uuid::new_v4(),
                user_id: user.user_id,
                transcript_id: None,
                created_at: timestamp_now(),
            })
            .unwrap();

        users.delete(user.user_id).unwrap();
        assert!(db.repo::<Chat>().get(chat.chat_id).unwrap().is_none());
        assert!(matches!(users.get(user.user_id), Err(ApiError::NotFound(_))));
        assert!(matches!(users.delete(user.user_id), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn seed_admin_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let users = UserService::new(&db);

        let first = users.seed_admin("root@example.com", "hunter2hunter2", "Admin").unwrap();
        let second = users.seed_admin("root@example.com", "other-password", "Admin").unwrap();

        assert!(first.is_admin);
        assert_eq!(first.user_id, second.user_id);
        assert!(users.get(first.user_id).unwrap().is_admin);
    }
}
