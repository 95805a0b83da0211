use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::core::config::{parse_admins, parse_users};
use crate::core::error::{ConfigError, Error};
use crate::types::user::ADMIN_CLAIM;
use crate::types::{AuthorizedUser, Username};

/// Read-only credential store, seeded once at startup.
#[derive(Clone)]
pub struct UserController {
    users: Arc<HashMap<Username, AuthorizedUser>>,
    // verified against on unknown usernames so both miss paths cost one bcrypt run
    decoy_hash: Arc<str>,
}

impl std::fmt::Debug for UserController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserController")
            .field("users", &self.users.len())
            .finish()
    }
}

impl UserController {
    /// Builds the store from `name:password` pairs, granting the admin claim
    /// to every name listed in `admins`.
    pub fn seed(users: &str, admins: &str, bcrypt_cost: u32) -> Result<Self, ConfigError> {
        let username_pattern = Regex::new(r"^[a-zA-Z0-9_-]{3,20}$")?;
        let admins = parse_admins(admins);
        let mut seeded = HashMap::new();

        for (index, (username, password)) in parse_users(users)?.into_iter().enumerate() {
            if !username_pattern.is_match(&username) {
                return Err(ConfigError::InvalidUser(format!("invalid username {username:?}")));
            }

            if seeded.contains_key(&username) {
                return Err(ConfigError::InvalidUser(format!("duplicate username {username:?}")));
            }

            let claims = if admins.contains(&username) {
                vec![ADMIN_CLAIM.to_string()]
            } else {
                Vec::new()
            };

            let user = AuthorizedUser {
                id: index as i32 + 1,
                email: format!("{username}@example.com"),
                full_name: format!("{} User", capitalize(&username)),
                password_hash: bcrypt::hash(&password, bcrypt_cost)?,
                username: username.clone(),
                claims,
            };

            seeded.insert(username, user);
        }

        tracing::debug!(users = seeded.len(), "seeded credential store");

        Ok(Self {
            users: Arc::new(seeded),
            decoy_hash: bcrypt::hash(Uuid::new_v4().simple().to_string(), bcrypt_cost)?.into(),
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Option<AuthorizedUser> {
        self.users.get(username).cloned()
    }

    pub fn usernames(&self) -> Vec<Username> {
        let mut names: Vec<_> = self.users.keys().cloned().collect();
        names.sort();
        names
    }

    /// Unknown users and wrong passwords both come back as
    /// [`Error::LoginFailed`].
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthorizedUser, Error> {
        let user = self.get_user_by_username(username);

        let password = password.to_owned();
        let hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.decoy_hash.to_string(),
        };

        // keep bcrypt off the async workers
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| {
                tracing::error!("password verification task failed: {:?}", e);
                Error::Internal
            })??;

        match user {
            Some(user) if verified => Ok(user),
            _ => Err(Error::LoginFailed),
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> UserController {
        UserController::seed("student:password123,teacher:secret456", "teacher", 4).unwrap()
    }

    #[tokio::test]
    async fn login_accepts_correct_password() {
        let user = users().login("student", "password123").await.unwrap();

        assert_eq!(user.username, "student");
        assert_eq!(user.full_name, "Student User");
        assert_eq!(user.email, "student@example.com");
        assert!(!user.is_admin());
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_look_the_same() {
        let users = users();

        let wrong_password = users.login("student", "nope").await.unwrap_err();
        let unknown = users.login("nobody", "password123").await.unwrap_err();

        assert!(matches!(wrong_password, Error::LoginFailed));
        assert!(matches!(unknown, Error::LoginFailed));
        assert_eq!(wrong_password.to_string(), unknown.to_string());
    }

    #[test]
    fn decoy_hash_uses_the_configured_cost() {
        let users = users();

        assert!(users.decoy_hash.starts_with("$2b$04$"));
        assert!(!bcrypt::verify("", &users.decoy_hash).unwrap());
    }

    #[tokio::test]
    async fn unknown_user_still_pays_for_a_bcrypt_check() {
        let users = UserController::seed("student:password123", "", 10).unwrap();

        let started = std::time::Instant::now();
        let known = users.login("student", "wrong").await.unwrap_err();
        let known_elapsed = started.elapsed();

        let started = std::time::Instant::now();
        let unknown = users.login("nobody", "wrong").await.unwrap_err();
        let unknown_elapsed = started.elapsed();

        assert!(matches!(known, Error::LoginFailed));
        assert!(matches!(unknown, Error::LoginFailed));
        // a cost-10 verify takes tens of milliseconds; a bare map lookup does not
        assert!(unknown_elapsed * 4 > known_elapsed);
    }

    #[test]
    fn admins_get_the_admin_claim() {
        let users = users();

        assert!(users.get_user_by_username("teacher").unwrap().is_admin());
        assert_eq!(users.usernames(), vec!["student", "teacher"]);
    }

    #[test]
    fn passwords_are_stored_hashed() {
        let user = users().get_user_by_username("student").unwrap();

        assert_ne!(user.password_hash, "password123");
        assert!(bcrypt::verify("password123", &user.password_hash).unwrap());
    }

    #[test]
    fn invalid_or_duplicate_usernames_are_rejected() {
        assert!(matches!(
            UserController::seed("a b:pw", "", 4),
            Err(ConfigError::InvalidUser(_))
        ));
        assert!(matches!(
            UserController::seed("alice:pw,alice:other", "", 4),
            Err(ConfigError::InvalidUser(_))
        ));
    }
}
