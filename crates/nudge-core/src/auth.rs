//! Account authentication and sessions
//!
//! `Accounts` keeps accounts in the nudge database. Passwords are stored as
//! Argon2 PHC strings; session tokens are random UUIDs handed to the client,
//! and only their SHA-256 digest is written to disk.
//!
//! Anything that needs to know who is signed in takes a `&dyn SessionProvider`
//! instead of reaching for global state.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::Session;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Source of the current user's identity
pub trait SessionProvider: Send + Sync {
    fn current_user_id(&self) -> Option<i64>;
}

impl SessionProvider for Session {
    fn current_user_id(&self) -> Option<i64> {
        Some(self.user_id)
    }
}

impl SessionProvider for Option<Session> {
    fn current_user_id(&self) -> Option<i64> {
        self.as_ref().map(|s| s.user_id)
    }
}

/// SHA-256 hex digest of a session token
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(Error::Auth("Email is required".into()));
    }
    if !email.contains('@') {
        return Err(Error::Auth(format!("'{}' is not a valid email address", email)));
    }
    Ok(email)
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
        .map_err(|e| Error::Auth(format!("Failed to create salt: {}", e)))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Auth(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Unreadable password hash: {}", e);
            false
        }
    }
}

/// Stateless account operations
///
/// Every call stands alone, so one instance can serve many users at once
/// (the REST server). Single-user front ends wrap it in `LocalAuth`.
#[derive(Clone)]
pub struct Accounts {
    db: Database,
}

impl Accounts {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create an account and issue a session for it
    pub fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::Auth(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.db.get_user_credentials(&email)?.is_some() {
            return Err(Error::Auth("An account with this email already exists".into()));
        }

        let user = self.db.create_user(&email, &hash_password(password)?)?;
        info!(user_id = user.id, "Account created");
        self.issue_session(user.id, user.email)
    }

    /// Check email and password and issue a session
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(Error::Auth("Password is required".into()));
        }

        let (user, stored) = self
            .db
            .get_user_credentials(&email)?
            .ok_or_else(|| Error::Auth("Invalid email or password".into()))?;

        if !verify_password(password, &stored) {
            warn!(user_id = user.id, "Failed sign-in attempt");
            return Err(Error::Auth("Invalid email or password".into()));
        }

        self.issue_session(user.id, user.email)
    }

    fn issue_session(&self, user_id: i64, email: String) -> Result<Session> {
        let token = uuid::Uuid::new_v4().to_string();
        self.db.create_session(user_id, &token_digest(&token))?;
        info!(user_id, "Session issued");
        Ok(Session {
            user_id,
            email,
            token,
        })
    }

    /// Look up the session for a token
    pub fn authenticate(&self, token: &str) -> Result<Option<Session>> {
        let user = self.db.get_session_user(&token_digest(token))?;
        Ok(user.map(|u| Session {
            user_id: u.id,
            email: u.email,
            token: token.to_string(),
        }))
    }

    /// Invalidate a token; false if it was unknown
    pub fn revoke(&self, token: &str) -> Result<bool> {
        self.db.delete_session(&token_digest(token))
    }
}

/// Single-user auth service
///
/// Holds the "current" session for front ends such as the CLI and
/// broadcasts every change to subscribers.
pub struct LocalAuth {
    accounts: Accounts,
    current: watch::Sender<Option<Session>>,
}

impl LocalAuth {
    pub fn new(db: Database) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            accounts: Accounts::new(db),
            current,
        }
    }

    /// Create an account and sign it in
    pub fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.accounts.sign_up(email, password)?;
        Ok(self.make_current(session))
    }

    /// Sign in with email and password
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.accounts.sign_in(email, password)?;
        Ok(self.make_current(session))
    }

    fn make_current(&self, session: Session) -> Session {
        self.current.send_replace(Some(session.clone()));
        info!(user_id = session.user_id, "Signed in");
        session
    }

    /// End the current session
    pub fn sign_out(&self) -> Result<()> {
        if let Some(session) = self.current.send_replace(None) {
            self.accounts.revoke(&session.token)?;
            info!(user_id = session.user_id, "Signed out");
        }
        Ok(())
    }

    /// Invalidate a token, clearing the current session if it matches
    pub fn revoke(&self, token: &str) -> Result<bool> {
        let revoked = self.accounts.revoke(token)?;
        if self
            .current
            .borrow()
            .as_ref()
            .is_some_and(|s| s.token == token)
        {
            self.current.send_replace(None);
        }
        Ok(revoked)
    }

    /// Look up the session for a token without making it current
    pub fn authenticate(&self, token: &str) -> Result<Option<Session>> {
        self.accounts.authenticate(token)
    }

    /// Resume a previously issued session and make it current
    pub fn restore(&self, token: &str) -> Result<Option<Session>> {
        let session = self.accounts.authenticate(token)?;
        if session.is_some() {
            self.current.send_replace(session.clone());
        }
        Ok(session)
    }

    pub fn current_session(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    /// Receive every session change (sign-in, sign-out, restore)
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }
}

impl SessionProvider for LocalAuth {
    fn current_user_id(&self) -> Option<i64> {
        self.current.borrow().as_ref().map(|s| s.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> LocalAuth {
        LocalAuth::new(Database::in_memory().unwrap())
    }

    #[test]
    fn test_sign_up_and_sign_in() {
        let auth = auth();
        let session = auth.sign_up("  Alex@Example.com ", "secret1").unwrap();
        assert_eq!(session.email, "alex@example.com");
        assert_eq!(auth.current_user_id(), Some(session.user_id));

        auth.sign_out().unwrap();
        assert!(auth.current_session().is_none());

        let again = auth.sign_in("alex@example.com", "secret1").unwrap();
        assert_eq!(again.user_id, session.user_id);
        assert_ne!(again.token, session.token);
    }

    #[test]
    fn test_sign_up_validation() {
        let auth = auth();
        assert!(matches!(auth.sign_up("", "secret1"), Err(Error::Auth(_))));
        assert!(matches!(auth.sign_up("not-an-email", "secret1"), Err(Error::Auth(_))));
        assert!(matches!(auth.sign_up("a@example.com", "12345"), Err(Error::Auth(_))));

        auth.sign_up("a@example.com", "secret1").unwrap();
        assert!(matches!(
            auth.sign_up("A@example.com", "secret2"),
            Err(Error::Auth(_))
        ));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let auth = auth();
        auth.sign_up("a@example.com", "secret1").unwrap();
        auth.sign_out().unwrap();

        assert!(matches!(auth.sign_in("a@example.com", "wrong!!"), Err(Error::Auth(_))));
        assert!(matches!(auth.sign_in("nobody@example.com", "secret1"), Err(Error::Auth(_))));
        assert!(auth.current_session().is_none());
    }

    #[test]
    fn test_restore_and_revoke() {
        let auth = auth();
        let session = auth.sign_up("a@example.com", "secret1").unwrap();

        let other = LocalAuth::new(auth.accounts.db.clone());
        let restored = other.restore(&session.token).unwrap().unwrap();
        assert_eq!(restored.user_id, session.user_id);
        assert_eq!(other.current_user_id(), Some(session.user_id));

        assert!(other.restore("bogus-token").unwrap().is_none());

        assert!(auth.revoke(&session.token).unwrap());
        assert!(auth.current_session().is_none());
        assert!(other.authenticate(&session.token).unwrap().is_none());
    }

    #[test]
    fn test_token_stored_only_as_digest() {
        let auth = auth();
        let session = auth.sign_up("a@example.com", "secret1").unwrap();

        let conn = auth.accounts.db.conn().unwrap();
        let stored: String = conn
            .query_row("SELECT token_hash FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_ne!(stored, session.token);
        assert_eq!(stored, token_digest(&session.token));
        assert_eq!(stored.len(), 64);
    }

    #[tokio::test]
    async fn test_subscribers_see_session_changes() {
        let auth = auth();
        let mut rx = auth.subscribe();
        assert!(rx.borrow().is_none());

        let session = auth.sign_up("a@example.com", "secret1").unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref(), Some(&session));

        auth.sign_out().unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }

    #[test]
    fn test_accounts_keep_no_current_user() {
        let accounts = Accounts::new(Database::in_memory().unwrap());
        let alex = accounts.sign_up("alex@example.com", "secret1").unwrap();
        let sam = accounts.sign_up("sam@example.com", "secret2").unwrap();
        let alex_again = accounts.sign_in("alex@example.com", "secret1").unwrap();

        let user_of = |token: &str| accounts.authenticate(token).unwrap().map(|s| s.user_id);
        assert_eq!(user_of(&alex.token), Some(alex.user_id));
        assert_eq!(user_of(&sam.token), Some(sam.user_id));
        assert_eq!(user_of(&alex_again.token), Some(alex.user_id));

        assert!(accounts.revoke(&alex.token).unwrap());
        assert!(!accounts.revoke(&alex.token).unwrap());
        assert_eq!(user_of(&alex.token), None);
        assert_eq!(user_of(&alex_again.token), Some(alex.user_id));
        assert_eq!(user_of(&sam.token), Some(sam.user_id));
    }

    #[test]
    fn test_option_session_provider() {
        let none: Option<Session> = None;
        assert_eq!(none.current_user_id(), None);
        let some = Some(Session {
            user_id: 3,
            email: "x@example.com".into(),
            token: "t".into(),
        });
        assert_eq!(some.current_user_id(), Some(3));
    }
}
