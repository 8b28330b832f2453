//! RivalScope Auth — verifies dashboard users against the login collection.
//!
//! Users are documents with `email`, `password`, `status`, `name`, `role`
//! and `clientId`. Stored passwords are either bcrypt hashes (`$2...`) or,
//! for legacy accounts, plain text.

use chrono::Utc;
use rivalscope_core::{Error, Result, RivalScopeConfig};
use rivalscope_store::{Collection, Document, DocumentStore, Fields, Filter};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// bcrypt work factor for newly hashed passwords.
pub const HASH_COST: u32 = 12;

const ACTIVE: &str = "active";

/// Profile returned for a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Option<String>,
    #[serde(rename = "clientId")]
    pub client_id: Option<Value>,
}

impl AuthenticatedUser {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.to_hex(),
            email: doc.get_str("email").unwrap_or_default().to_string(),
            name: doc.get_str("name").map(str::to_string),
            role: doc.get_str("role").map(str::to_string),
            client_id: doc.get("clientId").cloned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailure {
    /// Unknown or inactive user, or wrong password.
    InvalidCredentials,
    /// No login collection configured.
    Configuration,
    /// The store or the password check failed.
    Failed,
}

impl AuthFailure {
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Invalid credentials",
            Self::Configuration => "Configuration error",
            Self::Failed => "Authentication failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuthOutcome {
    Success { user: AuthenticatedUser },
    Failure { reason: AuthFailure, message: String },
}

impl AuthOutcome {
    fn failure(reason: AuthFailure) -> Self {
        Self::Failure {
            reason,
            message: reason.message().to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Credential check used by the operator surface.
pub trait Authenticator: Send + Sync {
    /// Never fails: every problem is reported as an `AuthOutcome::Failure`.
    fn authenticate(&self, email: &str, password: &str) -> AuthOutcome;
}

/// Authenticates against user documents in a [`DocumentStore`].
pub struct StoreAuthenticator<'a> {
    store: &'a dyn DocumentStore,
    collection: Option<&'a str>,
}

impl<'a> StoreAuthenticator<'a> {
    pub fn new(store: &'a dyn DocumentStore, collection: Option<&'a str>) -> Self {
        Self { store, collection }
    }

    pub fn from_config(store: &'a dyn DocumentStore, config: &'a RivalScopeConfig) -> Self {
        Self::new(store, config.login_collection.as_deref())
    }

    fn try_authenticate(&self, users: Collection<'_>, email: &str, password: &str) -> Result<AuthOutcome> {
        let active = Filter::and(vec![Filter::eq("email", email), Filter::eq("status", ACTIVE)]);
        let user = match users.find_one(&active)? {
            Some(user) => user,
            None => {
                let status = users
                    .find_one(&Filter::eq("email", email))?
                    .map(|u| u.get_str("status").unwrap_or("none").to_string());
                debug!("No active user {} (status={:?})", email, status);
                return Ok(AuthOutcome::failure(AuthFailure::InvalidCredentials));
            }
        };

        let stored = user.get_str("password").unwrap_or_default();
        if !verify_password(password, stored)? {
            debug!("Wrong password for {}", email);
            return Ok(AuthOutcome::failure(AuthFailure::InvalidCredentials));
        }

        let mut updates = Fields::new();
        updates.insert("last_login".to_string(), Value::String(Utc::now().to_rfc3339()));
        if let Err(e) = users.set_fields(user.id, &updates) {
            warn!("Failed to record last login for {}: {}", email, e);
        }

        Ok(AuthOutcome::Success {
            user: AuthenticatedUser::from_document(&user),
        })
    }
}

impl Authenticator for StoreAuthenticator<'_> {
    fn authenticate(&self, email: &str, password: &str) -> AuthOutcome {
        let Some(name) = self.collection else {
            error!("COLLECTION_NAME_LOGIN is not set; authentication disabled");
            return AuthOutcome::failure(AuthFailure::Configuration);
        };

        let email = email.trim().to_lowercase();
        let users = Collection::new(self.store, name);
        match self.try_authenticate(users, &email, password) {
            Ok(outcome) => {
                info!("Login for {} in {}: {}", email, name, outcome.is_success());
                outcome
            }
            Err(e) => {
                error!("Authentication error for {}: {}", email, e);
                AuthOutcome::failure(AuthFailure::Failed)
            }
        }
    }
}

/// Check `password` against a stored value: bcrypt when it looks like a
/// bcrypt hash, plain comparison otherwise.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    if stored.starts_with("$2") {
        bcrypt::verify(password, stored).map_err(|e| Error::Auth(e.to_string()))
    } else {
        Ok(!stored.is_empty() && password == stored)
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    hash_password_with_cost(password, HASH_COST)
}

pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost).map_err(|e| Error::Auth(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivalscope_core::ObjectId;
    use rivalscope_store::SqliteStore;
    use serde_json::json;

    const USERS: &str = "users";

    fn add_user(store: &SqliteStore, body: Value) -> ObjectId {
        let doc = Document::new(body.as_object().cloned().unwrap());
        store.insert(USERS, &doc).unwrap();
        doc.id
    }

    #[test]
    fn test_plain_password() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = add_user(
            &store,
            json!({"email": "ana@example.com", "password": "hunter2", "status": "active",
                   "name": "Ana", "role": "admin", "clientId": "c-1"}),
        );
        let auth = StoreAuthenticator::new(&store, Some(USERS));

        match auth.authenticate("  Ana@Example.com", "hunter2") {
            AuthOutcome::Success { user } => {
                assert_eq!(user.id, id.to_hex());
                assert_eq!(user.name.as_deref(), Some("Ana"));
                assert_eq!(user.role.as_deref(), Some("admin"));
                assert_eq!(user.client_id, Some(json!("c-1")));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let stored = Collection::new(&store, USERS)
            .find_one(&Filter::IdEq(id))
            .unwrap()
            .unwrap();
        assert!(stored.get_str("last_login").is_some());

        assert_eq!(
            auth.authenticate("ana@example.com", "wrong"),
            AuthOutcome::failure(AuthFailure::InvalidCredentials)
        );
    }

    #[test]
    fn test_bcrypt_password() {
        let store = SqliteStore::open_in_memory().unwrap();
        let hash = hash_password_with_cost("s3cret", 4).unwrap();
        assert!(hash.starts_with("$2"));
        add_user(
            &store,
            json!({"email": "bo@example.com", "password": hash, "status": "active"}),
        );
        let auth = StoreAuthenticator::new(&store, Some(USERS));
        assert!(auth.authenticate("bo@example.com", "s3cret").is_success());
        assert!(!auth.authenticate("bo@example.com", "S3cret").is_success());
    }

    #[test]
    fn test_inactive_user_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        add_user(
            &store,
            json!({"email": "cy@example.com", "password": "pw", "status": "disabled"}),
        );
        let auth = StoreAuthenticator::new(&store, Some(USERS));
        assert_eq!(
            auth.authenticate("cy@example.com", "pw"),
            AuthOutcome::failure(AuthFailure::InvalidCredentials)
        );
    }

    #[test]
    fn test_missing_login_collection() {
        let store = SqliteStore::open_in_memory().unwrap();
        let auth = StoreAuthenticator::new(&store, None);
        assert_eq!(
            auth.authenticate("ana@example.com", "pw"),
            AuthOutcome::failure(AuthFailure::Configuration)
        );
    }

    #[test]
    fn test_verify_password_rules() {
        assert!(verify_password("abc", "abc").unwrap());
        assert!(!verify_password("", "").unwrap());
        assert!(verify_password("abc", "$2b$04$not-a-real-hash").is_err());
    }
}
