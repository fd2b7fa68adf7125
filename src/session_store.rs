use chrono::Utc;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::api_client::ApiClient;
use crate::errors::ClientError;
use crate::models::{Credentials, Identity, PersistedIdentity, SignupForm, UserRecord};

/// Owner of the authenticated identity and its durable slot.
///
/// The slot is one JSON file holding the whole identity; every write replaces
/// the file via temp-file + rename so a reader never observes a torn record.
/// This store is the single writer — it is created once by the application
/// root and passed down explicitly, never reached through a global.
#[derive(Debug)]
pub struct SessionStore {
    client: ApiClient,
    path: PathBuf,
    identity: Identity,
}

impl SessionStore {
    /// Open the store, restoring the identity from `path`. A missing or
    /// corrupt slot means "logged out", never an error.
    pub fn open(client: ApiClient, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let identity = restore(&path);
        if identity.is_authenticated() {
            info!(path = %path.display(), "restored authenticated session");
        } else {
            debug!(path = %path.display(), "no stored session, starting logged out");
        }
        Self {
            client,
            path,
            identity,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn token(&self) -> Option<&str> {
        self.identity.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_authenticated()
    }

    /// Register a new account and adopt the returned identity. The raw
    /// response is handed back so the caller can show whatever else it holds.
    pub async fn signup(&mut self, form: &SignupForm) -> Result<Value, ClientError> {
        let body = serde_json::to_value(form)
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        let response = self.client.post("/api/signup", None, Some(&body)).await?;
        self.adopt(&response)?;
        info!(email = %form.email, authenticated = self.is_authenticated(), "signup completed");
        Ok(response)
    }

    /// Log in and adopt the returned identity.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<Value, ClientError> {
        let body = serde_json::to_value(credentials)
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        let response = self.client.post("/api/login", None, Some(&body)).await?;
        self.adopt(&response)?;
        info!(email = %credentials.email, authenticated = self.is_authenticated(), "login completed");
        Ok(response)
    }

    /// Tell the backend goodbye (best effort) and clear the local session.
    /// A failing logout request is logged and swallowed; the in-memory
    /// identity clears regardless, even when the slot write then fails.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        if let Some(token) = self.identity.token.clone() {
            if let Err(err) = self.client.post("/api/logout", Some(token.as_str()), None).await {
                warn!(error = %err, "logout request failed, clearing local session anyway");
            }
        }
        // Memory first on this path: the token must not stay live in the
        // process because the disk write failed.
        self.identity = Identity::anonymous();
        self.write_slot(&Identity::anonymous())?;
        info!("session cleared");
        Ok(())
    }

    /// Pull `{user, token}` out of an auth response, tolerating missing or
    /// oddly shaped fields, and persist the result.
    fn adopt(&mut self, response: &Value) -> Result<(), ClientError> {
        let token = response
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let user = response
            .get("user")
            .filter(|u| u.is_object())
            .and_then(|u| match serde_json::from_value::<UserRecord>(u.clone()) {
                Ok(user) => Some(user),
                Err(err) => {
                    warn!(error = %err, "auth response user record has an unexpected shape");
                    None
                }
            });

        // No token means no session; a user without a token is dropped.
        let identity = match token {
            Some(token) => Identity::authenticated(user, token),
            None => {
                warn!("auth response carried no token, staying logged out");
                Identity::anonymous()
            }
        };
        self.replace(identity)
    }

    /// Whole-object replace: disk first, then memory, so a failed write never
    /// upgrades the in-memory identity without a durable copy.
    fn replace(&mut self, identity: Identity) -> Result<(), ClientError> {
        self.write_slot(&identity)?;
        self.identity = identity;
        Ok(())
    }

    fn write_slot(&self, identity: &Identity) -> Result<(), ClientError> {
        let record = PersistedIdentity {
            user: identity.user.clone(),
            token: identity.token.clone(),
            saved_at: Utc::now(),
        };
        let raw = serde_json::to_string_pretty(&record)
            .map_err(|e| ClientError::Storage(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Read the slot back into an identity. Corruption downgrades to anonymous.
fn restore(path: &Path) -> Identity {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Identity::anonymous(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not read stored session, starting logged out");
            return Identity::anonymous();
        }
    };
    match serde_json::from_str::<PersistedIdentity>(&raw) {
        Ok(record) => {
            let token = record.token.filter(|t| !t.is_empty());
            match token {
                Some(token) => Identity::authenticated(record.user, token),
                // A stored user without a token is stale; drop it too.
                None => Identity::anonymous(),
            }
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "stored session is corrupt, starting logged out");
            Identity::anonymous()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new("http://localhost:0", None).unwrap()
    }

    #[test]
    fn test_missing_slot_restores_anonymous() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(client(), dir.path().join("session.json"));
        assert!(!store.is_authenticated());
        assert!(store.identity().user.is_none());
    }

    #[test]
    fn test_corrupt_slot_restores_anonymous_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json at all").unwrap();

        let store = SessionStore::open(client(), &path);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_stored_user_without_token_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(
            &path,
            serde_json::json!({
                "user": {"email": "ada@example.com"},
                "token": null,
                "saved_at": "2026-08-01T00:00:00Z"
            })
            .to_string(),
        )
        .unwrap();

        let store = SessionStore::open(client(), &path);
        assert!(!store.is_authenticated());
        assert!(store.identity().user.is_none());
    }

    #[test]
    fn test_replace_round_trips_through_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut store = SessionStore::open(client(), &path);
        store
            .replace(Identity::authenticated(
                Some(UserRecord {
                    email: Some("ada@example.com".to_string()),
                    ..Default::default()
                }),
                "tok-1".to_string(),
            ))
            .unwrap();
        assert!(store.is_authenticated());

        // Re-open from disk: identity survives the restart.
        let reopened = SessionStore::open(client(), &path);
        assert!(reopened.is_authenticated());
        assert_eq!(reopened.token(), Some("tok-1"));
        assert_eq!(
            reopened
                .identity()
                .user
                .as_ref()
                .and_then(|u| u.email.as_deref()),
            Some("ada@example.com")
        );
    }

    #[tokio::test]
    async fn test_logout_clears_memory_even_when_the_slot_write_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut store = SessionStore::open(client(), &path);
        store
            .replace(Identity::authenticated(None, "tok-1".to_string()))
            .unwrap();
        assert!(store.is_authenticated());

        // Occupy the temp-file name with a directory so the slot write fails.
        fs::create_dir(path.with_extension("tmp")).unwrap();

        let result = store.logout().await;
        assert!(result.is_err());
        assert!(!store.is_authenticated());
        assert!(store.identity().user.is_none());
    }

    #[test]
    fn test_adopt_without_token_clears_user() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SessionStore::open(client(), dir.path().join("session.json"));
        store
            .adopt(&serde_json::json!({"user": {"email": "ada@example.com"}}))
            .unwrap();
        assert!(!store.is_authenticated());
        assert!(store.identity().user.is_none());
    }
}
