//! Typed access to the users and requests collections
//!
//! Each collection is one JSON array document. Loading returns the whole
//! array; saving replaces it.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::models::{Request, User};
use crate::store::{DocumentStore, WriteOutcome};

pub use config::settings::{DEFAULT_REQUESTS_PATH, DEFAULT_USERS_PATH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Users,
    Requests,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 2] = [CollectionKind::Users, CollectionKind::Requests];

    pub fn name(&self) -> &'static str {
        match self {
            CollectionKind::Users => "users",
            CollectionKind::Requests => "requests",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The two collections over a shared document store
#[derive(Clone)]
pub struct Collections {
    store: Arc<dyn DocumentStore>,
    users_path: String,
    requests_path: String,
}

impl Collections {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        users_path: impl Into<String>,
        requests_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            users_path: users_path.into(),
            requests_path: requests_path.into(),
        }
    }

    pub fn with_default_paths(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(store, DEFAULT_USERS_PATH, DEFAULT_REQUESTS_PATH)
    }

    pub fn from_settings(store: Arc<dyn DocumentStore>, settings: &config::Settings) -> Self {
        Self::new(store, settings.users_path.clone(), settings.requests_path.clone())
    }

    pub fn path(&self, kind: CollectionKind) -> &str {
        match kind {
            CollectionKind::Users => &self.users_path,
            CollectionKind::Requests => &self.requests_path,
        }
    }

    async fn load<T: DeserializeOwned>(&self, kind: CollectionKind) -> StoreResult<Vec<T>> {
        let path = self.path(kind);
        let document = self.store.read(path).await?;
        serde_json::from_value(document).map_err(|e| {
            tracing::error!("{} collection at {} is malformed: {}", kind, path, e);
            StoreError::decode(path, e)
        })
    }

    async fn save<T: Serialize>(
        &self,
        kind: CollectionKind,
        records: &[T],
        message: &str,
    ) -> StoreResult<WriteOutcome> {
        let path = self.path(kind);
        let document = serde_json::to_value(records).map_err(|e| StoreError::decode(path, e))?;
        self.store.write(path, &document, message).await
    }

    pub async fn load_users(&self) -> StoreResult<Vec<User>> {
        self.load(CollectionKind::Users).await
    }

    pub async fn save_users(&self, users: &[User], message: &str) -> StoreResult<WriteOutcome> {
        self.save(CollectionKind::Users, users, message).await
    }

    pub async fn load_requests(&self) -> StoreResult<Vec<Request>> {
        self.load(CollectionKind::Requests).await
    }

    pub async fn save_requests(
        &self,
        requests: &[Request],
        message: &str,
    ) -> StoreResult<WriteOutcome> {
        self.save(CollectionKind::Requests, requests, message).await
    }

    /// Create an empty collection document if none exists.
    /// Returns the write outcome, or `None` when the document was already there.
    pub async fn ensure(&self, kind: CollectionKind) -> StoreResult<Option<WriteOutcome>> {
        let path = self.path(kind);
        if self.store.version(path).await?.is_some() {
            return Ok(None);
        }

        tracing::info!("Creating empty {} collection at {}", kind, path);
        let message = format!("Initialize {} collection", kind);
        let outcome = self
            .store
            .write(path, &Value::Array(Vec::new()), &message)
            .await?;
        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocumentStore;
    use crate::models::Role;
    use chrono::NaiveDate;
    use serde_json::json;

    fn user(email: &str) -> User {
        User::new(
            email,
            &"00".repeat(32),
            Role::Client,
            NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_save_then_load_preserves_order() {
        let store = Arc::new(MemoryDocumentStore::new());
        let collections = Collections::with_default_paths(store.clone());
        let users = vec![user("b@x.com"), user("a@x.com"), user("c@x.com")];

        collections.save_users(&users, "bulk").await.unwrap();
        assert_eq!(collections.load_users().await.unwrap(), users);
    }

    #[tokio::test]
    async fn test_load_rejects_wrong_shape() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.seed(DEFAULT_USERS_PATH, json!({"users": []}));
        let collections = Collections::with_default_paths(store);

        assert!(matches!(
            collections.load_users().await,
            Err(StoreError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_collection_is_not_empty() {
        let collections = Collections::with_default_paths(Arc::new(MemoryDocumentStore::new()));
        assert_eq!(
            collections.load_requests().await,
            Err(StoreError::NotFound(DEFAULT_REQUESTS_PATH.to_string()))
        );
    }

    #[tokio::test]
    async fn test_ensure_creates_only_missing() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.seed(DEFAULT_USERS_PATH, json!([{"email": "keep@x.com"}]));
        let collections = Collections::with_default_paths(store.clone());

        for kind in CollectionKind::ALL {
            collections.ensure(kind).await.unwrap();
        }

        assert_eq!(
            store.document(DEFAULT_USERS_PATH),
            Some(json!([{"email": "keep@x.com"}]))
        );
        assert_eq!(store.document(DEFAULT_REQUESTS_PATH), Some(json!([])));

        let changes = store.changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].message, "Initialize requests collection");
    }

    #[tokio::test]
    async fn test_custom_paths() {
        let store = Arc::new(MemoryDocumentStore::new());
        let settings = config::Settings {
            users_path: "data/u.json".to_string(),
            requests_path: "data/r.json".to_string(),
            ..config::Settings::default()
        };
        let collections = Collections::from_settings(store.clone(), &settings);
        assert_eq!(collections.path(CollectionKind::Users), "data/u.json");

        collections.save_requests(&[], "empty").await.unwrap();
        assert_eq!(store.document("data/r.json"), Some(json!([])));
    }
}
