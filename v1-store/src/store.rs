//! Whole-document storage seam
//!
//! A `DocumentStore` reads and writes entire JSON documents by path. Writes
//! are conditional on the document's current version tag, so a write racing
//! another writer comes back as `WriteOutcome::Conflict` instead of an error.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreResult;

/// Result of a conditional write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write landed; `version` is the new tag when the store reports one
    Committed { version: Option<String> },
    /// The version tag sent with the write was stale
    Conflict,
}

impl WriteOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, WriteOutcome::Committed { .. })
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read and parse the document at `path`
    async fn read(&self, path: &str) -> StoreResult<Value>;

    /// Current version tag of `path`, `None` if the document does not exist
    async fn version(&self, path: &str) -> StoreResult<Option<String>>;

    /// Replace the document at `path`, recording `message` as the change description.
    ///
    /// Looks up the current version tag first and makes the write conditional
    /// on it; creates the document when there is no tag.
    async fn write(&self, path: &str, document: &Value, message: &str) -> StoreResult<WriteOutcome>;
}
