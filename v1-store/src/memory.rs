//! In-memory DocumentStore implementation
//!
//! Keeps every document as its pretty-printed text with a SHA-256 version tag,
//! and records a change entry per committed write. Faults can be queued to
//! exercise conflict and failure paths.

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::store::{DocumentStore, WriteOutcome};

/// One committed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub path: String,
    pub message: String,
    pub version: String,
}

/// Scripted outcome for the next write
#[derive(Debug, Clone)]
pub enum WriteFault {
    Conflict,
    Fail(StoreError),
}

#[derive(Debug, Clone)]
struct StoredDocument {
    text: String,
    version: String,
}

/// In-memory document store for testing
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, StoredDocument>>,
    changes: Mutex<Vec<ChangeRecord>>,
    write_faults: Mutex<VecDeque<WriteFault>>,
    read_faults: Mutex<VecDeque<StoreError>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn version_of(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn put(&self, path: &str, document: &Value) -> StoreResult<String> {
        let text = serde_json::to_string_pretty(document).map_err(|e| StoreError::decode(path, e))?;
        let version = Self::version_of(&text);
        self.documents.lock().unwrap().insert(
            path.to_string(),
            StoredDocument {
                text,
                version: version.clone(),
            },
        );
        Ok(version)
    }

    /// Place a document without recording a change
    pub fn seed(&self, path: &str, document: Value) {
        self.put(path, &document).expect("seed document must serialize");
    }

    /// Current parsed contents of `path`, bypassing faults
    pub fn document(&self, path: &str) -> Option<Value> {
        let documents = self.documents.lock().unwrap();
        documents
            .get(path)
            .and_then(|d| serde_json::from_str(&d.text).ok())
    }

    /// Store raw text as-is, for malformed-document cases
    pub fn seed_raw(&self, path: &str, text: &str) {
        self.documents.lock().unwrap().insert(
            path.to_string(),
            StoredDocument {
                text: text.to_string(),
                version: Self::version_of(text),
            },
        );
    }

    pub fn changes(&self) -> Vec<ChangeRecord> {
        self.changes.lock().unwrap().clone()
    }

    /// Make the next write come back as `fault`
    pub fn push_write_fault(&self, fault: WriteFault) {
        self.write_faults.lock().unwrap().push_back(fault);
    }

    /// Make the next read fail with `err`
    pub fn push_read_fault(&self, err: StoreError) {
        self.read_faults.lock().unwrap().push_back(err);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn read(&self, path: &str) -> StoreResult<Value> {
        if let Some(err) = self.read_faults.lock().unwrap().pop_front() {
            return Err(err);
        }

        let documents = self.documents.lock().unwrap();
        let stored = documents
            .get(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        serde_json::from_str(&stored.text).map_err(|e| StoreError::decode(path, e))
    }

    async fn version(&self, path: &str) -> StoreResult<Option<String>> {
        let documents = self.documents.lock().unwrap();
        Ok(documents.get(path).map(|d| d.version.clone()))
    }

    async fn write(&self, path: &str, document: &Value, message: &str) -> StoreResult<WriteOutcome> {
        if let Some(fault) = self.write_faults.lock().unwrap().pop_front() {
            return match fault {
                WriteFault::Conflict => Ok(WriteOutcome::Conflict),
                WriteFault::Fail(err) => Err(err),
            };
        }

        let version = self.put(path, document)?;
        self.changes.lock().unwrap().push(ChangeRecord {
            path: path.to_string(),
            message: message.to_string(),
            version: version.clone(),
        });

        Ok(WriteOutcome::Committed {
            version: Some(version),
        })
    }
}
