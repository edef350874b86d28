//! Local session state: bearer token and signed-in user
//!
//! `SessionStore` is a flat string key-value store that survives restarts.
//! `Session` layers JSON values, token encryption and the logout rules on top.

use config::crypto::TokenCipher;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::User;

pub const TOKEN_KEY: &str = "github_token";
pub const CURRENT_USER_KEY: &str = "current_user";

pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// In-memory session store for testing
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> io::Result<()> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

/// Session store backed by a JSON object file, rewritten on every change
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStore {
    /// Open the file at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries: BTreeMap<String, String> = fs::read_to_string(&path)
            .ok()
            .and_then(|text| match serde_json::from_str(&text) {
                Ok(entries) => Some(entries),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable session file {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default();

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Open the session file in the default data directory
    pub fn open_default() -> io::Result<Self> {
        let path = config::PathManager::session_path().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "Could not determine session path")
        })?;
        Ok(Self::open(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(entries).map_err(io::Error::other)?;
        fs::write(&self.path, text)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let next = BTreeMap::new();
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

/// Typed view over a `SessionStore`
pub struct Session<S: SessionStore> {
    store: S,
    cipher: TokenCipher,
}

impl<S: SessionStore> Session<S> {
    pub fn new(store: S, cipher: TokenCipher) -> Self {
        Self { store, cipher }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> io::Result<()> {
        let text = serde_json::to_string(value).map_err(io::Error::other)?;
        self.store.set(key, text)
    }

    /// Decoded value under `key`; `None` if absent or not decodable as `T`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let text = self.store.get(key)?;
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Session value {} is unreadable: {}", key, e);
                None
            }
        }
    }

    pub fn remove(&self, key: &str) -> io::Result<()> {
        self.store.remove(key)
    }

    pub fn clear(&self) -> io::Result<()> {
        self.store.clear()
    }

    pub fn current_user(&self) -> Option<User> {
        self.get(CURRENT_USER_KEY)
    }

    pub fn set_current_user(&self, user: &User) -> io::Result<()> {
        self.set(CURRENT_USER_KEY, user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    /// Decrypted bearer token, if one is stored and readable on this machine
    pub fn token(&self) -> Option<String> {
        let sealed: String = self.get(TOKEN_KEY)?;
        match self.cipher.open(&sealed) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!("Stored token cannot be decrypted: {}", e);
                None
            }
        }
    }

    pub fn set_token(&self, token: &str) -> io::Result<()> {
        let sealed = self.cipher.seal(token).map_err(io::Error::other)?;
        self.set(TOKEN_KEY, &sealed)
    }

    /// Forget the signed-in user and the token; other keys stay
    pub fn logout(&self) -> io::Result<()> {
        self.store.remove(CURRENT_USER_KEY)?;
        self.store.remove(TOKEN_KEY)
    }
}
