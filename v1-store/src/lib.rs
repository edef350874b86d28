//! Record store for V1 Services
//!
//! Users and service requests live in two JSON documents inside a hosted Git
//! repository. This crate provides:
//! - **Store seam**: `DocumentStore` with the `ContentsClient` (repository
//!   contents API) and `MemoryDocumentStore` backends
//! - **Collections**: typed load/save of the users and requests arrays
//! - **Operations**: `RecordService` for registration, login, submission,
//!   status updates, auditor assignment and listings
//! - **Session**: local token and signed-in user persistence
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use v1_store::{Collections, ContentsClient, RecordService, Role, hash_password};
//!
//! let client = ContentsClient::new("acme", "v1books-backend", token);
//! let service = RecordService::new(Collections::with_default_paths(Arc::new(client)));
//! service.register_user("a@x.com", &hash_password("pw"), Role::Client).await?;
//! ```

pub mod collections;
pub mod error;
pub mod github;
pub mod hashing;
pub mod memory;
pub mod models;
pub mod service;
pub mod session;
pub mod store;
pub mod tracking;
pub mod utils;

pub use collections::{CollectionKind, Collections};
pub use error::{RecordError, RecordResult, StoreError, StoreResult};
pub use github::ContentsClient;
pub use hashing::{hash_password, verify_password};
pub use memory::{MemoryDocumentStore, WriteFault};
pub use models::{Request, RequestStatus, Role, User};
pub use service::{Mutation, RecordService};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};
pub use store::{DocumentStore, WriteOutcome};
pub use tracking::{generate_tracking_id, is_tracking_id};
pub use utils::{format_date, is_valid_email, today};
