//! Record operations
//!
//! Every mutation reads the whole collection, changes the in-memory copy and
//! writes the whole collection back with a change message. Nothing retries:
//! a rejected conditional write comes back as `Mutation::Conflict` and the
//! caller decides whether to run the operation again.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::collections::Collections;
use crate::error::{RecordError, RecordResult};
use crate::hashing::verify_password;
use crate::models::{Request, RequestStatus, Role, User};
use crate::store::WriteOutcome;
use crate::tracking::generate_tracking_id;
use crate::utils::{is_valid_email, today};

const MAX_TRACKING_ID_ATTEMPTS: usize = 64;

/// Result of a read-modify-write operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<T> {
    /// The new collection was written; carries the affected record
    Applied(T),
    /// The version tag went stale between the metadata fetch and the write;
    /// nothing was stored. Changes landing before the metadata fetch are
    /// overwritten without a conflict.
    Conflict,
}

impl<T> Mutation<T> {
    fn from_outcome(outcome: WriteOutcome, value: T) -> Self {
        match outcome {
            WriteOutcome::Committed { .. } => Mutation::Applied(value),
            WriteOutcome::Conflict => Mutation::Conflict,
        }
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Mutation::Applied(value) => Some(value),
            Mutation::Conflict => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Mutation::Conflict)
    }
}

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;
type IdSource = Box<dyn Fn() -> String + Send + Sync>;

/// Users and requests operations over one pair of collections
pub struct RecordService {
    collections: Collections,
    clock: Clock,
    next_tracking_id: IdSource,
}

impl RecordService {
    pub fn new(collections: Collections) -> Self {
        Self {
            collections,
            clock: Box::new(today),
            next_tracking_id: Box::new(generate_tracking_id),
        }
    }

    /// Override the date stamped on records
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Override where tracking IDs come from
    pub fn with_id_source(mut self, source: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.next_tracking_id = Box::new(source);
        self
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Append a new user. Fails with `EmailTaken` if the email is already
    /// registered, without writing anything.
    pub async fn register_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> RecordResult<Mutation<User>> {
        if !is_valid_email(email) {
            return Err(RecordError::InvalidEmail(email.to_string()));
        }

        let mut users = self.collections.load_users().await?;
        if users.iter().any(|u| u.email == email) {
            tracing::warn!("register_user: {} is already registered", email);
            return Err(RecordError::EmailTaken(email.to_string()));
        }

        let user = User::new(email, password_hash, role, (self.clock)());
        users.push(user.clone());

        let outcome = self
            .collections
            .save_users(&users, &format!("Register user: {}", email))
            .await?;
        Ok(Mutation::from_outcome(outcome, user))
    }

    /// The stored user if `password` hashes to the stored digest
    pub async fn authenticate_user(&self, email: &str, password: &str) -> RecordResult<Option<User>> {
        let users = self.collections.load_users().await?;
        let Some(user) = users.into_iter().find(|u| u.email == email) else {
            tracing::debug!("authenticate_user: no account for {}", email);
            return Ok(None);
        };

        if verify_password(password, &user.password_hash) {
            Ok(Some(user))
        } else {
            tracing::debug!("authenticate_user: password mismatch for {}", email);
            Ok(None)
        }
    }

    pub async fn list_users(&self) -> RecordResult<Vec<User>> {
        Ok(self.collections.load_users().await?)
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Submit a new request in `Submitted` state with no auditor
    pub async fn add_request(
        &self,
        client_email: &str,
        service: &str,
        period: &str,
        description: &str,
    ) -> RecordResult<Mutation<Request>> {
        let mut requests = self.collections.load_requests().await?;
        let tracking_id = self.fresh_tracking_id(&requests)?;

        let request = Request::submitted(
            tracking_id,
            client_email,
            service,
            period,
            description,
            (self.clock)(),
        );
        requests.push(request.clone());

        let outcome = self
            .collections
            .save_requests(&requests, &format!("New request: {}", request.tracking_id))
            .await?;
        Ok(Mutation::from_outcome(outcome, request))
    }

    /// Draw tracking IDs until one is not taken in `existing`
    fn fresh_tracking_id(&self, existing: &[Request]) -> RecordResult<String> {
        let taken: HashSet<&str> = existing.iter().map(|r| r.tracking_id.as_str()).collect();
        for _ in 0..MAX_TRACKING_ID_ATTEMPTS {
            let candidate = (self.next_tracking_id)();
            if !taken.contains(candidate.as_str()) {
                return Ok(candidate);
            }
            tracing::debug!("fresh_tracking_id: {} already in use", candidate);
        }
        Err(RecordError::TrackingIdExhausted)
    }

    /// Set a request's status. Non-empty `notes` are stored along with today's date.
    pub async fn update_request_status(
        &self,
        tracking_id: &str,
        status: impl Into<RequestStatus>,
        notes: Option<&str>,
    ) -> RecordResult<Mutation<Request>> {
        let status = status.into();
        let today = (self.clock)();

        let message = format!("Update request: {} to {}", tracking_id, status);
        self.modify_request(tracking_id, &message, |request| {
            request.status = status;
            if let Some(notes) = notes.filter(|n| !n.is_empty()) {
                request.last_notes = Some(notes.to_string());
                request.last_updated = Some(today);
            }
        })
        .await
    }

    /// Assign an auditor and move the request to `Assigned`
    pub async fn assign_auditor(
        &self,
        tracking_id: &str,
        auditor_email: &str,
    ) -> RecordResult<Mutation<Request>> {
        let message = format!("Assign auditor: {} to {}", auditor_email, tracking_id);
        self.modify_request(tracking_id, &message, |request| {
            request.assigned_auditor = Some(auditor_email.to_string());
            request.status = RequestStatus::Assigned;
        })
        .await
    }

    async fn modify_request(
        &self,
        tracking_id: &str,
        message: &str,
        change: impl FnOnce(&mut Request),
    ) -> RecordResult<Mutation<Request>> {
        let mut requests = self.collections.load_requests().await?;
        let Some(request) = requests.iter_mut().find(|r| r.tracking_id == tracking_id) else {
            tracing::warn!("No request with tracking ID {}", tracking_id);
            return Err(RecordError::RequestNotFound(tracking_id.to_string()));
        };

        change(request);
        let updated = request.clone();

        let outcome = self.collections.save_requests(&requests, message).await?;
        Ok(Mutation::from_outcome(outcome, updated))
    }

    pub async fn list_requests(&self) -> RecordResult<Vec<Request>> {
        Ok(self.collections.load_requests().await?)
    }

    /// Requests submitted by `email`, in collection order
    pub async fn get_client_requests(&self, email: &str) -> RecordResult<Vec<Request>> {
        let requests = self.collections.load_requests().await?;
        Ok(requests
            .into_iter()
            .filter(|r| r.client_email == email)
            .collect())
    }

    /// Requests assigned to `email`, in collection order
    pub async fn get_auditor_requests(&self, email: &str) -> RecordResult<Vec<Request>> {
        let requests = self.collections.load_requests().await?;
        Ok(requests
            .into_iter()
            .filter(|r| r.assigned_auditor.as_deref() == Some(email))
            .collect())
    }
}
