//! Record operations against the in-memory document store

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use v1_store::collections::{DEFAULT_REQUESTS_PATH, DEFAULT_USERS_PATH};
use v1_store::{
    Collections, DocumentStore, MemoryDocumentStore, Mutation, RecordError, RecordService,
    Request, RequestStatus, Role, StoreError, StoreResult, WriteFault, WriteOutcome,
    hash_password, is_tracking_id,
};

fn fixed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

/// Service over a store holding empty users and requests collections
fn make_service() -> (Arc<MemoryDocumentStore>, RecordService) {
    let store = Arc::new(MemoryDocumentStore::new());
    store.seed(DEFAULT_USERS_PATH, json!([]));
    store.seed(DEFAULT_REQUESTS_PATH, json!([]));
    let service =
        RecordService::new(Collections::with_default_paths(store.clone())).with_clock(fixed_date);
    (store, service)
}

fn stored_requests(store: &MemoryDocumentStore) -> Vec<Request> {
    serde_json::from_value(store.document(DEFAULT_REQUESTS_PATH).unwrap()).unwrap()
}

// ============================================================================
// Registration and login
// ============================================================================

#[tokio::test]
async fn test_register_appends_user() {
    let (store, service) = make_service();

    let user = service
        .register_user("a@x.com", &hash_password("pw"), Role::Client)
        .await
        .unwrap()
        .applied()
        .unwrap();

    assert_eq!(user.created_at, fixed_date());
    assert_eq!(
        store.document(DEFAULT_USERS_PATH),
        Some(json!([{
            "email": "a@x.com",
            "passwordHash": hash_password("pw"),
            "role": "client",
            "createdAt": "2026-10-19"
        }]))
    );
    assert_eq!(store.changes()[0].message, "Register user: a@x.com");
}

#[tokio::test]
async fn test_register_rejects_duplicate_email() {
    let (store, service) = make_service();
    service
        .register_user("a@x.com", &hash_password("pw"), Role::Client)
        .await
        .unwrap();

    let err = service
        .register_user("a@x.com", &hash_password("other"), Role::Admin)
        .await
        .unwrap_err();

    assert_eq!(err, RecordError::EmailTaken("a@x.com".to_string()));
    assert_eq!(service.list_users().await.unwrap().len(), 1);
    assert_eq!(store.changes().len(), 1);
}

#[tokio::test]
async fn test_register_rejects_invalid_email_before_reading() {
    let (store, service) = make_service();
    store.push_read_fault(StoreError::Unauthorized(DEFAULT_USERS_PATH.to_string()));

    let err = service
        .register_user("not-an-email", &hash_password("pw"), Role::Client)
        .await
        .unwrap_err();
    assert_eq!(err, RecordError::InvalidEmail("not-an-email".to_string()));

    // The queued fault is still there: no read happened
    assert!(matches!(
        service.list_users().await,
        Err(RecordError::Store(StoreError::Unauthorized(_)))
    ));
}

#[tokio::test]
async fn test_register_fails_when_collection_missing() {
    let store = Arc::new(MemoryDocumentStore::new());
    let service = RecordService::new(Collections::with_default_paths(store.clone()));

    let err = service
        .register_user("a@x.com", &hash_password("pw"), Role::Client)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RecordError::Store(StoreError::NotFound(DEFAULT_USERS_PATH.to_string()))
    );
    assert!(store.document(DEFAULT_USERS_PATH).is_none());
}

#[tokio::test]
async fn test_authenticate() {
    let (_store, service) = make_service();
    service
        .register_user("aud@x.com", &hash_password("correct horse"), Role::Auditor)
        .await
        .unwrap();

    let user = service
        .authenticate_user("aud@x.com", "correct horse")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.role, Role::Auditor);

    assert_eq!(
        service.authenticate_user("aud@x.com", "wrong").await.unwrap(),
        None
    );
    assert_eq!(
        service
            .authenticate_user("nobody@x.com", "correct horse")
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_authenticate_tolerates_timestamp_dates() {
    let (store, service) = make_service();
    store.seed(
        DEFAULT_USERS_PATH,
        json!([
            {
                "email": "old@x.com",
                "passwordHash": hash_password("legacy"),
                "role": "admin",
                "createdAt": "2026-01-05T10:00:00.000Z"
            },
            {
                "email": "a@x.com",
                "passwordHash": hash_password("pw"),
                "role": "client",
                "createdAt": "2026-02-01"
            }
        ]),
    );

    let user = service.authenticate_user("a@x.com", "pw").await.unwrap().unwrap();
    assert_eq!(user.role, Role::Client);

    let old = service
        .authenticate_user("old@x.com", "legacy")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(old.created_at, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
}

#[tokio::test]
async fn test_register_keeps_unknown_user_fields() {
    let (store, service) = make_service();
    store.seed(
        DEFAULT_USERS_PATH,
        json!([{
            "email": "old@x.com",
            "passwordHash": hash_password("legacy"),
            "role": "auditor",
            "createdAt": "2026-01-05",
            "phone": "555-0100"
        }]),
    );

    service
        .register_user("a@x.com", &hash_password("pw"), Role::Client)
        .await
        .unwrap()
        .applied()
        .unwrap();

    let users = store.document(DEFAULT_USERS_PATH).unwrap();
    assert_eq!(users[0]["phone"], "555-0100");
    assert_eq!(users[1]["email"], "a@x.com");
}

// ============================================================================
// Requests
// ============================================================================

#[tokio::test]
async fn test_add_request_initial_state() {
    let (store, service) = make_service();

    let request = service
        .add_request("c@x.com", "Bookkeeping", "2026-Q3", "Quarterly books")
        .await
        .unwrap()
        .applied()
        .unwrap();

    assert!(is_tracking_id(&request.tracking_id));
    assert_eq!(request.status, RequestStatus::Submitted);
    assert_eq!(request.assigned_auditor, None);
    assert_eq!(request.created_at, fixed_date());
    assert_eq!(stored_requests(&store), vec![request.clone()]);
    assert_eq!(
        store.changes()[0].message,
        format!("New request: {}", request.tracking_id)
    );
}

#[tokio::test]
async fn test_update_status_with_notes() {
    let (store, service) = make_service();
    store.seed(
        DEFAULT_REQUESTS_PATH,
        json!([{
            "trackingId": "V1-000001",
            "clientEmail": "c@x.com",
            "service": "Audit",
            "period": "2025",
            "description": "Year end",
            "status": "Submitted",
            "assignedAuditor": null,
            "createdAt": "2026-01-05"
        }]),
    );

    let updated = service
        .update_request_status("V1-000001", "Reviewed", Some("looks fine"))
        .await
        .unwrap()
        .applied()
        .unwrap();

    assert_eq!(updated.status, RequestStatus::Other("Reviewed".to_string()));
    assert_eq!(updated.last_notes.as_deref(), Some("looks fine"));
    assert_eq!(updated.last_updated, Some(fixed_date()));

    let stored = store.document(DEFAULT_REQUESTS_PATH).unwrap();
    assert_eq!(stored[0]["status"], "Reviewed");
    assert_eq!(stored[0]["lastNotes"], "looks fine");
    assert_eq!(stored[0]["lastUpdated"], "2026-10-19");
    assert_eq!(
        store.changes()[0].message,
        "Update request: V1-000001 to Reviewed"
    );
}

#[tokio::test]
async fn test_update_status_without_notes_leaves_note_fields() {
    let (store, service) = make_service();
    let request = service
        .add_request("c@x.com", "Audit", "2025", "")
        .await
        .unwrap()
        .applied()
        .unwrap();

    for notes in [None, Some("")] {
        let updated = service
            .update_request_status(&request.tracking_id, "In Progress", notes)
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(updated.last_notes, None);
        assert_eq!(updated.last_updated, None);
    }

    let stored = store.document(DEFAULT_REQUESTS_PATH).unwrap();
    assert!(stored[0].get("lastNotes").is_none());
}

#[tokio::test]
async fn test_update_unknown_request() {
    let (store, service) = make_service();
    let err = service
        .update_request_status("V1-999999", "Reviewed", None)
        .await
        .unwrap_err();

    assert_eq!(err, RecordError::RequestNotFound("V1-999999".to_string()));
    assert!(store.changes().is_empty());
}

#[tokio::test]
async fn test_assign_auditor() {
    let (store, service) = make_service();
    let request = service
        .add_request("c@x.com", "Audit", "2025", "")
        .await
        .unwrap()
        .applied()
        .unwrap();

    let assigned = service
        .assign_auditor(&request.tracking_id, "aud@x.com")
        .await
        .unwrap()
        .applied()
        .unwrap();

    assert_eq!(assigned.status, RequestStatus::Assigned);
    assert_eq!(assigned.assigned_auditor.as_deref(), Some("aud@x.com"));
    assert_eq!(stored_requests(&store), vec![assigned]);
    assert_eq!(
        store.changes().last().unwrap().message,
        format!("Assign auditor: aud@x.com to {}", request.tracking_id)
    );
}

#[tokio::test]
async fn test_assign_keeps_fields_of_other_requests() {
    let (store, service) = make_service();
    store.seed(
        DEFAULT_REQUESTS_PATH,
        json!([
            {
                "trackingId": "V1-000001",
                "clientEmail": "c@x.com",
                "service": "Tax",
                "period": "2025",
                "description": "",
                "status": "Submitted",
                "assignedAuditor": null,
                "createdAt": "2026-01-05",
                "priority": "high"
            },
            {
                "trackingId": "V1-000002",
                "clientEmail": "d@x.com",
                "service": "Audit",
                "period": "2025",
                "description": "",
                "status": "Submitted",
                "assignedAuditor": null,
                "createdAt": "2026-01-06T12:00:00.000Z",
                "attachments": ["ledger.pdf"]
            }
        ]),
    );

    let assigned = service
        .assign_auditor("V1-000002", "aud@x.com")
        .await
        .unwrap()
        .applied()
        .unwrap();
    assert_eq!(assigned.extra["attachments"], json!(["ledger.pdf"]));

    let requests = store.document(DEFAULT_REQUESTS_PATH).unwrap();
    assert_eq!(requests[0]["priority"], "high");
    assert_eq!(requests[0]["assignedAuditor"], Value::Null);
    assert_eq!(requests[1]["attachments"], json!(["ledger.pdf"]));
    assert_eq!(requests[1]["assignedAuditor"], "aud@x.com");
    assert_eq!(requests[1]["status"], "Assigned");
}

#[tokio::test]
async fn test_assign_unknown_request_leaves_collection() {
    let (store, service) = make_service();
    service
        .add_request("c@x.com", "Audit", "2025", "")
        .await
        .unwrap();
    let before = store.document(DEFAULT_REQUESTS_PATH);

    let err = service
        .assign_auditor("V1-424242", "aud@x.com")
        .await
        .unwrap_err();

    assert!(matches!(err, RecordError::RequestNotFound(_)));
    assert_eq!(store.document(DEFAULT_REQUESTS_PATH), before);
    assert_eq!(store.changes().len(), 1);
}

#[tokio::test]
async fn test_filtered_listings_preserve_order() {
    let (store, service) = make_service();
    let mut ids = Vec::new();
    for (client, service_name) in [
        ("a@x.com", "Tax"),
        ("b@x.com", "Audit"),
        ("a@x.com", "Payroll"),
        ("a@x.com", "Audit"),
    ] {
        let request = service
            .add_request(client, service_name, "2026", "")
            .await
            .unwrap()
            .applied()
            .unwrap();
        ids.push(request.tracking_id);
    }
    service.assign_auditor(&ids[1], "aud@x.com").await.unwrap();
    service.assign_auditor(&ids[3], "aud@x.com").await.unwrap();

    let all = stored_requests(&store);
    let expected: Vec<Request> = all
        .iter()
        .filter(|r| r.client_email == "a@x.com")
        .cloned()
        .collect();
    let mine = service.get_client_requests("a@x.com").await.unwrap();
    assert_eq!(mine, expected);
    assert_eq!(
        mine.iter().map(|r| r.service.as_str()).collect::<Vec<_>>(),
        vec!["Tax", "Payroll", "Audit"]
    );

    let assigned = service.get_auditor_requests("aud@x.com").await.unwrap();
    assert_eq!(
        assigned.iter().map(|r| r.tracking_id.clone()).collect::<Vec<_>>(),
        vec![ids[1].clone(), ids[3].clone()]
    );

    assert!(service.get_client_requests("A@x.com").await.unwrap().is_empty());
    assert!(service.get_auditor_requests("nobody@x.com").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_listing_read_failure_is_an_error() {
    let (store, service) = make_service();
    store.push_read_fault(StoreError::transport(DEFAULT_REQUESTS_PATH, Some(503), "unavailable"));

    assert!(matches!(
        service.get_client_requests("a@x.com").await,
        Err(RecordError::Store(StoreError::Transport { status: Some(503), .. }))
    ));
}

// ============================================================================
// Conflicts
// ============================================================================

#[tokio::test]
async fn test_conflict_discards_change() {
    let (store, service) = make_service();
    store.push_write_fault(WriteFault::Conflict);

    let outcome = service
        .register_user("a@x.com", &hash_password("pw"), Role::Client)
        .await
        .unwrap();

    assert_eq!(outcome, Mutation::Conflict);
    assert_eq!(store.document(DEFAULT_USERS_PATH), Some(json!([])));
    assert!(store.changes().is_empty());

    // Re-running the operation re-reads and succeeds
    let retried = service
        .register_user("a@x.com", &hash_password("pw"), Role::Client)
        .await
        .unwrap();
    assert!(!retried.is_conflict());
}

#[tokio::test]
async fn test_write_failure_propagates() {
    let (store, service) = make_service();
    store.push_write_fault(WriteFault::Fail(StoreError::Unauthorized(
        DEFAULT_REQUESTS_PATH.to_string(),
    )));

    let err = service
        .add_request("c@x.com", "Audit", "2025", "")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RecordError::Store(StoreError::Unauthorized(DEFAULT_REQUESTS_PATH.to_string()))
    );
    assert_eq!(stored_requests(&store), Vec::<Request>::new());
}

/// Lands a competing users write just before the first write passes through
struct InterleavedWriter {
    inner: Arc<MemoryDocumentStore>,
    fired: AtomicBool,
}

#[async_trait]
impl DocumentStore for InterleavedWriter {
    async fn read(&self, path: &str) -> StoreResult<Value> {
        self.inner.read(path).await
    }

    async fn version(&self, path: &str) -> StoreResult<Option<String>> {
        self.inner.version(path).await
    }

    async fn write(&self, path: &str, document: &Value, message: &str) -> StoreResult<WriteOutcome> {
        if !self.fired.swap(true, Ordering::SeqCst) {
            let competing = json!([{
                "email": "other@x.com",
                "passwordHash": hash_password("pw"),
                "role": "client",
                "createdAt": "2026-10-19"
            }]);
            self.inner.write(path, &competing, "Register user: other@x.com").await?;
        }
        self.inner.write(path, document, message).await
    }
}

#[tokio::test]
async fn test_write_between_read_and_write_is_overwritten() {
    let inner = Arc::new(MemoryDocumentStore::new());
    inner.seed(DEFAULT_USERS_PATH, json!([]));
    let store = Arc::new(InterleavedWriter {
        inner: inner.clone(),
        fired: AtomicBool::new(false),
    });
    let service = RecordService::new(Collections::with_default_paths(store)).with_clock(fixed_date);

    // The version tag is fetched at write time, so the competing write goes unnoticed
    let outcome = service
        .register_user("a@x.com", &hash_password("pw"), Role::Client)
        .await
        .unwrap();
    assert!(!outcome.is_conflict());

    let users = inner.document(DEFAULT_USERS_PATH).unwrap();
    assert_eq!(users.as_array().map(Vec::len), Some(1));
    assert_eq!(users[0]["email"], "a@x.com");
    assert_eq!(inner.changes().len(), 2);
}
