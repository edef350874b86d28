//! Records kept in the two collections

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// What a user is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Auditor,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Auditor => "auditor",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "auditor" => Ok(Role::Auditor),
            "client" => Ok(Role::Client),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Request lifecycle state.
///
/// Only `Submitted` and `Assigned` are set by this crate; auditors may move a
/// request to any other label, which is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestStatus {
    Submitted,
    Assigned,
    Other(String),
}

impl RequestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RequestStatus::Submitted => "Submitted",
            RequestStatus::Assigned => "Assigned",
            RequestStatus::Other(label) => label,
        }
    }
}

impl From<String> for RequestStatus {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Submitted" => RequestStatus::Submitted,
            "Assigned" => RequestStatus::Assigned,
            _ => RequestStatus::Other(label),
        }
    }
}

impl From<&str> for RequestStatus {
    fn from(label: &str) -> Self {
        RequestStatus::from(label.to_string())
    }
}

impl From<RequestStatus> for String {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Parse a stored date. Full timestamps written by other clients are cut
/// down to their calendar date.
pub fn parse_wire_date(text: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(stamp.date_naive());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|stamp| stamp.date())
}

fn de_wire_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_wire_date(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", text)))
}

fn de_wire_date_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(text) => parse_wire_date(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", text))),
    }
}

/// An account in the users collection, keyed by email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    /// Hex SHA-256 of the password
    pub password_hash: String,
    pub role: Role,
    #[serde(deserialize_with = "de_wire_date")]
    pub created_at: NaiveDate,
    /// Fields this crate does not know about, written back untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn new(email: &str, password_hash: &str, role: Role, created_at: NaiveDate) -> Self {
        Self {
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at,
            extra: Map::new(),
        }
    }
}

/// A service request in the requests collection, keyed by tracking ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub tracking_id: String,
    pub client_email: String,
    pub service: String,
    pub period: String,
    pub description: String,
    pub status: RequestStatus,
    pub assigned_auditor: Option<String>,
    #[serde(deserialize_with = "de_wire_date")]
    pub created_at: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_notes: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_wire_date_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<NaiveDate>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Request {
    /// A freshly submitted request with no auditor
    pub fn submitted(
        tracking_id: String,
        client_email: &str,
        service: &str,
        period: &str,
        description: &str,
        created_at: NaiveDate,
    ) -> Self {
        Self {
            tracking_id,
            client_email: client_email.to_string(),
            service: service.to_string(),
            period: period.to_string(),
            description: description.to_string(),
            status: RequestStatus::Submitted,
            assigned_auditor: None,
            created_at,
            last_notes: None,
            last_updated: None,
            extra: Map::new(),
        }
    }
}
