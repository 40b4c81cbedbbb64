//! Challenge requests and acknowledgments
//!
//! Wire formats, transport-agnostic JSON:
//!
//! ```text
//! request: { "id"?, "action": "add"|"remove", "domain"?, "name", "value", "ttl"? }
//! ack:     { "id"?, "action", "name", "value", "status": "ok"|"error",
//!            "record_id"?, "zone_id"?, "error"?: { "type", "message" } }
//! ```
//!
//! The correlation `id` is opaque and echoed back exactly as received.

use crate::error::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Requested operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Add,
    Remove,
}

impl Action {
    /// Parse an action name, ignoring case and surrounding whitespace
    pub fn parse(action: &str) -> Result<Self> {
        match action.trim().to_lowercase().as_str() {
            "add" => Ok(Action::Add),
            "remove" => Ok(Action::Remove),
            _ => Err(Error::invalid_action(action)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Remove => "remove",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload as received, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawChallengeRequest {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub ttl: Option<u32>,
}

/// A validated challenge request
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeRequest {
    /// Correlation token, echoed verbatim
    pub id: Option<Value>,
    pub action: Action,
    /// Advisory domain hint, used for managed-domain filtering only
    pub domain: Option<String>,
    /// Fully-qualified TXT record name
    pub name: String,
    /// Exact TXT content
    pub value: String,
    /// TTL in seconds, defaulted when absent or zero
    pub ttl: u32,
}

impl RawChallengeRequest {
    /// Parse a raw payload
    ///
    /// A payload that is not a JSON object, or whose fields have the wrong
    /// types, fails with `invalid_request`. The second element is the
    /// correlation id, recovered when the payload was at least an object.
    pub fn from_slice(payload: &[u8]) -> std::result::Result<Self, (Option<Value>, Error)> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| (None, Error::invalid_request(format!("Malformed JSON payload: {}", e))))?;

        if !value.is_object() {
            return Err((
                None,
                Error::invalid_request("Request payload must be a JSON object"),
            ));
        }

        let id = value.get("id").filter(|id| !id.is_null()).cloned();
        serde_json::from_value(value)
            .map_err(|e| (id, Error::invalid_request(format!("Malformed request: {}", e))))
    }

    /// Validate into a [`ChallengeRequest`]
    ///
    /// The action is checked first, then the presence of `name` and `value`.
    pub fn validate(self, default_ttl: u32) -> Result<ChallengeRequest> {
        let action = Action::parse(self.action.as_deref().unwrap_or_default())?;

        let name = self.name.filter(|n| !n.trim().is_empty());
        let value = self.value.filter(|v| !v.is_empty());
        let (Some(name), Some(value)) = (name, value) else {
            return Err(Error::invalid_request("Both 'name' and 'value' are required"));
        };

        Ok(ChallengeRequest {
            id: self.id.filter(|id| !id.is_null()),
            action,
            domain: self.domain,
            name: name.trim().to_string(),
            value,
            ttl: self.ttl.filter(|ttl| *ttl > 0).unwrap_or(default_ttl),
        })
    }

    /// Action as echoed in acknowledgments (lower-cased)
    pub fn echoed_action(&self) -> Option<String> {
        self.action.as_ref().map(|a| a.trim().to_lowercase())
    }
}

/// Acknowledgment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Ok,
    Error,
}

/// Error detail carried by an error acknowledgment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
}

/// Outbound result of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub status: AckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AckError>,
}

impl Acknowledgment {
    /// Base acknowledgment echoing the request fields that were present
    fn echo(raw: &RawChallengeRequest) -> Self {
        Self {
            id: raw.id.clone().filter(|id| !id.is_null()),
            action: raw.echoed_action(),
            name: raw.name.clone(),
            value: raw.value.clone(),
            status: AckStatus::Ok,
            record_id: None,
            zone_id: None,
            error: None,
        }
    }

    /// Successful acknowledgment
    pub fn ok(raw: &RawChallengeRequest, zone_id: &str, record_id: Option<String>) -> Self {
        Self {
            zone_id: Some(zone_id.to_string()),
            record_id,
            ..Self::echo(raw)
        }
    }

    /// Error acknowledgment for a payload that could be parsed
    pub fn error(raw: &RawChallengeRequest, zone_id: Option<&str>, err: &Error) -> Self {
        Self {
            status: AckStatus::Error,
            zone_id: zone_id.map(str::to_string),
            error: Some(AckError {
                kind: err.kind(),
                message: err.report_message(),
            }),
            ..Self::echo(raw)
        }
    }

    /// Error acknowledgment for a payload that could not be parsed
    pub fn rejected(id: Option<Value>, err: &Error) -> Self {
        Self {
            id,
            action: None,
            name: None,
            value: None,
            status: AckStatus::Error,
            record_id: None,
            zone_id: None,
            error: Some(AckError {
                kind: err.kind(),
                message: err.report_message(),
            }),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == AckStatus::Ok
    }

    /// Error kind, for error acknowledgments
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
