//! Webhook event parsing.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::config::Division;
use crate::rest::odata::parse_datetime;
use crate::webhooks::WebhookError;

/// The change a webhook reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WebhookAction {
    /// A record was created.
    Create,
    /// A record was updated.
    Update,
    /// A record was deleted.
    Delete,
}

impl FromStr for WebhookAction {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(WebhookError::InvalidPayload {
                reason: format!("unknown action '{other}'"),
            }),
        }
    }
}

impl fmt::Display for WebhookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("Create"),
            Self::Update => f.write_str("Update"),
            Self::Delete => f.write_str("Delete"),
        }
    }
}

/// A parsed webhook event. Immutable once parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct WebhookEvent {
    /// The entity type, e.g. "Accounts" or "SalesOrders".
    pub topic: String,
    /// The change that happened.
    pub action: WebhookAction,
    /// The division the change happened in.
    pub division: Division,
    /// The key (usually a GUID) of the affected record.
    pub key: String,
    /// API URL to fetch the full record, if provided.
    pub endpoint: Option<String>,
    /// When the event was raised, if provided.
    pub timestamp: Option<DateTime<Utc>>,
    /// The hash Exact Online issued for this delivery, if provided.
    pub hash_code: Option<String>,
    /// The full JSON payload as received.
    pub raw: Value,
}

/// Parses a webhook payload without checking its signature.
///
/// Use this only when the signature is verified elsewhere, e.g. by a gateway
/// in front of the application. It trusts the caller's own validation.
///
/// # Errors
///
/// Returns [`WebhookError::InvalidPayload`] if the payload is not a JSON
/// object or a field has the wrong type, and [`WebhookError::MissingField`]
/// if Topic, Action, Division or Key is absent.
pub fn parse_without_validation(payload: &[u8]) -> Result<WebhookEvent, WebhookError> {
    let raw: Value = serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload {
        reason: e.to_string(),
    })?;
    parse_value(raw)
}

fn parse_value(raw: Value) -> Result<WebhookEvent, WebhookError> {
    let envelope = raw.as_object().ok_or_else(|| WebhookError::InvalidPayload {
        reason: "expected a JSON object".to_string(),
    })?;
    let content = match envelope.get("Content").or_else(|| envelope.get("content")) {
        Some(Value::Object(content)) => content,
        Some(_) => {
            return Err(WebhookError::InvalidPayload {
                reason: "Content is not an object".to_string(),
            })
        }
        None => envelope,
    };

    let topic = required_str(content, "Topic")?.to_string();
    let action = required_str(content, "Action")?.parse()?;
    let division = parse_division(field(content, "Division").ok_or(WebhookError::MissingField {
        field: "Division",
    })?)?;
    let key = required_str(content, "Key")?.to_string();
    let endpoint = optional_str(content, "Endpoint");
    let timestamp = optional_str(content, "Timestamp").and_then(|ts| parse_datetime(&ts));
    let hash_code = optional_str(content, "HashCode");

    Ok(WebhookEvent {
        topic,
        action,
        division,
        key,
        endpoint,
        timestamp,
        hash_code,
        raw,
    })
}

/// Looks a field up by its PascalCase name, then its camelCase name.
fn field<'a>(content: &'a Map<String, Value>, name: &'static str) -> Option<&'a Value> {
    content.get(name).filter(|v| !v.is_null()).or_else(|| {
        let mut chars = name.chars();
        let camel: String = chars
            .next()
            .map(|first| first.to_ascii_lowercase())
            .into_iter()
            .chain(chars)
            .collect();
        content.get(&camel).filter(|v| !v.is_null())
    })
}

fn required_str<'a>(
    content: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a str, WebhookError> {
    match field(content, name) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) | None => Err(WebhookError::MissingField { field: name }),
        Some(_) => Err(WebhookError::InvalidPayload {
            reason: format!("{name} must be a string"),
        }),
    }
}

fn optional_str(content: &Map<String, Value>, name: &'static str) -> Option<String> {
    match field(content, name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_division(value: &Value) -> Result<Division, WebhookError> {
    let code = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    code.and_then(|code| Division::new(code).ok())
        .ok_or_else(|| WebhookError::InvalidPayload {
            reason: format!("invalid Division {value}"),
        })
}
