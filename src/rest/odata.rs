//! OData v2 helpers for the Exact Online REST API.
//!
//! Exact Online speaks OData v2 in JSON "verbose" form:
//!
//! - collections arrive as `{"d": {"results": [...], "__next": "..."}}` or
//!   `{"d": [...]}`
//! - single records arrive as `{"d": {...}}`
//! - dates arrive as `/Date(1704412800000)/` (epoch milliseconds)
//! - filter literals are written as `datetime'2024-01-05T00:00:00'` and
//!   keys as `guid'...'`

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parses an OData or ISO-8601 date.
///
/// # Example
///
/// ```rust
/// use exact_online::rest::odata::parse_datetime;
///
/// let date = parse_datetime("/Date(1704412800000)/").unwrap();
/// assert_eq!(date.to_rfc3339(), "2024-01-05T00:00:00+00:00");
///
/// let date = parse_datetime("2024-01-05T10:30:00Z").unwrap();
/// assert_eq!(date.timestamp(), 1_704_450_600);
///
/// assert!(parse_datetime("yesterday").is_none());
/// ```
#[must_use]
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Some(inner) = value
        .strip_prefix("/Date(")
        .and_then(|rest| rest.strip_suffix(")/"))
    {
        // An offset suffix such as +0100 does not change the instant.
        let end = inner
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '+' || *c == '-')
            .map_or(inner.len(), |(i, _)| i);
        let millis: i64 = inner[..end].parse().ok()?;
        return Utc.timestamp_millis_opt(millis).single();
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Formats an instant as an OData `datetime'...'` filter literal.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use exact_online::rest::odata::format_datetime;
///
/// let date = Utc.with_ymd_and_hms(2024, 1, 5, 8, 30, 0).unwrap();
/// assert_eq!(format_datetime(date), "datetime'2024-01-05T08:30:00'");
/// ```
#[must_use]
pub fn format_datetime(date: DateTime<Utc>) -> String {
    format!("datetime'{}'", date.format("%Y-%m-%dT%H:%M:%S"))
}

/// Formats a GUID key literal.
#[must_use]
pub fn guid(id: &str) -> String {
    format!("guid'{id}'")
}

/// Splits a collection envelope into its records and `__next` locator.
///
/// Returns `None` if the body has no `d` member of a known shape.
#[must_use]
pub fn decode_collection(body: &Value) -> Option<(Vec<Value>, Option<String>)> {
    match body.get("d")? {
        Value::Array(results) => Some((results.clone(), None)),
        Value::Object(data) => {
            let results = match data.get("results") {
                Some(Value::Array(results)) => results.clone(),
                None => Vec::new(),
                Some(_) => return None,
            };
            let next = data
                .get("__next")
                .and_then(Value::as_str)
                .filter(|next| !next.is_empty())
                .map(str::to_string);
            Some((results, next))
        }
        _ => None,
    }
}

/// Unwraps a single-record envelope.
///
/// Accepts `{"d": {...}}`, `{"d": {"results": [{...}]}}` and a bare record.
#[must_use]
pub fn decode_single(body: &Value) -> Option<Value> {
    match body.get("d") {
        Some(Value::Object(data)) => match data.get("results") {
            Some(Value::Array(results)) => results.first().cloned(),
            _ => Some(Value::Object(data.clone())),
        },
        Some(Value::Array(results)) => results.first().cloned(),
        Some(_) => None,
        None if body.is_object() => Some(body.clone()),
        None => None,
    }
}

/// Splits a `__next` URL into the endpoint below the division and its
/// decoded query parameters.
///
/// ```rust
/// use exact_online::rest::odata::parse_next_url;
///
/// let (path, query) = parse_next_url(
///     "https://start.exactonline.nl/api/v1/123/crm/Accounts?$skiptoken=guid'ab'&$top=60",
/// );
/// assert_eq!(path, "/crm/Accounts");
/// assert_eq!(query.get("$skiptoken").map(String::as_str), Some("guid'ab'"));
/// assert_eq!(query.get("$top").map(String::as_str), Some("60"));
/// ```
#[must_use]
pub fn parse_next_url(next_url: &str) -> (String, BTreeMap<String, String>) {
    let (location, query) = next_url.split_once('?').unwrap_or((next_url, ""));

    let path = if let Some((_, below)) = location.split_once("/api/v1/") {
        // Skip the division segment.
        below
            .split_once('/')
            .map_or_else(String::new, |(_, endpoint)| format!("/{endpoint}"))
    } else if let Some((_, after_scheme)) = location.split_once("://") {
        after_scheme
            .find('/')
            .map_or_else(String::new, |i| after_scheme[i..].to_string())
    } else {
        location.to_string()
    };

    let mut params = BTreeMap::new();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        // First occurrence wins, like a form decoder reading one value.
        params
            .entry(decode_component(key))
            .or_insert_with(|| decode_component(value));
    }

    (path, params)
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).map_or(spaced.clone(), std::borrow::Cow::into_owned)
}

/// Reads an integer that may be encoded as a JSON number or string.
#[must_use]
pub fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Serde helper for optional OData dates.
///
/// Unparseable values deserialize as `None`.
///
/// # Errors
///
/// Returns an error only if the input is not valid JSON.
pub fn deserialize_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).and_then(parse_datetime))
}

/// Serde helper for optional integers sent as numbers or strings.
///
/// # Errors
///
/// Returns an error only if the input is not valid JSON.
pub fn deserialize_lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(lenient_i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_odata_date_with_offset() {
        let date = parse_datetime("/Date(1704412800000+0100)/").unwrap();
        assert_eq!(date.timestamp(), 1_704_412_800);
    }

    #[test]
    fn test_parse_naive_iso_date_as_utc() {
        let date = parse_datetime("2024-01-05T00:00:00").unwrap();
        assert_eq!(date.timestamp(), 1_704_412_800);
    }

    #[test]
    fn test_decode_collection_with_next() {
        let body = json!({"d": {"results": [{"ID": "a"}, {"ID": "b"}], "__next": "https://x/api/v1/1/crm/Accounts?$skiptoken=1"}});
        let (results, next) = decode_collection(&body).unwrap();
        assert_eq!(results.len(), 2);
        assert!(next.unwrap().ends_with("$skiptoken=1"));
    }

    #[test]
    fn test_decode_collection_bare_array() {
        let body = json!({"d": [{"ID": "a"}]});
        let (results, next) = decode_collection(&body).unwrap();
        assert_eq!(results.len(), 1);
        assert!(next.is_none());
    }

    #[test]
    fn test_decode_collection_rejects_missing_envelope() {
        assert!(decode_collection(&json!({"value": []})).is_none());
        assert!(decode_collection(&Value::Null).is_none());
    }

    #[test]
    fn test_decode_single_shapes() {
        assert_eq!(
            decode_single(&json!({"d": {"ID": "a"}})),
            Some(json!({"ID": "a"}))
        );
        assert_eq!(
            decode_single(&json!({"d": {"results": [{"ID": "b"}]}})),
            Some(json!({"ID": "b"}))
        );
        assert_eq!(decode_single(&json!({"d": {"results": []}})), None);
    }

    #[test]
    fn test_parse_next_url_decodes_query() {
        let (path, query) = parse_next_url(
            "https://start.exactonline.nl/api/v1/42/salesorder/SalesOrders?%24filter=Status%20eq%2012&%24skiptoken=guid%27x%27",
        );
        assert_eq!(path, "/salesorder/SalesOrders");
        assert_eq!(query.get("$filter").unwrap(), "Status eq 12");
        assert_eq!(query.get("$skiptoken").unwrap(), "guid'x'");
    }

    #[test]
    fn test_parse_next_url_without_api_prefix() {
        let (path, query) = parse_next_url("http://127.0.0.1:8080/crm/Accounts");
        assert_eq!(path, "/crm/Accounts");
        assert!(query.is_empty());
    }

    #[test]
    fn test_lenient_i64() {
        assert_eq!(lenient_i64(&json!(42)), Some(42));
        assert_eq!(lenient_i64(&json!("1234")), Some(1234));
        assert_eq!(lenient_i64(&json!("n/a")), None);
        assert_eq!(lenient_i64(&Value::Null), None);
    }
}
