//! Capability traits for Exact Online resources.
//!
//! A resource type implements [`Resource`] to describe where it lives, and
//! then opts into the capabilities the endpoint supports:
//!
//! - [`Listable`]: `list()`, `list_next()`, `list_all()` and `get()`
//! - [`Writable`]: `create()`, `update()` and `delete()`
//! - [`Syncable`]: `sync()` against a native `/sync/...` endpoint
//! - [`ModifiedSinceSyncable`]: `sync_modified_since()` for endpoints without
//!   a sync counterpart
//!
//! All operations have default implementations; implementors only supply
//! constants.
//!
//! # Example
//!
//! ```rust,ignore
//! use exact_online::rest::{Listable, Resource, Syncable, Writable};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Clone, Deserialize)]
//! pub struct Item {
//!     #[serde(rename = "ID")]
//!     pub id: uuid::Uuid,
//!     #[serde(rename = "Code")]
//!     pub code: Option<String>,
//! }
//!
//! impl Resource for Item {
//!     const NAME: &'static str = "items";
//!     const ENDPOINT: &'static str = "/logistics/Items";
//! }
//! impl Listable for Item {}
//! impl Writable for Item {}
//! impl Syncable for Item {
//!     const SYNC_ENDPOINT: &'static str = "/sync/Logistics/Items";
//!     const BOOTSTRAP_WATERMARK: i64 = 1;
//! }
//!
//! let page = Item::list(&client, division, &ListParams::new().top(10)).await?;
//! let step = Item::sync(&client, division, 1, &ListParams::new()).await?;
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::clients::{HttpError, HttpMethod, HttpRequest, RestClient};
use crate::config::Division;
use crate::rest::odata::{self, decode_collection, decode_single, lenient_i64};
use crate::rest::{ListResult, PageCursor, ResourceError, SyncBaseline, SyncResult};

/// The largest `$top` the API accepts for cursor listing.
pub const MAX_PAGE_SIZE: u32 = 60;

/// The number of records a full sync page holds.
pub const SYNC_PAGE_SIZE: usize = 1000;

/// Query options for listing and sync.
///
/// ```rust
/// use exact_online::rest::ListParams;
///
/// let params = ListParams::new()
///     .filter("IsSupplier eq true")
///     .select(["ID", "Name"])
///     .top(500);
///
/// let query = params.to_query();
/// assert_eq!(query.get("$top").map(String::as_str), Some("60"));
/// assert_eq!(query.get("$select").map(String::as_str), Some("ID,Name"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListParams {
    /// An OData `$filter` expression.
    pub filter: Option<String>,
    /// Fields for `$select`.
    pub select: Vec<String>,
    /// Page size for cursor listing, capped at [`MAX_PAGE_SIZE`]. Ignored by
    /// native sync.
    pub top: Option<u32>,
}

impl ListParams {
    /// Creates empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `$filter` expression.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the `$select` fields.
    #[must_use]
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the page size.
    #[must_use]
    pub const fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    /// Returns the query for a cursor listing.
    #[must_use]
    pub fn to_query(&self) -> BTreeMap<String, String> {
        let top = self.top.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let mut query = self.base_query(self.filter.clone());
        query.insert("$top".to_string(), top.to_string());
        query
    }

    /// Returns the query for a native sync from `watermark`.
    ///
    /// A watermark of zero or below means a full sync, so no `Timestamp`
    /// filter is added.
    #[must_use]
    pub fn to_sync_query(&self, watermark: i64) -> BTreeMap<String, String> {
        let lower_bound = (watermark > 0).then(|| format!("Timestamp gt {watermark}"));
        self.base_query(self.combined_filter(lower_bound))
    }

    fn to_modified_query(&self, field: &str, since: Option<DateTime<Utc>>) -> BTreeMap<String, String> {
        let lower_bound = since.map(|since| format!("{field} ge {}", odata::format_datetime(since)));
        let mut query = self.to_query();
        if let Some(filter) = self.combined_filter(lower_bound) {
            query.insert("$filter".to_string(), filter);
        }
        query
    }

    fn combined_filter(&self, lower_bound: Option<String>) -> Option<String> {
        match (lower_bound, &self.filter) {
            (Some(bound), Some(filter)) => Some(format!("{bound} and ({filter})")),
            (Some(bound), None) => Some(bound),
            (None, filter) => filter.clone(),
        }
    }

    fn base_query(&self, filter: Option<String>) -> BTreeMap<String, String> {
        let mut query = BTreeMap::new();
        if let Some(filter) = filter {
            query.insert("$filter".to_string(), filter);
        }
        if !self.select.is_empty() {
            query.insert("$select".to_string(), self.select.join(","));
        }
        query
    }
}

/// Describes where a resource lives.
pub trait Resource: DeserializeOwned + Send + Sync + Sized {
    /// Name used in errors, logs and as the sync state key (e.g. "accounts").
    const NAME: &'static str;

    /// Endpoint below the division, e.g. `/crm/Accounts`.
    const ENDPOINT: &'static str;

    /// The primary key field.
    const ID_FIELD: &'static str = "ID";

    /// Returns the key predicate addressing one record.
    ///
    /// Most entities are keyed by GUID: `(guid'...')`.
    #[must_use]
    fn key_predicate(id: &str) -> String {
        format!("({})", odata::guid(id))
    }

    /// Returns the path of one record.
    #[must_use]
    fn record_path(id: &str) -> String {
        format!("{}{}", Self::ENDPOINT, Self::key_predicate(id))
    }
}

/// Resources that can be listed and fetched.
#[allow(async_fn_in_trait)]
pub trait Listable: Resource {
    /// Fetches the first page of records.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Http`] if the request fails, or a decoding
    /// error if the response is not a record collection.
    async fn list(
        client: &RestClient,
        division: Division,
        params: &ListParams,
    ) -> Result<ListResult<Self>, ResourceError> {
        let (values, next) = fetch_collection::<Self>(client, division, Self::ENDPOINT, params.to_query()).await?;
        Ok(ListResult::new(decode_records(Self::NAME, values)?, next.map(PageCursor::new)))
    }

    /// Fetches the page a cursor points at.
    ///
    /// # Errors
    ///
    /// Same as [`list`](Self::list).
    async fn list_next(
        client: &RestClient,
        division: Division,
        cursor: &PageCursor,
    ) -> Result<ListResult<Self>, ResourceError> {
        let path = if cursor.path().is_empty() {
            Self::ENDPOINT
        } else {
            cursor.path()
        };
        let (values, next) =
            fetch_collection::<Self>(client, division, path, cursor.query().clone()).await?;
        Ok(ListResult::new(decode_records(Self::NAME, values)?, next.map(PageCursor::new)))
    }

    /// Fetches every page and returns all records in page order.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; records fetched before it are
    /// discarded.
    async fn list_all(
        client: &RestClient,
        division: Division,
        params: &ListParams,
    ) -> Result<Vec<Self>, ResourceError> {
        let mut page = Self::list(client, division, params).await?;
        let mut records = Vec::new();
        loop {
            let next = page.next.take();
            records.append(&mut page.items);
            match next {
                Some(cursor) => page = Self::list_next(client, division, &cursor).await?,
                None => return Ok(records),
            }
        }
    }

    /// Fetches one record by key.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] if the record does not exist.
    async fn get(client: &RestClient, division: Division, id: &str) -> Result<Self, ResourceError> {
        let request = build_request(HttpMethod::Get, division, &Self::record_path(id), None)?;
        let response = client
            .request(request)
            .await
            .map_err(|e| not_found_or(e, Self::NAME, id))?;
        let value = decode_single(&response.body).ok_or_else(|| ResourceError::NotFound {
            resource: Self::NAME,
            id: id.to_string(),
        })?;
        decode_record(Self::NAME, value)
    }
}

/// Resources that accept POST, PUT and DELETE.
#[allow(async_fn_in_trait)]
pub trait Writable: Resource {
    /// Creates a record and returns it as stored by the API.
    ///
    /// `body` uses the API field names, e.g. `{"Name": "Acme"}`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Http`] if the API rejects the record.
    async fn create(
        client: &RestClient,
        division: Division,
        body: Value,
    ) -> Result<Self, ResourceError> {
        let request = build_request(HttpMethod::Post, division, Self::ENDPOINT, Some(body))?;
        let response = client.request(request).await?;
        let value = decode_single(&response.body)
            .ok_or(ResourceError::InvalidEnvelope { resource: Self::NAME })?;
        decode_record(Self::NAME, value)
    }

    /// Updates the given fields of a record.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] if the record does not exist.
    async fn update(
        client: &RestClient,
        division: Division,
        id: &str,
        body: Value,
    ) -> Result<(), ResourceError> {
        let request = build_request(HttpMethod::Put, division, &Self::record_path(id), Some(body))?;
        client
            .request(request)
            .await
            .map_err(|e| not_found_or(e, Self::NAME, id))?;
        Ok(())
    }

    /// Deletes a record.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] if the record does not exist.
    async fn delete(client: &RestClient, division: Division, id: &str) -> Result<(), ResourceError> {
        let request = build_request(HttpMethod::Delete, division, &Self::record_path(id), None)?;
        client
            .request(request)
            .await
            .map_err(|e| not_found_or(e, Self::NAME, id))?;
        Ok(())
    }
}

/// Resources with a native `/sync/...` endpoint.
///
/// Sync endpoints return up to [`SYNC_PAGE_SIZE`] records ordered by their
/// `Timestamp` row version. The watermark is only meaningful for this
/// resource in this division.
#[allow(async_fn_in_trait)]
pub trait Syncable: Resource {
    /// Endpoint below the division, e.g. `/sync/CRM/Accounts`.
    const SYNC_ENDPOINT: &'static str;

    /// The watermark a first sync starts from.
    ///
    /// Endpoints disagree on whether a full sync starts at 0 or 1.
    const BOOTSTRAP_WATERMARK: i64;

    /// Fetches the records changed after `watermark`.
    ///
    /// The returned baseline is the highest `Timestamp` seen, or `watermark`
    /// if the page was empty. Call again with it while `has_more` is `true`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Http`] if the request fails, or a decoding
    /// error if the response is not a record collection.
    async fn sync(
        client: &RestClient,
        division: Division,
        watermark: i64,
        params: &ListParams,
    ) -> Result<SyncResult<Self>, ResourceError> {
        let query = params.to_sync_query(watermark);
        let (values, _) = fetch_collection::<Self>(client, division, Self::SYNC_ENDPOINT, query).await?;

        let next_watermark = values
            .iter()
            .filter_map(|value| value.get("Timestamp").and_then(lenient_i64))
            .fold(watermark, i64::max);
        let has_more = values.len() >= SYNC_PAGE_SIZE;

        tracing::debug!(
            resource = Self::NAME,
            division = %division,
            watermark = next_watermark,
            records = values.len(),
            has_more,
            "Sync page fetched"
        );

        Ok(SyncResult {
            items: decode_records(Self::NAME, values)?,
            baseline: SyncBaseline::Watermark(next_watermark),
            has_more,
        })
    }
}

/// Listable resources without a sync endpoint, synced by modification time.
#[allow(async_fn_in_trait)]
pub trait ModifiedSinceSyncable: Listable {
    /// The modification time field used for filtering.
    const MODIFIED_FIELD: &'static str = "Modified";

    /// Fetches every record modified at or after `since` (all records if
    /// `None`), following all pages.
    ///
    /// The returned baseline is the latest modification time seen. Records
    /// modified exactly at the baseline are returned again by the next call.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Http`] if a request fails, or a decoding
    /// error if a response is not a record collection.
    async fn sync_modified_since(
        client: &RestClient,
        division: Division,
        since: Option<DateTime<Utc>>,
        params: &ListParams,
    ) -> Result<SyncResult<Self>, ResourceError> {
        let mut query = params.to_modified_query(Self::MODIFIED_FIELD, since);
        let mut path = Self::ENDPOINT.to_string();
        let mut latest = since;
        let mut items = Vec::new();

        loop {
            let (values, next) = fetch_collection::<Self>(client, division, &path, query).await?;
            latest = values
                .iter()
                .filter_map(|value| value.get(Self::MODIFIED_FIELD)?.as_str())
                .filter_map(odata::parse_datetime)
                .fold(latest, |latest, modified| latest.max(Some(modified)));
            items.extend(decode_records::<Self>(Self::NAME, values)?);

            let Some(next) = next else { break };
            let cursor = PageCursor::new(next);
            if !cursor.path().is_empty() {
                path = cursor.path().to_string();
            }
            query = cursor.query().clone();
        }

        tracing::debug!(
            resource = Self::NAME,
            division = %division,
            records = items.len(),
            "Modified-since sync fetched"
        );

        Ok(SyncResult {
            items,
            baseline: SyncBaseline::ModifiedSince(latest),
            has_more: false,
        })
    }
}

fn build_request(
    method: HttpMethod,
    division: Division,
    path: &str,
    body: Option<Value>,
) -> Result<HttpRequest, ResourceError> {
    let mut builder = HttpRequest::builder(method, path).division(division);
    if let Some(body) = body {
        builder = builder.json(body);
    }
    builder.build().map_err(|e| HttpError::from(e).into())
}

async fn fetch_collection<R: Resource>(
    client: &RestClient,
    division: Division,
    path: &str,
    query: BTreeMap<String, String>,
) -> Result<(Vec<Value>, Option<String>), ResourceError> {
    let request = HttpRequest::builder(HttpMethod::Get, path)
        .division(division)
        .query(query)
        .build()
        .map_err(HttpError::from)?;
    let response = client.request(request).await?;
    decode_collection(&response.body).ok_or(ResourceError::InvalidEnvelope { resource: R::NAME })
}

pub(crate) fn decode_record<T: DeserializeOwned>(
    resource: &'static str,
    value: Value,
) -> Result<T, ResourceError> {
    serde_json::from_value(value).map_err(|source| ResourceError::Deserialize { resource, source })
}

pub(crate) fn decode_records<T: DeserializeOwned>(
    resource: &'static str,
    values: Vec<Value>,
) -> Result<Vec<T>, ResourceError> {
    values
        .into_iter()
        .map(|value| decode_record(resource, value))
        .collect()
}

fn not_found_or(error: HttpError, resource: &'static str, id: &str) -> ResourceError {
    if error.status() == Some(404) {
        ResourceError::NotFound {
            resource,
            id: id.to_string(),
        }
    } else {
        error.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(rename = "ID")]
        id: String,
    }

    impl Resource for Probe {
        const NAME: &'static str = "probes";
        const ENDPOINT: &'static str = "/test/Probes";
    }

    #[test]
    fn test_list_query_caps_top() {
        let query = ListParams::new().top(1000).to_query();
        assert_eq!(query.get("$top").unwrap(), "60");

        let query = ListParams::new().top(5).to_query();
        assert_eq!(query.get("$top").unwrap(), "5");

        let query = ListParams::new().to_query();
        assert_eq!(query.get("$top").unwrap(), "60");
        assert!(!query.contains_key("$filter"));
    }

    #[test]
    fn test_sync_query_combines_filters() {
        let params = ListParams::new().filter("IsSupplier eq true");
        let query = params.to_sync_query(1234);
        assert_eq!(
            query.get("$filter").unwrap(),
            "Timestamp gt 1234 and (IsSupplier eq true)"
        );
        assert!(!query.contains_key("$top"));
    }

    #[test]
    fn test_sync_query_omits_filter_for_full_sync() {
        let query = ListParams::new().to_sync_query(0);
        assert!(query.is_empty());

        let query = ListParams::new().filter("Status eq 12").to_sync_query(0);
        assert_eq!(query.get("$filter").unwrap(), "Status eq 12");

        let query = ListParams::new().to_sync_query(1);
        assert_eq!(query.get("$filter").unwrap(), "Timestamp gt 1");
    }

    #[test]
    fn test_modified_query() {
        let since = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 3, 1, 12, 0, 0).unwrap();
        let query = ListParams::new().to_modified_query("Modified", Some(since));
        assert_eq!(
            query.get("$filter").unwrap(),
            "Modified ge datetime'2024-03-01T12:00:00'"
        );
        assert_eq!(query.get("$top").unwrap(), "60");
    }

    #[test]
    fn test_record_path_uses_guid_predicate() {
        assert_eq!(Probe::record_path("abc"), "/test/Probes(guid'abc')");
        assert_eq!(Probe::ID_FIELD, "ID");
    }

    #[test]
    fn test_decode_records_reports_resource() {
        let ok: Vec<Probe> =
            decode_records("probes", vec![serde_json::json!({"ID": "a"})]).unwrap();
        assert_eq!(ok[0].id, "a");

        let err = decode_records::<Probe>("probes", vec![serde_json::json!({"Name": "x"})]);
        assert!(matches!(
            err,
            Err(ResourceError::Deserialize { resource: "probes", .. })
        ));
    }

    #[test]
    fn test_not_found_mapping() {
        let error = HttpError::Response(crate::clients::HttpResponseError {
            code: 404,
            message: "gone".to_string(),
            attempts: 1,
        });
        assert!(matches!(
            not_found_or(error, "probes", "x"),
            ResourceError::NotFound { resource: "probes", .. }
        ));
    }
}
