//! Account resource implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rest::odata;
use crate::rest::{Listable, Resource, Syncable, Writable};

/// A CRM account: a customer, a supplier, or both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    #[serde(rename = "ID")]
    pub id: Uuid,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub search_code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub is_supplier: Option<bool>,
    #[serde(default)]
    pub is_sales: Option<bool>,
    #[serde(default)]
    pub blocked: Option<bool>,
    #[serde(default, rename = "VATNumber")]
    pub vat_number: Option<String>,
    #[serde(default, deserialize_with = "odata::deserialize_datetime")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "odata::deserialize_datetime")]
    pub modified: Option<DateTime<Utc>>,
    /// Row version; only present on sync responses.
    #[serde(default, deserialize_with = "odata::deserialize_lenient_i64")]
    pub timestamp: Option<i64>,
}

impl Resource for Account {
    const NAME: &'static str = "accounts";
    const ENDPOINT: &'static str = "/crm/Accounts";
}

impl Listable for Account {}

impl Writable for Account {}

impl Syncable for Account {
    const SYNC_ENDPOINT: &'static str = "/sync/CRM/Accounts";
    const BOOTSTRAP_WATERMARK: i64 = 1;
}
