//! HRM division resource implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rest::odata;
use crate::rest::{Listable, ModifiedSinceSyncable, Resource};

/// A division (company administration) the signed-in user can access.
///
/// Read-only. Keyed by its integer `Code` rather than a GUID, and synced by
/// modification time because there is no sync endpoint for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct HrmDivision {
    pub code: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "HID")]
    pub hid: Option<i64>,
    #[serde(default)]
    pub main: Option<bool>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer: Option<Uuid>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default, rename = "VATNumber")]
    pub vat_number: Option<String>,
    #[serde(default, deserialize_with = "odata::deserialize_datetime")]
    pub archive_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "odata::deserialize_datetime")]
    pub modified: Option<DateTime<Utc>>,
}

impl Resource for HrmDivision {
    const NAME: &'static str = "divisions";
    const ENDPOINT: &'static str = "/hrm/Divisions";
    const ID_FIELD: &'static str = "Code";

    fn key_predicate(id: &str) -> String {
        format!("({id})")
    }
}

impl Listable for HrmDivision {}

impl ModifiedSinceSyncable for HrmDivision {}
