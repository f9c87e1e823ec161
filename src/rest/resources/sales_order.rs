//! Sales order resource implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rest::odata;
use crate::rest::{Listable, Resource, Syncable, Writable};

/// Status of a sales order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesOrderStatus {
    Open,
    Partial,
    Complete,
    Cancelled,
    /// A status code this crate does not know.
    Other(i32),
}

impl From<i32> for SalesOrderStatus {
    fn from(code: i32) -> Self {
        match code {
            12 => Self::Open,
            20 => Self::Partial,
            21 => Self::Complete,
            45 => Self::Cancelled,
            other => Self::Other(other),
        }
    }
}

/// A sales order header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SalesOrder {
    #[serde(rename = "OrderID")]
    pub order_id: Uuid,
    #[serde(default)]
    pub order_number: Option<i64>,
    #[serde(default)]
    pub ordered_by: Option<Uuid>,
    #[serde(default)]
    pub ordered_by_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub your_ref: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "AmountDC")]
    pub amount_dc: Option<f64>,
    #[serde(default, rename = "AmountFC")]
    pub amount_fc: Option<f64>,
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default, deserialize_with = "odata::deserialize_datetime")]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "odata::deserialize_datetime")]
    pub delivery_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "odata::deserialize_datetime")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "odata::deserialize_lenient_i64")]
    pub timestamp: Option<i64>,
}

impl SalesOrder {
    /// Returns the typed order status.
    #[must_use]
    pub fn order_status(&self) -> Option<SalesOrderStatus> {
        self.status.map(SalesOrderStatus::from)
    }
}

impl Resource for SalesOrder {
    const NAME: &'static str = "sales_orders";
    const ENDPOINT: &'static str = "/salesorder/SalesOrders";
    const ID_FIELD: &'static str = "OrderID";
}

impl Listable for SalesOrder {}

impl Writable for SalesOrder {}

impl Syncable for SalesOrder {
    const SYNC_ENDPOINT: &'static str = "/sync/SalesOrder/SalesOrderHeaders";
    const BOOTSTRAP_WATERMARK: i64 = 0;
}
