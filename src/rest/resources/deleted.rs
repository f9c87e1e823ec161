//! Deleted records from the central `/sync/Deleted` endpoint.
//!
//! Exact Online keeps deletions for about two months. A consumer that does
//! not sync deletions within that window may keep records that no longer
//! exist upstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rest::odata;
use crate::rest::{Resource, Syncable};

macro_rules! entity_types {
    ($($variant:ident = $code:literal,)+) => {
        /// The entity a deleted record belonged to.
        ///
        /// Unknown codes are preserved in [`EntityType::Unknown`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EntityType {
            $(
                #[allow(missing_docs)]
                $variant,
            )+
            /// A code this crate does not know.
            Unknown(u16),
        }

        impl EntityType {
            /// Returns the upstream code.
            #[must_use]
            pub const fn code(&self) -> u16 {
                match self {
                    $(Self::$variant => $code,)+
                    Self::Unknown(code) => *code,
                }
            }
        }

        impl From<u16> for EntityType {
            fn from(code: u16) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    other => Self::Unknown(other),
                }
            }
        }
    };
}

entity_types! {
    TransactionLines = 1,
    Accounts = 2,
    Addresses = 3,
    Attachments = 4,
    Contacts = 5,
    Documents = 6,
    GlAccounts = 7,
    ItemPrices = 8,
    Items = 9,
    PaymentTerms = 10,
    SalesInvoices = 13,
    TimeCostTransactions = 14,
    StockPositions = 15,
    GoodsDeliveries = 16,
    GoodsDeliveryLines = 17,
    GlClassifications = 18,
    ItemWarehouses = 19,
    StorageLocationStockPositions = 20,
    Projects = 21,
    PurchaseOrders = 22,
    Subscriptions = 23,
    SubscriptionLines = 24,
    ProjectWbs = 25,
    ProjectPlanning = 26,
    LeaveAbsenceHoursByDay = 27,
    SerialBatchNumbers = 28,
    StockSerialBatchNumbers = 29,
    ItemAccounts = 30,
    DiscountTables = 31,
    SalesOrderHeaders = 32,
    SalesOrderLines = 33,
    QuotationHeaders = 34,
    QuotationLines = 35,
    ShopOrders = 36,
    ShopOrderMaterialPlans = 37,
    ShopOrderRoutingStepPlans = 38,
    Schedules = 39,
    ScheduleEntries = 40,
    ItemStorageLocations = 41,
    Employees = 42,
    Employments = 43,
    EmploymentContracts = 44,
    EmploymentOrganizations = 45,
    EmploymentClas = 46,
    EmploymentSalaries = 47,
    BankAccounts = 48,
    EmploymentTaxAuthoritiesGeneral = 49,
    ShopOrderPurchasePlanning = 50,
    ShopOrderSubOrders = 51,
    RequirementIssues = 53,
    BillOfMaterialMaterials = 54,
    BillOfMaterialVersions = 55,
    LeaveRegistrations = 56,
    LeaveBuildUpRegistrations = 57,
    AbsenceRegistrationTransactions = 58,
    AbsenceRegistrations = 59,
}

/// A record deleted upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DeletedRecord {
    #[serde(rename = "ID")]
    pub id: Uuid,
    /// The ID of the deleted record.
    pub entity_key: Uuid,
    /// Raw entity code; see [`DeletedRecord::entity`].
    pub entity_type: u16,
    pub division: u32,
    #[serde(default)]
    pub deleted_by: Option<Uuid>,
    #[serde(default, deserialize_with = "odata::deserialize_datetime")]
    pub deleted_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: i64,
}

impl DeletedRecord {
    /// Returns the typed entity this record belonged to.
    #[must_use]
    pub fn entity(&self) -> EntityType {
        EntityType::from(self.entity_type)
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    odata::deserialize_lenient_i64(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("Timestamp must be an integer"))
}

impl Resource for DeletedRecord {
    const NAME: &'static str = "_deleted";
    const ENDPOINT: &'static str = "/sync/Deleted";
}

impl Syncable for DeletedRecord {
    const SYNC_ENDPOINT: &'static str = "/sync/Deleted";
    const BOOTSTRAP_WATERMARK: i64 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_type_codes() {
        assert_eq!(EntityType::from(2), EntityType::Accounts);
        assert_eq!(EntityType::from(32), EntityType::SalesOrderHeaders);
        assert_eq!(EntityType::from(59).code(), 59);
        assert_eq!(EntityType::from(52), EntityType::Unknown(52));
        assert_eq!(EntityType::Unknown(99).code(), 99);
    }

    #[test]
    fn test_deleted_record_deserialization() {
        let record: DeletedRecord = serde_json::from_value(json!({
            "ID": "11111111-2222-3333-4444-555555555555",
            "EntityKey": "66666666-7777-8888-9999-000000000000",
            "EntityType": 22,
            "Division": 123,
            "DeletedDate": "/Date(1704412800000)/",
            "Timestamp": 5001
        }))
        .unwrap();

        assert_eq!(record.entity(), EntityType::PurchaseOrders);
        assert_eq!(record.timestamp, 5001);
        assert!(record.deleted_by.is_none());
    }

    #[test]
    fn test_deleted_record_requires_timestamp() {
        let result = serde_json::from_value::<DeletedRecord>(json!({
            "ID": "11111111-2222-3333-4444-555555555555",
            "EntityKey": "66666666-7777-8888-9999-000000000000",
            "EntityType": 22,
            "Division": 123
        }));
        assert!(result.is_err());
    }
}
