//! Resource implementations.
//!
//! Each resource declares its endpoints and opts into the capability traits
//! its endpoint supports:
//!
//! | Resource | Listable | Writable | Sync |
//! |---|---|---|---|
//! | [`Account`] | yes | yes | native, from watermark 1 |
//! | [`SalesOrder`] | yes | yes | native, from watermark 0 |
//! | [`HrmDivision`] | yes | no | modified-since |
//! | [`DeletedRecord`] | no | no | native, from watermark 1 |
//!
//! ```rust,ignore
//! use exact_online::rest::{Listable, ListParams, Syncable};
//! use exact_online::rest::resources::Account;
//!
//! let suppliers = Account::list_all(
//!     &client,
//!     division,
//!     &ListParams::new().filter("IsSupplier eq true"),
//! )
//! .await?;
//!
//! let step = Account::sync(&client, division, Account::BOOTSTRAP_WATERMARK, &ListParams::new()).await?;
//! ```

mod account;
mod deleted;
mod division;
mod sales_order;

pub use account::Account;
pub use deleted::{DeletedRecord, EntityType};
pub use division::HrmDivision;
pub use sales_order::{SalesOrder, SalesOrderStatus};
