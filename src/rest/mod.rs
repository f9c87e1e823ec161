//! REST resource infrastructure for Exact Online.
//!
//! This module provides:
//!
//! - **Capability traits**: [`Resource`], [`Listable`], [`Writable`],
//!   [`Syncable`] and [`ModifiedSinceSyncable`], which resource types
//!   implement selectively
//! - **Cursor listing**: [`ListResult`] pages linked by [`PageCursor`]
//! - **Incremental sync**: [`SyncResult`] with a [`SyncBaseline`] that says
//!   which of the two sync modes produced it
//! - **Stored sync**: [`sync_to_store`], which persists the watermark after
//!   every page
//! - **OData helpers**: [`odata`]
//! - **Resources**: [`resources`]
//!
//! # Example: Listing
//!
//! ```rust,ignore
//! use exact_online::rest::{Listable, ListParams};
//! use exact_online::rest::resources::Account;
//!
//! let mut page = Account::list(&client, division, &ListParams::new().top(60)).await?;
//! loop {
//!     for account in page.iter() {
//!         println!("{:?}", account.name);
//!     }
//!     match page.next.take() {
//!         Some(cursor) => page = Account::list_next(&client, division, &cursor).await?,
//!         None => break,
//!     }
//! }
//! ```
//!
//! # Example: Sync
//!
//! ```rust,ignore
//! use exact_online::rest::{ListParams, Syncable};
//! use exact_online::rest::resources::SalesOrder;
//!
//! let mut watermark = SalesOrder::BOOTSTRAP_WATERMARK;
//! loop {
//!     let step = SalesOrder::sync(&client, division, watermark, &ListParams::new()).await?;
//!     store_orders(step.items).await?;
//!     watermark = step.baseline.watermark().unwrap_or(watermark);
//!     if !step.has_more {
//!         break;
//!     }
//! }
//! save_watermark(watermark).await?;
//! ```

mod errors;
pub mod odata;
mod resource;
mod response;
mod sync;

pub mod resources;

pub use errors::{ProcessingError, ResourceError};
pub use resource::{
    ListParams, Listable, ModifiedSinceSyncable, Resource, Syncable, Writable, MAX_PAGE_SIZE,
    SYNC_PAGE_SIZE,
};
pub use response::{ListResult, PageCursor, SyncBaseline, SyncMode, SyncResult};
pub use sync::{sync_to_store, SyncSummary};
