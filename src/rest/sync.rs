//! Stored incremental sync.
//!
//! [`sync_to_store`] runs the native sync loop for one resource and keeps its
//! watermark in the [`CredentialStore`]:
//!
//! 1. read the stored watermark, or start from the resource's bootstrap value
//! 2. fetch a page changed after the watermark
//! 3. hand the page to the caller's callback
//! 4. persist the page's watermark
//! 5. repeat while the page was full
//!
//! Delivery is at-least-once. If the process stops between steps 3 and 4,
//! the next run fetches the same page again, so the callback must be
//! idempotent (upserts keyed by ID).

use std::future::Future;

use crate::auth::{CredentialStore, SyncState};
use crate::clients::RestClient;
use crate::config::Division;
use crate::rest::errors::ProcessingError;
use crate::rest::{ListParams, ResourceError, Syncable};

/// Totals of a completed stored sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncSummary {
    /// The number of pages fetched.
    pub pages: u32,
    /// The number of records handed to the callback.
    pub records: usize,
    /// The watermark persisted at the end of the run.
    pub watermark: i64,
}

/// Syncs a resource from its stored watermark until no more changes remain.
///
/// # Errors
///
/// - [`ResourceError::Storage`] if the sync state cannot be read or written
/// - [`ResourceError::Processing`] if the callback fails; the page's
///   watermark is not persisted
/// - any error of [`Syncable::sync`]
///
/// # Example
///
/// ```rust,ignore
/// use exact_online::rest::{sync_to_store, ListParams};
/// use exact_online::rest::resources::Account;
///
/// let summary = sync_to_store::<Account, _, _>(
///     &client,
///     store.as_ref(),
///     division,
///     &ListParams::new(),
///     |accounts| async move {
///         db.upsert_accounts(&accounts).await?;
///         Ok(())
///     },
/// )
/// .await?;
/// println!("{} records, watermark {}", summary.records, summary.watermark);
/// ```
pub async fn sync_to_store<R, F, Fut>(
    client: &RestClient,
    store: &dyn CredentialStore,
    division: Division,
    params: &ListParams,
    mut process: F,
) -> Result<SyncSummary, ResourceError>
where
    R: Syncable,
    F: FnMut(Vec<R>) -> Fut,
    Fut: Future<Output = Result<(), ProcessingError>>,
{
    let mut watermark = store
        .get_sync_state(division, R::NAME)
        .await?
        .map_or(R::BOOTSTRAP_WATERMARK, |state| state.timestamp);
    let mut summary = SyncSummary {
        pages: 0,
        records: 0,
        watermark,
    };

    loop {
        let page = R::sync(client, division, watermark, params).await?;
        let next = page.baseline.watermark().unwrap_or(watermark);
        summary.pages += 1;
        summary.records += page.items.len();

        process(page.items)
            .await
            .map_err(|source| ResourceError::Processing {
                resource: R::NAME,
                source,
            })?;

        store
            .save_sync_state(division, R::NAME, &SyncState::new(next))
            .await?;
        summary.watermark = next;

        if !page.has_more {
            break;
        }
        if next <= watermark {
            // A full page that did not advance the watermark would repeat forever.
            tracing::warn!(
                resource = R::NAME,
                division = %division,
                watermark,
                "Sync page did not advance the watermark; stopping"
            );
            break;
        }
        watermark = next;
    }

    tracing::debug!(
        resource = R::NAME,
        division = %division,
        pages = summary.pages,
        records = summary.records,
        watermark = summary.watermark,
        "Sync completed"
    );
    Ok(summary)
}
