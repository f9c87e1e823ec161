//! The credential store seam.
//!
//! The client never owns durable storage. Callers implement
//! [`CredentialStore`] on top of their database, keychain or secret manager;
//! [`MemoryCredentialStore`] is provided for tests and short-lived processes.

use crate::auth::errors::StorageError;
use crate::auth::token::TokenState;
use crate::config::Division;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Persisted progress of an incremental sync for one `(division, resource)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// The last watermark that was durably processed.
    pub timestamp: i64,
    /// When the watermark was saved.
    pub last_sync: DateTime<Utc>,
}

impl SyncState {
    /// Creates a sync state saved now.
    #[must_use]
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            last_sync: Utc::now(),
        }
    }
}

/// Durable storage for the token pair and sync watermarks.
///
/// Exact Online rotates refresh tokens on every refresh, so
/// [`save_tokens`](Self::save_tokens) must only return `Ok` once the new pair
/// is durable. Saves must be idempotent: writing the same value twice is
/// harmless.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Loads the current token pair, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read.
    async fn load_tokens(&self) -> Result<Option<TokenState>, StorageError>;

    /// Persists a token pair.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the pair could not be made durable.
    async fn save_tokens(&self, tokens: &TokenState) -> Result<(), StorageError>;

    /// Loads the sync state for a resource in a division.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read.
    async fn get_sync_state(
        &self,
        division: Division,
        resource: &str,
    ) -> Result<Option<SyncState>, StorageError>;

    /// Persists the sync state for a resource in a division.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the state could not be made durable.
    async fn save_sync_state(
        &self,
        division: Division,
        resource: &str,
        state: &SyncState,
    ) -> Result<(), StorageError>;
}

/// In-memory [`CredentialStore`].
///
/// Nothing survives the process; a refreshed token pair is lost on exit.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: Mutex<Option<TokenState>>,
    sync_states: Mutex<HashMap<(Division, String), SyncState>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds a token pair.
    #[must_use]
    pub fn with_tokens(tokens: TokenState) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
            sync_states: Mutex::default(),
        }
    }

    fn poisoned() -> StorageError {
        StorageError::new("memory store lock poisoned")
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load_tokens(&self) -> Result<Option<TokenState>, StorageError> {
        let tokens = self.tokens.lock().map_err(|_| Self::poisoned())?;
        Ok(tokens.clone())
    }

    async fn save_tokens(&self, tokens: &TokenState) -> Result<(), StorageError> {
        let mut slot = self.tokens.lock().map_err(|_| Self::poisoned())?;
        *slot = Some(tokens.clone());
        Ok(())
    }

    async fn get_sync_state(
        &self,
        division: Division,
        resource: &str,
    ) -> Result<Option<SyncState>, StorageError> {
        let states = self.sync_states.lock().map_err(|_| Self::poisoned())?;
        Ok(states.get(&(division, resource.to_string())).cloned())
    }

    async fn save_sync_state(
        &self,
        division: Division,
        resource: &str,
        state: &SyncState,
    ) -> Result<(), StorageError> {
        let mut states = self.sync_states.lock().map_err(|_| Self::poisoned())?;
        states.insert((division, resource.to_string()), state.clone());
        Ok(())
    }
}
