//! Authentication for the Exact Online API.
//!
//! # Overview
//!
//! - [`TokenState`]: The access/refresh token pair with its UTC expiry
//! - [`CredentialStore`]: The caller-supplied durable storage seam
//! - [`MemoryCredentialStore`]: An in-memory store for tests
//! - [`TokenManager`]: Single-flight refresh and persistence of the token pair
//! - [`oauth`]: Authorization URL, code exchange and refresh grant calls
//!
//! # Rotating refresh tokens
//!
//! Every refresh returns a new refresh token and invalidates the old one. The
//! [`TokenManager`] persists the new pair through the [`CredentialStore`]
//! before any caller sees the new access token; if persisting fails the
//! refresh is reported as a [`AuthError::Storage`] failure.

mod errors;
mod manager;
pub mod oauth;
mod store;
mod token;

pub use errors::{AuthError, StorageError};
pub use manager::{TokenLifecycle, TokenManager};
pub use store::{CredentialStore, MemoryCredentialStore, SyncState};
pub use token::{TokenResponse, TokenState, DEFAULT_EXPIRES_IN};
