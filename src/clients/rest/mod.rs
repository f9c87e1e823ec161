//! The REST client context object.
//!
//! [`RestClient`] is the entry point for calls to the Exact Online REST API.
//! It owns the request pipeline, and through it the token manager and the
//! rate limiter. Resource traits and batches take a `&RestClient`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use exact_online::{RestClient, ExactConfig, Division, MemoryCredentialStore};
//!
//! let client = RestClient::new(config, Arc::new(MemoryCredentialStore::new()))?;
//! let division = Division::new(123456)?;
//!
//! let response = client.get(division, "/crm/Accounts", &[("$select", "ID,Name")]).await?;
//! println!("Accounts: {}", response.body);
//! ```

mod client;

pub use client::RestClient;
