//! OAuth 2.0 authorization code flow for Exact Online.
//!
//! The flow has three steps:
//!
//! 1. Redirect the user to [`get_authorization_url`], passing a [`StateParam`].
//! 2. On the callback, compare the returned `state` with [`StateParam::matches`].
//! 3. Hand the returned `code` to
//!    [`TokenManager::exchange_code`](crate::TokenManager::exchange_code),
//!    which exchanges it and persists the resulting token pair.
//!
//! From then on the [`TokenManager`](crate::TokenManager) refreshes the pair
//! as needed. [`request_code_exchange`] and [`request_token_refresh`] are the
//! raw token endpoint calls it uses.

mod authorize;
mod grant;
mod state;

pub use authorize::get_authorization_url;
pub use grant::{request_code_exchange, request_token_refresh};
pub use state::StateParam;
