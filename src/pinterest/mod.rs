//! Pinterest v5 API client: OAuth exchanges, account identity, boards
//! listing and the rate-limit-aware create-pin call.

pub mod client;
pub mod pkce;
pub mod retry;
pub mod types;

pub use client::{PinterestApi, PinterestClient};
pub use retry::BackoffPolicy;
pub use types::{Account, Board, CreatedPin, MediaSource, PinPayload, TokenGrant};
