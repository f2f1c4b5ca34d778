//! Secret vault adapter. Raw OAuth tokens live only here, keyed by
//! connection id; the relational store never sees them.

pub mod http;
pub mod memory;

use crate::error::BeamError;
use async_trait::async_trait;

pub use http::HttpVault;
pub use memory::MemoryVault;

/// Store/fetch/delete the encrypted token pair for a connection.
///
/// Contract: plaintext tokens are handed to the immediate caller for one
/// API call and are never persisted outside the vault. Any failure means
/// "credentials unavailable": surfaced as [`BeamError::Vault`] and never
/// retried at this layer.
#[async_trait]
pub trait TokenVault: Send + Sync {
    async fn store(
        &self,
        connection_id: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<(), BeamError>;

    async fn access_token(&self, connection_id: &str) -> Result<String, BeamError>;

    async fn refresh_token(&self, connection_id: &str) -> Result<String, BeamError>;

    async fn delete(&self, connection_id: &str) -> Result<(), BeamError>;
}
