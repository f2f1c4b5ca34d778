use crate::error::BeamError;
use crate::vault::TokenVault;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory vault for tests and local development. Counts reads so tests
/// can assert one token fetch per credential group.
#[derive(Default)]
pub struct MemoryVault {
    secrets: Mutex<HashMap<String, (String, String)>>,
    reads: Mutex<HashMap<String, u32>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access_token_reads(&self, connection_id: &str) -> u32 {
        self.reads
            .lock()
            .unwrap()
            .get(connection_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn contains(&self, connection_id: &str) -> bool {
        self.secrets.lock().unwrap().contains_key(connection_id)
    }
}

#[async_trait]
impl TokenVault for MemoryVault {
    async fn store(
        &self,
        connection_id: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<(), BeamError> {
        self.secrets.lock().unwrap().insert(
            connection_id.to_string(),
            (access_token.to_string(), refresh_token.to_string()),
        );
        Ok(())
    }

    async fn access_token(&self, connection_id: &str) -> Result<String, BeamError> {
        *self
            .reads
            .lock()
            .unwrap()
            .entry(connection_id.to_string())
            .or_insert(0) += 1;
        self.secrets
            .lock()
            .unwrap()
            .get(connection_id)
            .map(|(access, _)| access.clone())
            .ok_or_else(|| BeamError::Vault(format!("no secret for connection {connection_id}")))
    }

    async fn refresh_token(&self, connection_id: &str) -> Result<String, BeamError> {
        self.secrets
            .lock()
            .unwrap()
            .get(connection_id)
            .map(|(_, refresh)| refresh.clone())
            .ok_or_else(|| BeamError::Vault(format!("no secret for connection {connection_id}")))
    }

    async fn delete(&self, connection_id: &str) -> Result<(), BeamError> {
        self.secrets.lock().unwrap().remove(connection_id);
        Ok(())
    }
}
