use crate::config::VaultConfig;
use crate::error::BeamError;
use crate::vault::TokenVault;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct SecretBody {
    access_token: String,
    refresh_token: String,
}

/// REST adapter for the secret service: one secret per connection at
/// `{base}/secrets/connections/{id}`, bearer-authenticated.
pub struct HttpVault {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpVault {
    pub fn new(cfg: &VaultConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("pinbeam-vault/1.0")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("FATAL: initialize vault HTTP client failed");
        Self {
            client,
            base_url: cfg.url.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
        }
    }

    fn secret_url(&self, connection_id: &str) -> String {
        format!("{}/secrets/connections/{}", self.base_url, connection_id)
    }

    async fn fetch(&self, connection_id: &str) -> Result<SecretBody, BeamError> {
        let resp = self
            .client
            .get(self.secret_url(connection_id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| BeamError::Vault(format!("fetch failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(BeamError::Vault(format!(
                "fetch returned {} for connection {connection_id}",
                resp.status()
            )));
        }
        resp.json::<SecretBody>()
            .await
            .map_err(|e| BeamError::Vault(format!("malformed secret payload: {e}")))
    }
}

#[async_trait]
impl TokenVault for HttpVault {
    async fn store(
        &self,
        connection_id: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<(), BeamError> {
        let body = SecretBody {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
        };
        let resp = self
            .client
            .put(self.secret_url(connection_id))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| BeamError::Vault(format!("store failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(BeamError::Vault(format!(
                "store returned {} for connection {connection_id}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn access_token(&self, connection_id: &str) -> Result<String, BeamError> {
        Ok(self.fetch(connection_id).await?.access_token)
    }

    async fn refresh_token(&self, connection_id: &str) -> Result<String, BeamError> {
        Ok(self.fetch(connection_id).await?.refresh_token)
    }

    async fn delete(&self, connection_id: &str) -> Result<(), BeamError> {
        let resp = self
            .client
            .delete(self.secret_url(connection_id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| BeamError::Vault(format!("delete failed: {e}")))?;
        // Deleting an already-absent secret is fine.
        if !resp.status().is_success() && resp.status().as_u16() != 404 {
            return Err(BeamError::Vault(format!(
                "delete returned {} for connection {connection_id}",
                resp.status()
            )));
        }
        Ok(())
    }
}
