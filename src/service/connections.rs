use crate::config::SchedulerConfig;
use crate::db::models::{Connection, OauthState};
use crate::db::store::Store;
use crate::error::BeamError;
use crate::middleware::auth::Caller;
use crate::pinterest::client::PinterestApi;
use crate::pinterest::pkce;
use crate::pinterest::types::Board;
use crate::vault::TokenVault;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// How long one authorization round-trip may take before its state record
/// goes stale.
const OAUTH_STATE_TTL_MINUTES: i64 = 10;

const INVALID_STATE: &str = "invalid or expired state";
const EXPIRED_STATE: &str = "OAuth state expired";

#[derive(Debug, Serialize)]
pub struct InitiatedOauth {
    pub auth_url: String,
}

#[derive(Debug, Serialize)]
pub struct CompletedOauth {
    pub project_id: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    pub refreshed: u32,
    pub deactivated: u32,
    pub purged_states: u64,
}

/// OAuth connection lifecycle: authorization, completion, disconnect and
/// the periodic token refresh sweep.
pub struct ConnectionService {
    store: Store,
    vault: Arc<dyn TokenVault>,
    api: Arc<dyn PinterestApi>,
    refresh_lookahead: ChronoDuration,
}

impl ConnectionService {
    pub fn new(
        store: Store,
        vault: Arc<dyn TokenVault>,
        api: Arc<dyn PinterestApi>,
        cfg: &SchedulerConfig,
    ) -> Self {
        Self {
            store,
            vault,
            api,
            refresh_lookahead: ChronoDuration::days(cfg.refresh_lookahead_days),
        }
    }

    /// Begin authorization for a project the caller's tenant owns. Each call
    /// mints an independent state record; abandoned ones simply expire.
    pub async fn init_oauth(
        &self,
        caller: &Caller,
        project_id: &str,
    ) -> Result<InitiatedOauth, BeamError> {
        let project = self
            .store
            .project_for_tenant(project_id, &caller.tenant_id)
            .await?
            .ok_or(BeamError::NotFound("project"))?;

        let verifier = pkce::code_verifier();
        let state = pkce::state_token();
        // Validates the client credentials before anything is persisted.
        let auth_url = self.api.authorize_url(&state, &verifier)?;

        let now = Utc::now();
        let record = OauthState {
            state,
            verifier,
            project_id: project.id.clone(),
            tenant_id: caller.tenant_id.clone(),
            user_id: caller.user_id.clone(),
            created_at: now,
            expires_at: now + ChronoDuration::minutes(OAUTH_STATE_TTL_MINUTES),
        };
        self.store.insert_oauth_state(&record).await?;
        info!(project_id = %project.id, "oauth authorization initiated");
        Ok(InitiatedOauth {
            auth_url: auth_url.to_string(),
        })
    }

    /// Finish the round-trip: validate the state record, exchange the code,
    /// upsert the connection and store its tokens. The record is single-use
    /// and is deleted on every exit path past the lookup, so a half-consumed
    /// authorization code cannot be replayed.
    pub async fn complete_oauth(
        &self,
        code: &str,
        state: &str,
    ) -> Result<CompletedOauth, BeamError> {
        let Some(record) = self.store.oauth_state(state).await? else {
            return Err(BeamError::OauthFlow(INVALID_STATE.to_string()));
        };

        if record.expires_at <= Utc::now() {
            self.store.delete_oauth_state(state).await?;
            return Err(BeamError::OauthFlow(EXPIRED_STATE.to_string()));
        }

        match self.establish_connection(&record, code).await {
            Ok(done) => {
                self.store.delete_oauth_state(state).await?;
                Ok(done)
            }
            Err(e) => {
                if let Err(del_err) = self.store.delete_oauth_state(state).await {
                    warn!(error = %del_err, "failed to delete oauth state after error");
                }
                Err(e)
            }
        }
    }

    async fn establish_connection(
        &self,
        record: &OauthState,
        code: &str,
    ) -> Result<CompletedOauth, BeamError> {
        let grant = self.api.exchange_code(code, &record.verifier).await?;
        let refresh_token = grant.refresh_token.clone().ok_or_else(|| {
            BeamError::TokenRejected("authorization response missing refresh_token".to_string())
        })?;
        let account = self.api.fetch_account(&grant.access_token).await?;

        let expires_at = Utc::now()
            + ChronoDuration::from_std(grant.expires_in)
                .unwrap_or_else(|_| ChronoDuration::hours(1));
        let connection = self
            .store
            .upsert_connection(
                &record.tenant_id,
                &account.id,
                Some(&account.username),
                grant.scope.as_deref(),
                expires_at,
            )
            .await?;

        self.vault
            .store(&connection.id, &grant.access_token, &refresh_token)
            .await?;
        self.store
            .link_project_connection(&record.project_id, &connection.id)
            .await?;

        info!(
            project_id = %record.project_id,
            connection_id = %connection.id,
            username = %account.username,
            "oauth connection established"
        );
        Ok(CompletedOauth {
            project_id: record.project_id.clone(),
            username: account.username,
        })
    }

    /// Unlink the project; purge the connection and its vault tokens only
    /// when no other project still references it.
    pub async fn disconnect(&self, caller: &Caller, project_id: &str) -> Result<(), BeamError> {
        let project = self
            .store
            .project_for_tenant(project_id, &caller.tenant_id)
            .await?
            .ok_or(BeamError::NotFound("project"))?;

        let Some(connection_id) = project.connection_id else {
            return Ok(());
        };

        self.store.unlink_project_connection(&project.id).await?;

        let remaining = self
            .store
            .count_projects_for_connection(&connection_id)
            .await?;
        if remaining == 0 {
            self.vault.delete(&connection_id).await?;
            self.store.delete_connection(&connection_id).await?;
            info!(connection_id = %connection_id, "connection removed with its vault tokens");
        } else {
            info!(
                connection_id = %connection_id,
                remaining,
                "connection still referenced; left in place"
            );
        }
        Ok(())
    }

    pub async fn connection_status(
        &self,
        caller: &Caller,
        project_id: &str,
    ) -> Result<ConnectionStatus, BeamError> {
        let connection = self.connection_for_project(caller, project_id).await?;
        Ok(match connection {
            Some(conn) => ConnectionStatus {
                connected: true,
                username: conn.username,
                account_id: Some(conn.account_id),
                token_expires_at: Some(conn.token_expires_at),
                is_active: Some(conn.is_active),
                last_error: conn.last_error,
            },
            None => ConnectionStatus {
                connected: false,
                username: None,
                account_id: None,
                token_expires_at: None,
                is_active: None,
                last_error: None,
            },
        })
    }

    /// Board listing for the UI's board picker, through the project's
    /// connection.
    pub async fn boards(&self, caller: &Caller, project_id: &str) -> Result<Vec<Board>, BeamError> {
        let connection = self
            .connection_for_project(caller, project_id)
            .await?
            .ok_or(BeamError::NotFound("connection"))?;
        let token = self.vault.access_token(&connection.id).await?;
        self.api.fetch_boards(&token).await
    }

    async fn connection_for_project(
        &self,
        caller: &Caller,
        project_id: &str,
    ) -> Result<Option<Connection>, BeamError> {
        let project = self
            .store
            .project_for_tenant(project_id, &caller.tenant_id)
            .await?
            .ok_or(BeamError::NotFound("project"))?;
        match project.connection_id {
            Some(id) => self.store.connection_by_id(&id).await,
            None => Ok(None),
        }
    }

    /// Refresh every active connection whose token expires inside the
    /// lookahead window. A failure deactivates that connection with a
    /// descriptive `last_error` and is not retried within the sweep; the
    /// expiry condition persists, so the next run picks it up again if the
    /// operator reactivates it.
    pub async fn refresh_sweep(&self) -> Result<SweepReport, BeamError> {
        let cutoff = Utc::now() + self.refresh_lookahead;
        let expiring = self.store.connections_expiring_before(cutoff).await?;
        info!(count = expiring.len(), "refresh sweep selected connections");

        let mut report = SweepReport::default();
        for connection in expiring {
            match self.refresh_connection(&connection).await {
                Ok(()) => report.refreshed += 1,
                Err(e) => {
                    warn!(
                        connection_id = %connection.id,
                        account_id = %connection.account_id,
                        error = %e,
                        "token refresh failed; deactivating connection"
                    );
                    let reason = format!("token refresh failed: {e}");
                    self.store
                        .mark_connection_inactive(&connection.id, &reason)
                        .await?;
                    report.deactivated += 1;
                }
            }
        }

        report.purged_states = self.store.purge_expired_oauth_states(Utc::now()).await?;
        info!(
            refreshed = report.refreshed,
            deactivated = report.deactivated,
            purged_states = report.purged_states,
            "refresh sweep finished"
        );
        Ok(report)
    }

    async fn refresh_connection(&self, connection: &Connection) -> Result<(), BeamError> {
        let refresh_token = self.vault.refresh_token(&connection.id).await?;
        let grant = self.api.refresh_token(&refresh_token).await?;
        // The platform may rotate the refresh token or keep the old one.
        let next_refresh = grant.refresh_token.unwrap_or(refresh_token);
        self.vault
            .store(&connection.id, &grant.access_token, &next_refresh)
            .await?;
        let expires_at = Utc::now()
            + ChronoDuration::from_std(grant.expires_in)
                .unwrap_or_else(|_| ChronoDuration::hours(1));
        self.store
            .update_connection_expiry(&connection.id, expires_at)
            .await?;
        info!(connection_id = %connection.id, "access token refreshed");
        Ok(())
    }
}
