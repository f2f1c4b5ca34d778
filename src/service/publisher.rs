use crate::config::PublishConfig;
use crate::db::models::DuePin;
use crate::db::store::Store;
use crate::error::BeamError;
use crate::middleware::auth::Caller;
use crate::pinterest::client::PinterestApi;
use crate::pinterest::types::{MediaSource, PinPayload};
use crate::vault::TokenVault;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const NO_CONNECTION_ERROR: &str = "no account connected";

const TITLE_MAX_CHARS: usize = 100;
const DESCRIPTION_MAX_CHARS: usize = 800;
const ALT_TEXT_MAX_CHARS: usize = 500;

#[derive(Debug, Default, Serialize)]
pub struct PublishReport {
    pub selected: usize,
    pub published: u32,
    pub failed: u32,
    pub skipped: u32,
}

enum PinOutcome {
    Published,
    Failed,
    Skipped,
}

/// Drives due pins through the platform API. The scheduled dispatcher and
/// the manual entry points share the same grouped, strictly sequential
/// per-pin routine; the only difference is how the pins are selected.
pub struct Publisher {
    store: Store,
    vault: Arc<dyn TokenVault>,
    api: Arc<dyn PinterestApi>,
    pacing: Duration,
    media_base_url: String,
}

impl Publisher {
    pub fn new(
        store: Store,
        vault: Arc<dyn TokenVault>,
        api: Arc<dyn PinterestApi>,
        cfg: &PublishConfig,
    ) -> Self {
        Self {
            store,
            vault,
            api,
            pacing: Duration::from_secs(cfg.pacing_secs),
            media_base_url: cfg.media_base_url.clone(),
        }
    }

    /// Scheduled entry point: everything currently due, across all tenants.
    pub async fn publish_due(&self) -> Result<PublishReport, BeamError> {
        let due = self.store.due_pins(Utc::now()).await?;
        info!(count = due.len(), "publish run selected due pins");
        self.process(due).await
    }

    /// Manual entry point for a single pin.
    pub async fn publish_one(
        &self,
        caller: &Caller,
        pin_id: &str,
    ) -> Result<PublishReport, BeamError> {
        self.publish_many(caller, &[pin_id.to_string()]).await
    }

    /// Manual entry point for an explicit list. All pins must belong to the
    /// caller's tenant; the routine itself is the scheduled one.
    pub async fn publish_many(
        &self,
        caller: &Caller,
        pin_ids: &[String],
    ) -> Result<PublishReport, BeamError> {
        let pins = self
            .store
            .pins_for_tenant(pin_ids, &caller.tenant_id)
            .await?;

        let mut requested: Vec<&String> = pin_ids.iter().collect();
        requested.sort();
        requested.dedup();
        if pins.len() != requested.len() {
            return Err(BeamError::NotFound("pin"));
        }

        info!(
            tenant_id = %caller.tenant_id,
            count = pins.len(),
            "manual publish requested"
        );
        self.process(pins).await
    }

    /// The shared unit of work: group by connection, one vault token fetch
    /// per group, pins strictly sequential with a fixed pacing pause. Each
    /// pin's outcome is independent of its siblings.
    async fn process(&self, pins: Vec<DuePin>) -> Result<PublishReport, BeamError> {
        let mut report = PublishReport {
            selected: pins.len(),
            ..Default::default()
        };

        let mut groups: BTreeMap<String, Vec<DuePin>> = BTreeMap::new();
        for item in pins {
            match item.connection_id.clone() {
                Some(connection_id) => groups.entry(connection_id).or_default().push(item),
                None => {
                    warn!(pin_id = %item.pin.id, "pin has no connected account");
                    self.store
                        .fail_unclaimed(&item.pin.id, NO_CONNECTION_ERROR)
                        .await?;
                    report.failed += 1;
                }
            }
        }

        for (connection_id, group) in groups {
            let token = match self.vault.access_token(&connection_id).await {
                Ok(token) => token,
                Err(e) => {
                    // Without a token nothing in this group can proceed.
                    warn!(
                        connection_id = %connection_id,
                        error = %e,
                        "token fetch failed; failing whole group"
                    );
                    let reason = e.to_string();
                    for item in &group {
                        self.store.fail_unclaimed(&item.pin.id, &reason).await?;
                        report.failed += 1;
                    }
                    continue;
                }
            };

            let last = group.len() - 1;
            for (idx, item) in group.iter().enumerate() {
                match self.publish_pin(item, &connection_id, &token).await? {
                    PinOutcome::Published => report.published += 1,
                    PinOutcome::Failed => report.failed += 1,
                    PinOutcome::Skipped => report.skipped += 1,
                }
                if idx < last {
                    tokio::time::sleep(self.pacing).await;
                }
            }
        }

        info!(
            selected = report.selected,
            published = report.published,
            failed = report.failed,
            skipped = report.skipped,
            "publish run finished"
        );
        Ok(report)
    }

    /// One pin, claim to completion. API failures are written to the pin row
    /// here and never escape; only datastore failures propagate.
    async fn publish_pin(
        &self,
        item: &DuePin,
        connection_id: &str,
        token: &str,
    ) -> Result<PinOutcome, BeamError> {
        let pin = &item.pin;

        if !self.store.claim_for_publish(&pin.id).await? {
            debug!(pin_id = %pin.id, "publish claim lost; skipping");
            return Ok(PinOutcome::Skipped);
        }

        let payload = self.build_payload(item);
        match self.api.create_pin(token, &payload).await {
            Ok(created) => {
                let url = self.api.pin_url(&created.id);
                let updated = self
                    .store
                    .complete_publish(&pin.id, &created.id, &url, Utc::now())
                    .await?;
                if updated {
                    info!(pin_id = %pin.id, external_pin_id = %created.id, "pin published");
                } else {
                    warn!(pin_id = %pin.id, "publish completed but claim was gone");
                }
                Ok(PinOutcome::Published)
            }
            Err(e) => {
                if e.is_auth_expired() {
                    warn!(
                        connection_id = %connection_id,
                        "authentication failed during publish; deactivating connection"
                    );
                    self.store
                        .mark_connection_inactive(
                            connection_id,
                            &format!("authentication failed during publish: {e}"),
                        )
                        .await?;
                }
                warn!(pin_id = %pin.id, error = %e, "pin publish failed");
                self.store.fail_publish(&pin.id, &e.to_string()).await?;
                Ok(PinOutcome::Failed)
            }
        }
    }

    fn build_payload(&self, item: &DuePin) -> PinPayload {
        let pin = &item.pin;
        let link = pin
            .alternate_url
            .clone()
            .or_else(|| item.article_url.clone());
        PinPayload {
            board_id: pin.board_id.clone().unwrap_or_default(),
            media_source: MediaSource::image_url(self.image_url(&pin.image_path)),
            title: pin
                .title
                .as_deref()
                .map(|s| truncate_chars(s, TITLE_MAX_CHARS)),
            description: pin
                .description
                .as_deref()
                .map(|s| truncate_chars(s, DESCRIPTION_MAX_CHARS)),
            alt_text: pin
                .alt_text
                .as_deref()
                .map(|s| truncate_chars(s, ALT_TEXT_MAX_CHARS)),
            link,
        }
    }

    fn image_url(&self, image_path: &str) -> String {
        if image_path.starts_with("http://") || image_path.starts_with("https://") {
            return image_path.to_string();
        }
        format!(
            "{}/{}",
            self.media_base_url.trim_end_matches('/'),
            image_path.trim_start_matches('/')
        )
    }
}

/// Character-exact truncation; the platform counts characters, not bytes.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
