use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical pin lifecycle.
///
/// ```text
/// draft | metadata_created → generating_metadata → metadata_created
///                                                → error
/// metadata_created → publishing → published
///                               → error
/// error → <previous_status>   (explicit user reset only)
/// ```
///
/// `publishing` is a transient claim held while the platform call is in
/// flight; `published` is terminal; `error` is terminal until reset.
/// Legacy exports carried a second, mixed-language status vocabulary;
/// those spellings are accepted only by [`PinStatus::from_legacy`] at
/// import time and never compared against anywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinStatus {
    Draft,
    GeneratingMetadata,
    MetadataCreated,
    Publishing,
    Published,
    Error,
}

impl PinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinStatus::Draft => "draft",
            PinStatus::GeneratingMetadata => "generating_metadata",
            PinStatus::MetadataCreated => "metadata_created",
            PinStatus::Publishing => "publishing",
            PinStatus::Published => "published",
            PinStatus::Error => "error",
        }
    }

    /// States a user can still edit metadata in.
    pub fn is_editable(&self) -> bool {
        matches!(self, PinStatus::Draft | PinStatus::MetadataCreated)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PinStatus::Published | PinStatus::Error)
    }

    /// Forward transitions only; the `error → previous_status` reset is an
    /// explicit user action handled outside this table.
    pub fn can_transition_to(&self, target: PinStatus) -> bool {
        match (self, target) {
            (s, PinStatus::GeneratingMetadata) if s.is_editable() => true,
            (PinStatus::GeneratingMetadata, PinStatus::MetadataCreated) => true,
            (PinStatus::GeneratingMetadata, PinStatus::Error) => true,
            (PinStatus::MetadataCreated, PinStatus::Publishing) => true,
            (PinStatus::Publishing, PinStatus::Published) => true,
            (PinStatus::Publishing, PinStatus::Error) => true,
            _ => false,
        }
    }

    /// One-time translation for the historical status vocabulary (Spanish
    /// spellings, capitalized variants). Import tooling only.
    pub fn from_legacy(raw: &str) -> Option<PinStatus> {
        let normalized = raw.trim().to_ascii_lowercase();
        let canonical = match normalized.as_str() {
            "borrador" => "draft",
            "generando_metadata" | "generando metadata" => "generating_metadata",
            "metadata_creada" | "metadata creada" => "metadata_created",
            "publicando" => "publishing",
            "publicado" | "publicada" => "published",
            other => other,
        };
        canonical.parse().ok()
    }
}

impl FromStr for PinStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PinStatus::Draft),
            "generating_metadata" => Ok(PinStatus::GeneratingMetadata),
            "metadata_created" => Ok(PinStatus::MetadataCreated),
            "publishing" => Ok(PinStatus::Publishing),
            "published" => Ok(PinStatus::Published),
            "error" => Ok(PinStatus::Error),
            other => Err(format!("unknown pin status: {other}")),
        }
    }
}

impl fmt::Display for PinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pin {
    pub id: String,
    pub tenant_id: String,
    pub project_id: String,
    pub article_id: Option<String>,
    pub image_path: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub alt_text: Option<String>,
    /// Optional explicit destination link; overrides the source article URL.
    pub alternate_url: Option<String>,
    pub board_id: Option<String>,
    pub status: PinStatus,
    pub previous_status: Option<PinStatus>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub external_pin_id: Option<String>,
    pub external_pin_url: Option<String>,
    pub error_message: Option<String>,
}

/// A pin selected for publishing, joined with the link fallback and the
/// credential it publishes through.
#[derive(Debug, Clone)]
pub struct DuePin {
    pub pin: Pin,
    pub connection_id: Option<String>,
    pub article_url: Option<String>,
}

/// Tenant-scoped authorization to one external Pinterest account. Raw
/// tokens live in the vault under `id`, never on this row.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub id: String,
    pub tenant_id: String,
    pub account_id: String,
    pub username: Option<String>,
    pub scope: Option<String>,
    pub token_expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Project {
    pub id: String,
    pub tenant_id: String,
    pub connection_id: Option<String>,
}

/// Transient record backing one OAuth authorization round-trip. Single-use:
/// deleted on success, expiry, or failure.
#[derive(Debug, Clone)]
pub struct OauthState {
    pub state: String,
    pub verifier: String,
    pub project_id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_as_str() {
        for status in [
            PinStatus::Draft,
            PinStatus::GeneratingMetadata,
            PinStatus::MetadataCreated,
            PinStatus::Publishing,
            PinStatus::Published,
            PinStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<PinStatus>().unwrap(), status);
        }
    }

    #[test]
    fn publish_transitions() {
        assert!(PinStatus::MetadataCreated.can_transition_to(PinStatus::Publishing));
        assert!(PinStatus::Publishing.can_transition_to(PinStatus::Published));
        assert!(PinStatus::Publishing.can_transition_to(PinStatus::Error));

        // Only the claim reaches `publishing`.
        assert!(!PinStatus::Draft.can_transition_to(PinStatus::Publishing));
        assert!(!PinStatus::Published.can_transition_to(PinStatus::Publishing));
    }

    #[test]
    fn metadata_transitions() {
        assert!(PinStatus::Draft.can_transition_to(PinStatus::GeneratingMetadata));
        assert!(PinStatus::MetadataCreated.can_transition_to(PinStatus::GeneratingMetadata));
        assert!(PinStatus::GeneratingMetadata.can_transition_to(PinStatus::MetadataCreated));
        assert!(PinStatus::GeneratingMetadata.can_transition_to(PinStatus::Error));
    }

    #[test]
    fn terminal_states_do_not_transition() {
        for target in [
            PinStatus::Draft,
            PinStatus::GeneratingMetadata,
            PinStatus::MetadataCreated,
            PinStatus::Publishing,
            PinStatus::Published,
        ] {
            assert!(!PinStatus::Published.can_transition_to(target));
            assert!(!PinStatus::Error.can_transition_to(target));
        }
    }

    #[test]
    fn legacy_spellings_translate_to_canonical() {
        assert_eq!(PinStatus::from_legacy("publicado"), Some(PinStatus::Published));
        assert_eq!(PinStatus::from_legacy("Publicada"), Some(PinStatus::Published));
        assert_eq!(PinStatus::from_legacy("Published"), Some(PinStatus::Published));
        assert_eq!(PinStatus::from_legacy("borrador"), Some(PinStatus::Draft));
        assert_eq!(
            PinStatus::from_legacy("metadata creada"),
            Some(PinStatus::MetadataCreated)
        );
        assert_eq!(PinStatus::from_legacy("  publicando "), Some(PinStatus::Publishing));
        assert_eq!(PinStatus::from_legacy("archived"), None);
    }

    #[test]
    fn canonical_parse_rejects_legacy_spellings() {
        assert!("publicado".parse::<PinStatus>().is_err());
        assert!("Published".parse::<PinStatus>().is_err());
    }
}
