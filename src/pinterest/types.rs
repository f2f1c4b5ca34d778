use serde::{Deserialize, Serialize};

/// Outgoing create-pin body. Optional fields are omitted entirely when
/// absent rather than sent as null.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PinPayload {
    pub board_id: String,
    pub media_source: MediaSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MediaSource {
    pub source_type: &'static str,
    pub url: String,
}

impl MediaSource {
    pub fn image_url(url: String) -> Self {
        Self {
            source_type: "image_url",
            url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPin {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
}

/// One page of the boards listing; `bookmark` carries the cursor for the
/// next page and is absent on the last one.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardsPage {
    pub items: Vec<Board>,
    #[serde(default)]
    pub bookmark: Option<String>,
}

/// External account identity behind a token.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub username: String,
    pub id: String,
}

/// Result of a code exchange or token refresh.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: std::time::Duration,
    pub scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_omits_absent_optionals() {
        let payload = PinPayload {
            board_id: "b1".to_string(),
            media_source: MediaSource::image_url("https://cdn.example/p.jpg".to_string()),
            title: Some("t".to_string()),
            description: None,
            alt_text: None,
            link: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["board_id"], "b1");
        assert_eq!(json["media_source"]["source_type"], "image_url");
        assert!(json.get("description").is_none());
        assert!(json.get("link").is_none());
    }

    #[test]
    fn boards_page_tolerates_missing_bookmark() {
        let page: BoardsPage =
            serde_json::from_str(r#"{"items":[{"id":"b1","name":"Inspiration"}]}"#).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.bookmark.is_none());
    }
}
