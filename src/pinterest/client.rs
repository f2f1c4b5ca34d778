use crate::config::PinterestConfig;
use crate::error::BeamError;
use crate::pinterest::retry::BackoffPolicy;
use crate::pinterest::types::{Account, Board, BoardsPage, CreatedPin, PinPayload, TokenGrant};
use async_trait::async_trait;
use oauth2::{
    AuthUrl, AuthorizationCode, Client as OAuth2Client, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken,
    Scope, StandardRevocableToken, TokenResponse, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenResponse,
    },
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

type PinterestOauthClient = OAuth2Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

const BOARDS_PAGE_SIZE: &str = "25";

/// The platform surface the publishing paths depend on; implemented by
/// [`PinterestClient`] and by test stubs.
#[async_trait]
pub trait PinterestApi: Send + Sync {
    fn authorize_url(&self, state: &str, verifier: &str) -> Result<Url, BeamError>;

    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenGrant, BeamError>;

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, BeamError>;

    async fn fetch_account(&self, token: &str) -> Result<Account, BeamError>;

    async fn fetch_boards(&self, token: &str) -> Result<Vec<Board>, BeamError>;

    async fn create_pin(&self, token: &str, payload: &PinPayload) -> Result<CreatedPin, BeamError>;

    /// Public page URL for a created pin.
    fn pin_url(&self, external_id: &str) -> String;
}

pub struct PinterestClient {
    http: reqwest::Client,
    cfg: PinterestConfig,
    backoff: BackoffPolicy,
}

impl PinterestClient {
    pub fn new(cfg: &PinterestConfig) -> Self {
        Self::with_backoff(cfg, BackoffPolicy::publish_default())
    }

    pub fn with_backoff(cfg: &PinterestConfig, backoff: BackoffPolicy) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("pinbeam/1.0")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("FATAL: initialize Pinterest HTTP client failed");
        Self {
            http,
            cfg: cfg.clone(),
            backoff,
        }
    }

    /// Build the oauth2 client from config; both halves of the client
    /// credential are required before any OAuth operation makes sense.
    fn oauth_client(&self) -> Result<PinterestOauthClient, BeamError> {
        let client_id = self
            .cfg
            .client_id
            .clone()
            .ok_or_else(|| BeamError::Config("Pinterest OAuth client id".to_string()))?;
        let client_secret = self
            .cfg
            .client_secret
            .clone()
            .ok_or_else(|| BeamError::Config("Pinterest OAuth client secret".to_string()))?;
        let client = OAuth2Client::new(ClientId::new(client_id))
            .set_client_secret(ClientSecret::new(client_secret))
            .set_auth_uri(AuthUrl::new(self.cfg.auth_url.clone())?)
            .set_token_uri(TokenUrl::new(self.cfg.token_url.clone())?)
            .set_redirect_uri(RedirectUrl::new(self.cfg.redirect_uri.clone())?);
        Ok(client)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.api_base.trim_end_matches('/'), path)
    }

    /// Authenticated request helper: bearer token, JSON body for non-GET,
    /// and the platform's error-body convention on non-2xx responses.
    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, BeamError> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }
        Ok(resp.json::<T>().await?)
    }

    fn grant_from(token: BasicTokenResponse) -> TokenGrant {
        TokenGrant {
            access_token: token.access_token().secret().clone(),
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            expires_in: token.expires_in().unwrap_or(Duration::from_secs(3600)),
            scope: token
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(",")),
        }
    }
}

#[async_trait]
impl PinterestApi for PinterestClient {
    fn authorize_url(&self, state: &str, verifier: &str) -> Result<Url, BeamError> {
        let client = self.oauth_client()?;
        let challenge = PkceCodeChallenge::from_code_verifier_sha256(&PkceCodeVerifier::new(
            verifier.to_string(),
        ));
        let state = state.to_string();
        let (url, _csrf) = client
            .authorize_url(move || CsrfToken::new(state))
            .add_scopes(self.cfg.scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(challenge)
            .url();
        Ok(url)
    }

    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenGrant, BeamError> {
        let client = self.oauth_client()?;
        let token = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(verifier.to_string()))
            .request_async(&self.http)
            .await?;
        debug!("authorization code exchanged");
        Ok(Self::grant_from(token))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, BeamError> {
        let client = self.oauth_client()?;
        let token = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await?;
        Ok(Self::grant_from(token))
    }

    async fn fetch_account(&self, token: &str) -> Result<Account, BeamError> {
        self.send(
            self.http
                .get(self.api_url("/user_account"))
                .bearer_auth(token),
        )
        .await
    }

    /// Page through the boards listing until the cursor runs out.
    async fn fetch_boards(&self, token: &str) -> Result<Vec<Board>, BeamError> {
        let mut boards = Vec::new();
        let mut bookmark: Option<String> = None;
        loop {
            let mut req = self
                .http
                .get(self.api_url("/boards"))
                .bearer_auth(token)
                .query(&[("page_size", BOARDS_PAGE_SIZE)]);
            if let Some(cursor) = bookmark.as_deref() {
                req = req.query(&[("bookmark", cursor)]);
            }
            let page: BoardsPage = self.send(req).await?;
            boards.extend(page.items);
            match page.bookmark {
                Some(cursor) if !cursor.is_empty() => bookmark = Some(cursor),
                _ => break,
            }
        }
        Ok(boards)
    }

    /// Create one pin, retrying only rate-limited failures on the bounded
    /// backoff schedule. Everything else surfaces immediately.
    async fn create_pin(&self, token: &str, payload: &PinPayload) -> Result<CreatedPin, BeamError> {
        let mut attempt: u32 = 1;
        loop {
            let result = self
                .send::<CreatedPin>(
                    self.http
                        .post(self.api_url("/pins"))
                        .bearer_auth(token)
                        .json(payload),
                )
                .await;
            match result {
                Ok(created) => return Ok(created),
                Err(e) if e.is_rate_limited() => {
                    if attempt >= self.backoff.max_attempts {
                        return Err(BeamError::RateLimitExhausted {
                            attempts: self.backoff.max_attempts,
                        });
                    }
                    attempt += 1;
                    let delay = self.backoff.delay_before(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "create pin rate limited; backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn pin_url(&self, external_id: &str) -> String {
        format!(
            "{}/{}/",
            self.cfg.pin_url_base.trim_end_matches('/'),
            external_id
        )
    }
}

/// Map a non-2xx platform response to a typed error, preferring the body's
/// `error_description`, then `message`, then the bare status line.
fn api_error(status: StatusCode, body: &str) -> BeamError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error_description")
                .and_then(|m| m.as_str())
                .or_else(|| v.get("message").and_then(|m| m.as_str()))
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            format!(
                "{} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        });
    BeamError::Api {
        status: status.as_u16(),
        message,
    }
}
