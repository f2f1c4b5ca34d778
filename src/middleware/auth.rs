use crate::error::BeamError;
use crate::router::BeamState;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use subtle::ConstantTimeEq;

/// Ensure the inbound request carries the shared service key.
/// Accepts either:
/// - Header: `x-api-key: ...`
/// - Header: `Authorization: Bearer <key>`
pub fn ensure_authorized(headers: &HeaderMap, expected: &str) -> Result<(), BeamError> {
    if expected.is_empty() {
        return Err(BeamError::Unauthorized(
            "service key not configured".to_string(),
        ));
    }

    if let Some(hv) = headers.get("x-api-key").and_then(|v| v.to_str().ok())
        && bool::from(hv.as_bytes().ct_eq(expected.as_bytes()))
    {
        return Ok(());
    }

    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let auth = auth.trim();
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            && bool::from(token.as_bytes().ct_eq(expected.as_bytes()))
        {
            return Ok(());
        }
    }

    Err(BeamError::Unauthorized(
        "invalid or missing service key".to_string(),
    ))
}

/// Marker extractor for scheduler-triggered routes: service key only, no
/// tenant context.
#[derive(Debug, Clone, Copy)]
pub struct ServiceAuth;

impl FromRequestParts<BeamState> for ServiceAuth {
    type Rejection = BeamError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &BeamState,
    ) -> Result<Self, Self::Rejection> {
        ensure_authorized(&parts.headers, &state.service_key)?;
        Ok(Self)
    }
}

/// Authenticated tenant context forwarded by the upstream web app.
#[derive(Debug, Clone)]
pub struct Caller {
    pub tenant_id: String,
    pub user_id: String,
}

impl FromRequestParts<BeamState> for Caller {
    type Rejection = BeamError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &BeamState,
    ) -> Result<Self, Self::Rejection> {
        ensure_authorized(&parts.headers, &state.service_key)?;

        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let tenant_id = header("x-tenant-id")
            .ok_or_else(|| BeamError::Unauthorized("missing x-tenant-id header".to_string()))?;
        let user_id = header("x-user-id")
            .ok_or_else(|| BeamError::Unauthorized("missing x-user-id header".to_string()))?;
        Ok(Caller { tenant_id, user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};
    use std::str::FromStr;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(
                HeaderName::from_str(k).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        map
    }

    #[test]
    fn accepts_api_key_header_and_bearer() {
        assert!(ensure_authorized(&headers(&[("x-api-key", "sk")]), "sk").is_ok());
        assert!(ensure_authorized(&headers(&[("authorization", "Bearer sk")]), "sk").is_ok());
    }

    #[test]
    fn rejects_wrong_or_missing_key() {
        assert!(ensure_authorized(&headers(&[("x-api-key", "nope")]), "sk").is_err());
        assert!(ensure_authorized(&headers(&[]), "sk").is_err());
    }

    #[test]
    fn rejects_everything_when_unconfigured() {
        assert!(ensure_authorized(&headers(&[("x-api-key", "")]), "").is_err());
    }
}
