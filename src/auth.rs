/// Authentication extractors and utilities
use crate::{context::AppContext, error::AlertError};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use tracing::warn;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

/// Caller holding the shared scheduler secret.
///
/// Guards the retention sweep and manual report deletion.
#[derive(Debug, Clone, Copy)]
pub struct CronAuth;

#[async_trait]
impl FromRequestParts<AppContext> for CronAuth {
    type Rejection = AlertError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        match extract_bearer_token(&parts.headers) {
            Some(token) if token == state.config.admin.cron_secret => Ok(CronAuth),
            Some(_) => {
                warn!("Rejected {} {}: bad cron secret", parts.method, parts.uri.path());
                Err(AlertError::Unauthorized)
            }
            None => {
                warn!(
                    "Rejected {} {}: missing authorization header",
                    parts.method,
                    parts.uri.path()
                );
                Err(AlertError::Unauthorized)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer s3cret"));
        assert_eq!(extract_bearer_token(&headers), Some("s3cret".to_string()));
    }
}
