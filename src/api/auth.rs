//! Shared-secret authentication middleware.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use subtle::{Choice, ConstantTimeEq};

use super::{ApiError, AppState, CRON_SECRET_HEADER};

/// Middleware that requires a configured token on every request.
///
/// Accepted forms:
/// ```text
/// Authorization: Bearer <token>
/// x-cron-secret: <token>
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = request.headers();
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "));
    let cron_secret = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    let Some(token) = bearer.or(cron_secret) else {
        tracing::debug!("missing or malformed authorization header");
        return Err(ApiError::Unauthorized);
    };

    if !token_matches(state.tokens.iter(), token.trim()) {
        tracing::debug!("invalid api token");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// Constant-time check of `candidate` against every configured token.
fn token_matches<'a>(tokens: impl IntoIterator<Item = &'a String>, candidate: &str) -> bool {
    let matched = tokens.into_iter().fold(Choice::from(0u8), |acc, token| {
        acc | token.as_bytes().ct_eq(candidate.as_bytes())
    });
    matched.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches_any_configured_token() {
        let tokens = vec!["first-token".to_string(), "second-token".to_string()];
        assert!(token_matches(&tokens, "first-token"));
        assert!(token_matches(&tokens, "second-token"));
        assert!(!token_matches(&tokens, "first-tokeN"));
        assert!(!token_matches(&tokens, "first"));
        assert!(!token_matches(&tokens, ""));
        assert!(!token_matches(&Vec::<String>::new(), "first-token"));
    }
}
