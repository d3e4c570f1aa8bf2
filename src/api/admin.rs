//! Admin Capability Check
//! Mission: Keep game management behind a bearer token at the HTTP boundary

use super::{error::ApiError, AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use subtle::ConstantTimeEq;
use tracing::warn;

/// Route layer for admin-only routes. With no admin token configured every
/// admin request is refused.
pub async fn require_admin(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        warn!(path = %req.uri().path(), "Admin route called but no admin token is configured");
        return Err(ApiError::Forbidden("Admin access is disabled"));
    };

    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::MissingToken)?;
    if !token_matches(bearer.token(), expected) {
        warn!(path = %req.uri().path(), "❌ Rejected admin request: bad token");
        return Err(ApiError::Forbidden("Admin access required"));
    }

    Ok(next.run(req).await)
}

/// Compare without short-circuiting on the first differing byte
fn token_matches(presented: &str, expected: &str) -> bool {
    bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches("test-admin-token", "test-admin-token"));
        assert!(!token_matches("test-admin-tokeN", "test-admin-token"));
        assert!(!token_matches("test-admin", "test-admin-token"));
        assert!(!token_matches("", "test-admin-token"));
    }
}
