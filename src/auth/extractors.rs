use super::claims::SessionClaims;
use crate::error::OrgwardError;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::future::Future;

/// Claims of the authenticated caller.
///
/// Requires [`RequireSession`](super::RequireSession) or
/// [`RequireOrgPermissions`](super::RequireOrgPermissions) on the route.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(CurrentClaims(claims): CurrentClaims) -> String {
///     format!("user {}", claims.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentClaims(pub SessionClaims);

impl<S> FromRequestParts<S> for CurrentClaims
where
    S: Send + Sync,
{
    type Rejection = OrgwardError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let claims = parts.extensions.get::<SessionClaims>().cloned();
        async move {
            claims
                .map(CurrentClaims)
                .ok_or_else(|| OrgwardError::unauthorized("no session claims on request"))
        }
    }
}

/// Claims of the caller if a session middleware authenticated the request.
#[derive(Debug, Clone)]
pub struct OptionalClaims(pub Option<SessionClaims>);

impl<S> FromRequestParts<S> for OptionalClaims
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let claims = parts.extensions.get::<SessionClaims>().cloned();
        async move { Ok(OptionalClaims(claims)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::TokenType;
    use crate::permissions::ActionPermissions;
    use axum::http::Request;

    fn claims() -> SessionClaims {
        SessionClaims {
            user_id: 3,
            email: "c@example.com".into(),
            organization_id: None,
            perms: ActionPermissions::new(),
            perms_version: 1,
            issuer: "orgward".into(),
            issued_at: 0,
            expires_at: 1,
            jti: "j".into(),
            token_type: TokenType::Session,
        }
    }

    #[tokio::test]
    async fn test_current_claims_present() {
        let mut request = Request::builder().body(()).unwrap();
        request.extensions_mut().insert(claims());
        let (mut parts, _) = request.into_parts();

        let CurrentClaims(found) = CurrentClaims::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found.user_id, 3);
    }

    #[tokio::test]
    async fn test_current_claims_missing_is_unauthorized() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let err = CurrentClaims::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, OrgwardError::Unauthorized(_)));

        let OptionalClaims(none) = OptionalClaims::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
