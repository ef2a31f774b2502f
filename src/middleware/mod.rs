use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

/// Bearer token payload. Tokens are issued elsewhere; this service only
/// checks the signature and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub admin: bool,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub is_admin: bool,
}

/// An [`AuthUser`] whose token carries `admin: true`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

pub fn decode_claims(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .ok()
}

// Bearer JWT extractor
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let claims = decode_claims(token, &state.config.jwt.secret).ok_or_else(|| {
            tracing::debug!("rejected bearer token");
            StatusCode::UNAUTHORIZED
        })?;

        if claims.sub.trim().is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }

        Ok(AuthUser {
            user_id: claims.sub,
            is_admin: claims.admin,
        })
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(StatusCode::FORBIDDEN);
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(admin: bool, exp: usize) -> Claims {
        Claims {
            sub: "user-7".into(),
            admin,
            exp,
        }
    }

    fn in_an_hour() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn valid_token_round_trips() {
        let decoded = decode_claims(&token(&claims(true, in_an_hour()), "s3cret"), "s3cret").unwrap();
        assert_eq!(decoded.sub, "user-7");
        assert!(decoded.admin);
    }

    #[test]
    fn wrong_secret_and_expired_tokens_are_rejected() {
        assert!(decode_claims(&token(&claims(false, in_an_hour()), "other"), "s3cret").is_none());

        let expired = (chrono::Utc::now().timestamp() - 3600) as usize;
        assert!(decode_claims(&token(&claims(false, expired), "s3cret"), "s3cret").is_none());
    }
}
