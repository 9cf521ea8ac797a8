use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    config::Config,
    entities::user,
    error::{AppError, AppResult},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by both access and refresh tokens. `kind` keeps a refresh
/// token from being accepted as a bearer credential and vice versa.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub fn issue_token(user_id: i32, kind: TokenKind, config: &Config) -> AppResult<String> {
    let now = jiff::Timestamp::now().as_second();
    let ttl = match kind {
        TokenKind::Access => config.access_ttl_mins * 60,
        TokenKind::Refresh => config.refresh_ttl_days * 86_400,
    };

    let claims = Claims {
        sub: user_id,
        kind,
        exp: now + ttl,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(config.jwt_secret.as_bytes()))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token encoding failed: {e}")))
}

pub fn issue_pair(user_id: i32, config: &Config) -> AppResult<TokenPair> {
    Ok(TokenPair {
        access: issue_token(user_id, TokenKind::Access, config)?,
        refresh: issue_token(user_id, TokenKind::Refresh, config)?,
    })
}

/// Validate signature and expiry, returning the claims. Callers still have to
/// check `kind` against what the endpoint expects.
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("invalid or expired token".to_string()))?;
    Ok(data.claims)
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("stored hash is malformed: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(anyhow::anyhow!("password verification failed: {e}"))),
    }
}

/// Authenticated request identity, resolved from the bearer token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
}

/// Like [`AuthUser`] but never rejects: anonymous and bad-token requests
/// resolve to `None`.
#[derive(Clone, Debug)]
pub struct MaybeUser(pub Option<AuthUser>);

async fn user_from_parts(parts: &Parts, state: &AppState) -> AppResult<AuthUser> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("expected bearer token".to_string()))?;

    let claims = decode_token(token, &state.config.jwt_secret)?;
    if claims.kind != TokenKind::Access {
        return Err(AppError::Unauthorized("not an access token".to_string()));
    }

    let user = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("unknown user".to_string()))?;

    Ok(AuthUser { id: user.id, username: user.username })
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        user_from_parts(parts, state).await
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(user_from_parts(parts, state).await.ok()))
    }
}
