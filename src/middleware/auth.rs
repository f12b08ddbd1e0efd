use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

use crate::config;
use crate::error::ApiError;

/// Caller identity for the current request. The subject is an opaque string
/// from the verified bearer token; the core never re-validates it and never
/// interprets it beyond binding it into the transaction's security context.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub subject: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: i64,
}

/// Bearer-token middleware: validates the token and injects [`AuthUser`]
/// into request extensions.
pub async fn auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers).map_err(ApiError::unauthorized)?;
    let claims = validate_token(&token).map_err(ApiError::unauthorized)?;

    request.extensions_mut().insert(AuthUser {
        subject: claims.sub,
    });
    Ok(next.run(request).await)
}

/// Shared-secret check for identity-provider webhook routes.
pub async fn webhook_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = &config::config().security.webhook_secret;
    if expected.is_empty() {
        return Err(ApiError::unauthorized("Webhook secret not configured"));
    }

    let provided = headers
        .get("x-webhook-secret")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if provided != expected {
        return Err(ApiError::unauthorized("Invalid webhook secret"));
    }
    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

fn validate_token(token: &str) -> Result<Claims, String> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err("Auth secret not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("Invalid bearer token: {}", e))?;

    Ok(token_data.claims)
}
