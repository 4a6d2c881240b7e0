use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, decode_header, Validation};
use jwks::Jwks;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{event, Level};

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSettings {
    pub domain: String,
    pub audience: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub aud: Value,
    pub iss: String,
    pub exp: usize,
    pub iat: usize,
}

fn audience_matches(aud: &Value, expected: &str) -> bool {
    match aud {
        Value::String(single_aud) => single_aud == expected,
        Value::Array(multiple_aud) => multiple_aud
            .iter()
            .any(|entry| entry.as_str() == Some(expected)),
        _ => false,
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .split_whitespace()
        .last()
}

/// Guards the mutating routes when Auth0 settings are configured; without
/// them every request passes through.
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let settings = match &state.auth {
        Some(settings) => settings,
        None => return Ok(next.run(request).await),
    };

    let token = match bearer_token(&request).map(str::to_owned) {
        Some(t) => t,
        None => {
            event!(Level::WARN, "No usable auth header found");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // Decode the header of the JWT which contains the 'kid'
    let kid = match decode_header(&token) {
        Ok(header) => header.kid.unwrap_or_default(),
        Err(e) => {
            event!(Level::WARN, "Failed to decode token header: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    let jwks_url = format!("{}/.well-known/jwks.json", settings.domain);
    let jwks = match Jwks::from_jwks_url(jwks_url).await {
        Ok(jwks) => jwks,
        Err(_) => {
            event!(Level::WARN, "Failed to fetch jwks");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    let jwk = match jwks.keys.get(&kid) {
        Some(jwk) => jwk,
        None => {
            event!(Level::WARN, kid = %kid, "Failed to get JWK from JWKS");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // Audience is checked by hand since it may be a string or an array
    let mut validation = Validation::new(jsonwebtoken::Algorithm::RS256);
    validation.validate_exp = true;
    validation.validate_aud = false;

    match decode::<Claims>(&token, &jwk.decoding_key, &validation) {
        Ok(token_data) if audience_matches(&token_data.claims.aud, &settings.audience) => {
            event!(Level::DEBUG, sub = %token_data.claims.sub, "Auth middleware successful");
            Ok(next.run(request).await)
        }
        Ok(_) => {
            event!(Level::WARN, "Invalid audience");
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(e) => {
            event!(Level::WARN, "Failed to decode token using decode key from jwk: {}", e);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
