//! Caller identity resolved from an HS256 bearer token

use crate::error::AppError;
use crate::models::{Principal, UserRole};
use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use uuid::Uuid;

/// JWT claims issued by the identity provider
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

/// Validates bearer tokens against the shared secret
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Principal, AppError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::warn!(error = %e, "rejected bearer token");
            AppError::Unauthorized
        })?;

        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| {
            tracing::warn!("token subject is not a user id");
            AppError::Unauthorized
        })?;
        let role = data.claims.role.parse::<UserRole>().map_err(|e| {
            tracing::warn!(error = %e, "token carries an unknown role");
            AppError::Unauthorized
        })?;

        Ok(Principal::new(user_id, role))
    }
}

/// Extractor for handlers that require an authenticated caller
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Principal);

impl AuthenticatedUser {
    pub fn principal(&self) -> &Principal {
        &self.0
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match req.app_data::<web::Data<JwtVerifier>>() {
            Some(verifier) => bearer_token(req)
                .ok_or(AppError::Unauthorized)
                .and_then(|token| verifier.verify(token))
                .map(AuthenticatedUser),
            None => {
                tracing::error!("JwtVerifier is not registered as app data");
                Err(AppError::Internal)
            }
        };
        ready(result)
    }
}
