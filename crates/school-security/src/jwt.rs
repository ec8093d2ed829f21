//! JWT token handling
//!
//! Tokens are HS256-signed with the shared secret from configuration. Issuer,
//! audience, expiry and signature are all checked; there is no refresh or
//! revocation.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use school_shared::config::JwtSettings;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token creation failed: {0}")]
    CreationError(String),
    #[error("Token validation failed: {0}")]
    ValidationError(String),
    #[error("Token expired")]
    TokenExpired,
    #[error("Malformed claim: {0}")]
    MalformedClaim(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub tenant_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::MalformedClaim("sub"))
    }

    pub fn tenant(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.tenant_id).map_err(|_| JwtError::MalformedClaim("tenant_id"))
    }
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    access_token_expiry: i64,
}

impl JwtService {
    pub fn new(settings: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.validate_exp = true;
        validation.leeway = settings.leeway_secs;

        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            access_token_expiry: settings.access_token_expiry,
        }
    }

    /// Issues an access token. Issuance normally happens in the identity
    /// provider; this exists for tooling and tests.
    pub fn issue(&self, user_id: &Uuid, tenant_id: &Uuid, roles: &[String]) -> Result<String, JwtError> {
        self.issue_with_expiry(user_id, tenant_id, roles, self.access_token_expiry)
    }

    pub fn issue_with_expiry(
        &self,
        user_id: &Uuid,
        tenant_id: &Uuid,
        roles: &[String],
        expiry_secs: i64,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
            roles: roles.to_vec(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(expiry_secs)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::CreationError(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                _ => JwtError::ValidationError(e.to_string()),
            })?;

        // Surface malformed identity claims here rather than in handlers
        claims.user_id()?;
        claims.tenant()?;
        debug!(sub = %claims.sub, tenant = %claims.tenant_id, "token accepted");
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-test-secret-test-secret".into(),
            issuer: "school-auth".into(),
            audience: "school-api".into(),
            access_token_expiry: 600,
            leeway_secs: 0,
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let svc = JwtService::new(&settings());
        let user = Uuid::new_v4();
        let tenant = Uuid::new_v4();
        let token = svc.issue(&user, &tenant, &["teacher".to_string()]).unwrap();

        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user);
        assert_eq!(claims.tenant().unwrap(), tenant);
        assert_eq!(claims.roles, vec!["teacher".to_string()]);
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = JwtService::new(&settings());
        let token = svc
            .issue_with_expiry(&Uuid::new_v4(), &Uuid::new_v4(), &[], -120)
            .unwrap();
        assert!(matches!(svc.validate_token(&token), Err(JwtError::TokenExpired)));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let issuer = JwtService::new(&JwtSettings { audience: "other-api".into(), ..settings() });
        let token = issuer.issue(&Uuid::new_v4(), &Uuid::new_v4(), &[]).unwrap();
        let svc = JwtService::new(&settings());
        assert!(matches!(svc.validate_token(&token), Err(JwtError::ValidationError(_))));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let issuer = JwtService::new(&JwtSettings { issuer: "someone-else".into(), ..settings() });
        let token = issuer.issue(&Uuid::new_v4(), &Uuid::new_v4(), &[]).unwrap();
        assert!(JwtService::new(&settings()).validate_token(&token).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtService::new(&JwtSettings {
            secret: "another-secret-another-secret-another".into(),
            ..settings()
        });
        let token = issuer.issue(&Uuid::new_v4(), &Uuid::new_v4(), &[]).unwrap();
        assert!(JwtService::new(&settings()).validate_token(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let svc = JwtService::new(&settings());
        assert!(svc.validate_token("not.a.token").is_err());
    }
}
