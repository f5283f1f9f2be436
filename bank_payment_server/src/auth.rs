//! Access token verification.
//!
//! Tokens are HS256 JWTs issued by the storefront's login service, which shares the `BPG_JWT_SECRET` with this
//! server. This server never issues tokens. It only checks them and reads the caller's identity and roles.
use std::{
    fmt::Display,
    future::{ready, Ready},
};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{config::AuthConfig, errors::AuthError, errors::ServerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Expiry, as a unix timestamp
    pub exp: usize,
}

impl JwtClaims {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    /// Admins hold every role implicitly.
    pub fn has_role(&self, role: Role) -> bool {
        self.is_admin() || self.roles.contains(&role)
    }
}

/// Claims are placed in the request extensions by the ACL middleware. Handlers behind it can take `JwtClaims` as an
/// argument.
impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned();
        ready(claims.ok_or(ServerError::AuthenticationError(AuthError::MissingToken)))
    }
}

#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        Self { key, validation }
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("🔐️ Access token rejected. {e}");
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ValidationError("The token has expired.".to_string()),
                ErrorKind::InvalidSignature => AuthError::ValidationError("Signature verification failed.".to_string()),
                _ => AuthError::ValidationError(e.to_string()),
            }
        })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    const SECRET: &str = "an-hs256-secret-for-tests-only-0123456789";

    fn token(roles: Vec<Role>, exp: i64, secret: &str) -> String {
        let claims = JwtClaims { sub: "user-1".into(), roles, exp: exp as usize };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn valid_token() {
        let validator = TokenValidator::new(&AuthConfig::new(SECRET));
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let claims = validator.validate(&token(vec![Role::User], exp, SECRET)).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.has_role(Role::User));
        assert!(!claims.has_role(Role::Admin));
    }

    #[test]
    fn admins_hold_every_role() {
        let claims = JwtClaims { sub: "root".into(), roles: vec![Role::Admin], exp: 0 };
        assert!(claims.has_role(Role::User));
        assert!(claims.is_admin());
    }

    #[test]
    fn expired_token() {
        let validator = TokenValidator::new(&AuthConfig::new(SECRET));
        let exp = (Utc::now() - Duration::hours(1)).timestamp();
        let err = validator.validate(&token(vec![Role::User], exp, SECRET)).unwrap_err();
        assert_eq!(err.to_string(), "Access token is invalid. The token has expired.");
    }

    #[test]
    fn wrong_secret() {
        let validator = TokenValidator::new(&AuthConfig::new(SECRET));
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let err = validator.validate(&token(vec![Role::User], exp, "some-other-secret")).unwrap_err();
        assert_eq!(err.to_string(), "Access token is invalid. Signature verification failed.");
    }

    #[test]
    fn garbage_token() {
        let validator = TokenValidator::new(&AuthConfig::new(SECRET));
        assert!(matches!(validator.validate("not.a.token"), Err(AuthError::ValidationError(_))));
    }
}
