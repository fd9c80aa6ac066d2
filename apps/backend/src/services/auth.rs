//! Account credentials and session tokens.
//!
//! Registration input is checked and hashed here before it reaches the
//! database, and login goes through [`AuthService::authenticate`] whether or
//! not the account exists.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::models::User;
use crate::error::{AppError, Result};

/// JWT claims carried by every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    /// Username when the token was issued
    pub username: String,
    pub exp: usize,
    pub iat: usize,
}

/// Sessions last a day.
const SESSION_SECS: usize = 24 * 60 * 60;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 32;

/// Valid Argon2 hash no password matches, verified when the username is
/// unknown so both login failures cost the same.
const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$dGltaW5nYXR0YWNr$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// A checked account, ready to insert.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub password_hash: String,
}

pub struct AuthService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    argon2: Argon2<'static>,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self {
            encoding: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt_secret.as_bytes()),
            argon2: Argon2::default(),
        }
    }

    /// Validates a sign-up and hashes its password.
    ///
    /// Usernames end up in object keys and profile URLs, so they are limited
    /// to ASCII letters, digits, `_`, `-` and `.`. Surrounding whitespace is
    /// dropped.
    pub fn prepare_registration(&self, username: &str, password: &str) -> Result<Registration> {
        let username = username.trim();
        if username.is_empty() || username.len() > MAX_USERNAME_LEN {
            return Err(AppError::BadRequest(format!(
                "Username must be 1 to {} characters",
                MAX_USERNAME_LEN
            )));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(AppError::BadRequest(
                "Username may only contain letters, digits, '_', '-' and '.'".to_string(),
            ));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        Ok(Registration {
            username: username.to_string(),
            password_hash: self.hash_password(password)?,
        })
    }

    /// Checks a login attempt against the stored hash, `None` when no account
    /// has the given username.
    pub fn authenticate(&self, password: &str, stored_hash: Option<&str>) -> Result<()> {
        let matches = match stored_hash {
            Some(hash) => self.verify_password(password, hash)?,
            None => {
                let _ = self.verify_password(password, UNKNOWN_USER_HASH);
                false
            }
        };
        if matches {
            Ok(())
        } else {
            Err(AppError::Unauthenticated)
        }
    }

    /// Signs a session token for `user`.
    pub fn issue_token(&self, user: &User) -> Result<String> {
        self.token_for(user.id, &user.username)
    }

    fn token_for(&self, user_id: i64, username: &str) -> Result<String> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| AppError::Internal(format!("System time error: {}", e)))?
            .as_secs() as usize;

        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            exp: now + SESSION_SECS,
            iat: now,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Token creation failed: {}", e)))
    }

    /// Decodes a bearer token; anything invalid or expired is `Unauthenticated`.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token verification failed: {}", e);
                AppError::Unauthenticated
            })
    }

    /// PHC-formatted Argon2 hash with a fresh salt.
    fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash format: {}", e)))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
