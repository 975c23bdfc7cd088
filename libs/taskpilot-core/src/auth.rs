//! Password hashing and bearer tokens

use crate::config::AuthConfig;
use crate::error::{Result, TaskPilotError};
use crate::models::User;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

const HASH_SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256 password hashes in `pbkdf2-sha256$iterations$salt$hash` form
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
}

impl PasswordHasher {
    /// # Errors
    /// Returns a configuration error when `iterations` is 0
    pub fn new(iterations: u32) -> Result<Self> {
        let iterations = NonZeroU32::new(iterations).ok_or_else(|| {
            TaskPilotError::configuration("PBKDF2 iterations must be greater than 0")
        })?;
        Ok(Self {
            iterations,
            rng: SystemRandom::new(),
        })
    }

    /// Hash `password` with a fresh random salt
    ///
    /// # Errors
    /// Returns an error if the system random source fails
    pub fn hash(&self, password: &str) -> Result<String> {
        let mut salt = [0u8; SALT_LEN];
        self.rng
            .fill(&mut salt)
            .map_err(|_| TaskPilotError::unknown("System random source unavailable"))?;

        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            &salt,
            password.as_bytes(),
            &mut hash,
        );

        Ok(format!(
            "{HASH_SCHEME}${}${}${}",
            self.iterations,
            STANDARD.encode(salt),
            STANDARD.encode(hash)
        ))
    }

    /// Check `password` against a stored hash; malformed hashes never match
    #[must_use]
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let mut parts = stored.split('$');
        let (Some(HASH_SCHEME), Some(iterations), Some(salt), Some(hash), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };

        let Some(iterations) = iterations.parse::<u32>().ok().and_then(NonZeroU32::new) else {
            return false;
        };
        let (Ok(salt), Ok(hash)) = (STANDARD.decode(salt), STANDARD.decode(hash)) else {
            return false;
        };

        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            &salt,
            password.as_bytes(),
            &hash,
        )
        .is_ok()
    }
}

/// JWT payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// Issues and verifies HS256 access tokens
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &str, expiry: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry,
        }
    }

    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let minutes = i64::try_from(config.token_expiry_minutes).unwrap_or(i64::MAX / 60);
        Self::new(&config.jwt_secret, Duration::minutes(minutes))
    }

    /// Token for `user`, valid from `now` for the configured expiry
    ///
    /// # Errors
    /// Returns an error if the token cannot be encoded
    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            exp: (now + self.expiry).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TaskPilotError::unknown(format!("Failed to issue token: {e}")))
    }

    /// Decode and validate a token, returning its claims
    ///
    /// # Errors
    /// Returns `Unauthorized` for a malformed, forged, or expired token
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| TaskPilotError::unauthorized(format!("Invalid token: {e}")))
    }

    /// User id carried by a valid token
    ///
    /// # Errors
    /// Returns `Unauthorized` if the token is invalid or its subject is not an id
    pub fn user_id(&self, token: &str) -> Result<i64> {
        self.verify(token)?
            .sub
            .parse()
            .map_err(|_| TaskPilotError::unauthorized("Invalid token subject"))
    }
}
