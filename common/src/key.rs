use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use base64::{Engine, engine::general_purpose};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Res};

const KEY_PREFIX: &str = "sk_";

/// Content of a raw API key. Only an argon2 hash of `secret` is persisted,
/// `key_id` points at the record holding that hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KeyClaims {
    pub key_id: Uuid,
    pub secret: String,
}

impl KeyClaims {
    pub fn generate(key_id: Uuid) -> Self {
        KeyClaims {
            key_id,
            secret: Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn to_key(&self) -> String {
        let json = serde_json::json!({ "key_id": self.key_id, "secret": self.secret });
        let encoded = general_purpose::STANDARD.encode(json.to_string());
        format!("{}{}", KEY_PREFIX, encoded)
    }

    pub fn from_key(key: &str) -> Res<Self> {
        let encoded = key
            .trim()
            .strip_prefix(KEY_PREFIX)
            .ok_or_else(|| AppError::Unauthorized("Missing prefix 'sk_'".to_string()))?;

        let decoded_bytes = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| AppError::Unauthorized(format!("Base64 decode error: {}", e)))?;

        serde_json::from_slice(&decoded_bytes)
            .map_err(|e| AppError::Unauthorized(format!("Malformed key: {}", e)))
    }
}

/// Hashes a key secret into a PHC string.
pub fn hash_secret(secret: &str) -> Res<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash key secret: {}", e)))
}

/// Checks a presented secret against the stored PHC hash.
/// A malformed stored hash never verifies.
pub fn verify_secret(secret: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("Stored key hash is not a valid PHC string: {}", e);
            false
        }
    }
}

/// Extracts the token of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_key_decodes_to_the_same_claims() {
        let claims = KeyClaims::generate(Uuid::new_v4());
        let key = claims.to_key();

        assert!(key.starts_with("sk_"));
        assert_eq!(KeyClaims::from_key(&key).unwrap(), claims);
    }

    #[test]
    fn garbage_keys_are_unauthorized() {
        for key in ["", "pk_abc", "sk_%%%", "sk_bm90IGpzb24="] {
            assert!(matches!(
                KeyClaims::from_key(key),
                Err(AppError::Unauthorized(_))
            ));
        }
    }

    #[test]
    fn secret_verifies_only_against_its_hash() {
        let hash = hash_secret("correct horse").unwrap();

        assert!(verify_secret("correct horse", &hash));
        assert!(!verify_secret("battery staple", &hash));
        assert!(!verify_secret("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        assert_eq!(bearer_token("Bearer sk_abc"), Some("sk_abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer   "), None);
    }
}
