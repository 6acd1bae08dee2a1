use common::{
    error::AppError,
    key::{KeyClaims, verify_secret},
};
use db::{KeyStore, models::key::ApiKey};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Missing API key")]
    Missing,

    #[error("Invalid API key")]
    Invalid,

    #[error("API key has been revoked")]
    Revoked,

    #[error(transparent)]
    Store(#[from] AppError),
}

/// Maps a presented raw key to its record. The secret is checked against
/// the stored hash; the raw key itself is never stored or compared.
pub async fn resolve_key<S>(store: &S, raw_key: Option<&str>) -> Result<ApiKey, ResolveError>
where
    S: KeyStore + ?Sized,
{
    let raw_key = raw_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(ResolveError::Missing)?;

    let claims = KeyClaims::from_key(raw_key).map_err(|e| {
        log::debug!("Undecodable API key: {}", e);
        ResolveError::Invalid
    })?;

    let key = store
        .get_key(claims.key_id)
        .await?
        .ok_or(ResolveError::Invalid)?;

    if !verify_secret(&claims.secret, &key.key_hash) {
        return Err(ResolveError::Invalid);
    }
    if key.is_revoked() {
        return Err(ResolveError::Revoked);
    }

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::key::hash_secret;
    use db::{MemoryStore, dtos::key::KeyCreateRequest};
    use uuid::Uuid;

    async fn issue(store: &MemoryStore) -> (ApiKey, String) {
        let claims = KeyClaims::generate(Uuid::new_v4());
        let key = store
            .insert_key(KeyCreateRequest {
                id: claims.key_id,
                user_id: Uuid::new_v4(),
                project_id: None,
                name: "ci".to_string(),
                key_hash: hash_secret(&claims.secret).unwrap(),
                expires: None,
                daily_usage_limit: None,
                monthly_usage_limit: None,
                total_usage_limit: None,
            })
            .await
            .unwrap();
        (key, claims.to_key())
    }

    #[actix_web::test]
    async fn issued_key_resolves() {
        let store = MemoryStore::new();
        let (key, raw) = issue(&store).await;

        let resolved = resolve_key(&store, Some(&raw)).await.unwrap();
        assert_eq!(resolved.id, key.id);
    }

    #[actix_web::test]
    async fn wrong_secret_or_unknown_id_is_invalid() {
        let store = MemoryStore::new();
        let (key, _) = issue(&store).await;

        let forged = KeyClaims {
            key_id: key.id,
            secret: "guess".to_string(),
        }
        .to_key();
        let unknown = KeyClaims::generate(Uuid::new_v4()).to_key();

        for raw in [forged.as_str(), unknown.as_str(), "sk_garbage"] {
            assert!(matches!(
                resolve_key(&store, Some(raw)).await,
                Err(ResolveError::Invalid)
            ));
        }
        assert!(matches!(
            resolve_key(&store, None).await,
            Err(ResolveError::Missing)
        ));
    }

    #[actix_web::test]
    async fn revoked_key_is_rejected() {
        let store = MemoryStore::new();
        let (key, raw) = issue(&store).await;
        store.revoke_key(key.id, Utc::now()).await.unwrap();

        assert!(matches!(
            resolve_key(&store, Some(&raw)).await,
            Err(ResolveError::Revoked)
        ));
    }
}
