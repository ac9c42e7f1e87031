//! Database operations for refresh tokens.

use chrono::Utc;
use sea_orm::*;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppResult;

/// Hash a refresh token using SHA-256.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a random refresh token string.
pub fn generate_token() -> String {
    let random_bytes: [u8; 32] = rand::random();
    format!("hrms_rt_{}", hex::encode(random_bytes))
}

/// Insert a new refresh token (stores the hash, not the raw token).
pub async fn insert(
    db: &DatabaseConnection,
    account_id: Uuid,
    token_hash: &str,
    ttl_secs: u64,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let expires_at = now + chrono::Duration::seconds(ttl_secs as i64);

    let model = crate::entity::refresh_token::ActiveModel {
        id: Set(id),
        account_id: Set(account_id),
        token_hash: Set(token_hash.to_string()),
        expires_at: Set(expires_at),
        revoked_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    crate::entity::refresh_token::Entity::insert(model)
        .exec(db)
        .await?;

    Ok(())
}

/// Find an active (non-revoked, non-expired) refresh token by its hash.
/// Returns the account_id if valid.
pub async fn find_valid_by_hash(
    db: &DatabaseConnection,
    token_hash: &str,
) -> AppResult<Option<Uuid>> {
    let result = crate::entity::refresh_token::Entity::find()
        .filter(crate::entity::refresh_token::Column::TokenHash.eq(token_hash))
        .filter(crate::entity::refresh_token::Column::RevokedAt.is_null())
        .filter(crate::entity::refresh_token::Column::ExpiresAt.gt(Utc::now()))
        .one(db)
        .await?;

    Ok(result.map(|m| m.account_id))
}

/// Revoke a refresh token by its hash. Returns true if a token was revoked.
pub async fn revoke_by_hash(db: &DatabaseConnection, token_hash: &str) -> AppResult<bool> {
    let result = crate::entity::refresh_token::Entity::find()
        .filter(crate::entity::refresh_token::Column::TokenHash.eq(token_hash))
        .filter(crate::entity::refresh_token::Column::RevokedAt.is_null())
        .one(db)
        .await?;

    if let Some(m) = result {
        let mut active: crate::entity::refresh_token::ActiveModel = m.into();
        active.revoked_at = Set(Some(Utc::now()));
        active.update(db).await?;
        return Ok(true);
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex_sha256() {
        let a = hash_token("hrms_rt_abc");
        let b = hash_token("hrms_rt_abc");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_token_is_prefixed_and_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert!(t1.starts_with("hrms_rt_"));
        assert_ne!(t1, t2);
    }
}
