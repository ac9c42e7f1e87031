//! Database operations for accounts.

use chrono::Utc;
use sea_orm::*;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Account;

/// Insert a new account. The unique index on email (active rows only)
/// backs the duplicate check.
pub async fn insert(
    db: &DatabaseConnection,
    email: &str,
    password_hash: &str,
) -> AppResult<Account> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let model = crate::entity::account::ActiveModel {
        id: Set(id),
        email: Set(email.to_string()),
        password_hash: Set(password_hash.to_string()),
        last_login_at: Set(Some(now)),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };

    crate::entity::account::Entity::insert(model)
        .exec(db)
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("duplicate key") || msg.contains("idx_accounts_email_active") {
                AppError::Conflict("An account with this email already exists".to_string())
            } else {
                AppError::Database(msg)
            }
        })?;

    let inserted = crate::entity::account::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| {
            AppError::Database("Failed to fetch newly inserted account".to_string())
        })?;

    Ok(model_to_account(inserted))
}

/// Find an active account by email.
pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> AppResult<Option<Account>> {
    let result = crate::entity::account::Entity::find()
        .filter(crate::entity::account::Column::Email.eq(email))
        .filter(crate::entity::account::Column::DeletedAt.is_null())
        .one(db)
        .await?;

    Ok(result.map(model_to_account))
}

/// Find an active account by id.
pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<Option<Account>> {
    let result = crate::entity::account::Entity::find_by_id(id)
        .filter(crate::entity::account::Column::DeletedAt.is_null())
        .one(db)
        .await?;

    Ok(result.map(model_to_account))
}

/// Record a successful login.
pub async fn touch_last_login(db: &DatabaseConnection, id: Uuid) -> AppResult<()> {
    let existing = crate::entity::account::Entity::find_by_id(id)
        .filter(crate::entity::account::Column::DeletedAt.is_null())
        .one(db)
        .await?;

    if let Some(m) = existing {
        let mut active: crate::entity::account::ActiveModel = m.into();
        active.last_login_at = Set(Some(Utc::now()));
        active.update(db).await?;
    }

    Ok(())
}

fn model_to_account(m: crate::entity::account::Model) -> Account {
    Account {
        id: m.id,
        email: m.email,
        password_hash: m.password_hash,
        last_login_at: m.last_login_at,
        created_at: m.created_at,
    }
}
