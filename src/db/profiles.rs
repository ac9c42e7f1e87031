//! Database operations for profiles.
//!
//! Implements the `ProfileStore` seam consumed by the profile service.
//! The "no rows" case is represented as `Ok(None)` from `find`; every
//! other database failure surfaces as an error.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use uuid::Uuid;

use crate::entity::profile::{ActiveModel, Column, Entity as ProfileEntity, Model};
use crate::error::{AppError, AppResult};
use crate::models::{Profile, ProfileChanges};
use crate::services::profile::ProfileStore;

use super::DbPool;

#[async_trait]
impl ProfileStore for DbPool {
    async fn find(&self, id: Uuid) -> AppResult<Option<Profile>> {
        let result = ProfileEntity::find_by_id(id).one(self.connection()).await?;
        Ok(result.map(model_to_profile))
    }

    /// Conflict-tolerant insert: `ON CONFLICT (id) DO NOTHING`, so two
    /// first-time loads racing each other cannot create a duplicate.
    /// Returns true if this call inserted the row.
    async fn insert_if_absent(&self, profile: &Profile) -> AppResult<bool> {
        let now = chrono::Utc::now();

        let model = ActiveModel {
            id: Set(profile.id),
            email: Set(profile.email.clone()),
            first_name: Set(profile.first_name.clone()),
            last_name: Set(profile.last_name.clone()),
            country: Set(profile.country.clone()),
            street_address: Set(profile.street_address.clone()),
            city: Set(profile.city.clone()),
            state: Set(profile.state.clone()),
            zip_code: Set(profile.zip_code.clone()),
            username: Set(profile.username.clone()),
            about: Set(profile.about.clone()),
            avatar_url: Set(profile.avatar_url.clone()),
            resume_url: Set(profile.resume_url.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let rows_affected = ProfileEntity::insert(model)
            .on_conflict(OnConflict::column(Column::Id).do_nothing().to_owned())
            .exec_without_returning(self.connection())
            .await?;

        Ok(rows_affected > 0)
    }

    /// Update an existing profile. The record must already exist; a save
    /// never creates one (creation happens only through ensure_profile).
    async fn update(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Profile> {
        let existing = ProfileEntity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or_else(|| AppError::NotFound("Profile".to_string()))?;

        let mut active: ActiveModel = existing.into();
        active.email = Set(changes.draft.email);
        active.first_name = Set(changes.draft.first_name);
        active.last_name = Set(changes.draft.last_name);
        active.country = Set(changes.draft.country);
        active.street_address = Set(changes.draft.street_address);
        active.city = Set(changes.draft.city);
        active.state = Set(changes.draft.state);
        active.zip_code = Set(changes.draft.zip_code);
        active.username = Set(changes.draft.username);
        active.about = Set(changes.draft.about);

        // Attachment URLs change only when a fresh upload succeeded;
        // otherwise the stored value stays as it was.
        if let Some(url) = changes.avatar_url {
            active.avatar_url = Set(Some(url));
        }
        if let Some(url) = changes.resume_url {
            active.resume_url = Set(Some(url));
        }

        let updated = active.update(self.connection()).await?;
        Ok(model_to_profile(updated))
    }
}

fn model_to_profile(m: Model) -> Profile {
    Profile {
        id: m.id,
        email: m.email,
        first_name: m.first_name,
        last_name: m.last_name,
        country: m.country,
        street_address: m.street_address,
        city: m.city,
        state: m.state,
        zip_code: m.zip_code,
        username: m.username,
        about: m.about,
        avatar_url: m.avatar_url,
        resume_url: m.resume_url,
        updated_at: Some(m.updated_at),
    }
}
