//! Profile synchronization and the upload-and-commit pipeline.
//!
//! Two operations make up the profile lifecycle:
//!
//! - [`ensure_profile`]: on first load, read the record for the caller's
//!   identity, creating a blank one if none exists. Creation uses a
//!   conflict-tolerant insert so concurrent first loads cannot produce
//!   a duplicate row.
//! - [`commit`]: upload any pending attachments (avatar, then resume,
//!   sequentially), substitute the resulting public URLs, then UPDATE
//!   the full merged record. A failed upload keeps the previous URL and
//!   is reported in the outcome; only a failed record write fails the
//!   whole commit.

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    AttachmentKind, CommitOutcome, Identity, PendingUpload, Profile, ProfileChanges, ProfileDraft,
    UploadFailure,
};

/// Record storage seam: the one-row-per-identity profile table.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read the profile for an identity. `Ok(None)` is the "no rows"
    /// signal; any other failure is an error.
    async fn find(&self, id: Uuid) -> AppResult<Option<Profile>>;

    /// Insert the profile unless a row with the same id already exists.
    /// Returns true if this call inserted the row.
    async fn insert_if_absent(&self, profile: &Profile) -> AppResult<bool>;

    /// Update an existing profile; errors if the record is missing.
    async fn update(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Profile>;
}

/// Blob storage seam: content-addressed-by-key uploads with public URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload an object. Re-uploading the same key is a last-write-wins
    /// overwrite.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: Option<&str>) -> AppResult<()>;

    /// Resolve the public URL for a stored key.
    fn public_url(&self, key: &str) -> String;
}

/// Build the storage key for a profile attachment, scoped by identity
/// and original filename.
pub fn attachment_key(account_id: Uuid, filename: &str) -> String {
    format!("profiles/{}/{}", account_id, filename)
}

/// Ensure exactly one profile record exists for the identity and return it.
///
/// Found records are returned verbatim. A missing record is created with
/// the identity's id and email and all other fields empty; the freshly
/// constructed shape is returned without a re-read. If the insert loses a
/// race with a concurrent first load, the winner's row is read back.
pub async fn ensure_profile<S>(store: &S, identity: &Identity) -> AppResult<Profile>
where
    S: ProfileStore + ?Sized,
{
    if let Some(existing) = store.find(identity.id).await? {
        return Ok(existing);
    }

    let blank = Profile::blank(identity.id, &identity.email);

    if store.insert_if_absent(&blank).await? {
        info!("Profile created for account {}", identity.id);
        return Ok(blank);
    }

    // Another load inserted first; return whatever won.
    store.find(identity.id).await?.ok_or_else(|| {
        crate::error::AppError::Database(
            "Profile insert conflicted but no row was found".to_string(),
        )
    })
}

/// Upload pending attachments and write the merged record back.
///
/// Uploads run sequentially (avatar, then resume) and independently: the
/// resume upload is attempted even if the avatar upload failed. Pending
/// files are consumed here and discarded whatever the result. The final
/// write is an UPDATE keyed by identity; the record must already exist.
pub async fn commit<S, B>(
    store: &S,
    blobs: &B,
    identity: &Identity,
    draft: ProfileDraft,
    avatar: Option<PendingUpload>,
    resume: Option<PendingUpload>,
) -> AppResult<CommitOutcome>
where
    S: ProfileStore + ?Sized,
    B: BlobStore + ?Sized,
{
    let mut failures = Vec::new();

    let avatar_url = match avatar {
        Some(pending) => {
            upload_attachment(blobs, identity, AttachmentKind::Avatar, pending, &mut failures)
                .await
        }
        None => None,
    };

    let resume_url = match resume {
        Some(pending) => {
            upload_attachment(blobs, identity, AttachmentKind::Resume, pending, &mut failures)
                .await
        }
        None => None,
    };

    let profile = store
        .update(
            identity.id,
            ProfileChanges {
                draft,
                avatar_url,
                resume_url,
            },
        )
        .await?;

    Ok(CommitOutcome {
        profile,
        upload_failures: failures,
    })
}

/// Upload one pending attachment. Returns the public URL on success;
/// records the failure and returns None otherwise.
async fn upload_attachment<B>(
    blobs: &B,
    identity: &Identity,
    kind: AttachmentKind,
    pending: PendingUpload,
    failures: &mut Vec<UploadFailure>,
) -> Option<String>
where
    B: BlobStore + ?Sized,
{
    let key = attachment_key(identity.id, &pending.filename);

    match blobs
        .put(&key, pending.data, pending.content_type.as_deref())
        .await
    {
        Ok(()) => {
            let url = blobs.public_url(&key);
            info!(
                "Uploaded {} '{}' for account {}",
                kind.as_str(),
                pending.filename,
                identity.id
            );
            Some(url)
        }
        Err(e) => {
            warn!(
                "Failed to upload {} '{}' for account {}: {}",
                kind.as_str(),
                pending.filename,
                identity.id,
                e
            );
            failures.push(UploadFailure {
                kind,
                filename: pending.filename,
                reason: e.to_string(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory profile table.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<HashMap<Uuid, Profile>>,
        inserts: AtomicUsize,
    }

    #[async_trait]
    impl ProfileStore for MemoryStore {
        async fn find(&self, id: Uuid) -> AppResult<Option<Profile>> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn insert_if_absent(&self, profile: &Profile) -> AppResult<bool> {
            let mut rows = self.rows.lock().unwrap();
            if rows.contains_key(&profile.id) {
                return Ok(false);
            }
            self.inserts.fetch_add(1, Ordering::SeqCst);
            rows.insert(profile.id, profile.clone());
            Ok(true)
        }

        async fn update(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Profile> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound("Profile".to_string()))?;

            row.email = changes.draft.email;
            row.first_name = changes.draft.first_name;
            row.last_name = changes.draft.last_name;
            row.country = changes.draft.country;
            row.street_address = changes.draft.street_address;
            row.city = changes.draft.city;
            row.state = changes.draft.state;
            row.zip_code = changes.draft.zip_code;
            row.username = changes.draft.username;
            row.about = changes.draft.about;
            if let Some(url) = changes.avatar_url {
                row.avatar_url = Some(url);
            }
            if let Some(url) = changes.resume_url {
                row.resume_url = Some(url);
            }

            Ok(row.clone())
        }
    }

    /// Store that simulates losing the first-load race: a concurrent
    /// load's blank row lands between the initial read and the insert
    /// attempt, so `insert_if_absent` reports a conflict.
    struct RacingStore {
        inner: MemoryStore,
        winner: Profile,
    }

    #[async_trait]
    impl ProfileStore for RacingStore {
        async fn find(&self, id: Uuid) -> AppResult<Option<Profile>> {
            self.inner.find(id).await
        }

        async fn insert_if_absent(&self, _profile: &Profile) -> AppResult<bool> {
            // The winner's insert commits first
            self.inner
                .rows
                .lock()
                .unwrap()
                .insert(self.winner.id, self.winner.clone());
            Ok(false)
        }

        async fn update(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Profile> {
            self.inner.update(id, changes).await
        }
    }

    /// In-memory blob store; keys containing `fail_substring` error out.
    #[derive(Default)]
    struct MemoryBlobs {
        objects: Mutex<HashMap<String, Vec<u8>>>,
        fail_substring: Option<String>,
    }

    #[async_trait]
    impl BlobStore for MemoryBlobs {
        async fn put(
            &self,
            key: &str,
            data: Vec<u8>,
            _content_type: Option<&str>,
        ) -> AppResult<()> {
            if let Some(ref s) = self.fail_substring {
                if key.contains(s.as_str()) {
                    return Err(AppError::Storage("injected upload failure".to_string()));
                }
            }
            self.objects.lock().unwrap().insert(key.to_string(), data);
            Ok(())
        }

        fn public_url(&self, key: &str) -> String {
            format!("https://store.example.com/hrms/{}", key)
        }
    }

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "u1@x.com".to_string(),
        }
    }

    fn draft(first_name: &str) -> ProfileDraft {
        ProfileDraft {
            email: "u1@x.com".to_string(),
            first_name: first_name.to_string(),
            ..ProfileDraft::default()
        }
    }

    #[tokio::test]
    async fn test_ensure_profile_creates_blank_record_on_first_load() {
        let store = MemoryStore::default();
        let id = identity();

        let profile = ensure_profile(&store, &id).await.unwrap();

        assert_eq!(profile.id, id.id);
        assert_eq!(profile.email, "u1@x.com");
        assert_eq!(profile.first_name, "");
        assert_eq!(profile.avatar_url, None);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ensure_profile_returns_existing_without_insert() {
        let store = MemoryStore::default();
        let id = identity();

        let mut existing = Profile::blank(id.id, &id.email);
        existing.first_name = "Ann".to_string();
        store.rows.lock().unwrap().insert(id.id, existing.clone());

        let profile = ensure_profile(&store, &id).await.unwrap();

        assert_eq!(profile, existing);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ensure_profile_is_single_insert_across_repeat_loads() {
        let store = MemoryStore::default();
        let id = identity();

        ensure_profile(&store, &id).await.unwrap();
        ensure_profile(&store, &id).await.unwrap();
        ensure_profile(&store, &id).await.unwrap();

        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_profile_race_loser_returns_winner_row() {
        let id = identity();
        let mut winner = Profile::blank(id.id, &id.email);
        winner.first_name = "Ann".to_string();

        let store = RacingStore {
            inner: MemoryStore::default(),
            winner: winner.clone(),
        };

        // Initial read sees nothing, the insert conflicts, and the
        // loser must come back with the row the winner created.
        let profile = ensure_profile(&store, &id).await.unwrap();

        assert_eq!(profile, winner);
        assert_eq!(store.inner.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_without_files_leaves_urls_unchanged() {
        let store = MemoryStore::default();
        let blobs = MemoryBlobs::default();
        let id = identity();

        let mut existing = Profile::blank(id.id, &id.email);
        existing.avatar_url = Some("https://old/avatar.png".to_string());
        existing.resume_url = Some("https://old/cv.pdf".to_string());
        store.rows.lock().unwrap().insert(id.id, existing);

        let outcome = commit(&store, &blobs, &id, draft("Ann"), None, None)
            .await
            .unwrap();

        assert!(outcome.fully_saved());
        assert_eq!(outcome.profile.first_name, "Ann");
        assert_eq!(
            outcome.profile.avatar_url.as_deref(),
            Some("https://old/avatar.png")
        );
        assert_eq!(
            outcome.profile.resume_url.as_deref(),
            Some("https://old/cv.pdf")
        );
    }

    #[tokio::test]
    async fn test_commit_uploads_avatar_and_persists_url() {
        let store = MemoryStore::default();
        let blobs = MemoryBlobs::default();
        let id = identity();
        store
            .rows
            .lock()
            .unwrap()
            .insert(id.id, Profile::blank(id.id, &id.email));

        let avatar = PendingUpload::new("a.png", Some("image/png".to_string()), vec![1, 2, 3])
            .unwrap();
        let outcome = commit(&store, &blobs, &id, draft("Ann"), Some(avatar), None)
            .await
            .unwrap();

        let expected_key = format!("profiles/{}/a.png", id.id);
        assert!(outcome.fully_saved());
        assert_eq!(outcome.profile.first_name, "Ann");
        assert_eq!(
            outcome.profile.avatar_url.as_deref(),
            Some(format!("https://store.example.com/hrms/{}", expected_key).as_str())
        );
        assert!(blobs.objects.lock().unwrap().contains_key(&expected_key));
    }

    #[tokio::test]
    async fn test_commit_with_failing_resume_still_saves_avatar_and_fields() {
        let store = MemoryStore::default();
        let blobs = MemoryBlobs {
            fail_substring: Some("cv.pdf".to_string()),
            ..MemoryBlobs::default()
        };
        let id = identity();
        store
            .rows
            .lock()
            .unwrap()
            .insert(id.id, Profile::blank(id.id, &id.email));

        let avatar = PendingUpload::new("a.png", None, vec![1]).unwrap();
        let resume = PendingUpload::new("cv.pdf", None, vec![2]).unwrap();

        let outcome = commit(&store, &blobs, &id, draft("Ann"), Some(avatar), Some(resume))
            .await
            .unwrap();

        assert!(!outcome.fully_saved());
        assert_eq!(outcome.upload_failures.len(), 1);
        assert_eq!(outcome.upload_failures[0].kind, AttachmentKind::Resume);
        assert_eq!(outcome.upload_failures[0].filename, "cv.pdf");

        assert_eq!(outcome.profile.first_name, "Ann");
        assert!(outcome.profile.avatar_url.is_some());
        assert_eq!(outcome.profile.resume_url, None);
    }

    #[tokio::test]
    async fn test_commit_is_idempotent_without_new_selections() {
        let store = MemoryStore::default();
        let blobs = MemoryBlobs::default();
        let id = identity();
        store
            .rows
            .lock()
            .unwrap()
            .insert(id.id, Profile::blank(id.id, &id.email));

        let first = commit(&store, &blobs, &id, draft("Ann"), None, None)
            .await
            .unwrap();
        let second = commit(&store, &blobs, &id, draft("Ann"), None, None)
            .await
            .unwrap();

        assert_eq!(first.profile, second.profile);
    }

    #[tokio::test]
    async fn test_commit_fails_when_record_is_missing() {
        let store = MemoryStore::default();
        let blobs = MemoryBlobs::default();
        let id = identity();

        // No ensure_profile ran; the update must not create the row.
        let result = commit(&store, &blobs, &id, draft("Ann"), None, None).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(store.rows.lock().unwrap().is_empty());
    }

    #[test]
    fn test_attachment_key_is_scoped_by_identity_and_filename() {
        let id = Uuid::nil();
        assert_eq!(
            attachment_key(id, "a.png"),
            "profiles/00000000-0000-0000-0000-000000000000/a.png"
        );
    }
}
