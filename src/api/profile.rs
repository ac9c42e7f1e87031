//! Profile API handlers.
//!
//! GET /profile loads (and lazily creates) the caller's profile record.
//! PUT /profile accepts the edited form as multipart/form-data — the text
//! fields plus optional `avatar` and `resume` file parts — and runs the
//! upload-and-commit pipeline.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, get, put, web};
use futures_util::StreamExt;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::SessionAuth;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{PendingUpload, Profile, ProfileDraft, UploadFailure};
use crate::services::Storage;
use crate::services::profile::{commit, ensure_profile};

/// Multipart field names that carry file attachments.
const AVATAR_FIELD: &str = "avatar";
const RESUME_FIELD: &str = "resume";

/// Response for a profile save.
#[derive(Debug, Serialize, ToSchema)]
pub struct SaveProfileResponse {
    pub profile: Profile,
    /// Attachment uploads that failed; the record itself was still saved.
    pub upload_failures: Vec<UploadFailure>,
    pub message: String,
}

/// Load the caller's profile, creating a blank record on first visit.
///
/// GET /api/v1/profile
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "The caller's profile record", body = Profile),
        (status = 401, description = "Not authenticated")
    )
)]
#[get("/profile")]
pub async fn get_profile(auth: SessionAuth, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let profile = ensure_profile(pool.get_ref(), &auth.identity).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Save the caller's profile: upload pending attachments, then update
/// the record. Attachment failures do not block the save; they are
/// reported in the response.
///
/// PUT /api/v1/profile
/// Content-Type: multipart/form-data
#[utoipa::path(
    put,
    path = "/api/v1/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "Profile saved", body = SaveProfileResponse),
        (status = 400, description = "Malformed form or invalid attachment filename"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Profile record missing"),
        (status = 413, description = "Attachment exceeds the size limit")
    )
)]
#[put("/profile")]
pub async fn save_profile(
    auth: SessionAuth,
    payload: Multipart,
    pool: web::Data<DbPool>,
    storage: web::Data<Storage>,
    max_upload_size: web::Data<usize>,
) -> AppResult<HttpResponse> {
    let form = parse_profile_form(payload, *max_upload_size.get_ref()).await?;

    info!(
        "Saving profile for account {} (avatar: {}, resume: {})",
        auth.identity.id,
        form.avatar.is_some(),
        form.resume.is_some()
    );

    let outcome = commit(
        pool.get_ref(),
        storage.get_ref(),
        &auth.identity,
        form.draft,
        form.avatar,
        form.resume,
    )
    .await?;

    let message = if outcome.upload_failures.is_empty() {
        "Profile saved".to_string()
    } else {
        format!(
            "Profile saved ({} attachment(s) failed to upload)",
            outcome.upload_failures.len()
        )
    };

    Ok(HttpResponse::Ok().json(SaveProfileResponse {
        profile: outcome.profile,
        upload_failures: outcome.upload_failures,
        message,
    }))
}

/// Configure profile routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_profile).service(save_profile);
}

// ============================================================================
// Multipart parsing
// ============================================================================

/// Parsed profile form: the text draft plus at most one pending avatar
/// and one pending resume. A repeated file part replaces the previous
/// selection, matching how a form's file input behaves.
struct ProfileForm {
    draft: ProfileDraft,
    avatar: Option<PendingUpload>,
    resume: Option<PendingUpload>,
}

async fn parse_profile_form(mut payload: Multipart, max_size: usize) -> AppResult<ProfileForm> {
    let mut form = ProfileForm {
        draft: ProfileDraft::default(),
        avatar: None,
        resume: None,
    };

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::InvalidInput("Missing content disposition".to_string()))?;

        let name = content_disposition
            .get_name()
            .unwrap_or_default()
            .to_string();
        let filename = content_disposition.get_filename().map(String::from);

        match (name.as_str(), filename) {
            (AVATAR_FIELD, Some(filename)) => {
                let content_type = field.content_type().map(|m| m.to_string());
                let data = read_field_bytes(&mut field, max_size, AVATAR_FIELD).await?;
                if let Some(selection) =
                    file_selection(AVATAR_FIELD, &filename, content_type, data)?
                {
                    form.avatar = Some(selection);
                }
            }
            (RESUME_FIELD, Some(filename)) => {
                let content_type = field.content_type().map(|m| m.to_string());
                let data = read_field_bytes(&mut field, max_size, RESUME_FIELD).await?;
                if let Some(selection) =
                    file_selection(RESUME_FIELD, &filename, content_type, data)?
                {
                    form.resume = Some(selection);
                }
            }
            (field_name, _) => {
                let data = read_field_bytes(&mut field, max_size, field_name).await?;
                let value = String::from_utf8(data).map_err(|_| {
                    AppError::InvalidInput(format!("Field '{}' is not valid UTF-8", field_name))
                })?;
                form.draft.set_field(field_name, value);
            }
        }
    }

    Ok(form)
}

/// Turn a submitted file part into a pending upload.
///
/// An empty file input still submits a part with an empty filename and
/// no data; that is no selection, not an error. A part that carried a
/// real filename which normalizes to nothing (traversal names, a path
/// ending in a separator) is rejected outright rather than silently
/// ignored.
fn file_selection(
    slot: &str,
    filename: &str,
    content_type: Option<String>,
    data: Vec<u8>,
) -> AppResult<Option<PendingUpload>> {
    if filename.is_empty() && data.is_empty() {
        return Ok(None);
    }

    match PendingUpload::new(filename, content_type, data) {
        Some(pending) => Ok(Some(pending)),
        None => Err(AppError::InvalidInput(format!(
            "Invalid {} filename: '{}'",
            slot, filename
        ))),
    }
}

/// Read a multipart field into memory, enforcing the size limit.
async fn read_field_bytes(
    field: &mut actix_multipart::Field,
    max_size: usize,
    what: &str,
) -> AppResult<Vec<u8>> {
    let mut data = Vec::new();

    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
        if data.len() + chunk.len() > max_size {
            return Err(AppError::PayloadTooLarge(format!(
                "'{}' exceeds the {} byte limit",
                what, max_size
            )));
        }
        data.extend_from_slice(&chunk);
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_selection_empty_part_is_no_selection() {
        let result = file_selection(AVATAR_FIELD, "", None, Vec::new()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_file_selection_accepts_normal_filename() {
        let result = file_selection(AVATAR_FIELD, "a.png", None, vec![1, 2, 3])
            .unwrap()
            .unwrap();
        assert_eq!(result.filename, "a.png");
    }

    #[test]
    fn test_file_selection_rejects_unusable_filename_instead_of_dropping_it() {
        // A selected file whose name normalizes to nothing must surface
        // as an error, never as a save that quietly skipped the upload.
        for bad in ["..", ".", "uploads/"] {
            let result = file_selection(RESUME_FIELD, bad, None, vec![1]);
            assert!(
                matches!(result, Err(AppError::InvalidInput(_))),
                "'{}' should be rejected",
                bad
            );
        }
    }
}
