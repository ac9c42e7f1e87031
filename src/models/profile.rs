//! Profile models: the persisted record, the in-progress edit, and the
//! structured outcome of a save.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Profile record stored in database. One row per account; `id` equals
/// the owning account id and never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub username: String,
    pub about: String,
    pub avatar_url: Option<String>,
    pub resume_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// A freshly created profile: identity and email populated, every
    /// other field empty.
    pub fn blank(id: Uuid, email: &str) -> Self {
        Self {
            id,
            email: email.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            country: String::new(),
            street_address: String::new(),
            city: String::new(),
            state: String::new(),
            zip_code: String::new(),
            username: String::new(),
            about: String::new(),
            avatar_url: None,
            resume_url: None,
            updated_at: None,
        }
    }
}

/// The editable text fields of a profile, as submitted by the form.
/// Holds no attachment data; pending files travel separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct ProfileDraft {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub username: String,
    pub about: String,
}

impl ProfileDraft {
    /// Merge one named field into the draft. Unknown names are ignored,
    /// matching what the surrounding form can submit.
    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            "email" => self.email = value,
            "first_name" => self.first_name = value,
            "last_name" => self.last_name = value,
            "country" => self.country = value,
            "street_address" => self.street_address = value,
            "city" => self.city = value,
            "state" => self.state = value,
            "zip_code" => self.zip_code = value,
            "username" => self.username = value,
            "about" => self.about = value,
            _ => {}
        }
    }
}

/// Field changes applied by a profile save. `avatar_url`/`resume_url`
/// are only set when a new upload succeeded; `None` leaves the stored
/// value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub draft: ProfileDraft,
    pub avatar_url: Option<String>,
    pub resume_url: Option<String>,
}

/// Which attachment slot a pending upload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Avatar,
    Resume,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avatar => "avatar",
            Self::Resume => "resume",
        }
    }
}

/// A file selection held in memory until commit. Never persisted;
/// discarded after the upload attempt, successful or not.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl PendingUpload {
    /// Create a pending upload, keeping only the final path component of
    /// the submitted filename. Returns None for empty or traversal names.
    pub fn new(filename: &str, content_type: Option<String>, data: Vec<u8>) -> Option<Self> {
        let name = filename.replace('\\', "/");
        let name = name.rsplit('/').next().unwrap_or("");
        if name.is_empty() || name == "." || name == ".." {
            return None;
        }
        Some(Self {
            filename: name.to_string(),
            content_type,
            data,
        })
    }
}

/// A single failed attachment upload within an otherwise successful save.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadFailure {
    pub kind: AttachmentKind,
    pub filename: String,
    pub reason: String,
}

/// Structured result of a profile save: the persisted record plus any
/// attachment uploads that failed along the way. A failed upload never
/// blocks the record write; it is reported here instead.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommitOutcome {
    pub profile: Profile,
    pub upload_failures: Vec<UploadFailure>,
}

impl CommitOutcome {
    /// Whether every requested upload succeeded.
    pub fn fully_saved(&self) -> bool {
        self.upload_failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_profile_is_empty_except_identity() {
        let id = Uuid::new_v4();
        let p = Profile::blank(id, "u1@x.com");
        assert_eq!(p.id, id);
        assert_eq!(p.email, "u1@x.com");
        assert_eq!(p.first_name, "");
        assert_eq!(p.about, "");
        assert_eq!(p.avatar_url, None);
        assert_eq!(p.resume_url, None);
    }

    #[test]
    fn test_draft_set_field_merges_known_names() {
        let mut draft = ProfileDraft::default();
        draft.set_field("first_name", "Ann".to_string());
        draft.set_field("city", "Lagos".to_string());
        draft.set_field("unknown_field", "ignored".to_string());
        assert_eq!(draft.first_name, "Ann");
        assert_eq!(draft.city, "Lagos");
        assert_eq!(draft.last_name, "");
    }

    #[test]
    fn test_pending_upload_strips_path_components() {
        let up = PendingUpload::new("photos/2024/a.png", None, vec![1]).unwrap();
        assert_eq!(up.filename, "a.png");

        let up = PendingUpload::new("C:\\Users\\me\\cv.pdf", None, vec![1]).unwrap();
        assert_eq!(up.filename, "cv.pdf");
    }

    #[test]
    fn test_pending_upload_rejects_empty_and_traversal_names() {
        assert!(PendingUpload::new("", None, vec![]).is_none());
        assert!(PendingUpload::new("..", None, vec![]).is_none());
        assert!(PendingUpload::new("uploads/..", None, vec![]).is_none());
    }
}
