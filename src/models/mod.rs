//! Domain models shared across API handlers and services.

pub mod account;
pub mod profile;

pub use account::{Account, Identity, SessionClaims};
pub use profile::{
    AttachmentKind, CommitOutcome, PendingUpload, Profile, ProfileChanges, ProfileDraft,
    UploadFailure,
};
