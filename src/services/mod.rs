//! Business logic services.

pub mod auth;
pub mod profile;
pub mod storage;

pub use auth::configure_auth_routes;
pub use profile::{BlobStore, ProfileStore};
pub use storage::Storage;
