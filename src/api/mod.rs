//! API endpoint modules.

pub mod files;
pub mod health;
pub mod openapi;
pub mod profile;

pub use files::configure_routes as configure_file_routes;
pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use profile::configure_routes as configure_profile_routes;
