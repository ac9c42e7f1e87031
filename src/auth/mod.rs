//! Authentication module for session-based identity resolution.

mod extractor;

pub use extractor::SessionAuth;
