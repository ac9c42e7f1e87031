//! SeaORM entity definitions for PostgreSQL database.

pub mod account;
pub mod profile;
pub mod refresh_token;
