//! HRMS Dashboard Server library.
//!
//! This library provides the core functionality for the HRMS dashboard server,
//! including database operations, authentication, profile management, and
//! attachment storage.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
