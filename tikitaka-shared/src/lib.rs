//! # Tikitaka Shared Library
//!
//! Domain layer of the Tikitaka Q&A service: users linked to an external
//! social account post short-lived questions that others answer with text or
//! pitch-shifted voice comments, or vote on.
//!
//! ## Module Organization
//!
//! - `models`: Row types and their SQL
//! - `store`: Validation, lifecycle and aggregation on top of the models
//! - `lifecycle`: Pure expiry, comment-policy and vote rules
//! - `limits`: Configurable content limits and the expiry window
//! - `error`: Store error taxonomy
//! - `db`: Connection pool and migrations
//! - `identity`: External identity provider
//! - `media`: Object storage, audio transform and the voice pipeline

pub mod db;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod limits;
pub mod media;
pub mod models;
pub mod store;

/// Current version of the Tikitaka shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
