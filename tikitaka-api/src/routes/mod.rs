/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Identity provider authorization and token refresh
/// - `users`: User linking, lookup and deletion
/// - `questions`: Questions and vote questions
/// - `comments`: Text and voice comments, votes and per-user inboxes

pub mod auth;
pub mod comments;
pub mod health;
pub mod questions;
pub mod users;
