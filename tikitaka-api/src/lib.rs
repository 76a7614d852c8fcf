//! # TikiTaka API Server Library
//!
//! HTTP surface of the TikiTaka Q&A service: users linked to an external
//! identity, time-boxed questions, vote questions, and text and voice comments.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
