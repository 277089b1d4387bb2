//! # Tasklist API Server Library
//!
//! HTTP layer of the tasklist service: users register or log in for a bearer
//! token, then create, list, update and delete tasks with file attachments.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Request extractors (validated JSON, task payloads, task lookup)
//! - `middleware`: Security headers and JSON error rewriting
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
