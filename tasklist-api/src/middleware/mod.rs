/// Middleware modules for the API server
///
/// - `security`: Security headers on every response
/// - `json`: JSON bodies for framework-generated error responses

pub mod json;
pub mod security;
