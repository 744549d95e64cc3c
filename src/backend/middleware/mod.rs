//! HTTP Middleware

pub mod auth;
