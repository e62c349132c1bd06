//! Tollgate - request admission for API services
//!
//! This crate implements the admission layer that sits in front of an API's
//! business handlers: a shared-secret API key check and a per-client
//! sliding-window rate limiter, exposed as axum middleware and extractors.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod provider;
pub mod ratelimit;
