//! Shared types, errors, and configuration for RemitGL.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error types
//! - Configuration management
//! - JWT claims and token validation
//! - Pagination types for list endpoints

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
