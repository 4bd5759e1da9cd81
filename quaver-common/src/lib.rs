//! # Quaver Common Library
//!
//! Shared code for both quaver processes including:
//! - Error types
//! - Configuration loading
//! - Database initialization
//! - Persistent per-chat queue
//! - Action bridge (wire types and pub/sub transports)

pub mod bridge;
pub mod config;
pub mod db;
pub mod error;
pub mod queue;

pub use error::{Error, Result};
