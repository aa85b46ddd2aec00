//! Error type definitions for the podcast server.
//!
//! The database layer reports failures through `anyhow::Result`; typed
//! errors below are attached where the web boundary needs to tell
//! validation, missing-resource and data-integrity cases apart.

use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed input, rejected before any query executes
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// A mandatory join target is missing, e.g. a podcast without a
    /// cover. Fatal: the store no longer satisfies its invariants.
    #[error("Data integrity violation: {message}")]
    DataIntegrity { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn data_integrity<S: Into<String>>(message: S) -> Self {
        Self::DataIntegrity {
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
