//! Chat Error Taxonomy
//!
//! This module defines the error type shared by the service layer, the REST
//! handlers and the WebSocket gateway.
//!
//! # Error Categories
//!
//! - `Validation` - missing or malformed required fields, rejected before persistence
//! - `NotFound` - a referenced conversation or message does not exist
//! - `Authorization` - the actor is not the owning sender/receiver for a mutation
//! - `Conflict` - a concurrent writer won a uniqueness race
//! - `Transport` - socket-level failures (missing or invalid handshake token)
//! - `Database` - an underlying sqlx failure
//!
//! # Boundary Rules
//!
//! REST handlers translate these into HTTP statuses. `Database` details never
//! cross the boundary; clients see a generic internal-error message while the
//! full error is logged server-side.

use thiserror::Error;

/// Errors produced by the chat core
#[derive(Debug, Error)]
pub enum ChatError {
    /// A required field is missing or malformed
    #[error("validation error in field '{field}': {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// The referenced entity does not exist
    #[error("{entity} not found")]
    NotFound {
        /// What was looked up ("conversation", "message", "user")
        entity: String,
    },

    /// The actor does not own the entity being mutated
    #[error("authorization error: {message}")]
    Authorization {
        /// Human-readable error message
        message: String,
    },

    /// A concurrent writer created the same entity first
    #[error("conflict: {message}")]
    Conflict {
        /// Human-readable error message
        message: String,
    },

    /// Socket-level authentication or framing failure
    #[error("transport error: {message}")]
    Transport {
        /// Human-readable error message
        message: String,
    },

    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChatError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    /// Create a new authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Create a new conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Client-safe description of this error
    ///
    /// `Database` and `Serialization` details stay server-side; everything
    /// else is already phrased for users.
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Serialization(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}
