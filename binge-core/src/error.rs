use binge_model::ModelError;
use thiserror::Error;

use crate::providers::ProviderError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid identifier: {0}")]
    Model(#[from] ModelError),

    #[error("Metadata provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A write hit a unique constraint. `constraint` names it when the
    /// database reported one.
    #[error("Conflict: {message}")]
    Conflict {
        constraint: Option<String>,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound(what.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::Conflict {
            constraint: None,
            message: message.into(),
        }
    }

    /// True for a conflict on the named unique constraint.
    pub fn violates(&self, constraint: &str) -> bool {
        matches!(
            self,
            CoreError::Conflict { constraint: Some(name), .. } if name == constraint
        )
    }

    /// Maps constraint violations raised by writes. Unique violations become
    /// [`CoreError::Conflict`] carrying the constraint name and foreign key
    /// violations become [`CoreError::NotFound`].
    pub fn from_write(err: sqlx::Error, context: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                CoreError::Conflict {
                    constraint: db.constraint().map(str::to_owned),
                    message: format!("{context}: {}", db.message()),
                }
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                CoreError::NotFound(format!("{context}: {}", db.message()))
            }
            _ => CoreError::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
