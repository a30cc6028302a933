use std::fmt::{self, Display};

/// Errors produced by model constructors, enum parsing and global id decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The string is not shaped like `gid://watch/{Type}/{id}` or its id is
    /// not a valid UUID.
    InvalidGlobalId(String),
    /// The global id is well formed but names a different entity type.
    UnexpectedGlobalIdType { expected: &'static str, found: String },
    /// A persisted enum column held a value this build does not know.
    UnknownVariant { kind: &'static str, value: String },
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidGlobalId(gid) => {
                write!(f, "invalid global id: {gid}")
            }
            ModelError::UnexpectedGlobalIdType { expected, found } => {
                write!(f, "expected a {expected} global id, found {found}")
            }
            ModelError::UnknownVariant { kind, value } => {
                write!(f, "unknown {kind}: {value}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
