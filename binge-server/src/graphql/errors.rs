//! Conversion of core failures into GraphQL field errors.
//!
//! Every error carries a machine readable `extensions.code`.

use async_graphql::{Error, ErrorExtensions, ID};
use binge_core::CoreError;
use binge_model::{GlobalId, GlobalIdentifiable};

pub const BAD_GLOBAL_ID: &str = "BAD_GLOBAL_ID";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const PROVIDER_ERROR: &str = "PROVIDER_ERROR";
pub const CONFLICT: &str = "CONFLICT";
pub const INTERNAL: &str = "INTERNAL";

pub fn error_code(err: &CoreError) -> &'static str {
    match err {
        CoreError::Model(_) => BAD_GLOBAL_ID,
        CoreError::NotFound(_) => NOT_FOUND,
        CoreError::Provider(_) => PROVIDER_ERROR,
        CoreError::Conflict { .. } => CONFLICT,
        CoreError::Database(_) | CoreError::Internal(_) => INTERNAL,
    }
}

pub fn core_error(err: CoreError) -> Error {
    let code = error_code(&err);
    let message = match &err {
        CoreError::Database(db) => {
            tracing::error!(error = ?db, "database operation failed");
            "Database operation failed".to_string()
        }
        CoreError::Internal(msg) => {
            tracing::error!("internal error: {}", msg);
            err.to_string()
        }
        _ => err.to_string(),
    };

    Error::new(message).extend_with(|_, ext| ext.set("code", code))
}

pub trait GqlResultExt<T> {
    fn gql(self) -> async_graphql::Result<T>;
}

impl<T> GqlResultExt<T> for binge_core::Result<T> {
    fn gql(self) -> async_graphql::Result<T> {
        self.map_err(core_error)
    }
}

/// Decodes a client supplied global id into the typed id `T`.
pub fn decode_id<T: GlobalIdentifiable>(id: &ID) -> async_graphql::Result<T> {
    GlobalId::decode_as::<T>(id.as_str())
        .map_err(|err| core_error(CoreError::Model(err)))
}

pub fn decode_ids<T: GlobalIdentifiable>(
    ids: &[ID],
) -> async_graphql::Result<Vec<T>> {
    ids.iter().map(decode_id).collect()
}

pub fn to_id<T: GlobalIdentifiable>(id: &T) -> ID {
    ID(id.to_gid())
}
