//! Opaque global identifiers of the form `gid://watch/{Type}/{id}`.
//!
//! Global ids are the only identifiers exposed across the API boundary. They
//! carry the entity type so a client can hand any of them back without
//! additional context.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::{ModelError, Result};

/// Namespace segment shared by every id this service issues.
pub const GID_NAMESPACE: &str = "watch";

static GID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^gid://watch/(?P<type>\w+)/(?P<id>[\w-]+)$")
        .unwrap_or_else(|err| panic!("global id pattern must compile: {err}"))
});

/// A decoded global id: entity type name plus the local id string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalId {
    pub kind: String,
    pub id: String,
}

impl GlobalId {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Formats `kind` and `id` as `gid://watch/{kind}/{id}`.
    pub fn encode(kind: &str, id: &str) -> String {
        format!("gid://{GID_NAMESPACE}/{kind}/{id}")
    }

    /// Parses a global id, failing when the string does not have the
    /// `gid://watch/{Type}/{id}` shape.
    pub fn decode(gid: &str) -> Result<Self> {
        let captures = GID_PATTERN
            .captures(gid)
            .ok_or_else(|| ModelError::InvalidGlobalId(gid.to_string()))?;

        Ok(Self::new(&captures["type"], &captures["id"]))
    }

    /// Decodes a global id and converts it into the typed id `T`, checking
    /// that the type segment matches.
    pub fn decode_as<T: GlobalIdentifiable>(gid: &str) -> Result<T> {
        let decoded = Self::decode(gid)?;
        if decoded.kind != T::TYPE_NAME {
            return Err(ModelError::UnexpectedGlobalIdType {
                expected: T::TYPE_NAME,
                found: decoded.kind,
            });
        }

        T::from_local_id(&decoded.id)
            .ok_or_else(|| ModelError::InvalidGlobalId(gid.to_string()))
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::encode(&self.kind, &self.id))
    }
}

/// Typed ids that can be rendered as, and recovered from, global ids.
pub trait GlobalIdentifiable: Sized {
    /// Entity type segment, e.g. `Series`.
    const TYPE_NAME: &'static str;

    fn local_id(&self) -> String;

    fn from_local_id(id: &str) -> Option<Self>;

    fn to_gid(&self) -> String {
        GlobalId::encode(Self::TYPE_NAME, &self.local_id())
    }
}
