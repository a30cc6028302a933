//! Repository ports consumed by application services.

pub mod catalog;
pub mod watches;
