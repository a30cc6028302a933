//! PostgreSQL-backed repository implementations.

pub mod catalog;
pub mod watches;
