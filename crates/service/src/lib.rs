//! Service layer providing generic CRUD and query operations on top of models.
//! - Callers work with transfer shapes (DTOs) and predicates over them.
//! - Predicates are translated to storage shape through an explicit mapping registry
//!   before any backend call.
//! - Data access goes through the `Repository` trait; SeaORM is the production backend.

pub mod errors;
pub mod generic;
pub mod mapping;
pub mod mappings;
pub mod pagination;
pub mod person;
pub mod predicate;
pub mod repository;
pub mod team;
#[cfg(test)]
pub mod test_support;
