//! Storage-shape entities and database bootstrap.

pub mod db;
pub mod team;
pub mod person;

#[cfg(test)]
mod tests;
