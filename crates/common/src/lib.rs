//! Cross-crate helpers shared by the binaries and tests.

pub mod utils;
