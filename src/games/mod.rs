//! Game implementations.

pub mod mutiny;
