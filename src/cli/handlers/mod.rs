//! Command handlers for CLI operations
//!
//! This module contains handlers for different CLI commands,
//! separating command execution logic from parsing and validation.

pub mod catalog;
pub mod token;

pub use catalog::CatalogCommandHandler;
pub use token::TokenCommandHandler;
