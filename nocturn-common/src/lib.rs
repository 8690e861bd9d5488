//! # Nocturn Common Library
//!
//! Shared code for the nocturn clip-archive tools including:
//! - Common error type
//! - TOML configuration loading and path resolution
//! - Night/time utility functions

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
