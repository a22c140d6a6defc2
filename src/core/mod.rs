//! # Core
//!
//! Cross-cutting application plumbing. Currently just configuration; it
//! knows nothing about HTTP or the auth domain.

pub mod config;
