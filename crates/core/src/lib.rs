//! Sweet Shop Core - Shared types library.
//!
//! This crate provides common types used across all Sweet Shop client
//! components:
//! - `client` - The SDK (session manager, API gateway, inventory cache)
//! - `cli` - Command-line storefront/admin front end
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and emails, plus the
//!   sweet and user domain models

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
