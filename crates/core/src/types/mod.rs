//! Core types for the Sweet Shop client.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod sweet;
pub mod user;

pub use email::{Email, EmailError};
pub use id::*;
pub use sweet::{SearchQuery, Sweet, SweetInput};
pub use user::{Role, UserProfile};
