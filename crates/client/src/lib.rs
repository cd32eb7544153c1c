//! Sweet Shop client SDK.
//!
//! Client-side core for the Sweet Shop storefront: the session/token
//! lifecycle, the API gateway with its 401 refresh-and-retry policy, and the
//! inventory cache that keeps local state consistent with server mutations.
//!
//! # Architecture
//!
//! - [`session::SessionManager`] - owns the access/refresh token pair,
//!   persists it through a [`store::CredentialStore`], refreshes expired
//!   access tokens (single-flight), and tears the session down on
//!   unrecoverable auth failure.
//! - [`gateway::ApiClient`] - the one HTTP wrapper everything calls through:
//!   bearer attachment, envelope unwrapping, 401 intercept with exactly one
//!   retry, typed errors.
//! - [`inventory::Inventory`] - in-memory mirror of the product list,
//!   reconciled against server-confirmed mutations.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sweet_shop_client::{ApiClient, ClientConfig, Inventory, MemoryStore, SessionManager};
//! use sweet_shop_core::Email;
//!
//! # async fn run() -> sweet_shop_client::Result<()> {
//! let config = ClientConfig::new("http://localhost:8050")?;
//! let session = SessionManager::new(&config, Arc::new(MemoryStore::new()))?;
//! let gateway = ApiClient::new(&config, session.clone())?;
//! let inventory = Inventory::new(gateway);
//!
//! session.login(&Email::parse("customer@example.com").unwrap(), "hunter22").await?;
//! for sweet in inventory.list().await? {
//!     println!("{} - {} in stock", sweet.name, sweet.quantity);
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod gateway;
pub mod inventory;
pub mod session;
pub mod store;
pub mod token;

mod wire;

pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, AuthError, Result};
pub use gateway::ApiClient;
pub use inventory::Inventory;
pub use session::{Registration, Session, SessionManager};
pub use store::{CredentialStore, Credentials, JsonFileStore, MemoryStore, StoreError};
