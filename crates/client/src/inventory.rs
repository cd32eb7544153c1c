//! Inventory cache: a client-side mirror of the sweets list.
//!
//! Every operation goes through the gateway and reconciles the local mirror
//! only after the server has confirmed:
//!
//! - `list`/`search` replace the mirror wholesale,
//! - `create`/`update`/`get` merge the server-returned object by id,
//! - `delete` removes by id,
//! - `purchase`/`restock` apply the quantity delta post-confirmation.
//!
//! Nothing is applied speculatively, so a failed call leaves the mirror
//! exactly as it was and no rollback path exists. The mirror persists across
//! calls until the next wholesale fetch replaces it.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use sweet_shop_core::{SearchQuery, Sweet, SweetId, SweetInput};

use crate::error::{ApiError, Result};
use crate::gateway::ApiClient;

#[derive(Serialize)]
struct QuantityRequest {
    quantity: u32,
}

/// Cached view of the sweets inventory.
///
/// Cheap to clone; all clones share the mirror.
#[derive(Clone)]
pub struct Inventory {
    gateway: ApiClient,
    items: Arc<RwLock<Vec<Sweet>>>,
}

impl Inventory {
    /// Create an empty inventory over `gateway`.
    #[must_use]
    pub fn new(gateway: ApiClient) -> Self {
        Self {
            gateway,
            items: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Fetch all sweets and replace the mirror wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any gateway failure; the mirror is unchanged.
    pub async fn list(&self) -> Result<Vec<Sweet>> {
        let sweets: Vec<Sweet> = self.gateway.get("sweets").await?;
        debug!(count = sweets.len(), "inventory listed");
        *self.items.write().await = sweets.clone();
        Ok(sweets)
    }

    /// Fetch sweets matching `query` and replace the mirror wholesale.
    ///
    /// The filtered result *is* the new mirror; it is not merged with any
    /// previous unfiltered set.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any gateway failure; the mirror is unchanged.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<Sweet>> {
        let sweets: Vec<Sweet> = self.gateway.get_query("sweets/search", query).await?;
        debug!(count = sweets.len(), "inventory searched");
        *self.items.write().await = sweets.clone();
        Ok(sweets)
    }

    /// Fetch one sweet by id and merge it into the mirror.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Server`] with status 404 for an unknown id.
    pub async fn get(&self, id: &SweetId) -> Result<Sweet> {
        let sweet: Sweet = self.gateway.get(&format!("sweets/{id}")).await?;
        self.merge(sweet.clone()).await;
        Ok(sweet)
    }

    /// Create a sweet and append the server-returned object to the mirror.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for locally invalid input, otherwise
    /// any gateway failure.
    pub async fn create(&self, input: &SweetInput) -> Result<Sweet> {
        validate_input(input)?;
        let sweet: Sweet = self.gateway.post("sweets", input).await?;
        debug!(id = %sweet.id, "sweet created");
        self.items.write().await.push(sweet.clone());
        Ok(sweet)
    }

    /// Update a sweet and replace the mirrored entry by id.
    ///
    /// A response for an id the mirror does not hold is merged as an append
    /// (should not happen under correct use, but must not panic).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for locally invalid input, otherwise
    /// any gateway failure.
    pub async fn update(&self, id: &SweetId, input: &SweetInput) -> Result<Sweet> {
        validate_input(input)?;
        let sweet: Sweet = self.gateway.put(&format!("sweets/{id}"), input).await?;
        debug!(id = %sweet.id, "sweet updated");
        self.merge(sweet.clone()).await;
        Ok(sweet)
    }

    /// Delete a sweet and remove it from the mirror.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any gateway failure; the mirror keeps the
    /// entry on failure.
    pub async fn delete(&self, id: &SweetId) -> Result<()> {
        self.gateway.delete(&format!("sweets/{id}")).await?;
        debug!(%id, "sweet deleted");
        self.items.write().await.retain(|s| &s.id != id);
        Ok(())
    }

    /// Purchase `quantity` units, decrementing the mirrored quantity after
    /// the server confirms.
    ///
    /// Stock sufficiency is the server's call; an over-purchase comes back
    /// as a server error and the mirror stays untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a zero quantity, otherwise any
    /// gateway failure.
    pub async fn purchase(&self, id: &SweetId, quantity: u32) -> Result<()> {
        validate_quantity(quantity)?;
        self.gateway
            .post_unit(&format!("sweets/{id}/purchase"), &QuantityRequest { quantity })
            .await?;
        debug!(%id, quantity, "sweet purchased");
        self.adjust_quantity(id, |current| current.saturating_sub(quantity))
            .await;
        Ok(())
    }

    /// Restock `quantity` units, incrementing the mirrored quantity after
    /// the server confirms.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a zero quantity, otherwise any
    /// gateway failure.
    pub async fn restock(&self, id: &SweetId, quantity: u32) -> Result<()> {
        validate_quantity(quantity)?;
        self.gateway
            .post_unit(&format!("sweets/{id}/restock"), &QuantityRequest { quantity })
            .await?;
        debug!(%id, quantity, "sweet restocked");
        self.adjust_quantity(id, |current| current.saturating_add(quantity))
            .await;
        Ok(())
    }

    /// Current mirror contents. Pure read, no network I/O.
    pub async fn snapshot(&self) -> Vec<Sweet> {
        self.items.read().await.clone()
    }

    /// Mirrored entry for `id`, if present.
    pub async fn find(&self, id: &SweetId) -> Option<Sweet> {
        self.items.read().await.iter().find(|s| &s.id == id).cloned()
    }

    // Replace by id, append when absent.
    async fn merge(&self, sweet: Sweet) {
        let mut items = self.items.write().await;
        if let Some(slot) = items.iter_mut().find(|s| s.id == sweet.id) {
            *slot = sweet;
        } else {
            items.push(sweet);
        }
    }

    async fn adjust_quantity(&self, id: &SweetId, f: impl FnOnce(u32) -> u32) {
        let mut items = self.items.write().await;
        if let Some(sweet) = items.iter_mut().find(|s| &s.id == id) {
            sweet.quantity = f(sweet.quantity);
        }
    }
}

fn validate_input(input: &SweetInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(ApiError::Validation {
            field: "name",
            message: "name cannot be empty".to_string(),
        });
    }
    if input.category.trim().is_empty() {
        return Err(ApiError::Validation {
            field: "category",
            message: "category cannot be empty".to_string(),
        });
    }
    if input.price.is_sign_negative() {
        return Err(ApiError::Validation {
            field: "price",
            message: "price cannot be negative".to_string(),
        });
    }
    Ok(())
}

fn validate_quantity(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(ApiError::Validation {
            field: "quantity",
            message: "quantity must be greater than zero".to_string(),
        });
    }
    Ok(())
}
