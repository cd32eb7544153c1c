//! Sweet domain model and request inputs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::SweetId;

/// A sweet as served by the inventory API.
///
/// The server assigns `id` on creation and is the sole authority over
/// `quantity`; the client mirrors what the server last confirmed. `quantity`
/// is unsigned so a negative stock level is unrepresentable locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sweet {
    /// Server-assigned identifier, unique across the inventory.
    pub id: SweetId,
    /// Display name.
    pub name: String,
    /// Category label (e.g., "chocolate", "gummy").
    pub category: String,
    /// Unit price. Non-negative; serialized as a JSON number.
    pub price: Decimal,
    /// Units in stock.
    pub quantity: u32,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Input for creating or updating a sweet.
///
/// The id is never part of the input: the server assigns it on create and
/// takes it from the URL path on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweetInput {
    /// Display name.
    pub name: String,
    /// Category label.
    pub category: String,
    /// Unit price.
    pub price: Decimal,
    /// Units in stock.
    pub quantity: u32,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Filters for `GET /sweets/search`.
///
/// All fields are optional; omitted fields are not sent as query parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Substring match on the sweet name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Exact category match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Inclusive lower price bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Decimal>,
}

impl SearchQuery {
    /// True when no filter is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn sweet_deserializes_from_wire_shape() {
        let json = r#"{"id":"7","name":"Fudge","category":"chocolate","price":3.5,"quantity":12}"#;
        let sweet: Sweet = serde_json::from_str(json).unwrap();
        assert_eq!(sweet.id, SweetId::new("7"));
        assert_eq!(sweet.quantity, 12);
        assert_eq!(sweet.price, Decimal::try_from(3.5).unwrap());
        assert!(sweet.description.is_none());
    }

    #[test]
    fn input_omits_absent_description() {
        let input = SweetInput {
            name: "Nougat".into(),
            category: "chewy".into(),
            price: Decimal::ONE,
            quantity: 3,
            description: None,
        };
        let json = serde_json::to_string(&input).unwrap();
        assert!(!json.contains("description"));
    }

    #[test]
    fn search_query_reports_empty() {
        assert!(SearchQuery::default().is_empty());
        let q = SearchQuery {
            category: Some("gummy".into()),
            ..SearchQuery::default()
        };
        assert!(!q.is_empty());
    }
}
