//! Storage abstraction for products.
//!
//! Handlers talk to a `ProductStore` so the MongoDB driver stays behind one
//! seam and tests can run against the in-memory implementation.

use crate::models::{Product, ProductUpdate};
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Every stored product, unfiltered. Order is not guaranteed.
    async fn list(&self) -> Result<Vec<Product>, AppError>;

    /// Inserts the whole batch in one call and returns it as stored.
    async fn insert_many(&self, products: Vec<Product>) -> Result<Vec<Product>, AppError>;

    /// `Ok(None)` when the id is well formed but nothing matches.
    async fn find_by_id(&self, id: &str) -> Result<Option<Product>, AppError>;

    /// Merges `update` into the matching product and returns the result.
    /// `Ok(None)` when the id is well formed but nothing matches.
    async fn update_by_id(
        &self,
        id: &str,
        update: &ProductUpdate,
    ) -> Result<Option<Product>, AppError>;

    /// Deleting an id that matches nothing is not an error.
    async fn delete_by_id(&self, id: &str) -> Result<(), AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// Parses a path identifier into an ObjectId.
///
/// A malformed id surfaces as a store failure, the same way the driver
/// reports a value it cannot cast.
pub fn parse_product_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|e| {
        tracing::error!(id = %id, "Cast to ObjectId failed: {}", e);
        AppError::DatabaseError(anyhow::anyhow!(
            "Cast to ObjectId failed for value \"{}\": {}",
            id,
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_object_id() {
        let id = ObjectId::new();
        assert_eq!(parse_product_id(&id.to_hex()).unwrap(), id);
    }

    #[test]
    fn malformed_id_is_a_database_error() {
        let err = parse_product_id("not-an-id").unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
    }
}
