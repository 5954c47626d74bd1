use crate::models::{Product, ProductUpdate};
use crate::services::store::{ProductStore, parse_product_id};
use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local product store with the same id and error semantics as
/// `MongoProductStore`.
#[derive(Clone, Default)]
pub struct InMemoryProductStore {
    products: Arc<RwLock<Vec<Product>>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn list(&self) -> Result<Vec<Product>, AppError> {
        Ok(self.products.read().await.clone())
    }

    async fn insert_many(&self, products: Vec<Product>) -> Result<Vec<Product>, AppError> {
        self.products.write().await.extend(products.iter().cloned());
        Ok(products)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Product>, AppError> {
        let oid = parse_product_id(id)?;
        Ok(self
            .products
            .read()
            .await
            .iter()
            .find(|p| p.id == oid)
            .cloned())
    }

    async fn update_by_id(
        &self,
        id: &str,
        update: &ProductUpdate,
    ) -> Result<Option<Product>, AppError> {
        let oid = parse_product_id(id)?;
        let mut products = self.products.write().await;
        Ok(products.iter_mut().find(|p| p.id == oid).map(|product| {
            product.apply(update);
            product.clone()
        }))
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), AppError> {
        let oid = parse_product_id(id)?;
        self.products.write().await.retain(|p| p.id != oid);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewProduct;
    use mongodb::bson::oid::ObjectId;

    fn product(name: &str) -> Product {
        Product::new(NewProduct {
            name: name.to_string(),
            price: 10.0,
            image: format!("http://img/{}.png", name),
        })
    }

    #[tokio::test]
    async fn insert_then_list_returns_everything() {
        let store = InMemoryProductStore::new();
        store
            .insert_many(vec![product("a"), product("b")])
            .await
            .unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn update_missing_id_returns_none() {
        let store = InMemoryProductStore::new();
        let result = store
            .update_by_id(&ObjectId::new().to_hex(), &ProductUpdate::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = InMemoryProductStore::new();
        let inserted = store.insert_many(vec![product("a")]).await.unwrap();
        let id = inserted[0].id.to_hex();

        let update = ProductUpdate {
            price: Some(42.0),
            ..Default::default()
        };
        let updated = store.update_by_id(&id, &update).await.unwrap().unwrap();

        assert_eq!(updated.price, 42.0);
        assert_eq!(updated.name, "a");
        assert_eq!(store.find_by_id(&id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn delete_is_silent_for_unknown_ids() {
        let store = InMemoryProductStore::new();
        let inserted = store.insert_many(vec![product("a")]).await.unwrap();
        let id = inserted[0].id.to_hex();

        store.delete_by_id(&id).await.unwrap();
        store.delete_by_id(&id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_ids_fail() {
        let store = InMemoryProductStore::new();
        assert!(matches!(
            store.delete_by_id("123").await,
            Err(AppError::DatabaseError(_))
        ));
        assert!(store.find_by_id("xyz").await.is_err());
    }
}
