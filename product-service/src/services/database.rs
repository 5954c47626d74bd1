use crate::models::{Product, ProductUpdate};
use crate::services::store::{ProductStore, parse_product_id};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{ClientOptions, FindOneAndUpdateOptions, ReturnDocument},
    Client as MongoClient, Collection,
};
use secrecy::{ExposeSecret, Secret};
use service_core::error::AppError;
use tokio::sync::OnceCell;

/// MongoDB-backed product store.
///
/// Construction does no I/O. The connection string (including any
/// `mongodb+srv` DNS lookup) is resolved on first use, and retried on the
/// next call if that fails, so the router can serve before the database is
/// reachable.
pub struct MongoProductStore {
    uri: Secret<String>,
    database: String,
    client: OnceCell<MongoClient>,
}

impl MongoProductStore {
    pub fn new(uri: Secret<String>, database: impl Into<String>) -> Self {
        Self {
            uri,
            database: database.into(),
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&MongoClient, AppError> {
        self.client
            .get_or_try_init(|| async {
                tracing::info!(database = %self.database, "Configuring MongoDB client");
                let mut options = ClientOptions::parse(self.uri.expose_secret())
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to parse MongoDB connection string: {}", e);
                        AppError::from(e)
                    })?;
                options.app_name = Some("product-service".to_string());

                MongoClient::with_options(options).map_err(|e| {
                    tracing::error!("Failed to create MongoDB client: {}", e);
                    AppError::from(e)
                })
            })
            .await
    }

    async fn products(&self) -> Result<Collection<Product>, AppError> {
        Ok(self
            .client()
            .await?
            .database(&self.database)
            .collection("products"))
    }
}

#[async_trait]
impl ProductStore for MongoProductStore {
    async fn list(&self) -> Result<Vec<Product>, AppError> {
        let cursor = self.products().await?.find(doc! {}, None).await.map_err(|e| {
            tracing::error!("error in finding products: {}", e);
            AppError::from(e)
        })?;

        cursor.try_collect().await.map_err(|e| {
            tracing::error!("error in collecting products: {}", e);
            AppError::from(e)
        })
    }

    async fn insert_many(&self, products: Vec<Product>) -> Result<Vec<Product>, AppError> {
        self.products()
            .await?
            .insert_many(&products, None)
            .await
            .map_err(|e| {
                tracing::error!("Error in Create products: {}", e);
                AppError::from(e)
            })?;
        Ok(products)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Product>, AppError> {
        let oid = parse_product_id(id)?;
        self.products()
            .await?
            .find_one(doc! { "_id": oid }, None)
            .await
            .map_err(|e| {
                tracing::error!("error in fetching product: {}", e);
                AppError::from(e)
            })
    }

    async fn update_by_id(
        &self,
        id: &str,
        update: &ProductUpdate,
    ) -> Result<Option<Product>, AppError> {
        let oid = parse_product_id(id)?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.products()
            .await?
            .find_one_and_update(
                doc! { "_id": oid },
                doc! { "$set": update.to_set_document() },
                options,
            )
            .await
            .map_err(|e| {
                tracing::error!("error in updating product: {}", e);
                AppError::from(e)
            })
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), AppError> {
        let oid = parse_product_id(id)?;
        self.products()
            .await?
            .delete_one(doc! { "_id": oid }, None)
            .await
            .map_err(|e| {
                tracing::error!("error in deleting product: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client()
            .await?
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_store() -> MongoProductStore {
        MongoProductStore::new(Secret::new("not-a-mongodb-uri".to_string()), "product_db")
    }

    #[tokio::test]
    async fn bad_connection_string_fails_each_operation_not_construction() {
        let store = unreachable_store();

        assert!(matches!(store.list().await, Err(AppError::DatabaseError(_))));
        assert!(matches!(
            store.health_check().await,
            Err(AppError::DatabaseError(_))
        ));
        assert!(store.client.get().is_none());
    }

    #[tokio::test]
    async fn malformed_id_fails_before_connecting() {
        let store = unreachable_store();

        let err = store.delete_by_id("nope").await.unwrap_err();
        assert!(err.to_string().contains("Cast to ObjectId failed"));
        assert!(store.client.get().is_none());
    }
}
