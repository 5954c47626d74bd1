#![allow(dead_code)]

use product_service::config::{MongoConfig, ProductConfig, StoreBackend};
use product_service::services::InMemoryProductStore;
use product_service::{build_router, AppState, Application};
use secrecy::Secret;
use serde_json::Value;
use service_core::config::Config;
use std::sync::Arc;

pub fn test_config(store_backend: StoreBackend) -> ProductConfig {
    ProductConfig {
        common: Config {
            port: 0, // Random port
            log_level: "error".to_string(),
            otlp_endpoint: None,
        },
        mongodb: MongoConfig {
            uri: Secret::new(
                std::env::var("TEST_MONGODB_URI")
                    .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            ),
            database: format!("product_test_{}", uuid_like()),
        },
        store_backend,
    }
}

/// Router over a fresh in-memory store, for `oneshot` tests.
pub fn memory_router() -> axum::Router {
    build_router(AppState {
        config: test_config(StoreBackend::Memory),
        store: Arc::new(InMemoryProductStore::new()),
    })
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(StoreBackend::Memory).await
    }

    pub async fn spawn_with(store_backend: StoreBackend) -> Self {
        Self::spawn_with_config(test_config(store_backend)).await
    }

    pub async fn spawn_with_config(config: ProductConfig) -> Self {
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    pub fn products_url(&self) -> String {
        format!("{}/api/products", self.address)
    }

    pub fn product_url(&self, id: &str) -> String {
        format!("{}/api/products/{}", self.address, id)
    }

    pub async fn create(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(self.products_url())
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn list(&self) -> Value {
        self.client
            .get(self.products_url())
            .send()
            .await
            .expect("Failed to execute request")
            .json()
            .await
            .expect("Failed to parse JSON")
    }
}

fn uuid_like() -> String {
    mongodb::bson::oid::ObjectId::new().to_hex()
}
