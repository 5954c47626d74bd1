use crate::models::{NewProduct, Product, ProductUpdate};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use service_core::error::AppError;
use validator::Validate;

pub const EMPTY_BATCH_MESSAGE: &str = "Please provide at least one product";
pub const INVALID_PRODUCT_MESSAGE: &str = "Each product must have a name, price, and image";

/// Success envelope shared by every product endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(serialize_with = "price_as_json_number")]
    pub price: f64,
    pub image: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_hex(),
            name: product.name,
            price: product.price,
            image: product.image,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// A create request that passed validation.
///
/// The body must be a non-empty JSON array and every entry must carry a
/// truthy `name`, `price` and `image`. One bad entry rejects the batch.
#[derive(Debug)]
pub struct ProductBatch(pub Vec<NewProduct>);

impl ProductBatch {
    pub fn from_value(body: Value) -> Result<Self, AppError> {
        let candidates = match body {
            Value::Array(items) if !items.is_empty() => items,
            _ => return Err(AppError::bad_request(EMPTY_BATCH_MESSAGE)),
        };

        if !candidates.iter().all(has_required_fields) {
            return Err(AppError::bad_request(INVALID_PRODUCT_MESSAGE));
        }

        candidates
            .into_iter()
            .map(|candidate| -> Result<NewProduct, AppError> {
                let product: NewProduct = serde_json::from_value(candidate)
                    .map_err(|_| AppError::bad_request(INVALID_PRODUCT_MESSAGE))?;
                product
                    .validate()
                    .map_err(|_| AppError::bad_request(INVALID_PRODUCT_MESSAGE))?;
                Ok(product)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ProductBatch)
    }

    pub fn into_inner(self) -> Vec<NewProduct> {
        self.0
    }
}

#[async_trait]
impl<S> FromRequest<S> for ProductBatch
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // A missing or unparseable body counts as "no products".
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|_| AppError::bad_request(EMPTY_BATCH_MESSAGE))?;
        Self::from_value(body)
    }
}

/// Update body.
///
/// Requests without a JSON content type, or whose body is empty or not JSON,
/// update nothing. A JSON body whose fields cannot be cast to the product
/// shape fails like any other store error.
#[derive(Debug)]
pub struct ProductPatch(pub ProductUpdate);

impl ProductPatch {
    pub fn from_slice(body: &[u8]) -> Result<Self, AppError> {
        let value = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Null) | Err(_) => return Ok(ProductPatch(ProductUpdate::default())),
            Ok(value @ Value::Object(_)) => value,
            Ok(other) => {
                tracing::error!("error in casting product update: not an object: {}", other);
                return Err(AppError::DatabaseError(anyhow::anyhow!(
                    "Cast to product fields failed: expected an object"
                )));
            }
        };

        serde_json::from_value(value).map(ProductPatch).map_err(|e| {
            tracing::error!("error in casting product update: {}", e);
            AppError::DatabaseError(anyhow::Error::new(e).context("Cast to product fields failed"))
        })
    }
}

#[async_trait]
impl<S> FromRequest<S> for ProductPatch
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(is_json_content_type);

        let body = Bytes::from_request(req, state).await.map_err(|e| {
            tracing::error!("Failed to read update body: {}", e);
            AppError::InternalError(anyhow::anyhow!("failed to read update body: {}", e))
        })?;

        if !is_json {
            return Ok(ProductPatch(ProductUpdate::default()));
        }
        Self::from_slice(&body)
    }
}

fn is_json_content_type(value: &str) -> bool {
    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// Whole-number prices render as JSON integers (`120`, not `120.0`).
fn price_as_json_number<S>(price: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    // Largest magnitude below which every integer is exact in an f64.
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    if price.fract() == 0.0 && price.abs() < MAX_EXACT {
        serializer.serialize_i64(*price as i64)
    } else {
        serializer.serialize_f64(*price)
    }
}

fn has_required_fields(candidate: &Value) -> bool {
    ["name", "price", "image"]
        .iter()
        .all(|field| candidate.get(field).is_some_and(is_truthy))
}

/// JSON truthiness: `null`, `false`, `0` and `""` are falsy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
