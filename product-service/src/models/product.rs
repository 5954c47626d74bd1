use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId, Document};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// A product as stored in the `products` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub price: f64,
    pub image: String,
    #[serde(
        rename = "createdAt",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    pub created_at: DateTime<Utc>,
    #[serde(
        rename = "updatedAt",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Assigns a fresh identifier and timestamps to a validated candidate.
    pub fn new(candidate: NewProduct) -> Self {
        // BSON dates carry millisecond precision; truncate up front so a
        // product reads back exactly as it was returned on insert.
        let now = bson::DateTime::now().to_chrono();
        Self {
            id: ObjectId::new(),
            name: candidate.name,
            price: candidate.price,
            image: candidate.image,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges the provided fields and bumps `updated_at`.
    pub fn apply(&mut self, update: &ProductUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(image) = &update.image {
            self.image = image.clone();
        }
        self.updated_at = bson::DateTime::now().to_chrono();
    }
}

/// A creation candidate that passed field checks.
#[derive(Debug, Clone, Deserialize, Validate, PartialEq)]
pub struct NewProduct {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    #[serde(deserialize_with = "text_from_json")]
    pub name: String,
    #[serde(deserialize_with = "price_from_json")]
    pub price: f64,
    #[validate(length(min = 1, message = "Image cannot be empty"))]
    #[serde(deserialize_with = "text_from_json")]
    pub image: String,
}

/// Fields accepted on update. Absent fields are left untouched and unknown
/// fields are dropped.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProductUpdate {
    #[serde(default, deserialize_with = "optional_text_from_json")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "optional_price_from_json")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "optional_text_from_json")]
    pub image: Option<String>,
}

impl ProductUpdate {
    /// The `$set` document for this update, including the `updatedAt` bump.
    pub fn to_set_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(name) = &self.name {
            set.insert("name", name.as_str());
        }
        if let Some(price) = self.price {
            set.insert("price", price);
        }
        if let Some(image) = &self.image {
            set.insert("image", image.as_str());
        }
        set.insert("updatedAt", bson::DateTime::now());
        set
    }
}

/// Text fields also take numbers and booleans, rendered as they were sent.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl From<RawText> for String {
    fn from(raw: RawText) -> Self {
        match raw {
            RawText::Text(s) => s,
            RawText::Number(n) => n.to_string(),
            RawText::Bool(b) => b.to_string(),
        }
    }
}

fn text_from_json<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawText::deserialize(deserializer).map(String::from)
}

fn optional_text_from_json<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawText>::deserialize(deserializer)?.map(String::from))
}

/// Prices arrive either as JSON numbers or as numeric strings such as "19.99".
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Number(f64),
    Text(String),
}

impl RawPrice {
    fn into_price<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            RawPrice::Number(n) => Ok(n),
            RawPrice::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| E::custom(format!("price is not a number: {:?}", s))),
        }
    }
}

fn price_from_json<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    RawPrice::deserialize(deserializer)?.into_price()
}

fn optional_price_from_json<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawPrice>::deserialize(deserializer)?
        .map(RawPrice::into_price)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn desk() -> NewProduct {
        NewProduct {
            name: "Desk".to_string(),
            price: 120.0,
            image: "http://x/d.png".to_string(),
        }
    }

    #[test]
    fn new_product_gets_identifier_and_matching_timestamps() {
        let product = Product::new(desk());
        assert_eq!(product.name, "Desk");
        assert_eq!(product.created_at, product.updated_at);
        assert_ne!(product.id, Product::new(desk()).id);
    }

    #[test]
    fn price_accepts_numeric_strings() {
        let candidate: NewProduct =
            serde_json::from_value(json!({"name": "Lamp", "price": "19.5", "image": "i"})).unwrap();
        assert_eq!(candidate.price, 19.5);
    }

    #[test]
    fn scalar_text_fields_are_cast() {
        let candidate: NewProduct =
            serde_json::from_value(json!({"name": 123, "price": 1, "image": "i"})).unwrap();
        assert_eq!(candidate.name, "123");

        let update: ProductUpdate = serde_json::from_value(json!({"image": true})).unwrap();
        assert_eq!(update.image.as_deref(), Some("true"));

        assert!(serde_json::from_value::<ProductUpdate>(json!({"name": {"a": 1}})).is_err());
    }

    #[test]
    fn price_rejects_words() {
        let result = serde_json::from_value::<NewProduct>(
            json!({"name": "Lamp", "price": "cheap", "image": "i"}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn update_ignores_unknown_fields_and_keeps_absent_ones() {
        let update: ProductUpdate =
            serde_json::from_value(json!({"price": 99, "color": "red"})).unwrap();
        assert_eq!(
            update,
            ProductUpdate {
                name: None,
                price: Some(99.0),
                image: None,
            }
        );

        let mut product = Product::new(desk());
        product.apply(&update);
        assert_eq!(product.name, "Desk");
        assert_eq!(product.price, 99.0);
    }

    #[test]
    fn set_document_contains_only_provided_fields() {
        let update = ProductUpdate {
            name: Some("Chair".to_string()),
            ..Default::default()
        };
        let set = update.to_set_document();

        assert_eq!(set.get_str("name").unwrap(), "Chair");
        assert!(!set.contains_key("price"));
        assert!(!set.contains_key("image"));
        assert!(set.contains_key("updatedAt"));
    }
}
