//! # Wire DTOs
//!
//! JSON shapes of the remote catalog. Converted into domain types at the
//! boundary; nothing past this module sees a float price.

use serde::{Deserialize, Serialize};
use tote_core::{CoreError, Money, Product, ProductId, Rating};

/// A product as the catalog sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProduct {
    pub id: u64,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub rating: Option<RemoteRating>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRating {
    pub rate: f64,
    #[serde(default)]
    pub count: u32,
}

impl TryFrom<RemoteProduct> for Product {
    type Error = CoreError;

    fn try_from(remote: RemoteProduct) -> Result<Self, Self::Error> {
        let price = Money::from_decimal(remote.price)?;
        if price.is_negative() {
            return Err(CoreError::NegativePrice {
                product_id: remote.id.to_string(),
                price: remote.price.to_string(),
            });
        }
        if !price.is_valid_unit_price() {
            return Err(CoreError::PriceOutOfRange {
                product_id: remote.id.to_string(),
                price: remote.price.to_string(),
            });
        }

        Ok(Product {
            id: ProductId(remote.id),
            title: remote.title,
            price,
            image: remote.image,
            category: remote.category,
            description: remote.description,
            rating: remote
                .rating
                .map(|r| Rating::new(r.rate, r.count))
                .unwrap_or_default(),
        })
    }
}

/// `POST /auth/login` body.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `POST /auth/login` success body.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}
