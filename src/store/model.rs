use serde::{Deserialize, Serialize};

use super::decode::{DecodeError, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub shop: Option<Shop>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
}

/// Signed-in user plus the bearer token for the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub jwt: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: u64,
    pub quantity: u32,
    pub product: Product,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub id: u64,
    pub product: Product,
}

/// Sum of price × quantity over the cart
pub fn cart_total(lines: &[CartLine]) -> f64 {
    lines
        .iter()
        .map(|line| line.product.price * line.quantity as f64)
        .sum()
}

impl Validate for Product {
    fn validate(&self) -> Result<(), DecodeError> {
        if self.name.trim().is_empty() {
            return Err(DecodeError::invalid("product", format!("{} has no name", self.id)));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(DecodeError::invalid(
                "product",
                format!("{} has price {}", self.id, self.price),
            ));
        }
        self.shop.validate()
    }
}

impl Validate for Shop {
    fn validate(&self) -> Result<(), DecodeError> {
        if self.name.trim().is_empty() {
            return Err(DecodeError::invalid("shop", format!("{} has no name", self.id)));
        }
        Ok(())
    }
}

impl Validate for User {
    fn validate(&self) -> Result<(), DecodeError> {
        if self.username.trim().is_empty() {
            return Err(DecodeError::invalid("user", "empty username"));
        }
        if !self.email.contains('@') {
            return Err(DecodeError::invalid("user", format!("bad email {:?}", self.email)));
        }
        Ok(())
    }
}

impl Validate for AuthSession {
    fn validate(&self) -> Result<(), DecodeError> {
        if self.jwt.is_empty() {
            return Err(DecodeError::invalid("auth session", "empty token"));
        }
        self.user.validate()
    }
}

impl Validate for CartLine {
    fn validate(&self) -> Result<(), DecodeError> {
        if self.quantity == 0 {
            return Err(DecodeError::invalid(
                "cart line",
                format!("{} has zero quantity", self.id),
            ));
        }
        self.product.validate()
    }
}

impl Validate for WishlistEntry {
    fn validate(&self) -> Result<(), DecodeError> {
        self.product.validate()
    }
}
