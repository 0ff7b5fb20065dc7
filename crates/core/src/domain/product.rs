use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Breakfast,
    Spices,
    Sides,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Spices => "spices",
            Self::Sides => "sides",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "spices" => Ok(Self::Spices),
            "sides" => Ok(Self::Sides),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown product category `{other}` (expected breakfast|spices|sides)"
            ))),
        }
    }
}

/// A catalog entry. `short_id` is the compact number bot users type in
/// `/addtocart`; `id` is the store's primary key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub short_id: u32,
    pub name: String,
    pub category: Option<Category>,
    pub price: Decimal,
}

impl Product {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.0.trim().is_empty() {
            return Err(DomainError::InvariantViolation("product id must not be empty".to_owned()));
        }
        if self.short_id == 0 {
            return Err(DomainError::InvariantViolation(format!(
                "product `{}` must have a positive short id",
                self.id
            )));
        }
        if self.price.is_sign_negative() {
            return Err(DomainError::InvariantViolation(format!(
                "product `{}` has a negative price",
                self.id
            )));
        }
        Ok(())
    }
}
