use rust_decimal::Decimal;

use storefront_core::domain::product::{Category, Product, ProductId};

use crate::repositories::{ProductRepository, RepositoryError};

struct SeedProduct {
    id: &'static str,
    short_id: u32,
    name: &'static str,
    category: Option<Category>,
    /// Price in paise.
    price_minor: i64,
}

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct { id: "idli", short_id: 1, name: "Idli", category: Some(Category::Breakfast), price_minor: 5_000 },
    SeedProduct { id: "masala-dosa", short_id: 2, name: "Masala Dosa", category: Some(Category::Breakfast), price_minor: 12_000 },
    SeedProduct { id: "poha", short_id: 3, name: "Poha", category: Some(Category::Breakfast), price_minor: 4_000 },
    SeedProduct { id: "upma", short_id: 4, name: "Upma", category: Some(Category::Breakfast), price_minor: 4_500 },
    SeedProduct { id: "chili-powder", short_id: 5, name: "Chili Powder", category: Some(Category::Spices), price_minor: 8_000 },
    SeedProduct { id: "turmeric-powder", short_id: 6, name: "Turmeric Powder", category: Some(Category::Spices), price_minor: 6_000 },
    SeedProduct { id: "garam-masala", short_id: 7, name: "Garam Masala", category: Some(Category::Spices), price_minor: 15_000 },
    SeedProduct { id: "coconut-chutney", short_id: 8, name: "Coconut Chutney", category: Some(Category::Sides), price_minor: 3_000 },
    SeedProduct { id: "sambar", short_id: 9, name: "Sambar", category: Some(Category::Sides), price_minor: 4_000 },
    SeedProduct { id: "mango-pickle", short_id: 10, name: "Mango Pickle", category: Some(Category::Sides), price_minor: 9_900 },
    SeedProduct { id: "filter-coffee", short_id: 11, name: "Filter Coffee", category: None, price_minor: 3_500 },
];

impl SeedProduct {
    fn to_product(&self) -> Product {
        Product {
            id: ProductId(self.id.to_string()),
            short_id: self.short_id,
            name: self.name.to_string(),
            category: self.category,
            price: Decimal::new(self.price_minor, 2),
        }
    }
}

/// Deterministic demo catalog of South Indian breakfast items, spices and
/// sides. Loading is idempotent because products are upserted by id.
pub struct DemoCatalog;

impl DemoCatalog {
    pub fn products() -> Vec<Product> {
        SEED_PRODUCTS.iter().map(SeedProduct::to_product).collect()
    }

    pub async fn load(products: &dyn ProductRepository) -> Result<SeedResult, RepositoryError> {
        for product in Self::products() {
            products.save(product).await?;
        }

        Ok(SeedResult { products_seeded: SEED_PRODUCTS.len() })
    }

    pub async fn verify(
        products: &dyn ProductRepository,
    ) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(SEED_PRODUCTS.len());
        for seed in SEED_PRODUCTS {
            let stored = products.find_by_short_id(seed.short_id).await?;
            checks.push((seed.id, stored.as_ref() == Some(&seed.to_product())));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub products_seeded: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
