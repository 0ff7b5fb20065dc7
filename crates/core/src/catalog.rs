use crate::domain::product::{Product, ProductId};
use crate::nlu::query::{filter_products, parse_query, SearchCriteria};

/// Products loaded once per session. Never mutated after construction.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn find(&self, product_id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|product| &product.id == product_id)
    }

    pub fn find_by_short_id(&self, short_id: u32) -> Option<&Product> {
        self.products.iter().find(|product| product.short_id == short_id)
    }

    pub fn filter(&self, criteria: &SearchCriteria) -> Vec<Product> {
        filter_products(&self.products, criteria)
    }

    pub fn search(&self, text: &str) -> (SearchCriteria, Vec<Product>) {
        let criteria = parse_query(text);
        let matches = self.filter(&criteria);
        (criteria, matches)
    }
}
