use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::product::{Category, Product};
use crate::nlu::normalize::{is_numeric, normalize, tokens};

pub const STOPWORDS: &[&str] = &[
    "show", "me", "items", "item", "please", "find", "give", "want", "need", "search", "under",
    "below", "less", "than", "for", "of", "the", "a", "an", "with", "and", "or", "to", "in", "buy",
    "order", "cart", "checkout", "offer", "offers", "help",
];

pub const CATEGORY_WORDS: &[&str] = &["breakfast", "spice", "spices", "side", "sides"];

/// Checked in order; the first needle found anywhere in the text decides the
/// category, so "breakfast spice mix" is a breakfast query.
const CATEGORY_PRECEDENCE: &[(&str, Category)] = &[
    ("breakfast", Category::Breakfast),
    ("spice", Category::Spices),
    ("side", Category::Sides),
];

const MIN_KEYWORD_LEN: usize = 3;

static PRICE_CEILING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:under|below|less\s*than)\s*(\d+)").expect("price ceiling pattern is valid")
});

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SearchCriteria {
    pub category: Option<Category>,
    pub price_max: Option<Decimal>,
    pub keywords: BTreeSet<String>,
}

impl SearchCriteria {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.price_max.is_none() && self.keywords.is_empty()
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category {
            if product.category != Some(category) {
                return false;
            }
        }
        if let Some(price_max) = self.price_max {
            if product.price > price_max {
                return false;
            }
        }
        if self.keywords.is_empty() {
            return true;
        }

        let name = product.name.to_lowercase();
        self.keywords.iter().all(|keyword| name.contains(keyword.as_str()))
    }
}

pub fn parse_query(text: &str) -> SearchCriteria {
    let lower = normalize(text);

    let category = CATEGORY_PRECEDENCE
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, category)| *category);

    let price_max = PRICE_CEILING
        .captures(&lower)
        .and_then(|captures| captures.get(1))
        .and_then(|amount| amount.as_str().parse::<u64>().ok())
        .map(Decimal::from);

    let keywords = tokens(&lower)
        .filter(|token| is_keyword(token))
        .map(str::to_owned)
        .collect();

    SearchCriteria { category, price_max, keywords }
}

fn is_keyword(token: &str) -> bool {
    token.len() >= MIN_KEYWORD_LEN
        && !STOPWORDS.contains(&token)
        && !CATEGORY_WORDS.contains(&token)
        && !is_numeric(token)
}

/// Products satisfying every present constraint, in catalog order.
/// An empty result means "nothing matched", not "no criteria".
pub fn filter_products(products: &[Product], criteria: &SearchCriteria) -> Vec<Product> {
    if criteria.is_empty() {
        return products.to_vec();
    }

    products.iter().filter(|product| criteria.matches(product)).cloned().collect()
}
