use serde::Serialize;
use storefront_core::domain::product::Product;
use storefront_core::nlu::query::SearchCriteria;
use storefront_core::Catalog;
use storefront_db::repositories::ProductRepository;

use crate::commands::{build_runtime, load_config, open_stores, render_product, CommandResult};

#[derive(Debug, Serialize)]
struct SearchReport {
    command: &'static str,
    status: &'static str,
    query: String,
    criteria: SearchCriteria,
    matches: Vec<Product>,
}

/// Prints a one-line summary, the matching products, then the JSON report on
/// the last line.
pub fn run(query: &str) -> CommandResult {
    let config = match load_config("search") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("search") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let (pool, stores) = open_stores(&config).await?;
        let listed = stores
            .products
            .list_products()
            .await
            .map_err(|error| ("query", format!("loading the catalog failed: {error}"), 6u8));
        pool.close().await;
        listed
    });

    match result {
        Ok(products) => {
            let report = search_report(&Catalog::new(products), query);
            render_report(&report, &config.storefront.currency_symbol)
        }
        Err(failure) => CommandResult::from_failure("search", failure),
    }
}

fn search_report(catalog: &Catalog, query: &str) -> SearchReport {
    let (criteria, matches) = catalog.search(query);
    SearchReport { command: "search", status: "ok", query: query.to_string(), criteria, matches }
}

fn render_report(report: &SearchReport, currency: &str) -> CommandResult {
    let mut lines = vec![summary(report)];
    lines.extend(report.matches.iter().map(|product| render_product(product, currency)));

    let machine = serde_json::to_string(report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"search\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });
    lines.push(machine);

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn summary(report: &SearchReport) -> String {
    let criteria = &report.criteria;
    let mut filters = Vec::new();
    if let Some(category) = criteria.category {
        filters.push(format!("category={category}"));
    }
    if let Some(price_max) = criteria.price_max {
        filters.push(format!("price<={}", price_max.normalize()));
    }
    if !criteria.keywords.is_empty() {
        let keywords = criteria.keywords.iter().map(String::as_str).collect::<Vec<_>>();
        filters.push(format!("keywords={}", keywords.join(",")));
    }
    let filters = if filters.is_empty() { "no filters".to_string() } else { filters.join(" ") };

    format!("search: {} match(es) for {filters}", report.matches.len())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use storefront_core::domain::product::{Category, Product, ProductId};
    use storefront_core::Catalog;

    use super::{render_report, search_report, summary};

    fn catalog() -> Catalog {
        let product = |short_id: u32, name: &str, category, price| Product {
            id: ProductId(format!("p-{short_id}")),
            short_id,
            name: name.to_owned(),
            category: Some(category),
            price: Decimal::new(price, 0),
        };
        Catalog::new(vec![
            product(1, "Idli", Category::Breakfast, 50),
            product(2, "Masala Dosa", Category::Breakfast, 120),
            product(3, "Sambar Powder", Category::Spices, 90),
        ])
    }

    #[test]
    fn summary_lists_the_interpreted_filters() {
        let report = search_report(&catalog(), "Breakfast under 60");

        assert_eq!(report.matches.len(), 1);
        assert_eq!(summary(&report), "search: 1 match(es) for category=breakfast price<=60");
    }

    #[test]
    fn empty_query_matches_everything() {
        let report = search_report(&catalog(), "");

        assert_eq!(summary(&report), "search: 3 match(es) for no filters");
    }

    #[test]
    fn report_ends_with_machine_readable_json() {
        let report = search_report(&catalog(), "dosa");
        let result = render_report(&report, "₹");

        let lines = result.output.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "search: 1 match(es) for keywords=dosa");
        assert_eq!(lines[1], "2. Masala Dosa [breakfast] - ₹120");
        let payload: serde_json::Value =
            serde_json::from_str(lines.last().copied().unwrap_or_default()).expect("json");
        assert_eq!(payload["command"], "search");
        assert_eq!(payload["criteria"]["keywords"], serde_json::json!(["dosa"]));
        assert_eq!(payload["matches"][0]["short_id"], 2);
    }
}
