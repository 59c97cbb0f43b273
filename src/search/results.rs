// file: src/search/results.rs
// description: property summaries extracted from search template hits
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/search-fields.html

use crate::elastic::mappings::fields;
use serde::Serialize;
use serde_json::Value;

const MISSING: &str = "N/A";
const MISSING_TITLE: &str = "No title";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySummary {
    pub title: Value,
    pub tax: Value,
    pub maintenance: Value,
    pub bathrooms: Value,
    pub bedrooms: Value,
    pub square_footage: Value,
    pub home_price: Value,
    pub features: Value,
}

impl PropertySummary {
    /// Reads the first value of each requested field from a hit's `fields`
    /// section, substituting placeholders for missing ones.
    pub fn from_hit(hit: &Value) -> Self {
        let first = |field: &str, fallback: &str| {
            hit.get("fields")
                .and_then(|f| f.get(field))
                .and_then(|values| match values {
                    Value::Array(items) => items.first().cloned(),
                    other => Some(other.clone()),
                })
                .filter(|value| !value.is_null())
                .unwrap_or_else(|| Value::String(fallback.to_string()))
        };

        Self {
            title: first(fields::TITLE, MISSING_TITLE),
            tax: first(fields::ANNUAL_TAX, MISSING),
            maintenance: first(fields::MAINTENANCE_FEE, MISSING),
            bathrooms: first(fields::BATHROOMS, MISSING),
            bedrooms: first(fields::BEDROOMS, MISSING),
            square_footage: first(fields::SQUARE_FOOTAGE, MISSING),
            home_price: first(fields::HOME_PRICE, MISSING),
            features: first(fields::FEATURES, MISSING),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub total: u64,
    pub results: Vec<PropertySummary>,
}

impl SearchOutcome {
    pub fn from_response(response: &Value) -> Self {
        let hits = response.get("hits");

        // `hits.total` is an object unless the request set rest_total_hits_as_int.
        let total = hits
            .and_then(|h| h.get("total"))
            .and_then(|t| t.get("value").unwrap_or(t).as_u64())
            .unwrap_or(0);

        let results = hits
            .and_then(|h| h.get("hits"))
            .and_then(Value::as_array)
            .map(|items| items.iter().map(PropertySummary::from_hit).collect())
            .unwrap_or_default();

        Self { total, results }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn headline(&self) -> String {
        format!(
            "Found {} properties matching your criteria. Here are the top {} results:",
            self.total,
            self.results.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_response_extracts_first_values() {
        let response = json!({
            "took": 12,
            "hits": {
                "total": {"value": 42, "relation": "eq"},
                "hits": [{
                    "_id": "1",
                    "fields": {
                        "title": ["Sunny bungalow"],
                        "annual-tax": [3200],
                        "number-of-bedrooms": [3],
                        "home-price": [450000.0],
                        "property-features": ["pool garage"]
                    }
                }]
            }
        });

        let outcome = SearchOutcome::from_response(&response);
        assert_eq!(outcome.total, 42);
        assert_eq!(outcome.results.len(), 1);

        let summary = &outcome.results[0];
        assert_eq!(summary.title, json!("Sunny bungalow"));
        assert_eq!(summary.tax, json!(3200));
        assert_eq!(summary.bedrooms, json!(3));
        assert_eq!(summary.maintenance, json!("N/A"));
        assert_eq!(summary.features, json!("pool garage"));
        assert_eq!(
            outcome.headline(),
            "Found 42 properties matching your criteria. Here are the top 1 results:"
        );
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        let summary = PropertySummary::from_hit(&json!({"_id": "2"}));
        assert_eq!(summary.title, json!("No title"));
        assert_eq!(summary.home_price, json!("N/A"));
    }

    #[test]
    fn test_numeric_total_and_empty_hits() {
        let outcome = SearchOutcome::from_response(&json!({"hits": {"total": 7, "hits": []}}));
        assert_eq!(outcome.total, 7);
        assert!(outcome.is_empty());

        let outcome = SearchOutcome::from_response(&json!({}));
        assert_eq!(outcome.total, 0);
        assert!(outcome.is_empty());
    }
}
