// file: src/search/template.rs
// description: properties search template source, parameter catalog and placeholder discovery
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/search-template.html

use crate::elastic::mappings::fields;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\{\{\s*([a-zA-Z0-9_]+)\s*\}\}").expect("PLACEHOLDER regex is valid");
}

/// Number of hits returned by the template.
pub const RESULT_SIZE: usize = 5;

/// Fields requested from each hit, in display order.
pub const RESULT_FIELDS: &[&str] = &[
    fields::TITLE,
    fields::ANNUAL_TAX,
    fields::MAINTENANCE_FEE,
    fields::BATHROOMS,
    fields::BEDROOMS,
    fields::SQUARE_FOOTAGE,
    fields::HOME_PRICE,
    fields::FEATURES,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Integer,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateParameter {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

pub const PARAMETER_CATALOG: &[TemplateParameter] = &[
    TemplateParameter {
        name: "query",
        kind: ParamKind::String,
        required: true,
        description: "Main search query (mandatory)",
    },
    TemplateParameter {
        name: "latitude",
        kind: ParamKind::Number,
        required: false,
        description: "Geographic latitude coordinate",
    },
    TemplateParameter {
        name: "longitude",
        kind: ParamKind::Number,
        required: false,
        description: "Geographic longitude coordinate",
    },
    TemplateParameter {
        name: "distance",
        kind: ParamKind::Integer,
        required: false,
        description: "Search radius in miles around latitude/longitude; requires both coordinates",
    },
    TemplateParameter {
        name: "bedrooms",
        kind: ParamKind::Integer,
        required: false,
        description: "Minimum number of bedrooms",
    },
    TemplateParameter {
        name: "bathrooms",
        kind: ParamKind::Number,
        required: false,
        description: "Minimum number of bathrooms",
    },
    TemplateParameter {
        name: "tax",
        kind: ParamKind::Number,
        required: false,
        description: "Maximum real estate tax amount",
    },
    TemplateParameter {
        name: "maintenance",
        kind: ParamKind::Number,
        required: false,
        description: "Maximum maintenance fee amount",
    },
    TemplateParameter {
        name: "square_footage",
        kind: ParamKind::Integer,
        required: false,
        description: "Minimum property square footage",
    },
    TemplateParameter {
        name: "home_price",
        kind: ParamKind::Number,
        required: false,
        description: "Max home price. Not a range, just a number",
    },
    TemplateParameter {
        name: "feature",
        kind: ParamKind::String,
        required: false,
        description: "Home features such as AC, pool, updated kitchen, listed as a single string, e.g. \"pool updated kitchen\"",
    },
];

pub fn catalog_entry(name: &str) -> Option<&'static TemplateParameter> {
    PARAMETER_CATALOG.iter().find(|p| p.name == name)
}

/// Variable names referenced by `{{name}}` tags in a template source, in
/// order of first appearance. Section tags (`{{#x}}`, `{{^x}}`, `{{/x}}`)
/// are not variables and are ignored.
pub fn extract_placeholders(source: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for capture in PLACEHOLDER.captures_iter(source) {
        let name = &capture[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

enum Filter {
    GeoDistance,
    Range {
        param: &'static str,
        field: &'static str,
        op: &'static str,
    },
}

impl Filter {
    fn param(&self) -> &'static str {
        match self {
            Filter::GeoDistance => "distance",
            Filter::Range { param, .. } => param,
        }
    }

    fn clause(&self) -> String {
        match self {
            Filter::GeoDistance => [
                r#"{"geo_distance": {"distance": "{{distance}}", ""#,
                fields::LOCATION,
                r#"": {"lat": {{latitude}}, "lon": {{longitude}} }}}"#,
            ]
            .concat(),
            Filter::Range { param, field, op } => [
                r#"{"range": {""#,
                field,
                r#"": {""#,
                op,
                r#"": "#,
                &tag("", param),
                " }}}",
            ]
            .concat(),
        }
    }
}

const FILTERS: &[Filter] = &[
    Filter::GeoDistance,
    Filter::Range {
        param: "bedrooms",
        field: fields::BEDROOMS,
        op: "gte",
    },
    Filter::Range {
        param: "bathrooms",
        field: fields::BATHROOMS,
        op: "gte",
    },
    Filter::Range {
        param: "tax",
        field: fields::ANNUAL_TAX,
        op: "lte",
    },
    Filter::Range {
        param: "maintenance",
        field: fields::MAINTENANCE_FEE,
        op: "lte",
    },
    Filter::Range {
        param: "square_footage",
        field: fields::SQUARE_FOOTAGE,
        op: "gte",
    },
    Filter::Range {
        param: "home_price",
        field: fields::HOME_PRICE,
        op: "lte",
    },
];

const TEMPLATE_SKELETON: &str = r#"{
  "_source": false,
  "size": %size%,
  "fields": [%fields%],
  "retriever": {
    "standard": {
      "query": {
        "semantic": {
          "field": "%semantic_field%",
          "query": "{{query}}"
        }
      },
      "filter": {
        "bool": {
          "must": [
%must%
          ]{{#feature}},
          "should": [
            {"match": {"%features_field%": {"query": "{{feature}}", "operator": "and"}}}
          ],
          "minimum_should_match": 1{{/feature}}
        }
      }
    }
  }
}"#;

fn tag(sigil: &str, name: &str) -> String {
    ["{{", sigil, name, "}}"].concat()
}

/// Emits a comma before filter `index` exactly when some earlier filter is
/// present. Mustache has no "or", so each earlier filter `j` contributes a
/// branch that fires only when `j` is the last present filter before `index`.
fn separator_guard(index: usize) -> String {
    let mut guard = String::new();
    for j in 0..index {
        let between = &FILTERS[j + 1..index];
        guard.push_str(&tag("#", FILTERS[j].param()));
        for filter in between {
            guard.push_str(&tag("^", filter.param()));
        }
        guard.push(',');
        for filter in between.iter().rev() {
            guard.push_str(&tag("/", filter.param()));
        }
        guard.push_str(&tag("/", FILTERS[j].param()));
    }
    guard
}

/// Mustache source of the properties search template.
pub fn properties_search_template() -> String {
    let must = FILTERS
        .iter()
        .enumerate()
        .map(|(index, filter)| {
            [
                tag("#", filter.param()),
                separator_guard(index),
                filter.clause(),
                tag("/", filter.param()),
            ]
            .concat()
        })
        .collect::<Vec<_>>()
        .join("\n");

    let result_fields = RESULT_FIELDS
        .iter()
        .map(|f| format!("\"{}\"", f))
        .collect::<Vec<_>>()
        .join(", ");

    TEMPLATE_SKELETON
        .replace("%size%", &RESULT_SIZE.to_string())
        .replace("%fields%", &result_fields)
        .replace("%semantic_field%", fields::BODY_CONTENT_SEMANTIC)
        .replace("%features_field%", fields::FEATURES)
        .replace("%must%", &must)
}
