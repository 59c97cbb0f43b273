// file: src/search/mod.rs
// description: properties search template, local rendering and template search execution
// reference: internal module structure

pub mod params;
pub mod render;
pub mod results;
pub mod service;
pub mod template;

pub use params::SearchRequest;
pub use results::{PropertySummary, SearchOutcome};
pub use service::{PropertySearch, TemplateParams};
pub use template::{PARAMETER_CATALOG, TemplateParameter, properties_search_template};
