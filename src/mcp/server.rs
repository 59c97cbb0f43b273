// file: src/mcp/server.rs
// description: MCP server exposing template discovery, geocoding and property search tools
// reference: https://docs.rs/rmcp

use crate::config::Config;
use crate::elastic::ElasticClient;
use crate::error::{Result as ServiceResult, ServiceError};
use crate::geocode::GeocodingClient;
use crate::search::{PropertySearch, SearchRequest};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{error, info, warn};

const INSTRUCTIONS: &str = "Property search over Elasticsearch. Call get_properties_template_params \
to learn the search parameters, geocode_location to turn a place name into latitude/longitude, \
then search_template with the user's original request plus any structured filters.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GeocodeRequest {
    #[schemars(description = "Address, city, or place name to geocode, e.g. \"Orlando, FL\"")]
    pub location: String,
}

#[derive(Clone)]
pub struct PropertySearchMcp {
    search: PropertySearch,
    geocoder: Option<GeocodingClient>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl PropertySearchMcp {
    pub fn new(search: PropertySearch, geocoder: Option<GeocodingClient>) -> Self {
        Self {
            search,
            geocoder,
            tool_router: Self::tool_router(),
        }
    }

    pub fn from_config(config: &Config) -> ServiceResult<Self> {
        let client = ElasticClient::new(&config.elasticsearch)?;
        let search = PropertySearch::new(client, &config.elasticsearch);

        let geocoder = match GeocodingClient::new(&config.geocoding) {
            Ok(geocoder) => Some(geocoder),
            Err(e) => {
                warn!("Geocoding disabled: {}", e);
                None
            }
        };

        Ok(Self::new(search, geocoder))
    }

    pub fn search(&self) -> &PropertySearch {
        &self.search
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect()
    }

    #[tool(description = "Get the parameters accepted by the properties search template, with descriptions and types.")]
    async fn get_properties_template_params(&self) -> Result<CallToolResult, McpError> {
        info!("MCP: Getting template parameters");

        let params = match self.search.template_params().await {
            Ok(params) => params,
            Err(e) => {
                error!("Failed to get template: {}", e);
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Error getting template: {}",
                    e
                ))]));
            }
        };

        Ok(CallToolResult::success(vec![
            Content::text("Required parameters for properties search template:"),
            Content::text(params.parameters.join(", ")),
            Content::text("Parameter descriptions:"),
            Content::text(params.describe()),
        ]))
    }

    #[tool(description = "Geocode a location string (address, city, neighbourhood) into latitude and longitude.")]
    async fn geocode_location(
        &self,
        Parameters(request): Parameters<GeocodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: Geocoding '{}'", request.location);

        if request.location.trim().is_empty() {
            return Err(McpError::invalid_params("location must not be empty", None));
        }

        let Some(geocoder) = &self.geocoder else {
            error!("No Google Maps API key provided");
            return Ok(CallToolResult::error(vec![Content::text(
                "Error: Google Maps API key not configured",
            )]));
        };

        match geocoder.geocode(&request.location).await {
            Ok(result) => {
                let point = serde_json::to_string(&result.point)
                    .map_err(|e| McpError::internal_error(e.to_string(), None))?;
                info!("Successfully geocoded to: {}", point);
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "Geocoded '{}' to: {}",
                    request.location, point
                ))]))
            }
            Err(e) => tool_failure(e),
        }
    }

    #[tool(description = "Search properties with the stored search template. Pass the user's original request, a semantic query, and any structured filters such as location, bedrooms, or price.")]
    async fn search_template(
        &self,
        Parameters(request): Parameters<SearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: Searching properties for '{}'", request.query);

        let outcome = match self.search.search(&request).await {
            Ok(outcome) => outcome,
            Err(e) => return tool_failure(e),
        };

        if outcome.is_empty() {
            return Ok(CallToolResult::success(vec![Content::text(format!(
                "No results found for query: {}",
                request.original_query
            ))]));
        }

        let results = serde_json::to_string_pretty(&outcome.results)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(CallToolResult::success(vec![
            Content::text(outcome.headline()),
            Content::text(results),
        ]))
    }
}

/// Caller mistakes become protocol errors; everything else is reported to
/// the client as a failed tool call.
fn tool_failure(err: ServiceError) -> Result<CallToolResult, McpError> {
    match err {
        ServiceError::Validation(message) => Err(McpError::invalid_params(message, None)),
        other => {
            error!("Tool call failed: {}", other);
            Ok(CallToolResult::error(vec![Content::text(format!(
                "Error: {}",
                other
            ))]))
        }
    }
}

#[tool_handler]
impl ServerHandler for PropertySearchMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }
}
