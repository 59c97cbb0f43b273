// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use property_search_mcp::mcp::check_inference_endpoint;
use property_search_mcp::utils::logging::{
    format_error, format_info, format_step, format_success, format_warning,
};
use property_search_mcp::{
    AuthMode, Config, ElasticClient, GeocodingClient, InferenceWarmup, IngestMode, IngestOptions,
    IngestOrchestrator, PropertySearch, PropertySearchMcp, SearchRequest,
};
use rmcp::ServiceExt;
use rmcp::transport::sse_server::SseServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "property-search")]
#[command(version)]
#[command(about = "MCP server and ingestion pipeline for property search on Elasticsearch", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server
    Serve {
        /// stdio or sse
        #[arg(long)]
        transport: Option<String>,

        /// Port for the sse transport (defaults to MCP_PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Do not keep the inference endpoint warm
        #[arg(long)]
        no_warmup: bool,
    },

    /// Provision indices, load the property dataset and register the search template
    Ingest {
        /// full, template-only or reindex-only
        #[arg(long, default_value = "full")]
        mode: IngestMode,

        #[arg(long, value_name = "NUM")]
        limit: Option<usize>,

        #[arg(long, value_name = "URL")]
        dataset_url: Option<String>,

        /// api-key or basic
        #[arg(long)]
        auth: Option<AuthMode>,

        /// Download the dataset even when a cached copy exists
        #[arg(long)]
        refresh: bool,

        /// Load straight into the processed index, skipping raw index and reindex
        #[arg(long)]
        direct: bool,

        /// Keep the raw index after reindexing
        #[arg(long)]
        keep_raw: bool,
    },

    /// Print the query the search template renders for the given parameters
    Render {
        #[command(flatten)]
        search: SearchArgs,

        /// Render with the stored template on the cluster instead of locally
        #[arg(long)]
        remote: bool,
    },

    /// Run the search template and print the matching properties
    Search {
        #[command(flatten)]
        search: SearchArgs,
    },

    /// Geocode a location with the Google Geocoding API
    Geocode { location: String },

    /// Check the cluster, indices, search template and inference endpoint
    Verify,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Semantic query text
    query: String,

    /// Request as the user phrased it (defaults to the query)
    #[arg(long)]
    original_query: Option<String>,

    /// Geocode this place and search around it
    #[arg(long, value_name = "PLACE", conflicts_with_all = ["latitude", "longitude"])]
    near: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    latitude: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    longitude: Option<f64>,

    /// Radius in miles
    #[arg(long, value_name = "MILES")]
    distance: Option<u32>,

    #[arg(long)]
    bedrooms: Option<u32>,

    #[arg(long)]
    bathrooms: Option<f64>,

    #[arg(long)]
    tax: Option<f64>,

    #[arg(long)]
    maintenance: Option<f64>,

    #[arg(long)]
    square_footage: Option<u32>,

    #[arg(long)]
    home_price: Option<f64>,

    #[arg(long)]
    feature: Option<String>,
}

impl SearchArgs {
    async fn into_request(self, config: &Config) -> Result<SearchRequest> {
        let (latitude, longitude) = match &self.near {
            Some(place) => {
                let geocoder = GeocodingClient::new(&config.geocoding)
                    .context("--near needs a Google Maps API key")?;
                let result = geocoder.geocode(place).await?;
                info!(
                    "'{}' resolved to {}, {}",
                    place, result.point.latitude, result.point.longitude
                );
                (Some(result.point.latitude), Some(result.point.longitude))
            }
            None => (self.latitude, self.longitude),
        };

        Ok(SearchRequest {
            original_query: self.original_query.unwrap_or_else(|| self.query.clone()),
            query: self.query,
            latitude,
            longitude,
            distance: self.distance,
            tax: self.tax,
            bedrooms: self.bedrooms,
            home_price: self.home_price,
            bathrooms: self.bathrooms,
            square_footage: self.square_footage,
            feature: self.feature,
            maintenance: self.maintenance,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    property_search_mcp::utils::logging::init_logger(cli.color, cli.verbose);

    info!("Loading configuration from: {}", cli.config.display());

    let mut config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using defaults and environment",
            cli.config.display()
        );
        Config::load(None).context("Failed to load configuration")?
    };

    match cli.command {
        Commands::Serve {
            transport,
            port,
            no_warmup,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            let transport = transport.unwrap_or_else(|| config.server.transport.clone());
            cmd_serve(&config, &transport, !no_warmup).await?;
        }
        Commands::Ingest {
            mode,
            limit,
            dataset_url,
            auth,
            refresh,
            direct,
            keep_raw,
        } => {
            if let Some(auth) = auth {
                config.elasticsearch.restrict_auth(auth)?;
            }
            let options = IngestOptions {
                mode,
                limit,
                dataset_url,
                refresh,
                direct,
                keep_raw,
            };
            cmd_ingest(&config, &options, cli.color).await?;
        }
        Commands::Render { search, remote } => {
            let request = search.into_request(&config).await?;
            cmd_render(&config, &request, remote).await?;
        }
        Commands::Search { search } => {
            let request = search.into_request(&config).await?;
            cmd_search(&config, &request).await?;
        }
        Commands::Geocode { location } => {
            cmd_geocode(&config, &location).await?;
        }
        Commands::Verify => {
            cmd_verify(&config).await?;
        }
    }

    Ok(())
}

async fn cmd_serve(config: &Config, transport: &str, warmup: bool) -> Result<()> {
    info!("Starting MCP server (transport: {})", transport);

    let server =
        PropertySearchMcp::from_config(config).context("Failed to initialise MCP server")?;

    info!("MCP server ready. Available tools:");
    for name in server.tool_names() {
        info!("  - {}", name);
    }

    let _warmup = (warmup && config.server.inference_check_secs > 0).then(|| {
        InferenceWarmup::spawn(
            server.search().client().clone(),
            config.elasticsearch.inference_id.clone(),
            Duration::from_secs(config.server.inference_check_secs),
        )
    });

    match transport {
        "stdio" => {
            let service = server
                .serve(rmcp::transport::stdio())
                .await
                .context("Failed to start stdio transport")?;
            service.waiting().await?;
        }
        "sse" => {
            let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
                .parse()
                .context("Invalid server address")?;
            let ct = SseServer::serve(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?
                .with_service(move || server.clone());
            info!("Serving MCP over SSE at http://{}/sse", addr);

            tokio::signal::ctrl_c().await?;
            info!("Shutting down");
            ct.cancel();
        }
        other => bail!("Unsupported transport: {} (expected stdio or sse)", other),
    }

    Ok(())
}

async fn cmd_ingest(config: &Config, options: &IngestOptions, colored: bool) -> Result<()> {
    info!("Starting ingestion ({:?})", options.mode);

    let orchestrator = IngestOrchestrator::new(config.clone())
        .context("Failed to create ingestion pipeline")?
        .with_progress(true, colored);

    match orchestrator.run(options).await {
        Ok(stats) => {
            println!("{}", format_success("Ingestion complete"));
            println!("{}", stats.summary());
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format_error(&format!("Ingestion failed: {}", e)));
            Err(e.into())
        }
    }
}

fn search_service(config: &Config) -> Result<PropertySearch> {
    let client =
        ElasticClient::new(&config.elasticsearch).context("Failed to create Elasticsearch client")?;
    Ok(PropertySearch::new(client, &config.elasticsearch))
}

async fn cmd_render(config: &Config, request: &SearchRequest, remote: bool) -> Result<()> {
    let query = if remote {
        info!("Rendering stored template {}", config.elasticsearch.template_id);
        search_service(config)?.render_remote(request).await?
    } else {
        PropertySearch::render_local(request)?
    };

    println!("{}", serde_json::to_string_pretty(&query)?);
    Ok(())
}

async fn cmd_search(config: &Config, request: &SearchRequest) -> Result<()> {
    info!("Searching for: {}", request.query);

    let outcome = search_service(config)?
        .search(request)
        .await
        .context("Search template failed")?;

    if outcome.is_empty() {
        println!("\nNo results found for query: \"{}\"\n", request.original_query);
        println!("Try:");
        println!("  - Loosening numeric filters");
        println!("  - Increasing --distance");
        println!("  - Checking that properties have been ingested");
        return Ok(());
    }

    println!("\n{}\n", outcome.headline());
    println!("{}", "=".repeat(80));

    for (idx, property) in outcome.results.iter().enumerate() {
        println!("\n{}. {}", idx + 1, display(&property.title));
        println!(
            "   Price: {} | Tax: {} | Maintenance: {}",
            display(&property.home_price),
            display(&property.tax),
            display(&property.maintenance)
        );
        println!(
            "   Bedrooms: {} | Bathrooms: {} | Square footage: {}",
            display(&property.bedrooms),
            display(&property.bathrooms),
            display(&property.square_footage)
        );
        println!("   Features: {}", display(&property.features));
    }

    println!("\n{}", "=".repeat(80));
    info!("Search complete");

    Ok(())
}

fn display(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn cmd_geocode(config: &Config, location: &str) -> Result<()> {
    let geocoder = GeocodingClient::new(&config.geocoding)?;
    let result = geocoder.geocode(location).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn cmd_verify(config: &Config) -> Result<()> {
    let es = &config.elasticsearch;
    let total = 5;
    let client = ElasticClient::new(es).context("Failed to create Elasticsearch client")?;

    println!("{}", format_step(1, total, "Cluster connection"));
    let info = client
        .info()
        .await
        .context("Cannot connect to Elasticsearch")?;
    println!(
        "{}",
        format_success(&format!(
            "{} (Elasticsearch {})",
            info.cluster_name, info.version.number
        ))
    );

    println!("{}", format_step(2, total, "Properties index"));
    if client.index_exists(&es.index).await? {
        let count = client.count(&es.index).await?;
        println!(
            "{}",
            format_success(&format!("'{}' holds {} documents", es.index, count))
        );
    } else {
        println!(
            "{}",
            format_warning(&format!("'{}' is missing, run ingest", es.index))
        );
    }

    println!("{}", format_step(3, total, "Raw index"));
    if client.index_exists(&es.raw_index).await? {
        println!(
            "{}",
            format_info(&format!("'{}' is still present", es.raw_index))
        );
    } else {
        println!(
            "{}",
            format_info(&format!("'{}' not present", es.raw_index))
        );
    }

    println!("{}", format_step(4, total, "Search template"));
    let search = PropertySearch::new(client.clone(), es);
    match search.template_params().await {
        Ok(params) => println!(
            "{}",
            format_success(&format!(
                "'{}' accepts {}",
                params.template_id,
                params.parameters.join(", ")
            ))
        ),
        Err(e) if e.is_not_found() => println!(
            "{}",
            format_warning(&format!(
                "'{}' is not registered, run ingest --mode template-only",
                es.template_id
            ))
        ),
        Err(e) => return Err(e.into()),
    }

    println!("{}", format_step(5, total, "Inference endpoint"));
    if check_inference_endpoint(&client, &es.inference_id).await {
        println!(
            "{}",
            format_success(&format!("'{}' is ready", es.inference_id))
        );
    } else {
        println!(
            "{}",
            format_warning(&format!("'{}' is not available", es.inference_id))
        );
    }

    Ok(())
}
