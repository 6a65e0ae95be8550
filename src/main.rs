use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use poidata::apify::ApifyClient;
use poidata::config::{Config, LoggingConfig};
use poidata::geo::{BoundingBox, Coordinate, RouteBuffer};
use poidata::ingest::{DatasetKind, IngestionPipeline};
use poidata::maps::{MapsService, ScraperRequest, SearchRequest, TripadvisorRequest};
use poidata::query::{GeoQueryService, ListPoiResponse};
use poidata::server::{AppState, PoiServer};
use poidata::storage::{create_memory_repository, create_postgres_repository, SharedPoiRepository};

#[derive(Parser)]
#[command(
    name = "poidata",
    version,
    about = "POI harvesting from remote scrape tasks with H3-indexed geographic queries",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging, overriding the configured level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json), overriding the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML config file; environment variables are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keep POIs in memory instead of PostgreSQL
    #[arg(long, global = true)]
    memory: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Override the configured bind address
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Ingest the dataset of a finished run
    Ingest {
        /// Run whose dataset to fetch
        #[arg(long)]
        dataset_id: String,

        /// Engine that produced the dataset (extractor, scraper, tripadvisor)
        #[arg(long, default_value = "extractor")]
        kind: DatasetKind,
    },

    /// Run a search and ingest its results
    Search {
        /// Search terms
        #[arg(short, long, required = true)]
        query: Vec<String>,

        /// Free-text location, e.g. a city name
        #[arg(short, long)]
        location: Option<String>,

        /// Engine to search with (extractor, scraper, tripadvisor)
        #[arg(long, default_value = "extractor")]
        engine: DatasetKind,

        /// Cap on dataset items
        #[arg(short, long, default_value = "100")]
        max_items: u32,

        /// Two-letter language code
        #[arg(long)]
        language: Option<String>,
    },

    /// Query stored POIs
    Query {
        #[command(subcommand)]
        shape: QueryShape,

        /// Case-insensitive category substring
        #[arg(long, global = true)]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
enum QueryShape {
    /// POIs inside a longitude/latitude box
    Box {
        #[arg(long, allow_negative_numbers = true)]
        min_x: f64,
        #[arg(long, allow_negative_numbers = true)]
        min_y: f64,
        #[arg(long, allow_negative_numbers = true)]
        max_x: f64,
        #[arg(long, allow_negative_numbers = true)]
        max_y: f64,
    },

    /// POIs within a buffer of a straight route
    Route {
        #[arg(long, allow_negative_numbers = true)]
        a_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        a_lng: f64,
        #[arg(long, allow_negative_numbers = true)]
        b_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        b_lng: f64,
        /// Buffer in metres
        #[arg(long, default_value = "500")]
        buffer_m: f64,
    },

    /// POIs inside any of the given H3 cells
    Cells {
        #[arg(required = true)]
        cells: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let logging = config
        .logging
        .clone()
        .with_overrides(cli.verbose, cli.log_format.as_deref());
    setup_tracing(&logging)?;
    tracing::info!("poidata starting");

    match cli.command {
        Commands::Serve { bind } => {
            tracing::info!(bind = ?bind, memory = cli.memory, "Starting serve command");
            serve(config, bind, cli.memory).await?;
        }

        Commands::Ingest { dataset_id, kind } => {
            tracing::info!(dataset_id = %dataset_id, kind = %kind, "Starting ingest command");
            let maps = maps_service(&config, open_repository(&config, cli.memory).await?)?;
            let stats = maps.ingest_dataset(&dataset_id, kind).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Commands::Search {
            query,
            location,
            engine,
            max_items,
            language,
        } => {
            tracing::info!(query = ?query, engine = %engine, max_items, "Starting search command");
            let maps = maps_service(&config, open_repository(&config, cli.memory).await?)?;
            let search = SearchArgs {
                query,
                location: location.unwrap_or_default(),
                max_items,
                language: language.unwrap_or_default(),
            };
            search_command(&maps, engine, search).await?;
        }

        Commands::Query { shape, category } => {
            let pois = GeoQueryService::new(open_repository(&config, cli.memory).await?);
            query_command(&pois, shape, category.as_deref()).await?;
        }
    }

    Ok(())
}

fn setup_tracing(logging: &LoggingConfig) -> Result<()> {
    logging.validate()?;
    let env_filter = tracing_subscriber::EnvFilter::try_new(logging.filter_directives())
        .context("Invalid log filter")?;

    if logging.is_json() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::from_env(),
    }
}

async fn open_repository(config: &Config, memory: bool) -> Result<SharedPoiRepository> {
    if memory {
        tracing::warn!("Using in-memory storage; POIs are lost on exit");
        return Ok(create_memory_repository());
    }
    create_postgres_repository(config.postgres_config())
        .await
        .context("Failed to open PostgreSQL repository")
}

fn maps_service(config: &Config, repo: SharedPoiRepository) -> Result<MapsService> {
    config.validate()?;
    let client = ApifyClient::new(config.client_config()).context("Failed to build job client")?;
    Ok(MapsService::new(client, IngestionPipeline::new(repo)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn serve(mut config: Config, bind: Option<SocketAddr>, memory: bool) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }

    let repo = open_repository(&config, memory).await?;
    let maps = maps_service(&config, repo.clone())?;
    let state = AppState::new(maps, GeoQueryService::new(repo));

    let server = PoiServer::new(config.server.clone(), state);
    server.start_with_shutdown(shutdown_signal()).await?;
    Ok(())
}

struct SearchArgs {
    query: Vec<String>,
    location: String,
    max_items: u32,
    language: String,
}

async fn search_command(maps: &MapsService, engine: DatasetKind, args: SearchArgs) -> Result<()> {
    let stats = match engine {
        DatasetKind::GoogleMapsExtractor => {
            let request = SearchRequest {
                search_strings_array: args.query,
                location_query: args.location,
                language: args.language,
                number_of_results: args.max_items,
                ..Default::default()
            };
            maps.search_extractor(&request, shutdown_signal()).await?
        }
        DatasetKind::GoogleMapsScraper => {
            let request = ScraperRequest {
                search_strings_array: args.query,
                location_query: args.location,
                language: args.language,
                max_crawled_places_per_search: args.max_items,
                ..Default::default()
            };
            maps.search_scraper(&request, shutdown_signal()).await?
        }
        DatasetKind::Tripadvisor => {
            let request = TripadvisorRequest {
                query: args.query.join(" "),
                language: args.language,
                max_items_per_query: args.max_items,
                number_of_results: args.max_items,
                include_hotels: true,
                include_restaurants: true,
                include_attractions: true,
                ..Default::default()
            };
            maps.search_tripadvisor(&request, shutdown_signal()).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn query_command(
    pois: &GeoQueryService,
    shape: QueryShape,
    category: Option<&str>,
) -> Result<()> {
    let response: ListPoiResponse = match shape {
        QueryShape::Box {
            min_x,
            min_y,
            max_x,
            max_y,
        } => {
            let bbox = BoundingBox::new(min_x, min_y, max_x, max_y);
            match category {
                Some(category) => pois.list_in_box_with_category(&bbox, category).await?,
                None => pois.list_in_box(&bbox).await?,
            }
        }
        QueryShape::Route {
            a_lat,
            a_lng,
            b_lat,
            b_lng,
            buffer_m,
        } => {
            let route = RouteBuffer::new(
                Coordinate::new(a_lat, a_lng),
                Coordinate::new(b_lat, b_lng),
                buffer_m,
            );
            match category {
                Some(category) => pois.list_along_route_with_category(&route, category).await?,
                None => pois.list_along_route(&route).await?,
            }
        }
        QueryShape::Cells { cells } => {
            let mut batches = match category {
                Some(category) => pois.list_by_cells_with_category(&cells, category).await?,
                None => pois.list_by_cells(&cells).await?,
            };
            while let Some(batch) = batches.next_batch().await {
                println!("{}", serde_json::to_string(&batch)?);
            }
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
