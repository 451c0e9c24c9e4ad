use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use pagesearch::config::Config;
use pagesearch::embedding::EmbeddingProvider;
use pagesearch::embedding::together::TogetherEmbeddingProvider;
use pagesearch::logging;
use pagesearch::presign::ObjectUrlSigner;
use pagesearch::presign::r2::R2UrlSigner;
use pagesearch::provider::CandidateProvider;
use pagesearch::provider::turbopuffer::TurbopufferProvider;
use pagesearch::search::{ResultEnricher, SearchService};
use pagesearch::server::{create_router, AppState};

#[derive(Parser)]
#[command(name = "pagesearch", version, about = "Hybrid page search with presigned image URLs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind, overrides server.bind_addr
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run a single search and print the results as JSON
    Search {
        query: String,
        /// Number of results to return (default: search.default_match_count)
        #[arg(long)]
        match_count: Option<usize>,
    },
    /// List every page of an issue as JSON
    Pages { issue_id: String },
    /// Ask the index to warm its namespace cache
    Warm,
}

/// Wire the external collaborators and the orchestrator from configuration.
fn create_service(config: &Config) -> Result<SearchService> {
    config.validate()?;

    let embedder: Arc<dyn EmbeddingProvider + Send + Sync> =
        Arc::new(TogetherEmbeddingProvider::new(&config.embedding)?);
    let index: Arc<dyn CandidateProvider + Send + Sync> =
        Arc::new(TurbopufferProvider::new(&config.index)?);
    let signer: Arc<dyn ObjectUrlSigner + Send + Sync> = Arc::new(R2UrlSigner::new(&config.storage)?);

    let enricher = ResultEnricher::new(signer, config.storage.sign_timeout());

    Ok(SearchService::new(
        embedder,
        index,
        enricher,
        config.search.clone(),
        std::time::Duration::from_millis(config.embedding.timeout_ms),
        config.index.timeout(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args
    let cli = Cli::parse();

    // 2. Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Config error (using defaults): {}", e);
        Config::default()
    });

    // 3. Initialize logging before any other output; hold the guard until exit
    let _log_guard = logging::init_logging(&config);

    let service = create_service(&config)?;

    match cli.command {
        Some(Commands::Search { query, match_count }) => {
            let match_count = service.match_count(match_count)?;
            let results = service.search_text(&query, match_count).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }

        Some(Commands::Pages { issue_id }) => {
            let pages = service.list_pages(&issue_id).await?;
            println!("{}", serde_json::to_string_pretty(&pages)?);
        }

        Some(Commands::Warm) => {
            let status = service.warm().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }

        Some(Commands::Serve { bind }) => serve(service, bind.unwrap_or(config.server.bind_addr)).await?,

        None => serve(service, config.server.bind_addr).await?,
    }

    Ok(())
}

async fn serve(service: SearchService, bind_addr: String) -> Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_addr = %bind_addr,
        "pagesearch server starting"
    );

    let app = create_router(AppState {
        service: Arc::new(service),
    });
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    tracing::info!("pagesearch server stopped");
    Ok(())
}
