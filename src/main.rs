use clap::Parser;
use clausebase::api;
use clausebase::embedding::EmbeddingModel;
use clausebase::service::ChunkService;
use clausebase::store::VectorStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Semantic search service for document chunks.
#[derive(Parser)]
#[command(name = "clausebase", version)]
struct Args {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "0.0.0.0:8000", env = "CLAUSEBASE_BIND")]
    bind: SocketAddr,

    /// Directory holding the persisted vector collections.
    #[arg(long, default_value = "./clausebase_data", env = "CLAUSEBASE_DATA_DIR")]
    data_dir: PathBuf,

    /// Cache directory for downloaded embedding model files.
    #[arg(long, default_value = "./models", env = "CLAUSEBASE_MODEL_CACHE")]
    model_cache_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Model load failure is unrecoverable; abort startup.
    tracing::info!(cache_dir = %args.model_cache_dir.display(), "loading embedding model");
    let embedder = Arc::new(EmbeddingModel::new(&args.model_cache_dir)?);
    tracing::info!("embedding model loaded");

    let store = Arc::new(VectorStore::open(&args.data_dir).await?);
    let service = Arc::new(ChunkService::new(store, embedder));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let server = api::start_http_server(args.bind, service, shutdown_rx).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    server.await?;

    Ok(())
}
