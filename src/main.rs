use anyhow::Context;
use clap::Parser;
use sage::index::VectorIndex;
use sage::llm::{CompletionClient, EmbeddingClient, OpenAiCompatClient};
use sage::rag::RagPipeline;
use sage::utils::config::Config;
use sage::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sage-server", about = "Source-augmented generation engine", version)]
struct Args {
    /// Bind address, overrides the HOST environment variable.
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overrides the PORT environment variable.
    #[arg(long)]
    port: Option<u16>,

    /// Ingest this directory at startup before serving requests.
    #[arg(long, env = "SAGE_INGEST_DIR", value_name = "DIR")]
    ingest_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sage=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let client = Arc::new(OpenAiCompatClient::new(
        config.llm.api_base.clone(),
        config.llm.api_key.clone(),
        config.llm.embedding_model.clone(),
        config.llm.llm_model.clone(),
    ));
    let embedder: Arc<dyn EmbeddingClient> = client.clone();
    let llm: Arc<dyn CompletionClient> = client;

    let index = Arc::new(
        VectorIndex::open(
            embedder,
            config.rag.collection_name.clone(),
            Some(config.rag.persist_directory.clone()),
            config.rag.similarity_threshold,
        )
        .await,
    );
    tracing::info!(
        collection = %config.rag.collection_name,
        chunks = index.len(),
        "Vector index opened"
    );

    let pipeline = Arc::new(RagPipeline::new(config.rag.clone(), index, llm));

    if let Some(dir) = args.ingest_dir {
        let chunks = pipeline
            .initialize_from_documents(&dir)
            .await
            .with_context(|| format!("Failed to ingest {}", dir.display()))?;
        tracing::info!(directory = %dir.display(), chunks, "Startup ingestion complete");
    }

    let state = AppState {
        pipeline,
        config: Arc::new(config.clone()),
    };

    let app = sage::api::routes::create_router()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
