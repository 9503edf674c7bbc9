mod config;

use clap::{Parser, Subcommand, ValueEnum};
use config::{EmbeddingBackend, MmragConfig};
use mmrag_agent::{
    AnswerSynthesizer, ExtractiveSynthesizer, LlmClient, LlmSynthesizer, RagPipeline,
};
use mmrag_gateway::{AppState, GatewayServer};
use mmrag_ingest::{ExtractorRegistry, Ingestor};
use mmrag_memory::{
    DocumentStore, EmbeddingProvider, HttpEmbedding, HttpEmbeddingConfig, LocalEmbedding,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mmrag", about = "mmrag: multimodal retrieval-augmented question answering")]
struct Cli {
    /// Path to config file (default: ./mmrag.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ingest local files into the document store
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Ask a question against the stored documents
    Query {
        text: String,
        /// Number of results to retrieve (overrides config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// List every stored content unit
    Sources,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

fn build_embedder(config: &MmragConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let dimension = config.vector_store.dimension;
    Ok(match config.embedding.provider {
        EmbeddingBackend::Local => Arc::new(LocalEmbedding::new(dimension)),
        EmbeddingBackend::Http => Arc::new(HttpEmbedding::new(HttpEmbeddingConfig {
            base_url: config.embedding.base_url.clone(),
            model: config.embedding.model.clone(),
            api_key: config.embedding_api_key()?,
            dimension,
            batch_size: config.embedding.batch_size,
        })),
    })
}

fn build_synthesizer(config: &MmragConfig) -> anyhow::Result<Arc<dyn AnswerSynthesizer>> {
    Ok(match &config.model {
        Some(model) => {
            let model = model.resolved()?;
            info!(provider = ?model.provider, model = %model.model_id, "Using LLM answer synthesis");
            let model_id = model.model_id.clone();
            Arc::new(LlmSynthesizer::new(LlmClient::new(model), model_id))
        }
        None => {
            info!("No [model] configured; using extractive answers");
            Arc::new(ExtractiveSynthesizer::new())
        }
    })
}

/// Open the store, restoring the snapshot under `data_dir/store` if any.
async fn open_store(config: &MmragConfig) -> anyhow::Result<Arc<DocumentStore>> {
    let embedder = build_embedder(config)?;
    let store =
        DocumentStore::open(config.vector_store.clone(), embedder, &config.store_dir()).await?;
    info!(
        vectors = store.len().await,
        dir = %config.store_dir().display(),
        "Document store ready"
    );
    Ok(Arc::new(store))
}

fn build_ingestor(config: &MmragConfig, store: &Arc<DocumentStore>) -> Ingestor {
    Ingestor::new(
        config.ingest.clone(),
        ExtractorRegistry::with_builtins(),
        Arc::clone(store),
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = MmragConfig::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Serve { host, port } => {
            let mut server = config.server.clone();
            if let Some(host) = host {
                server.host = host;
            }
            if let Some(port) = port {
                server.port = port;
            }

            let store = open_store(&config).await?;
            let ingestor = Arc::new(build_ingestor(&config, &store));
            let pipeline = Arc::new(RagPipeline::new(
                Arc::clone(&store),
                build_synthesizer(&config)?,
                config.query.clone(),
            ));
            let state = Arc::new(AppState {
                store,
                ingestor,
                pipeline,
                snapshot_dir: Some(config.store_dir()),
            });
            let app = GatewayServer::build(state, &server);

            let addr = server.bind_address();
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!(addr = %addr, "mmrag listening");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Commands::Ingest { files } => {
            let store = open_store(&config).await?;
            let ingestor = build_ingestor(&config, &store);
            let mut failed = 0usize;
            for file in &files {
                match ingestor.ingest_path(file).await {
                    Ok(report) => {
                        store.save(&config.store_dir()).await?;
                        println!("{}: {} unit(s) added", report.source, report.units_added);
                    }
                    Err(e) => {
                        failed += 1;
                        warn!(file = %file.display(), error = %e, "Ingestion failed");
                        eprintln!("{}: {e}", file.display());
                    }
                }
            }
            println!("Store now holds {} unit(s)", store.len().await);
            if failed > 0 {
                anyhow::bail!("{failed} of {} file(s) failed to ingest", files.len());
            }
        }
        Commands::Query { text, top_k } => {
            let store = open_store(&config).await?;
            let pipeline =
                RagPipeline::new(store, build_synthesizer(&config)?, config.query.clone());
            let response = match top_k {
                Some(k) => pipeline.query_top_k(&text, k).await?,
                None => pipeline.query(&text).await?,
            };

            println!("{}\n", response.answer);
            println!("Sources ({}):", response.model);
            for (rank, source) in response.sources.iter().enumerate() {
                println!(
                    "  {}. {} [{} p.{}] score {:.3}",
                    rank + 1,
                    source.metadata.source,
                    source.metadata.content_type,
                    source.metadata.page,
                    source.score
                );
            }
        }
        Commands::Sources => {
            let store = open_store(&config).await?;
            let records = store.list().await;
            if records.is_empty() {
                println!("No documents ingested.");
            } else {
                for record in &records {
                    println!("{}\t{}\tpage {}", record.source, record.content_type, record.page);
                }
                println!("\nTotal: {} unit(s)", records.len());
            }
        }
    }

    Ok(())
}
