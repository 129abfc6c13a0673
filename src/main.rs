// Import from library crate
use spider_sqlgen::config::OpenAiConfig;
use spider_sqlgen::dataset::SpiderDataset;
use spider_sqlgen::db::DatabaseRegistry;
use spider_sqlgen::index::{build_index_bundles, EmbeddingModel, SchemaEmbedder};
use spider_sqlgen::llm::{CompletionModel, LlmClient};
use spider_sqlgen::runner::run_split;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spider-sqlgen")]
#[command(about = "Generate SQL predictions for the Spider text-to-SQL benchmark")]
#[command(version)]
struct Args {
    /// Path to the Spider dataset directory
    #[arg(long)]
    input: PathBuf,

    /// Path to the output directory for the generated SQL files, one query
    /// on one line, to be compared with the *_gold.sql files in the input
    /// directory
    #[arg(long)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,spider_sqlgen=info")),
        )
        .init();

    let args = Args::parse();

    fs::create_dir_all(&args.output).with_context(|| {
        format!("Failed to create output directory {}", args.output.display())
    })?;

    let dataset = SpiderDataset::load(&args.input)?;
    info!(
        "Loaded {} train, {} train-others and {} dev examples",
        dataset.train_spider.len(),
        dataset.train_others.len(),
        dataset.dev.len()
    );

    let registry = DatabaseRegistry::open(&args.input, dataset.all_examples())?;
    info!("Opened {} databases", registry.len());

    let config = OpenAiConfig::from_env()?;
    let model: Arc<dyn CompletionModel> = Arc::new(LlmClient::new(
        config.api_key.clone(),
        config.model.clone(),
        config.base_url.clone(),
    ));
    let embedder: Arc<dyn EmbeddingModel> = Arc::new(SchemaEmbedder::new(
        config.api_key.clone(),
        config.embedding_model.clone(),
        config.base_url.clone(),
    ));

    let bundles = build_index_bundles(&registry, model, embedder).await?;

    let train = dataset.train_examples();
    run_split(&bundles, &train, &args.output.join("train_pred.sql")).await?;
    run_split(&bundles, &dataset.dev, &args.output.join("dev_pred.sql")).await?;

    Ok(())
}
