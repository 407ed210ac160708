//! DocGrid: extract documents and ask typed questions about them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use docgrid_core::{ConcurrencyLimiter, DocGridConfig, Document, ExtractionSettings, TaskRegistry};
use docgrid_ingest::{BackendRegistry, DocumentPipeline};
use docgrid_llm::{CompletionService, LLMConfig, OpenAiCompatClient, VisionModel};
use docgrid_query::{AnswerType, QueryPrompt, QueryRequest};
use docgrid_runtime::DocGrid;
use docgrid_store::MemoryVectorStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn resolve_data_dir() -> PathBuf {
    std::env::var("DOCGRID_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn print_help() {
    println!("DocGrid - adaptive document extraction and typed queries");
    println!();
    println!("Usage: docgrid <command>");
    println!();
    println!("Commands:");
    println!("  classify <file>                 Print the content classification");
    println!("  extract <file>                  Extract and chunk, print chunks as JSON");
    println!("  ask <file> <type> <question>    Answer a question about a file");
    println!("                                  (type: int, bool, str, int_array, str_array)");
    println!("  help                            Show this help message");
}

fn read_input(path: &str) -> anyhow::Result<(String, Vec<u8>)> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path))?;
    let filename = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string();
    Ok((filename, bytes))
}

/// The configured LLM client, if credentials are available.
fn llm_client(config: &DocGridConfig) -> Option<Arc<OpenAiCompatClient>> {
    let llm_config = LLMConfig::load(&config.data_paths.llm_config_file);
    match OpenAiCompatClient::from_config(&llm_config) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

fn pipeline(
    settings: &ExtractionSettings,
    max_concurrency: usize,
    vision: Option<Arc<dyn VisionModel>>,
) -> anyhow::Result<DocumentPipeline> {
    let limiter = ConcurrencyLimiter::new(max_concurrency);
    let registry = BackendRegistry::with_defaults(vision, limiter.clone(), Arc::new(TaskRegistry::new()));
    Ok(DocumentPipeline::new(settings, limiter, registry)?)
}

async fn classify(config: &DocGridConfig, path: &str) -> anyhow::Result<()> {
    let (filename, bytes) = read_input(path)?;
    let pipeline = pipeline(&config.extraction, config.query.max_concurrency, None)?;
    let document = Document::new("local", &filename, bytes.len(), None);
    let class = pipeline.classify(&document, Arc::new(bytes)).await;
    println!("{}", class);
    Ok(())
}

async fn extract(config: &DocGridConfig, path: &str) -> anyhow::Result<()> {
    let (filename, bytes) = read_input(path)?;
    let vision = llm_client(config).map(|c| c as Arc<dyn VisionModel>);
    let pipeline = pipeline(&config.extraction, config.query.max_concurrency, vision)?;
    let document = Document::new("local", &filename, bytes.len(), Some(PathBuf::from(path)));

    let processed = pipeline.process(&document, Arc::new(bytes)).await?;
    info!(
        "{}: {} units via {}",
        filename,
        processed.load.units.len(),
        processed.load.method.as_deref().unwrap_or("nothing")
    );
    println!("{}", serde_json::to_string_pretty(&processed.chunks)?);
    Ok(())
}

async fn ask(config: DocGridConfig, path: &str, answer_type: &str, question: &str) -> anyhow::Result<()> {
    let answer_type: AnswerType = serde_json::from_value(serde_json::Value::String(answer_type.into()))
        .with_context(|| format!("unknown answer type {}", answer_type))?;
    let (filename, bytes) = read_input(path)?;

    let Some(client) = llm_client(&config) else {
        bail!("ask needs an LLM provider (set OPENAI_API_KEY or GROQ_API_KEY)");
    };
    let grid = DocGrid::new(
        config,
        Arc::new(MemoryVectorStore::new()),
        client.clone() as Arc<dyn CompletionService>,
        Some(client as Arc<dyn VisionModel>),
        Vec::new(),
    )?;

    let Some(document_id) = grid.upload_and_process(&filename, bytes).await? else {
        bail!("could not process {}", filename);
    };
    let request = QueryRequest::new(document_id, QueryPrompt::new("cli", question, answer_type));
    let result = grid.run_query(&request).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");
    if matches!(command, "--help" | "-h" | "help") {
        print_help();
        return Ok(());
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());
    let config = DocGridConfig::from_env(&data_dir)?;

    match (command, &args[2..]) {
        ("classify", [file]) => classify(&config, file).await,
        ("extract", [file]) => extract(&config, file).await,
        ("ask", [file, answer_type, question @ ..]) if !question.is_empty() => {
            ask(config, file, answer_type, &question.join(" ")).await
        }
        ("classify" | "extract" | "ask", _) => {
            eprintln!("Wrong arguments for {}. Use 'docgrid help' for usage.", command);
            std::process::exit(1);
        }
        _ => {
            eprintln!("Unknown command: {}. Use 'docgrid help' for usage.", command);
            std::process::exit(1);
        }
    }
}
