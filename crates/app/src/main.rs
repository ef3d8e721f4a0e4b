use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use thairag_core::{
    build_extractor, extract_blocking, format_mod_time, load_embedder, normalize_whitespace,
    write_text_dump, ChunkingConfig, DocumentProcessor, Embedder, EmbeddingConfig,
    ExtractionConfig, ExtractorKind, FileOutcome, MemoryStore, MilvusClient, MilvusStore,
    Pipeline, PipelineConfig, SearchHit, StoreConfig, TextStats, VectorIndex,
    DEFAULT_COLLECTION, DEFAULT_MODEL,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SAMPLE_QUERY: &str = "ฐานข้อมูลเวกเตอร์คืออะไร";
const SAMPLE_QUERIES: [&str; 5] = [
    "ฐานข้อมูลเวกเตอร์คืออะไร",
    "ประโยชน์ของฐานข้อมูลเวกเตอร์",
    "Vector Database ใช้งานอย่างไร",
    "การใช้งาน Milvus",
    "เทคโนโลยีฐานข้อมูล",
];
const PREVIEW_CHARS: usize = 500;

type BoxedPipeline<V> = Pipeline<Box<dyn Embedder>, V>;

#[derive(Parser)]
#[command(name = "thairag", version, about = "Index Thai PDFs into Milvus and search them")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Milvus host
    #[arg(long, env = "MILVUS_HOST", default_value = "localhost")]
    milvus_host: String,

    /// Milvus REST port
    #[arg(long, env = "MILVUS_PORT", default_value_t = 19530)]
    milvus_port: u16,

    /// Milvus bearer token
    #[arg(long, env = "MILVUS_TOKEN")]
    milvus_token: Option<String>,

    /// Collection name
    #[arg(long, env = "THAIRAG_COLLECTION", default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// Embedding model code, or `ngram` for the offline hashed embedder
    #[arg(long, env = "THAIRAG_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Directory for downloaded model files
    #[arg(long, env = "THAIRAG_MODEL_CACHE")]
    model_cache_dir: Option<PathBuf>,

    /// Maximum characters per chunk
    #[arg(long, default_value_t = 1000)]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value_t = 200)]
    chunk_overlap: usize,

    /// Text extraction strategy
    #[arg(long, env = "THAIRAG_EXTRACTOR", value_enum, default_value_t = ExtractorArg::Parser)]
    extractor: ExtractorArg,

    /// Rasterisation resolution for OCR
    #[arg(long, default_value_t = 300)]
    ocr_dpi: u32,

    /// OCR language codes joined by `+`
    #[arg(long, env = "THAIRAG_OCR_LANG", default_value = "tha+eng")]
    ocr_languages: String,

    /// Tesseract page segmentation mode
    #[arg(long, default_value_t = 6)]
    ocr_psm: u8,

    /// Tesseract engine mode
    #[arg(long, default_value_t = 1)]
    ocr_oem: u8,

    /// Neural OCR service endpoint
    #[arg(long, env = "THAIRAG_OCR_ENDPOINT")]
    ocr_endpoint: Option<String>,

    /// Neural OCR service API key
    #[arg(long, env = "THAIRAG_OCR_API_KEY")]
    ocr_api_key: Option<String>,

    /// Ask the neural OCR service to use a GPU
    #[arg(long, default_value_t = false)]
    ocr_gpu: bool,

    /// Write extracted text next to each processed PDF
    #[arg(long, default_value_t = false)]
    dump_text: bool,

    /// Number of search results to show
    #[arg(long, default_value_t = 5)]
    limit: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExtractorArg {
    Parser,
    Tesseract,
    Neural,
}

impl From<ExtractorArg> for ExtractorKind {
    fn from(value: ExtractorArg) -> Self {
        match value {
            ExtractorArg::Parser => ExtractorKind::Parser,
            ExtractorArg::Tesseract => ExtractorKind::Tesseract,
            ExtractorArg::Neural => ExtractorKind::Neural,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Index one PDF, then run a sample query.
    IndexFile {
        /// PDF to index [default: document/Vector Database.pdf]
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Index every PDF in a folder.
    Batch {
        /// Folder with PDFs [default: document]
        #[arg(long)]
        folder: Option<PathBuf>,
        /// Descend into subfolders.
        #[arg(long, default_value_t = false)]
        recursive: bool,
        /// Index into an in-memory collection instead of Milvus.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Interactive search; type `exit` to quit.
    Search {
        /// Run the built-in Thai test queries instead of prompting.
        #[arg(long, default_value_t = false)]
        sample: bool,
    },
    /// Drop the collection.
    Drop {
        /// Skip the confirmation prompt.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Check the Milvus connection and list collections.
    Check,
    /// Extract text from one PDF and report character statistics.
    Extract {
        /// PDF to extract.
        #[arg(long)]
        path: PathBuf,
        /// Do not write the extracted text next to the PDF.
        #[arg(long, default_value_t = false)]
        no_dump: bool,
    },
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            store: StoreConfig {
                host: self.milvus_host.clone(),
                port: self.milvus_port,
                collection: self.collection.clone(),
                token: self.milvus_token.clone(),
            },
            embedding: EmbeddingConfig {
                model: self.model.clone(),
                cache_dir: self.model_cache_dir.clone(),
                show_download_progress: true,
            },
            chunking: ChunkingConfig {
                chunk_size: self.chunk_size,
                chunk_overlap: self.chunk_overlap,
            },
            extraction: ExtractionConfig {
                kind: self.extractor.into(),
                dpi: self.ocr_dpi,
                languages: self.ocr_languages.clone(),
                page_segmentation_mode: self.ocr_psm,
                engine_mode: self.ocr_oem,
                neural_endpoint: self.ocr_endpoint.clone(),
                neural_api_key: self.ocr_api_key.clone(),
                use_gpu: self.ocr_gpu,
                dump_text: self.dump_text,
            },
            search_limit: self.limit,
            ..defaults
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.pipeline_config();
    config.validate().context("invalid configuration")?;

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        collection = %config.store.collection,
        "thairag boot"
    );

    match cli.command {
        Command::IndexFile { path } => {
            let path = path.unwrap_or_else(|| config.input_path.clone());
            let mut pipeline = open_milvus_pipeline(&config).await?;
            let result = index_file(&pipeline, &path, config.search_limit).await;
            pipeline.close().await;
            result
        }
        Command::Batch {
            folder,
            recursive,
            dry_run,
        } => {
            let folder = folder.unwrap_or_else(|| config.input_dir.clone());
            let recursive = recursive || config.recursive;
            if dry_run {
                let embedder = load_embedder_logged(&config.embedding)?;
                let store = MemoryStore::new(&config.store.collection, embedder.dimensions());
                let mut pipeline = build_pipeline(&config, embedder, store)?;
                pipeline.open().await?;
                let result = batch(&pipeline, &folder, recursive).await;
                pipeline.close().await;
                result
            } else {
                let mut pipeline = open_milvus_pipeline(&config).await?;
                let result = batch(&pipeline, &folder, recursive).await;
                pipeline.close().await;
                result
            }
        }
        Command::Search { sample } => {
            let mut pipeline = open_milvus_pipeline(&config).await?;
            let result = if sample {
                sample_search(&pipeline, config.search_limit).await
            } else {
                interactive_search(&pipeline, config.search_limit).await
            };
            pipeline.close().await;
            result
        }
        Command::Drop { yes } => {
            let mut client = MilvusClient::connect(&config.store).await?;
            let result = drop_collection(&client, &config.store.collection, yes).await;
            client.close();
            result
        }
        Command::Check => {
            let mut client = MilvusClient::connect(&config.store).await?;
            let result = check(&client, &config.store.collection).await;
            client.close();
            result
        }
        Command::Extract { path, no_dump } => extract(&config.extraction, &path, !no_dump).await,
    }
}

fn load_embedder_logged(config: &EmbeddingConfig) -> anyhow::Result<Box<dyn Embedder>> {
    println!("loading embedding model {} ...", config.model);
    let embedder = load_embedder(config)
        .with_context(|| format!("failed to load embedding model {}", config.model))?;
    info!(model = %embedder.model_id(), dimensions = embedder.dimensions(), "embedding model ready");
    Ok(embedder)
}

fn build_pipeline<V: VectorIndex>(
    config: &PipelineConfig,
    embedder: Box<dyn Embedder>,
    store: V,
) -> anyhow::Result<BoxedPipeline<V>> {
    let extractor = build_extractor(&config.extraction);
    let processor =
        DocumentProcessor::new(extractor, config.chunking, config.extraction.dump_text)?;
    Ok(Pipeline::new(processor, embedder, store))
}

/// Loads the model, connects and opens the collection. The store is closed
/// again if opening fails.
async fn open_milvus_pipeline(config: &PipelineConfig) -> anyhow::Result<BoxedPipeline<MilvusStore>> {
    let embedder = load_embedder_logged(&config.embedding)?;
    println!("connecting to milvus at {} ...", config.store.base_url());
    let store = MilvusStore::connect(&config.store, embedder.dimensions())
        .await
        .context("could not connect to milvus")?;
    let mut pipeline = build_pipeline(config, embedder, store)?;

    if let Err(error) = pipeline.open().await {
        pipeline.close().await;
        return Err(error).context("could not open the collection");
    }
    Ok(pipeline)
}

async fn index_file<V: VectorIndex>(
    pipeline: &BoxedPipeline<V>,
    path: &Path,
    limit: usize,
) -> anyhow::Result<()> {
    println!("indexing {}", path.display());
    match pipeline.index_file(path).await? {
        FileOutcome::Missing => {
            eprintln!("file not found: {}", path.display());
        }
        FileOutcome::Empty { .. } => {
            println!("no text could be extracted from {}", path.display());
        }
        FileOutcome::Indexed { chunks, replaced } => {
            let verb = if replaced { "re-indexed" } else { "indexed" };
            println!("{verb} {chunks} chunks from {}", path.display());
            println!("searching: '{SAMPLE_QUERY}'");
            let hits = pipeline.search(SAMPLE_QUERY, limit).await?;
            print_hits(&hits);
        }
        FileOutcome::Unchanged => {
            println!("no files need processing");
            if confirm("search now? (y/n): ")? {
                if let Some(query) = prompt("query: ")? {
                    let query = query.trim();
                    if !query.is_empty() {
                        println!("searching: '{query}'");
                        let hits = pipeline.search(query, limit).await?;
                        print_hits(&hits);
                    }
                }
            }
        }
    }
    Ok(())
}

async fn batch<V: VectorIndex>(
    pipeline: &BoxedPipeline<V>,
    folder: &Path,
    recursive: bool,
) -> anyhow::Result<()> {
    let report = pipeline.index_folder(folder, recursive).await?;
    println!("found {} pdf files", report.discovered);

    for skipped in &report.failed {
        warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
        println!("  failed: {} ({})", skipped.path.display(), skipped.reason);
    }

    println!(
        "done, files processed: {}/{} (chunks inserted: {}, unchanged: {}, without text: {}, failed: {})",
        report.processed(),
        report.discovered,
        report.rows_inserted,
        report.unchanged,
        report.empty,
        report.failed.len()
    );
    Ok(())
}

async fn interactive_search<V: VectorIndex>(
    pipeline: &BoxedPipeline<V>,
    limit: usize,
) -> anyhow::Result<()> {
    println!("\n=== document search ===");
    println!("type a query to search the vector database");
    println!("type 'exit' to quit");

    loop {
        let Some(query) = prompt("\nquery (or 'exit'): ")? else {
            break;
        };
        let query = query.trim();
        if query.eq_ignore_ascii_case("exit") {
            break;
        }
        if query.is_empty() {
            continue;
        }

        println!("searching: '{query}'");
        let hits = pipeline.search(query, limit).await?;
        print_hits(&hits);
    }
    Ok(())
}

async fn sample_search<V: VectorIndex>(
    pipeline: &BoxedPipeline<V>,
    limit: usize,
) -> anyhow::Result<()> {
    for (index, query) in SAMPLE_QUERIES.iter().enumerate() {
        println!("\n=== query {}: '{query}' ===", index + 1);
        let hits = pipeline.search(query, limit).await?;
        print_hits(&hits);
    }
    Ok(())
}

async fn drop_collection(client: &MilvusClient, collection: &str, yes: bool) -> anyhow::Result<()> {
    let confirmed = yes || confirm(&format!("drop collection '{collection}'? (y/n): "))?;
    if !confirmed {
        println!("cancelled");
        return Ok(());
    }

    if client.drop_collection(collection).await? {
        println!("dropped collection {collection}");
    } else {
        println!("collection not found: {collection}");
    }
    Ok(())
}

async fn check(client: &MilvusClient, collection: &str) -> anyhow::Result<()> {
    println!("connected to milvus at {}", client.base_url());
    let collections = client.list_collections().await?;
    println!("collections: {}", collections.len());
    for name in &collections {
        println!("  - {name}");
    }
    if client.has_collection(collection).await? {
        println!("collection '{collection}' exists");
    } else {
        println!("collection '{collection}' does not exist yet");
    }
    Ok(())
}

async fn extract(config: &ExtractionConfig, path: &Path, dump: bool) -> anyhow::Result<()> {
    let extractor = build_extractor(config);
    let label = extractor.name();
    println!("extracting {} with the {label} extractor", path.display());

    let text = extract_blocking(extractor, path.to_path_buf())
        .await
        .with_context(|| format!("extraction failed for {}", path.display()))?;

    let stats = TextStats::of(&text);
    println!("total characters: {}", stats.total_chars);
    println!("thai characters: {}", stats.thai_chars);
    if stats.total_chars > 0 {
        println!("thai share: {:.2}%", stats.thai_percentage());
    }

    let preview = normalize_whitespace(&text)
        .chars()
        .take(PREVIEW_CHARS)
        .collect::<String>();
    if !preview.is_empty() {
        println!("\n--- preview ---\n{preview}");
    }

    if dump {
        let target = write_text_dump(path, label, &text)?;
        println!("wrote {}", target.display());
    }
    Ok(())
}

fn print_hits(hits: &[SearchHit]) {
    println!("\nresults:");
    if hits.is_empty() {
        println!("(no matches)");
        return;
    }
    for hit in hits {
        println!("Score: {:.4}", hit.score);
        println!("File: {}", hit.document_name);
        println!("Modified: {}", format_mod_time(hit.modified));
        println!("Text Chunk: {}", hit.text);
        println!("----------------------------");
    }
}

/// Reads one line from stdin; `None` at end of input.
fn prompt(message: &str) -> anyhow::Result<Option<String>> {
    print!("{message}");
    io::stdout().flush()?;

    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn confirm(message: &str) -> anyhow::Result<bool> {
    Ok(prompt(message)?
        .map(|answer| matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
        .unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_build_the_pipeline_config() {
        let cli = Cli::parse_from([
            "thairag",
            "--milvus-host",
            "milvus",
            "--extractor",
            "tesseract",
            "--chunk-size",
            "500",
            "--chunk-overlap",
            "50",
            "batch",
            "--recursive",
        ]);
        let config = cli.pipeline_config();

        assert_eq!(config.store.base_url(), "http://milvus:19530");
        assert_eq!(config.extraction.kind, ExtractorKind::Tesseract);
        assert_eq!(config.chunking.chunk_size, 500);
        assert!(config.validate().is_ok());
        assert!(matches!(cli.command, Command::Batch { recursive: true, .. }));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
