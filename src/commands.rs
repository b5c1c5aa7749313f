use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::time::{Duration, Instant};
use tracing::info;

use crate::backends::{
    OllamaClient, SYSTEM_PROMPT_BARE, SYSTEM_PROMPT_RAG, create_embedder, create_generator,
};
use crate::config::Config;
use crate::context::build_context;
use crate::corpus::{list_data_files, load_documents};
use crate::index::IndexStore;

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Chunk, embed and persist everything in the data directory.
#[inline]
pub fn build_index(
    mut config: Config,
    chunk_size: Option<usize>,
    overlap: Option<usize>,
    embed_model: Option<String>,
) -> Result<()> {
    if let Some(chunk_size) = chunk_size {
        config.indexing.chunk_size = chunk_size;
    }
    if let Some(overlap) = overlap {
        config.indexing.overlap = overlap;
    }
    if let Some(embed_model) = embed_model {
        config.ollama.embed_model = embed_model;
    }
    config.validate().context("Invalid build settings")?;

    let data_dir = config.data_dir();
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

    let documents = load_documents(&data_dir)?;
    if documents.is_empty() {
        println!("No documents found in {}", data_dir.display());
        println!("Add .txt, .md, .csv or .pdf files there and run the build again.");
        return Ok(());
    }
    println!("Found {} documents", documents.len());

    let embedder = create_embedder(&config)?;
    let mut store = IndexStore::new(&config);

    let started = Instant::now();
    let bar = spinner("Chunking and embedding...");
    let result = store.build(&documents, embedder.as_ref(), &config.indexing);
    bar.finish_and_clear();
    let stats = result.context("Index build failed")?;

    info!(
        "Index built in {} ms ({} chunks)",
        started.elapsed().as_millis(),
        stats.num_chunks
    );
    println!("{} Index built", style("✓").green());
    println!("  Documents: {}", stats.num_documents);
    println!("  Chunks: {}", stats.num_chunks);
    println!("  Dimension: {}", stats.dimension);
    println!("  Model: {}", stats.model_name);
    println!("  Elapsed: {} ms", started.elapsed().as_millis());

    Ok(())
}

/// Answer a question twice, once with retrieved context and once without,
/// and print both answers side by side with timings.
#[inline]
pub fn ask(config: &Config, question: &str, top_k: Option<usize>) -> Result<()> {
    let top_k = top_k.unwrap_or(config.indexing.top_k);

    let mut store = IndexStore::new(config);
    store.ensure_loaded()?;

    let embedder = create_embedder(config)?;
    let generator = create_generator(config)?;

    let total_started = Instant::now();

    let retrieval_started = Instant::now();
    let query_vector = embedder.embed_query(question)?;
    let hits = store.retrieve(&query_vector, top_k)?;
    let retrieval_ms = retrieval_started.elapsed().as_millis();

    let context = build_context(&hits, config.indexing.max_context_chars);
    let rag_prompt = format!("Question:\n{question}\n\nContext:\n{context}");

    let rag_started = Instant::now();
    let bar = spinner("Generating answer with context...");
    let rag_answer = generator.generate(SYSTEM_PROMPT_RAG, &rag_prompt);
    bar.finish_and_clear();
    let rag_answer = rag_answer.context("Context-grounded generation failed")?;
    let rag_ms = rag_started.elapsed().as_millis();

    let bare_started = Instant::now();
    let bar = spinner("Generating answer without context...");
    let bare_answer = generator.generate(SYSTEM_PROMPT_BARE, question);
    bar.finish_and_clear();
    let bare_answer = bare_answer.context("Bare generation failed")?;
    let bare_ms = bare_started.elapsed().as_millis();

    println!();
    println!("{}", style("=== Answer with retrieval ===").cyan().bold());
    println!("{rag_answer}");
    println!();
    println!("{}", style("Sources:").bold());
    for hit in &hits {
        println!(
            "  {}#chunk{} (score={:.3})",
            hit.record.source, hit.record.chunk_index, hit.score
        );
    }
    println!();
    println!("{}", style("=== Answer without retrieval ===").cyan().bold());
    println!("{bare_answer}");
    println!();
    println!("{}", style("Timings:").bold());
    println!("  Retrieval: {retrieval_ms} ms");
    println!("  Generation with context: {rag_ms} ms");
    println!("  Generation without context: {bare_ms} ms");
    println!("  Total: {} ms", total_started.elapsed().as_millis());

    Ok(())
}

/// Print data directory, index and backend status.
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("{}", style("ragcmp status").bold());
    println!();

    let data_dir = config.data_dir();
    let files = list_data_files(&data_dir)?;
    println!("📂 Data: {}", data_dir.display());
    println!("   Files: {}", files.len());

    let mut store = IndexStore::new(config);
    if store.exists() {
        match store.load() {
            Ok(_) => {
                println!("📦 Index: built");
                if let Some(size) = store.size() {
                    println!("   Chunks: {size}");
                }
                if let Some(model) = store.model_name() {
                    println!("   Model: {model}");
                }
                if let Some(dimension) = store.dimension() {
                    println!("   Dimension: {dimension}");
                }
            }
            Err(e) => {
                println!("📦 Index: {} ({e})", style("corrupt").red());
            }
        }
    } else {
        println!("📦 Index: not built");
    }

    let client = OllamaClient::new(config)?;
    match client.ping() {
        Ok(()) => {
            println!("🦙 Ollama: {} at {}", style("reachable").green(), config.ollama.url()?);
            if let Err(e) = client.health_check() {
                println!("   {} {e}", style("warning:").yellow());
            }
        }
        Err(e) => {
            println!("🦙 Ollama: {} ({e})", style("unreachable").red());
        }
    }

    Ok(())
}

/// List the files in the data directory with their sizes.
#[inline]
pub fn list_files(config: &Config) -> Result<()> {
    let data_dir = config.data_dir();
    let files = list_data_files(&data_dir)?;

    if files.is_empty() {
        println!("No files in {}", data_dir.display());
        println!("Add .txt, .md, .csv or .pdf files there, then run a build.");
        return Ok(());
    }

    println!("Data files ({} total):", files.len());
    for file in &files {
        println!("  {} ({} bytes)", file.path, file.bytes);
    }

    Ok(())
}

/// Remove all documents and index artifacts.
#[inline]
pub fn clear_data(config: &Config, yes: bool) -> Result<()> {
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Delete all documents and the index?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let mut store = IndexStore::new(config);
    store.clear()?;

    for dir in [config.data_dir(), config.artifacts_dir()] {
        if dir.is_dir() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to remove {}", dir.display()))?;
        }
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to recreate {}", dir.display()))?;
    }

    println!("{} Data and index cleared", style("✓").green());
    Ok(())
}
