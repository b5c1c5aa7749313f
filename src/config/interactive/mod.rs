use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, IndexingConfig, OllamaConfig};
use crate::backends::OllamaClient;

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 ragcmp Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure the local Ollama instance used for embeddings and generation.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Indexing Configuration").bold().yellow());
    configure_indexing(&mut config.indexing)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before building an index.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!("  Embedding Model: {}", style(&config.ollama.embed_model).cyan());
    eprintln!("  Chat Model: {}", style(&config.ollama.chat_model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    eprintln!("  Temperature: {}", style(config.ollama.temperature).cyan());

    eprintln!();
    eprintln!("{}", style("Indexing Settings:").bold().yellow());
    eprintln!("  Chunk Size: {}", style(config.indexing.chunk_size).cyan());
    eprintln!("  Overlap: {}", style(config.indexing.overlap).cyan());
    eprintln!("  Top K: {}", style(config.indexing.top_k).cyan());
    eprintln!(
        "  Max Context Chars: {}",
        style(config.indexing.max_context_chars).cyan()
    );

    eprintln!();
    match config.ollama.url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!("Data dir: {}", style(config.data_dir().display()).dim());
    eprintln!(
        "Artifacts dir: {}",
        style(config.artifacts_dir().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: Config::config_dir()?,
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_protocol = protocols
        .iter()
        .position(|p| *p == ollama.protocol)
        .unwrap_or(0);
    let protocol_idx = Select::new()
        .with_prompt("Protocol")
        .items(protocols)
        .default(default_protocol)
        .interact()?;
    ollama.protocol = protocols[protocol_idx].to_string();

    ollama.host = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .interact_text()?;

    ollama.port = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .interact_text()?;

    ollama.embed_model = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.embed_model.clone())
        .interact_text()?;

    ollama.chat_model = Input::new()
        .with_prompt("Chat model")
        .default(ollama.chat_model.clone())
        .interact_text()?;

    Ok(())
}

fn configure_indexing(indexing: &mut IndexingConfig) -> Result<()> {
    indexing.chunk_size = Input::new()
        .with_prompt("Chunk size (characters)")
        .default(indexing.chunk_size)
        .interact_text()?;

    let chunk_size = indexing.chunk_size;
    indexing.overlap = Input::new()
        .with_prompt("Chunk overlap (characters)")
        .default(indexing.overlap)
        .validate_with(move |value: &usize| {
            if *value < chunk_size {
                Ok(())
            } else {
                Err("overlap must be smaller than chunk size")
            }
        })
        .interact_text()?;

    indexing.top_k = Input::new()
        .with_prompt("Top K retrieved chunks")
        .default(indexing.top_k)
        .interact_text()?;

    Ok(())
}

fn test_ollama_connection(config: &Config) -> bool {
    OllamaClient::new(config).is_ok_and(|client| client.ping().is_ok())
}
