//! `kbchat status`: Show configuration and repository state.

use kbchat_agent::AnswerSettings;
use kbchat_config::AppConfig;
use kbchat_core::DocumentRepository;
use kbchat_drive::DriveSession;

use crate::setup;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = setup::load_config()?;
    let repository = setup::repository(&config);
    let documents = repository.list().await;
    let chunks: usize = documents.iter().map(|d| d.chunk_count).sum();

    println!("kbchat Status");
    println!("=============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", AnswerSettings::from_config(&config).model);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!(
        "  Chunking:     {} chars, {} overlap",
        config.chunking.size, config.chunking.overlap
    );
    println!(
        "  Retrieval:    top {} chunks, {} token budget",
        config.retrieval.max_chunks, config.retrieval.max_context_tokens
    );
    println!("  Storage:      {}", repository.path().display());
    println!("  Documents:    {} ({} chunks)", documents.len(), chunks);
    println!(
        "  Last update:  {}",
        repository.last_updated().await.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let drive = if !config.drive.is_configured() {
        "not configured"
    } else {
        match DriveSession::load(&AppConfig::session_path()) {
            Ok(Some(_)) => "logged in",
            Ok(None) => "not logged in",
            Err(_) => "session unreadable",
        }
    };
    println!("  Google Drive: {drive}");

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `kbchat onboard` first");
    }

    Ok(())
}
