//! Wiring shared by the commands: config, repository, agent, Drive source.

use std::path::Path;
use std::sync::Arc;
use kbchat_agent::{AnswerGenerator, AnswerSettings, KnowledgeAgent};
use kbchat_config::AppConfig;
use kbchat_core::Provider;
use kbchat_documents::{Chunker, FileRepository};
use kbchat_drive::{DriveSession, GoogleDriveSource, OAuthClient};

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

pub fn load_config() -> CliResult<AppConfig> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

pub fn chunker(config: &AppConfig) -> CliResult<Chunker> {
    let chunker = Chunker::new(config.chunking.size, config.chunking.overlap)?
        .with_min_chunk_chars(config.chunking.min_chunk_chars);
    Ok(chunker)
}

pub fn repository(config: &AppConfig) -> Arc<FileRepository> {
    Arc::new(FileRepository::new(config.storage_path()))
}

/// Fail early with setup hints when no API key is available.
pub fn require_api_key(config: &AppConfig) -> CliResult<()> {
    if config.has_api_key() {
        return Ok(());
    }

    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    ANTHROPIC_API_KEY=sk-ant-...   (default provider)");
    eprintln!("    OPENAI_API_KEY=sk-...          (with default_provider = \"openai\")");
    eprintln!("    KBCHAT_API_KEY=...             (generic)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    Err("No API key found. See above for setup instructions.".into())
}

pub fn provider(config: &AppConfig) -> CliResult<Arc<dyn Provider>> {
    let router = kbchat_providers::build_from_config(config);
    Ok(router
        .default()
        .ok_or_else(|| format!("Provider '{}' is not available", config.default_provider))?)
}

/// Agent over the persisted repository and the default provider.
pub fn agent(config: &AppConfig) -> CliResult<KnowledgeAgent> {
    Ok(KnowledgeAgent::new(
        repository(config),
        AnswerGenerator::new(provider(config)?, AnswerSettings::from_config(config)),
        chunker(config)?,
    ))
}

pub fn oauth_client(config: &AppConfig) -> CliResult<OAuthClient> {
    if !config.drive.is_configured() {
        return Err(concat!(
            "Google Drive is not configured. Set GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET ",
            "and GOOGLE_REDIRECT_URI, or fill in the [drive] section of config.toml."
        )
        .into());
    }
    Ok(OAuthClient::from_config(&config.drive)?)
}

/// Drive source over the saved session.
pub fn drive_source(config: &AppConfig) -> CliResult<GoogleDriveSource> {
    let oauth = oauth_client(config)?;
    let session = DriveSession::load(&AppConfig::session_path())?
        .ok_or("Not logged in to Google Drive. Run `kbchat auth`, then `kbchat login --code <CODE>`.")?;
    Ok(GoogleDriveSource::new(oauth, session, &config.drive))
}

/// Persist the session if the source refreshed it.
pub async fn save_session(source: &GoogleDriveSource, path: &Path) -> CliResult<()> {
    let current = source.session().await;
    let saved = DriveSession::load(path)?;
    if saved.as_ref().map(|s| &s.access_token) != Some(&current.access_token) {
        current.save(path)?;
        tracing::debug!("Saved refreshed Drive session");
    }
    Ok(())
}
