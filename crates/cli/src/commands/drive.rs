//! `kbchat auth`, `login` and `files`: Google Drive access.

use kbchat_config::AppConfig;
use kbchat_core::FileSource;

use crate::setup;

pub async fn auth() -> Result<(), Box<dyn std::error::Error>> {
    let config = setup::load_config()?;
    let oauth = setup::oauth_client(&config)?;

    println!("Open this URL in your browser and grant read-only Drive access:\n");
    println!("  {}\n", oauth.authorization_url()?);
    println!("Then run: kbchat login --code <CODE>");
    Ok(())
}

pub async fn login(code: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = setup::load_config()?;
    let oauth = setup::oauth_client(&config)?;

    let session = oauth.exchange_code(code).await?;
    let path = AppConfig::session_path();
    session.save(&path)?;

    println!("✅ Authentication successful. Session saved to {}", path.display());
    if session.refresh_token.is_none() {
        println!("⚠️  No refresh token was issued; you will need to log in again when it expires.");
    }
    Ok(())
}

pub async fn files(query: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = setup::load_config()?;
    let source = setup::drive_source(&config)?;

    let files = source.list(query).await;
    setup::save_session(&source, &AppConfig::session_path()).await?;
    let files = files?;

    if files.is_empty() {
        println!("No files found.");
        return Ok(());
    }

    for file in &files {
        println!("{}  {}  ({})", file.id, file.name, file.mime_type);
    }
    println!("\n{} files", files.len());
    Ok(())
}
