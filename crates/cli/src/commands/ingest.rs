//! `kbchat ingest` and `kbchat add`: Fill the knowledge base.

use std::path::PathBuf;
use kbchat_agent::IngestReport;
use kbchat_config::AppConfig;

use crate::setup;

pub async fn from_drive(ids: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let ids: Vec<String> = ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect();
    if ids.is_empty() {
        return Err("No file ids given".into());
    }

    let config = setup::load_config()?;
    let agent = setup::agent(&config)?;
    let source = setup::drive_source(&config)?;

    eprintln!("  Processing {} files...", ids.len());
    let report = agent.ingest_from_source(&source, &ids).await;
    setup::save_session(&source, &AppConfig::session_path()).await?;

    print_report(&report);
    Ok(())
}

pub async fn local(paths: Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = setup::load_config()?;
    let agent = setup::agent(&config)?;

    let report = agent.ingest_local(&paths).await;
    print_report(&report);
    Ok(())
}

fn print_report(report: &IngestReport) {
    for file in &report.succeeded {
        println!("  ✅ {} ({} chunks)", file.name, file.chunks);
    }
    for failure in &report.failed {
        eprintln!("  ❌ {}: {}", failure.id, failure.error);
    }
    println!("{}", report.summary());
}
