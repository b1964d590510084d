//! `kbchat docs`, `remove` and `clear`: Repository management.

use kbchat_core::DocumentRepository;

use crate::setup;

pub async fn list() -> Result<(), Box<dyn std::error::Error>> {
    let config = setup::load_config()?;
    let documents = setup::repository(&config).list().await;

    if documents.is_empty() {
        println!("No documents in the repository.");
        return Ok(());
    }

    for (i, doc) in documents.iter().enumerate() {
        println!("{}. {} (chunks: {})", i + 1, doc.name, doc.chunk_count);
        println!("   id: {}", doc.id);
    }
    Ok(())
}

pub async fn remove(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = setup::load_config()?;
    if setup::repository(&config).remove(id).await? {
        println!("Removed {id}");
    } else {
        println!("No document with id {id}");
    }
    Ok(())
}

pub async fn clear(confirm: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !confirm {
        return Err("Refusing to clear without --confirm".into());
    }
    let config = setup::load_config()?;
    setup::repository(&config).clear().await?;
    println!("Knowledge base cleared.");
    Ok(())
}
