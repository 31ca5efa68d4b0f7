//! Store statistics.
//!
//! A quick summary of what's indexed: backend, record count,
//! dimensionality and embedding model. Used by `chunkvec stats`.

use anyhow::Result;

use crate::config::Config;
use crate::engine::Engine;

/// Run the stats command: open the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let engine = Engine::open(config).await?;
    let count = engine.store.count().await?;

    println!("chunkvec store stats");
    println!("====================");
    println!();
    println!("  Backend:     {}", engine.store.backend_name());
    if let Some(path) = &config.store.path {
        if engine.store.backend_name() == "sqlite" {
            let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            println!("  Database:    {}", path.display());
            println!("  Size:        {}", format_bytes(size));
        }
    }
    println!(
        "  Dimensions:  {}",
        engine
            .store
            .dims()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!("  Model:       {}", engine.embedder.model_name());
    println!("  Records:     {}", count);
    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
