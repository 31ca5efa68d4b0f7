//! `search` and `list` command output.
//!
//! Ranking itself lives in [`chunkvec_core::search::query`]; this module
//! opens the engine and prints the results.

use anyhow::Result;
use chunkvec_core::models::VectorRecord;
use chunkvec_core::search::{query, SearchHit};

use crate::config::Config;
use crate::engine::Engine;

/// Run the search command and print ranked hits, closest first.
pub async fn run_search(config: &Config, text: &str, k: Option<i64>) -> Result<()> {
    let engine = Engine::open(config).await?;
    let k = k.unwrap_or(config.retrieval.default_k);

    let response = query(engine.store.as_ref(), engine.embedder.as_ref(), text, k).await?;

    if response.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in response.results.iter().enumerate() {
        println!("{}. [{:.4}] {}", i + 1, hit.distance, source_label(hit));
        println!("    excerpt: \"{}\"", excerpt(&hit.text));
        println!("    id: {}", hit.id);
        println!();
    }
    Ok(())
}

/// Run the list command: every record, newest first.
pub async fn run_list(config: &Config) -> Result<()> {
    let engine = Engine::open(config).await?;
    let records = engine.store.list_all().await?;

    if records.is_empty() {
        println!("No records.");
        return Ok(());
    }

    for record in &records {
        println!(
            "{:>6}  {}  {:<28}  {}",
            record.id,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record_label(record),
            excerpt(&record.text)
        );
    }
    println!();
    println!("{} record{}", records.len(), if records.len() == 1 { "" } else { "s" });
    Ok(())
}

fn source_label(hit: &SearchHit) -> String {
    match (&hit.filename, hit.chunk_number) {
        (Some(name), Some(n)) => format!("{} #{}", name, n),
        (Some(name), None) => name.clone(),
        _ => "(text)".to_string(),
    }
}

fn record_label(record: &VectorRecord) -> String {
    match record.provenance() {
        Some(p) => format!("{} #{}", p.filename, p.chunk_number),
        None => "(text)".to_string(),
    }
}

/// First line-joined 80 characters of `text`.
fn excerpt(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    if flat.chars().count() > 80 {
        let cut: String = flat.chars().take(77).collect();
        format!("{}...", cut)
    } else {
        flat.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let long = "é".repeat(100);
        let e = excerpt(&long);
        assert_eq!(e.chars().count(), 80);
        assert!(e.ends_with("..."));
        assert_eq!(excerpt("a\nb "), "a b");
    }

    #[test]
    fn test_source_label() {
        let hit = SearchHit {
            id: 1,
            text: "x".to_string(),
            distance: 0.0,
            filename: Some("a.txt".to_string()),
            chunk_number: Some(3),
        };
        assert_eq!(source_label(&hit), "a.txt #3");
        let bare = SearchHit {
            filename: None,
            chunk_number: None,
            ..hit
        };
        assert_eq!(source_label(&bare), "(text)");
    }
}
