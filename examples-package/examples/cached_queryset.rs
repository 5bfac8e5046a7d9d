//! Cached Queryset Example
//!
//! Loads a snapshot for one unit of work, answers filters and orderings from
//! memory, and shows where queries fall back to the store.

use anyhow::Result;
use examples_package::{sample_articles, Article};
use query_cache::CacheManager;
use query_planner::Filters;
use query_storage::MemoryStore;
use std::sync::Arc;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Cached Queryset Example ===\n");

    let store = Arc::new(MemoryStore::new().with_rows(sample_articles()));
    let manager = CacheManager::with_defaults();

    {
        let _request = manager.begin_unit_of_work();
        let loaded = manager.load_snapshot::<Article>(store.as_ref())?;
        println!("Loaded {} articles into the snapshot", loaded);

        let articles = manager.get_handle::<Article>(store.clone());

        // Example 1: simple filter, answered from memory
        let active = articles.filter(&Filters::new().with("status", "active"))?;
        println!("\nActive articles (cached: {}):", active.is_cached());
        for article in active.fetch()? {
            println!("  #{} {}", article.id, article.title);
        }

        // Example 2: related field, one hop
        let by_ann = articles.filter(&Filters::new().with("author__name__iexact", "ANN"))?;
        println!("\nArticles by ann: {}", by_ann.count()?);

        // Example 3: multi-field ordering, last field is primary
        let ordered = articles.order_by(&["status", "-views"])?;
        println!("\nOrdered by views desc, then status:");
        for article in ordered.fetch()? {
            println!("  {:>4} {:<9} {}", article.views, article.status, article.title);
        }

        // Example 4: regex is not evaluated in memory
        let fallback = articles.filter(&Filters::new().with("title__regex", "^Rust"))?;
        println!("\nRegex filter cached: {}", fallback.is_cached());

        let stats = manager.stats();
        println!(
            "\nCache stats: {} hits, {} misses, {} fallbacks",
            stats.hits(),
            stats.misses(),
            stats.fallbacks()
        );
    }

    println!(
        "\nAfter the unit of work, snapshot loaded: {}",
        manager.is_loaded::<Article>()
    );

    println!("\n=== Example completed! ===");
    Ok(())
}
