#![allow(dead_code)]

use chrono::NaiveDate;
use query_core::{Model, ModelMeta, Value};
use query_storage::MemoryStore;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub status: &'static str,
    pub views: i64,
    pub published: Option<NaiveDate>,
    pub author_name: Option<String>,
    /// Two relationships away; only the store resolves it
    pub author_team_name: &'static str,
}

impl Model for Article {
    const NAME: &'static str = "Article";

    fn meta() -> ModelMeta<Self> {
        Self::meta_builder()
            .field("id", |a| Value::from(a.id))
            .field("title", |a| Value::from(&a.title))
            .field("status", |a| Value::from(a.status))
            .field("views", |a| Value::from(a.views))
            .field("published", |a| Value::from(a.published))
            .field("author_name", |a| Value::from(a.author_name.clone()))
            .field("author_team_name", |a| Value::from(a.author_team_name))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn article(
    id: i64,
    title: &str,
    status: &'static str,
    views: i64,
    published: Option<NaiveDate>,
    author_name: Option<&str>,
    author_team_name: &'static str,
) -> Article {
    Article {
        id,
        title: title.to_string(),
        status,
        views,
        published,
        author_name: author_name.map(str::to_string),
        author_team_name,
    }
}

/// Five articles, three of them active
pub fn articles() -> Vec<Article> {
    vec![
        article(1, "Rust ownership", "active", 120, Some(date(2024, 1, 15)), Some("ann"), "core"),
        article(2, "Async in depth", "draft", 40, None, Some("bob"), "infra"),
        article(3, "Lifetimes explained", "active", 75, Some(date(2024, 2, 3)), None, "core"),
        article(4, "Trait objects", "archived", 75, Some(date(2023, 11, 20)), Some("ann"), "docs"),
        article(5, "Unsafe Rust", "active", 300, Some(date(2024, 2, 29)), Some("cy"), "infra"),
    ]
}

pub fn store() -> Arc<MemoryStore<Article>> {
    Arc::new(MemoryStore::new().with_rows(articles()))
}

pub fn ids(rows: &[Arc<Article>]) -> Vec<i64> {
    rows.iter().map(|a| a.id).collect()
}
