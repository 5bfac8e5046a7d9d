//! Demo model shared by the examples

use query_core::{Model, ModelMeta, Value};

#[derive(Debug, Clone)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub status: &'static str,
    pub views: i64,
    pub author_name: Option<String>,
}

impl Article {
    pub fn new(id: i64, title: &str, status: &'static str, views: i64, author: Option<&str>) -> Self {
        Self {
            id,
            title: title.to_string(),
            status,
            views,
            author_name: author.map(str::to_string),
        }
    }
}

impl Model for Article {
    const NAME: &'static str = "Article";

    fn meta() -> ModelMeta<Self> {
        Self::meta_builder()
            .field("id", |a| Value::from(a.id))
            .field("title", |a| Value::from(&a.title))
            .field("status", |a| Value::from(a.status))
            .field("views", |a| Value::from(a.views))
            .field("author_name", |a| Value::from(a.author_name.clone()))
    }
}

/// Sample rows: five articles, three active
pub fn sample_articles() -> Vec<Article> {
    vec![
        Article::new(1, "Rust ownership", "active", 120, Some("ann")),
        Article::new(2, "Async in depth", "draft", 40, Some("bob")),
        Article::new(3, "Lifetimes explained", "active", 75, None),
        Article::new(4, "Trait objects", "archived", 75, Some("ann")),
        Article::new(5, "Unsafe Rust", "active", 300, Some("cy")),
    ]
}
