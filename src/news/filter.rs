use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::model::Article;

/// Hard cap on any article page. A free-text term that would only match
/// article 101 in recency order is invisible; known limitation, carried
/// over from the source system.
pub const MAX_RESULTS: i64 = 100;

/// Structured article filter. Everything except `query` is pushed down to
/// the store; `query` is applied in-process on the fetched page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleFilter {
    pub country: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub source: Option<String>,
    pub query: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Case-insensitive substring match over title, description, and content.
/// Explicitly not full-text search.
pub fn matches_query(article: &Article, query: &str) -> bool {
    let needle = query.to_lowercase();
    article.title.to_lowercase().contains(&needle)
        || article.description.to_lowercase().contains(&needle)
        || article.content.to_lowercase().contains(&needle)
}

/// Apply the free-text term (if any) to an already-fetched page.
pub fn apply_query(articles: Vec<Article>, query: Option<&str>) -> Vec<Article> {
    match query {
        Some(q) if !q.trim().is_empty() => {
            let q = q.trim();
            articles.into_iter().filter(|a| matches_query(a, q)).collect()
        }
        _ => articles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(title: &str, description: &str, content: &str) -> Article {
        Article {
            id: "x".into(),
            title: title.into(),
            description: description.into(),
            content: content.into(),
            url: String::new(),
            image_url: String::new(),
            source: "test".into(),
            author: "test".into(),
            published_at: Utc::now(),
            category: "general".into(),
            country: "us".into(),
            language: "en".into(),
            sentiment: None,
            scraped_at: None,
        }
    }

    #[test]
    fn test_query_matches_any_text_field() {
        let a = article("Markets rally", "Stocks climb", "A broad rebound");
        assert!(matches_query(&a, "rally"));
        assert!(matches_query(&a, "climb"));
        assert!(matches_query(&a, "rebound"));
        assert!(!matches_query(&a, "cricket"));
    }

    #[test]
    fn test_query_is_case_insensitive() {
        let a = article("Quantum Breakthrough", "", "");
        assert!(matches_query(&a, "QUANTUM"));
        assert!(matches_query(&a, "breakthrough"));
    }

    #[test]
    fn test_apply_query_blank_term_is_passthrough() {
        let page = vec![article("one", "", ""), article("two", "", "")];
        assert_eq!(apply_query(page.clone(), None).len(), 2);
        assert_eq!(apply_query(page.clone(), Some("  ")).len(), 2);
        assert_eq!(apply_query(page, Some("one")).len(), 1);
    }
}
