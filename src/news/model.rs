use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One aggregated news article. Wire names are camelCase to stay compatible
/// with the scraper's JSON output.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub image_url: String,
    pub source: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
    pub category: String,
    pub country: String,
    pub language: String,
    pub sentiment: Option<String>,
    pub scraped_at: Option<DateTime<Utc>>,
}

pub const CATEGORIES: [&str; 8] = [
    "general",
    "business",
    "technology",
    "entertainment",
    "health",
    "science",
    "sports",
    "politics",
];

pub const LANGUAGES: [&str; 5] = ["en", "de", "fr", "ja", "hi"];

/// Country code, display name, and the sources we aggregate for it.
#[derive(Debug, Clone, Serialize)]
pub struct CountryInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub sources: &'static [&'static str],
}

pub const COUNTRIES: [CountryInfo; 8] = [
    CountryInfo { code: "us", name: "United States", sources: &["cnn", "nytimes", "bbc"] },
    CountryInfo { code: "gb", name: "United Kingdom", sources: &["bbc", "guardian", "reuters"] },
    CountryInfo { code: "de", name: "Germany", sources: &["dw", "spiegel"] },
    CountryInfo { code: "fr", name: "France", sources: &["france24", "lemonde"] },
    CountryInfo { code: "in", name: "India", sources: &["timesofindia", "ndtv"] },
    CountryInfo { code: "jp", name: "Japan", sources: &["japantimes", "nhk"] },
    CountryInfo { code: "au", name: "Australia", sources: &["abc", "smh"] },
    CountryInfo { code: "ca", name: "Canada", sources: &["cbc", "globalnews"] },
];

pub fn is_known_category(category: &str) -> bool {
    CATEGORIES.contains(&category)
}
