//! Traits and interfaces for site-agnostic part scraping

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extraction::EntityTable;
use crate::models::{DetailResult, SearchResult};

/// Configuration for a parts site scraper
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Display name for the website
    pub name: String,
    /// Base URL for the website
    pub base_url: String,
    /// Search path pattern with {vin} placeholder, relative to `base_url`
    pub search_path_pattern: String,
    /// Article page path pattern with {article} placeholder, relative to `base_url`
    pub article_path_pattern: String,
    /// Login form path, relative to `base_url`
    pub login_path: String,
    /// Strategy tables for extracting data
    pub selectors: SiteSelectors,
}

/// Strategy tables for the two kinds of pages the site serves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSelectors {
    /// Search result rows
    pub listings: EntityTable,
    /// Seller offers on an article page
    pub offers: EntityTable,
}

/// Trait for site-specific part scrapers
#[async_trait]
pub trait PartsCatalog: Send + Sync {
    /// Get the configuration for this scraper
    fn config(&self) -> &ScraperConfig;

    /// Decode the VIN, then scrape listings for it
    ///
    /// # Arguments
    /// * `vin` - 17-character VIN, already case-normalized
    /// * `part_name` - Optional free-text filter forwarded to the site
    async fn search_parts(&self, vin: &str, part_name: Option<&str>) -> Result<SearchResult>;

    /// Scrape the offers for one article
    async fn get_part_details(&self, article: &str) -> Result<DetailResult>;

    /// Build the listing search URL for a VIN
    ///
    /// # Returns
    /// * `String` - The complete search URL, with `query` appended when a part name is given
    fn build_search_url(&self, vin: &str, part_name: Option<&str>) -> String {
        let config = self.config();
        let mut url = format!(
            "{}{}",
            config.base_url,
            config.search_path_pattern.replace("{vin}", &urlencoding::encode(vin))
        );

        if let Some(part_name) = part_name.map(str::trim).filter(|p| !p.is_empty()) {
            let separator = if url.contains('?') { '&' } else { '?' };
            url.push(separator);
            url.push_str("query=");
            url.push_str(&urlencoding::encode(part_name));
        }

        url
    }

    /// Build the offers page URL for an article
    fn build_article_url(&self, article: &str) -> String {
        let config = self.config();
        format!(
            "{}{}",
            config.base_url,
            config.article_path_pattern.replace("{article}", &urlencoding::encode(article))
        )
    }

    /// Build the login form URL
    fn build_login_url(&self) -> String {
        let config = self.config();
        format!("{}{}", config.base_url, config.login_path)
    }
}
