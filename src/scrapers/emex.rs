//! emex.ru specific scraper implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use tracing::{error, info, warn};

use crate::config::{Credentials, Settings};
use crate::decoder::VinDecoder;
use crate::error::{ParserError, Result};
use crate::extraction::{EntityTable, Extractor, FieldRule, Locator};
use crate::models::{DetailResult, SearchResult};
use crate::traits::{PartsCatalog, ScraperConfig, SiteSelectors};

pub const PAGE_TIMEOUT: Duration = Duration::from_secs(30);
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Built-in strategy tables for the emex.ru markup.
///
/// The site's markup is not documented and changes; deployments that see
/// empty results should supply their own tables via `EMEX_SELECTORS_FILE`.
pub fn default_selectors() -> SiteSelectors {
    let by_title = |title: &str| Locator::tag_attr("td", "data-title", title);

    SiteSelectors {
        listings: EntityTable {
            containers: vec![
                Locator::tag_class("div", "part-item"),
                Locator::tag_class("tr", "search-row"),
                Locator::tag_attr("div", "data-type", "part"),
            ],
            fields: vec![
                FieldRule::new("article", vec![Locator::class("article"), by_title("Артикул")]),
                FieldRule::new("name", vec![Locator::class("name"), Locator::class("part-name")]),
                FieldRule::new("price", vec![Locator::class("price"), by_title("Цена")]),
                FieldRule::new("availability", vec![Locator::class("availability"), by_title("Наличие")]),
                FieldRule::new("manufacturer", vec![Locator::class("manufacturer"), Locator::class("brand")]),
                FieldRule::new("delivery_time", vec![Locator::class("delivery"), by_title("Срок")]),
            ],
        },
        offers: EntityTable {
            containers: vec![
                Locator::tag_class("div", "offer-item"),
                Locator::tag_class("tr", "offer-row"),
                Locator::tag_attr("div", "data-type", "offer"),
            ],
            fields: vec![
                FieldRule::new("price", vec![Locator::class("price"), by_title("Цена")]),
                FieldRule::new("availability", vec![Locator::class("availability"), by_title("Наличие")]),
                FieldRule::new("warehouse", vec![Locator::class("warehouse"), by_title("Склад")]),
                FieldRule::new("delivery_time", vec![Locator::class("delivery"), by_title("Срок")]),
            ],
        },
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("ru-RU,ru;q=0.9,en;q=0.8"));
    headers
}

/// Scraper implementation for emex.ru
///
/// Owns the cookie-keeping session client. Instances are never mutated once
/// shared; re-authentication builds a fresh one.
pub struct EmexScraper {
    client: Client,
    decoder: VinDecoder,
    config: ScraperConfig,
    extractor: Extractor,
    credentials: Option<Credentials>,
    authenticated: bool,
}

impl EmexScraper {
    /// Create a scraper from settings. `credentials` replaces the configured
    /// pair when given.
    pub fn new(settings: &Settings, credentials: Option<Credentials>) -> Result<Self> {
        let config = ScraperConfig {
            name: "emex.ru".to_string(),
            base_url: settings.base_url.clone(),
            search_path_pattern: "/search/vin/{vin}".to_string(),
            article_path_pattern: "/search/articles/{article}".to_string(),
            login_path: "/auth/login".to_string(),
            selectors: settings.selectors.clone(),
        };

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .cookie_store(true)
            .build()?;

        let decoder = VinDecoder::new(Client::builder().build()?, settings.decode_url_pattern.clone());
        let extractor = Extractor::new(&config.selectors)?;

        Ok(Self {
            client,
            decoder,
            config,
            extractor,
            credentials: credentials.or_else(|| settings.credentials.clone()),
            authenticated: false,
        })
    }

    pub fn decoder(&self) -> &VinDecoder {
        &self.decoder
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Best-effort login: one form POST, success iff the site answers 200.
    /// The session cookie lands in the client's cookie store.
    pub async fn authenticate(&mut self) -> bool {
        let Some(credentials) = &self.credentials else {
            warn!("No credentials provided - working without authentication");
            return false;
        };

        let form = [
            ("login", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];

        let response = self
            .client
            .post(self.build_login_url())
            .form(&form)
            .timeout(PAGE_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                info!("Authenticated on {}", self.config.name);
                self.authenticated = true;
            }
            Ok(response) => {
                error!("Authentication failed: {}", response.status());
            }
            Err(e) => {
                error!("Error during authentication: {}", e);
            }
        }

        self.authenticated
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        info!("Fetching {}", url);

        let response = self.client.get(url).timeout(PAGE_TIMEOUT).send().await?;

        if !response.status().is_success() {
            warn!("Failed to fetch {}: {}", url, response.status());
            return Err(ParserError::Upstream {
                status: response.status().as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PartsCatalog for EmexScraper {
    fn config(&self) -> &ScraperConfig {
        &self.config
    }

    async fn search_parts(&self, vin: &str, part_name: Option<&str>) -> Result<SearchResult> {
        let vehicle_info = self.decoder.decode(vin).await?;

        let url = self.build_search_url(vin, part_name);
        let html = self.fetch_page(&url).await?;
        let parts = self.extractor.extract_listings(&html);

        info!("Found {} parts for {} on {}", parts.len(), vin, self.config.name);
        Ok(SearchResult::new(vin.to_string(), vehicle_info, parts))
    }

    async fn get_part_details(&self, article: &str) -> Result<DetailResult> {
        let url = self.build_article_url(article);
        let html = self.fetch_page(&url).await?;
        let offers = self.extractor.extract_offers(&html);

        info!("Found {} offers for article {}", offers.len(), article);
        Ok(DetailResult {
            article: article.to_string(),
            offers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingsOverrides;

    fn scraper() -> EmexScraper {
        let overrides = SettingsOverrides {
            base_url: Some("https://emex.example".to_string()),
            ..SettingsOverrides::default()
        };
        let settings = Settings::resolve_with(overrides, |_| None).unwrap();
        EmexScraper::new(&settings, None).unwrap()
    }

    #[test]
    fn search_url_carries_optional_query() {
        let scraper = scraper();

        assert_eq!(
            scraper.build_search_url("1HGCM82633A004352", None),
            "https://emex.example/search/vin/1HGCM82633A004352"
        );
        assert_eq!(
            scraper.build_search_url("1HGCM82633A004352", Some("масляный фильтр")),
            "https://emex.example/search/vin/1HGCM82633A004352?query=%D0%BC%D0%B0%D1%81%D0%BB%D1%8F%D0%BD%D1%8B%D0%B9%20%D1%84%D0%B8%D0%BB%D1%8C%D1%82%D1%80"
        );
        assert_eq!(
            scraper.build_search_url("1HGCM82633A004352", Some("  ")),
            "https://emex.example/search/vin/1HGCM82633A004352"
        );
    }

    #[test]
    fn urls_follow_the_configured_base() {
        let scraper = scraper();

        assert_eq!(scraper.config().base_url, "https://emex.example");
        assert_eq!(scraper.build_login_url(), "https://emex.example/auth/login");
    }

    #[test]
    fn article_url_is_encoded() {
        assert_eq!(
            scraper().build_article_url("15208 65F0E/A"),
            "https://emex.example/search/articles/15208%2065F0E%2FA"
        );
    }

    #[test]
    fn default_tables_compile() {
        assert!(Extractor::new(&default_selectors()).is_ok());
    }

    #[tokio::test]
    async fn authenticate_without_credentials_is_false() {
        let mut scraper = scraper();
        assert!(!scraper.authenticate().await);
        assert!(!scraper.is_authenticated());
    }
}
