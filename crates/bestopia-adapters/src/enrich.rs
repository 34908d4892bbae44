//! Best-effort product enrichment: an Amazon search-results scrape, proxied
//! through a crawler API so requests survive bot detection.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;

use crate::fetch::{FetchError, HttpClientConfig, HttpFetcher};

const DEFAULT_PROXY_BASE: &str = "https://api.crawlbase.com/";
const AMAZON_SEARCH_BASE: &str = "https://www.amazon.com/s";
const AMAZON_ORIGIN: &str = "https://www.amazon.com";

/// A best-guess image and purchase page for one product name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub image_url: String,
    pub product_page: String,
}

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("invalid url: {0}")]
    Url(String),
    #[error("invalid selector: {0}")]
    Selector(String),
    #[error("no search results in page")]
    NoResults,
    #[error("search result is missing an image or product link")]
    MissingDetails,
}

/// The narrow contract the ingestion pipeline depends on. Possibly slow,
/// possibly failing; the caller treats every failure as advisory.
#[async_trait]
pub trait ProductEnricher: Send + Sync {
    async fn enrich(&self, product_name: &str) -> Result<Enrichment, EnrichError>;
}

pub struct AmazonSearchEnricher {
    http: HttpFetcher,
    proxy_base: String,
    proxy_token: String,
}

impl AmazonSearchEnricher {
    pub fn new(http: HttpFetcher, proxy_token: String) -> Self {
        Self {
            http,
            proxy_base: DEFAULT_PROXY_BASE.to_string(),
            proxy_token,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let timeout_secs: u64 = std::env::var("BESTOPIA_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);
        let http = HttpFetcher::new(HttpClientConfig {
            timeout: std::time::Duration::from_secs(timeout_secs),
            user_agent: Some(
                std::env::var("BESTOPIA_USER_AGENT")
                    .unwrap_or_else(|_| "bestopia-bot/0.1".to_string()),
            ),
        })?;
        let proxy_token = std::env::var("CRAWLER_API_TOKEN").unwrap_or_default();
        Ok(Self::new(http, proxy_token))
    }

    fn search_url(&self, product_name: &str) -> Result<reqwest::Url, EnrichError> {
        let amazon = reqwest::Url::parse_with_params(AMAZON_SEARCH_BASE, [("k", product_name)])
            .map_err(|e| EnrichError::Url(e.to_string()))?;
        reqwest::Url::parse_with_params(
            &self.proxy_base,
            [("token", self.proxy_token.as_str()), ("url", amazon.as_str())],
        )
        .map_err(|e| EnrichError::Url(e.to_string()))
    }
}

#[async_trait]
impl ProductEnricher for AmazonSearchEnricher {
    async fn enrich(&self, product_name: &str) -> Result<Enrichment, EnrichError> {
        let url = self.search_url(product_name)?;
        let html = self.http.fetch_text(url).await?;
        let enrichment = extract_first_result(&html)?;
        debug!(product = product_name, image = %enrichment.image_url, "enriched product");
        Ok(enrichment)
    }
}

/// Pull the first search result's image and product page out of an Amazon
/// search-results page.
pub fn extract_first_result(html: &str) -> Result<Enrichment, EnrichError> {
    let document = Html::parse_document(html);

    let result_sel = parse_selector("[data-component-type=\"s-search-result\"]")?;
    let first = document.select(&result_sel).next().ok_or(EnrichError::NoResults)?;

    let image_sel = parse_selector(".s-image")?;
    let link_sel = parse_selector(".a-link-normal")?;

    let image = first.select(&image_sel).next();
    let image_url = image.and_then(|el| best_image_url(&el));
    let product_page = first
        .select(&link_sel)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(absolute_product_page);

    match (image_url, product_page) {
        (Some(image_url), Some(product_page)) => Ok(Enrichment {
            image_url,
            product_page,
        }),
        _ => Err(EnrichError::MissingDetails),
    }
}

fn parse_selector(selector: &str) -> Result<Selector, EnrichError> {
    Selector::parse(selector).map_err(|e| EnrichError::Selector(e.to_string()))
}

/// Prefer the high-density srcset entry over the plain `src` attribute.
fn best_image_url(image: &ElementRef) -> Option<String> {
    if let Some(srcset) = image.value().attr("srcset") {
        if let Some(url) = pick_from_srcset(srcset) {
            return Some(url);
        }
    }
    image.value().attr("src").map(ToString::to_string)
}

/// Choose the `3x` entry of a srcset when present, else the last (largest)
/// entry.
pub fn pick_from_srcset(srcset: &str) -> Option<String> {
    let mut last = None;
    for part in srcset.split(',') {
        let mut fields = part.split_whitespace();
        let url = fields.next()?;
        let descriptor = fields.next().unwrap_or("");
        if descriptor == "3x" {
            return Some(url.to_string());
        }
        last = Some(url.to_string());
    }
    last
}

/// Absolutize a result link and strip the tracking `/ref=` suffix.
fn absolute_product_page(href: &str) -> String {
    let absolute = if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{AMAZON_ORIGIN}{href}")
    };
    match absolute.find("/ref=") {
        Some(idx) => absolute[..idx].to_string(),
        None => absolute,
    }
}
