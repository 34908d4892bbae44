//! External collaborators behind narrow contracts: HTTP fetching, the
//! product-enrichment scrape, and the LLM drafting client.

pub const CRATE_NAME: &str = "bestopia-adapters";

mod draft;
mod enrich;
mod fetch;

pub use draft::{DraftError, DraftingClient, OpenAiDraftingClient};
pub use enrich::{AmazonSearchEnricher, EnrichError, Enrichment, ProductEnricher};
pub use fetch::{FetchError, HttpClientConfig, HttpFetcher};
