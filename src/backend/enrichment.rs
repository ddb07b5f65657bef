use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

use super::BackendClient;
use crate::error::ScanError;
use crate::models::{TastingNotes, WineIdentity, WinePrice, WineRating};

const RATING_PATH: &str = "/api/v1/wine-rating";
const PRICE_PATH: &str = "/api/v1/wine-price";
const NOTES_PATH: &str = "/api/v1/tasting-notes";

const DEFAULT_CURRENCY: &str = "USD";

/// The three enrichment fetches, each independently fallible. A failed or
/// empty slot is the aggregator's cue to fall back to a local estimate.
#[async_trait]
pub trait EnrichmentSource: Send + Sync {
    async fn fetch_rating(&self, identity: &WineIdentity) -> Result<Option<WineRating>, ScanError>;

    /// Candidate quotes; possibly empty. Selection policy belongs to the
    /// aggregator.
    async fn fetch_price(&self, identity: &WineIdentity) -> Result<Vec<WinePrice>, ScanError>;

    async fn fetch_tasting_notes(
        &self,
        identity: &WineIdentity,
    ) -> Result<Option<TastingNotes>, ScanError>;
}

#[derive(Debug, Serialize)]
struct EnrichmentRequest {
    wine_name: String,
    winery: Option<String>,
    vintage: Option<String>,
    region: Option<String>,
    country: Option<String>,
}

impl EnrichmentRequest {
    fn for_identity(identity: &WineIdentity) -> Self {
        Self {
            wine_name: identity.display_name(),
            winery: identity.winery.clone(),
            vintage: identity.vintage.clone(),
            region: identity.region.clone(),
            country: identity.country.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TastingNotesRequest {
    wine_name: String,
    winery: Option<String>,
    grape_variety: Option<String>,
    wine_type: Option<String>,
    region: Option<String>,
    country: Option<String>,
    vintage: Option<String>,
    alcohol_content: Option<String>,
}

impl TastingNotesRequest {
    fn for_identity(identity: &WineIdentity) -> Self {
        Self {
            wine_name: identity.display_name(),
            winery: identity.winery.clone(),
            grape_variety: identity.grape_variety.clone(),
            wine_type: identity.wine_type.map(|t| t.as_str().to_string()),
            region: identity.region.clone(),
            country: identity.country.clone(),
            vintage: identity.vintage.clone(),
            alcohol_content: identity.alcohol_content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RatingData {
    rating: f64,
    max_rating: Option<f64>,
    source: Option<String>,
}

impl From<RatingData> for WineRating {
    fn from(data: RatingData) -> Self {
        WineRating {
            score: data.rating,
            max_score: data.max_rating.unwrap_or(100.0),
            source: data.source.unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceQuote {
    price: f64,
    currency: Option<String>,
    source: Option<String>,
    url: Option<String>,
}

impl From<PriceQuote> for WinePrice {
    fn from(quote: PriceQuote) -> Self {
        WinePrice {
            amount: quote.price,
            currency: quote.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            source: quote.source.unwrap_or_else(|| "Unknown".to_string()),
            url: quote.url,
        }
    }
}

/// The price endpoint answers in one of three shapes: a full quote list, a
/// pre-selected lowest quote, or a single point estimate.
#[derive(Debug, Deserialize)]
struct PriceData {
    price: Option<f64>,
    currency: Option<String>,
    source: Option<String>,
    url: Option<String>,
    lowest_price: Option<PriceQuote>,
    all_prices: Option<Vec<PriceQuote>>,
}

fn price_candidates(data: PriceData) -> Vec<WinePrice> {
    if let Some(quotes) = data.all_prices {
        if !quotes.is_empty() {
            return quotes.into_iter().map(WinePrice::from).collect();
        }
    }

    if let Some(lowest) = data.lowest_price {
        return vec![WinePrice::from(lowest)];
    }

    match data.price {
        Some(amount) => vec![WinePrice {
            amount,
            currency: data.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            source: data.source.unwrap_or_else(|| "Unknown".to_string()),
            url: data.url,
        }],
        None => Vec::new(),
    }
}

#[derive(Debug, Deserialize)]
struct TastingNotesData {
    tasting_notes: String,
}

#[async_trait]
impl EnrichmentSource for BackendClient {
    async fn fetch_rating(&self, identity: &WineIdentity) -> Result<Option<WineRating>, ScanError> {
        let request = EnrichmentRequest::for_identity(identity);
        let envelope = self
            .post_json::<_, RatingData>(RATING_PATH, &request, self.enrichment_timeout)
            .await?;

        if !envelope.success {
            return Ok(None);
        }
        Ok(envelope.data.map(WineRating::from))
    }

    async fn fetch_price(&self, identity: &WineIdentity) -> Result<Vec<WinePrice>, ScanError> {
        let request = EnrichmentRequest::for_identity(identity);
        let envelope = self
            .post_json::<_, PriceData>(PRICE_PATH, &request, self.enrichment_timeout)
            .await?;

        if !envelope.success {
            return Ok(Vec::new());
        }
        Ok(envelope.data.map(price_candidates).unwrap_or_default())
    }

    async fn fetch_tasting_notes(
        &self,
        identity: &WineIdentity,
    ) -> Result<Option<TastingNotes>, ScanError> {
        let request = TastingNotesRequest::for_identity(identity);
        let envelope = self
            .post_json::<_, TastingNotesData>(NOTES_PATH, &request, self.enrichment_timeout)
            .await?;

        if !envelope.success {
            return Ok(None);
        }

        let notes = envelope.data.map(|data| TastingNotes {
            text: data.tasting_notes,
        });
        if let Some(notes) = &notes {
            info!("received tasting notes ({} chars)", notes.text.len());
        }
        Ok(notes)
    }
}
