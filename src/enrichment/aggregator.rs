use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use log::{info, warn};

use super::estimate::{
    estimate_price, estimate_rating, estimate_tasting_notes, EstimateConfig,
};
use crate::backend::EnrichmentSource;
use crate::models::{Enriched, WineDetail, WineIdentity, WinePrice};
use crate::scanner::events::{emit, EventSender, ScanEvent};

/// Fans the three enrichment calls out concurrently, lets each settle on its
/// own, and fills failed or empty slots with deterministic local estimates.
/// The merged record it hands out is always complete.
pub struct EnrichmentAggregator {
    source: Arc<dyn EnrichmentSource>,
    config: EstimateConfig,
    events: EventSender,
}

impl EnrichmentAggregator {
    pub fn new(source: Arc<dyn EnrichmentSource>, events: EventSender) -> Self {
        Self::with_config(source, events, EstimateConfig::default())
    }

    pub fn with_config(
        source: Arc<dyn EnrichmentSource>,
        events: EventSender,
        config: EstimateConfig,
    ) -> Self {
        Self {
            source,
            config,
            events,
        }
    }

    /// Build the full detail record for an identified wine. `seed` drives
    /// the fallback estimators, so a fixed seed reproduces the exact record.
    ///
    /// Emits `DetailReady` exactly once.
    pub async fn enrich(&self, identity: WineIdentity, seed: u64) -> WineDetail {
        let (rating, price, notes) = tokio::join!(
            self.source.fetch_rating(&identity),
            self.source.fetch_price(&identity),
            self.source.fetch_tasting_notes(&identity),
        );

        let rating = match rating {
            Ok(Some(value)) => Enriched::remote(value),
            Ok(None) => {
                info!("no remote rating for {}, estimating", identity.display_name());
                Enriched::estimated(estimate_rating(&identity, &self.config, seed))
            }
            Err(err) => {
                warn!("rating fetch failed ({err}), estimating");
                Enriched::estimated(estimate_rating(&identity, &self.config, seed))
            }
        };

        let reference_year = Utc::now().year();
        let price = match price.map(select_lowest) {
            Ok(Some(quote)) => Enriched::remote(quote),
            Ok(None) => {
                info!("no remote price for {}, estimating", identity.display_name());
                Enriched::estimated(estimate_price(&identity, &self.config, seed, reference_year))
            }
            Err(err) => {
                warn!("price fetch failed ({err}), estimating");
                Enriched::estimated(estimate_price(&identity, &self.config, seed, reference_year))
            }
        };

        let tasting_notes = match notes {
            Ok(Some(value)) if !value.text.trim().is_empty() => Enriched::remote(value),
            Ok(_) => {
                info!("no remote tasting notes for {}", identity.display_name());
                Enriched::estimated(estimate_tasting_notes(&identity))
            }
            Err(err) => {
                warn!("tasting notes fetch failed ({err})");
                Enriched::estimated(estimate_tasting_notes(&identity))
            }
        };

        let detail = WineDetail {
            identity,
            rating,
            price,
            tasting_notes,
        };

        emit(&self.events, ScanEvent::DetailReady {
            detail: detail.clone(),
        });

        detail
    }
}

/// Lowest candidate by amount; ties keep the earlier quote.
fn select_lowest(mut quotes: Vec<WinePrice>) -> Option<WinePrice> {
    quotes.sort_by(|a, b| a.amount.partial_cmp(&b.amount).unwrap_or(Ordering::Equal));
    quotes.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::models::{Provenance, TastingNotes, WineRating, WineType};
    use async_trait::async_trait;
    use std::time::{Duration, Instant};
    use tokio::sync::mpsc;

    #[derive(Clone)]
    struct StubSource {
        rating: Result<Option<WineRating>, ScanError>,
        price: Result<Vec<WinePrice>, ScanError>,
        notes: Result<Option<TastingNotes>, ScanError>,
        delay: Duration,
    }

    impl StubSource {
        fn failing() -> Self {
            Self {
                rating: Err(ScanError::Timeout),
                price: Err(ScanError::NetworkUnreachable),
                notes: Err(ScanError::Server(500)),
                delay: Duration::ZERO,
            }
        }

        fn succeeding() -> Self {
            Self {
                rating: Ok(Some(WineRating {
                    score: 4.2,
                    max_score: 5.0,
                    source: "Vivino".to_string(),
                })),
                price: Ok(vec![
                    quote(38.0, "Wine.com"),
                    quote(32.5, "Total Wine"),
                    quote(35.0, "Wine-Searcher"),
                ]),
                notes: Ok(Some(TastingNotes {
                    text: "Blackberry and cedar with a long finish.".to_string(),
                })),
                delay: Duration::ZERO,
            }
        }
    }

    fn quote(amount: f64, source: &str) -> WinePrice {
        WinePrice {
            amount,
            currency: "USD".to_string(),
            source: source.to_string(),
            url: None,
        }
    }

    #[async_trait]
    impl EnrichmentSource for StubSource {
        async fn fetch_rating(
            &self,
            _identity: &WineIdentity,
        ) -> Result<Option<WineRating>, ScanError> {
            if self.rating.is_ok() {
                tokio::time::sleep(self.delay).await;
            }
            self.rating.clone()
        }

        async fn fetch_price(&self, _identity: &WineIdentity) -> Result<Vec<WinePrice>, ScanError> {
            if self.price.is_ok() {
                tokio::time::sleep(self.delay).await;
            }
            self.price.clone()
        }

        async fn fetch_tasting_notes(
            &self,
            _identity: &WineIdentity,
        ) -> Result<Option<TastingNotes>, ScanError> {
            if self.notes.is_ok() {
                tokio::time::sleep(self.delay).await;
            }
            self.notes.clone()
        }
    }

    fn margaux() -> WineIdentity {
        WineIdentity {
            name: Some("Château Margaux".to_string()),
            winery: Some("Château Margaux".to_string()),
            vintage: Some("2010".to_string()),
            region: Some("Margaux, Bordeaux".to_string()),
            country: Some("France".to_string()),
            grape_variety: Some("Cabernet Sauvignon".to_string()),
            alcohol_content: None,
            wine_type: Some(WineType::Red),
            description: None,
            confidence: Some(0.95),
        }
    }

    fn build_aggregator(source: StubSource) -> (EnrichmentAggregator, mpsc::UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EnrichmentAggregator::new(Arc::new(source), tx), rx)
    }

    #[tokio::test]
    async fn all_slots_failing_yields_complete_estimated_record() {
        let (aggregator, mut events) = build_aggregator(StubSource::failing());

        let detail = aggregator.enrich(margaux(), 42).await;

        assert_eq!(detail.rating.provenance, Provenance::Estimated);
        assert!((75.0..=95.0).contains(&detail.rating.value.score));

        // 25 * 2.5 (Bordeaux) = 62.5, optionally * 1.3 for an aged vintage,
        // then jitter in [0.8, 1.2]: always within [50, 97.5].
        assert_eq!(detail.price.provenance, Provenance::Estimated);
        assert!((50.0..=97.5).contains(&detail.price.value.amount));
        assert_eq!(detail.price.value.currency, "USD");

        assert_eq!(detail.tasting_notes.provenance, Provenance::Estimated);
        assert!(detail.tasting_notes.value.text.contains("blackcurrant"));

        match events.try_recv().unwrap() {
            ScanEvent::DetailReady { detail: emitted } => assert_eq!(emitted, detail),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(events.try_recv().is_err(), "DetailReady must fire once");
    }

    #[tokio::test]
    async fn enrichment_is_reproducible_for_a_fixed_seed() {
        let (aggregator, _events) = build_aggregator(StubSource::failing());
        let first = aggregator.enrich(margaux(), 7).await;
        let second = aggregator.enrich(margaux(), 7).await;
        assert_eq!(first.rating, second.rating);
        assert_eq!(first.price, second.price);
        assert_eq!(first.tasting_notes, second.tasting_notes);
    }

    #[tokio::test]
    async fn single_failed_slot_does_not_taint_the_others() {
        let mut source = StubSource::succeeding();
        source.rating = Err(ScanError::Timeout);
        let (aggregator, _events) = build_aggregator(source);

        let detail = aggregator.enrich(margaux(), 1).await;

        assert_eq!(detail.rating.provenance, Provenance::Estimated);
        assert_eq!(detail.price.provenance, Provenance::Remote);
        assert_eq!(detail.tasting_notes.provenance, Provenance::Remote);
    }

    #[tokio::test]
    async fn remote_price_selection_picks_the_lowest_quote() {
        let (aggregator, _events) = build_aggregator(StubSource::succeeding());
        let detail = aggregator.enrich(margaux(), 1).await;

        assert_eq!(detail.price.provenance, Provenance::Remote);
        assert_eq!(detail.price.value.amount, 32.5);
        assert_eq!(detail.price.value.source, "Total Wine");
    }

    #[tokio::test]
    async fn slow_slots_settle_concurrently_and_failures_do_not_serialize() {
        let mut source = StubSource::succeeding();
        source.delay = Duration::from_millis(80);
        source.rating = Err(ScanError::Timeout);
        let (aggregator, _events) = build_aggregator(source);

        let start = Instant::now();
        let detail = aggregator.enrich(margaux(), 1).await;
        let elapsed = start.elapsed();

        // Two slots sleep 80ms each; run serially that is 160ms+. The
        // instant rating failure must not push the total past one sleep.
        assert!(elapsed < Duration::from_millis(200), "took {elapsed:?}");
        assert_eq!(detail.rating.provenance, Provenance::Estimated);
        assert_eq!(detail.price.provenance, Provenance::Remote);
    }

    #[test]
    fn select_lowest_handles_empty_and_ties() {
        assert_eq!(select_lowest(Vec::new()), None);
        let picked = select_lowest(vec![quote(20.0, "A"), quote(20.0, "B"), quote(25.0, "C")]);
        assert_eq!(picked.unwrap().source, "A");
    }
}
