pub mod aggregator;
pub mod estimate;

pub use aggregator::EnrichmentAggregator;
pub use estimate::{estimate_price, estimate_rating, estimate_tasting_notes, EstimateConfig};
