use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{TastingNotes, WineIdentity, WinePrice, WineRating};

const BASE_RATING: f64 = 85.0;
const PRESTIGIOUS_REGION_BONUS: f64 = 5.0;
const PREMIUM_GRAPE_BONUS: f64 = 3.0;
const RATING_FLOOR: f64 = 75.0;
const RATING_CEILING: f64 = 95.0;
const RATING_SOURCE: &str = "Expert Estimate";

const BASE_PRICE: f64 = 25.0;
const EXPENSIVE_REGION_MULTIPLIER: f64 = 2.5;
const MID_TIER_REGION_MULTIPLIER: f64 = 1.5;
const AGED_VINTAGE_MULTIPLIER: f64 = 1.3;
const AGED_VINTAGE_YEARS: i32 = 5;
const PRICE_SOURCE: &str = "Market Estimate";

/// Grape variety profiles used when no remote tasting notes are available.
/// The first entry is the reference profile for unknown varieties.
const GRAPE_PROFILES: &[(&str, &str)] = &[
    (
        "sangiovese",
        "Medium-bodied with bright acidity and firm tannins. Notes of cherry, plum, and herbs \
         with earthy undertones. The finish is persistent with hints of leather and tobacco.",
    ),
    (
        "cabernet sauvignon",
        "Full-bodied with structured tannins and dark fruit flavors. Aromas of blackcurrant, \
         cedar, and vanilla with a long, elegant finish showing notes of chocolate and spice.",
    ),
    (
        "pinot noir",
        "Light to medium-bodied with silky tannins. Delicate aromas of red cherry, strawberry, \
         and violet with earthy minerality. The finish is smooth and refined.",
    ),
    (
        "chardonnay",
        "Medium to full-bodied with balanced acidity. Flavors of green apple, citrus, and \
         mineral notes. Creamy texture with a clean, refreshing finish.",
    ),
    (
        "merlot",
        "Medium to full-bodied with soft tannins. Rich flavors of black cherry, plum, and \
         chocolate with hints of herbs and vanilla. Smooth, approachable finish.",
    ),
];

/// Region and grape sets driving the estimators, matched as lowercase
/// substrings of the identity's free-text fields.
#[derive(Debug, Clone)]
pub struct EstimateConfig {
    pub prestigious_regions: Vec<String>,
    pub premium_grapes: Vec<String>,
    pub expensive_regions: Vec<String>,
    pub mid_tier_regions: Vec<String>,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            prestigious_regions: owned(&[
                "bordeaux",
                "burgundy",
                "napa valley",
                "chianti classico",
                "barolo",
                "rioja",
            ]),
            premium_grapes: owned(&["cabernet sauvignon", "pinot noir", "chardonnay", "sangiovese"]),
            expensive_regions: owned(&["bordeaux", "burgundy", "napa", "champagne"]),
            mid_tier_regions: owned(&["chianti", "rioja", "rhone"]),
        }
    }
}

fn matches_any(text: &Option<String>, set: &[String]) -> bool {
    let Some(text) = text else {
        return false;
    };
    let text = text.to_lowercase();
    set.iter().any(|entry| text.contains(entry.as_str()))
}

/// Estimate a rating from the identity's static attributes. Deterministic
/// for a given identity and seed; the result always lands in
/// [`RATING_FLOOR`, `RATING_CEILING`].
pub fn estimate_rating(identity: &WineIdentity, config: &EstimateConfig, seed: u64) -> WineRating {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut score = BASE_RATING;
    if matches_any(&identity.region, &config.prestigious_regions) {
        score += PRESTIGIOUS_REGION_BONUS;
    }
    if matches_any(&identity.grape_variety, &config.premium_grapes) {
        score += PREMIUM_GRAPE_BONUS;
    }
    score += rng.gen_range(-4..=4) as f64;

    WineRating {
        score: score.clamp(RATING_FLOOR, RATING_CEILING),
        max_score: 100.0,
        source: RATING_SOURCE.to_string(),
    }
}

/// Estimate a price in USD. `reference_year` stands in for "today" so the
/// vintage-age adjustment stays a pure function of its inputs.
pub fn estimate_price(
    identity: &WineIdentity,
    config: &EstimateConfig,
    seed: u64,
    reference_year: i32,
) -> WinePrice {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut amount = BASE_PRICE;
    if matches_any(&identity.region, &config.expensive_regions) {
        amount *= EXPENSIVE_REGION_MULTIPLIER;
    } else if matches_any(&identity.region, &config.mid_tier_regions) {
        amount *= MID_TIER_REGION_MULTIPLIER;
    }

    if let Some(year) = identity.vintage_year() {
        if reference_year - year > AGED_VINTAGE_YEARS {
            amount *= AGED_VINTAGE_MULTIPLIER;
        }
    }

    amount *= rng.gen_range(0.8..=1.2);

    WinePrice {
        amount: amount.round(),
        currency: "USD".to_string(),
        source: PRICE_SOURCE.to_string(),
        url: None,
    }
}

/// Look up tasting notes for the identity's grape variety. Total: unknown or
/// missing varieties fall back to the reference profile.
pub fn estimate_tasting_notes(identity: &WineIdentity) -> TastingNotes {
    let grape = identity
        .grape_variety
        .as_deref()
        .map(|g| g.trim().to_lowercase())
        .unwrap_or_default();

    let text = GRAPE_PROFILES
        .iter()
        .find(|(variety, _)| *variety == grape)
        .map(|(_, profile)| *profile)
        .unwrap_or(GRAPE_PROFILES[0].1);

    TastingNotes {
        text: text.to_string(),
    }
}
