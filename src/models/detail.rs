use serde::{Deserialize, Serialize};

use super::wine::WineIdentity;

/// Where a detail field came from: a remote source, or the local fallback
/// estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Provenance {
    Remote,
    Estimated,
}

/// A detail value tagged with its provenance. The merged detail record only
/// ever exposes values through this wrapper, never a raw failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enriched<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T> Enriched<T> {
    pub fn remote(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Remote,
        }
    }

    pub fn estimated(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Estimated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WineRating {
    pub score: f64,
    pub max_score: f64,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinePrice {
    pub amount: f64,
    /// ISO currency code, e.g. "USD".
    pub currency: String,
    pub source: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TastingNotes {
    pub text: String,
}

/// The merged detail record for one identified wine. Every field is present:
/// slots the remote sources could not fill carry estimated values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WineDetail {
    pub identity: WineIdentity,
    pub rating: Enriched<WineRating>,
    pub price: Enriched<WinePrice>,
    pub tasting_notes: Enriched<TastingNotes>,
}
