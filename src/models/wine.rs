use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Broad style of a wine, as printed on the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WineType {
    Red,
    White,
    Rose,
    Sparkling,
}

impl WineType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "red" => Some(WineType::Red),
            "white" => Some(WineType::White),
            "rosé" | "rose" => Some(WineType::Rose),
            "sparkling" => Some(WineType::Sparkling),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WineType::Red => "red",
            WineType::White => "white",
            WineType::Rose => "rosé",
            WineType::Sparkling => "sparkling",
        }
    }
}

impl std::fmt::Display for WineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for WineType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WineType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        WineType::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown wine type: {raw}")))
    }
}

/// The wine record returned by the label-recognition service.
///
/// Fields are optional because the recognition model returns null for
/// anything it cannot read off the label. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WineIdentity {
    pub name: Option<String>,
    pub winery: Option<String>,
    pub vintage: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub grape_variety: Option<String>,
    pub alcohol_content: Option<String>,
    #[serde(default, with = "wine_type_opt")]
    pub wine_type: Option<WineType>,
    pub description: Option<String>,
    pub confidence: Option<f64>,
}

impl WineIdentity {
    /// Display name used in enrichment requests, which require one.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "Unknown Wine".to_string())
    }

    /// Vintage year, when the label carried a parseable one.
    pub fn vintage_year(&self) -> Option<i32> {
        self.vintage.as_deref().and_then(|v| v.trim().parse().ok())
    }

    /// Fixed demonstration record for the manual test action.
    pub fn demo() -> Self {
        Self {
            name: Some("Sassicaia".to_string()),
            winery: Some("Tenuta San Guido".to_string()),
            vintage: Some("2019".to_string()),
            region: Some("Bolgheri, Tuscany".to_string()),
            country: Some("Italy".to_string()),
            grape_variety: Some("Cabernet Sauvignon".to_string()),
            alcohol_content: Some("14%".to_string()),
            wine_type: Some(WineType::Red),
            description: Some("Iconic Super Tuscan from the Bolgheri coast.".to_string()),
            confidence: Some(1.0),
        }
    }
}

/// Tolerant (de)serialization for the `wine_type` field: the recognition
/// model occasionally emits values outside the four known styles, and those
/// must not fail the whole identity.
mod wine_type_opt {
    use super::WineType;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<WineType>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(wine_type) => serializer.serialize_some(wine_type.as_str()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<WineType>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(WineType::parse))
    }
}

/// Result of one recognition round-trip. Never holds both a value and an
/// error.
#[derive(Debug, Clone)]
pub enum RecognitionOutcome {
    Identified(WineIdentity),
    NotIdentified { reason: String },
    Failed(ScanError),
}

impl RecognitionOutcome {
    pub fn is_identified(&self) -> bool {
        matches!(self, RecognitionOutcome::Identified(_))
    }
}

/// A still frame handed to the recognition service. The embedding camera
/// layer is responsible for downscaling/compressing before handing it over.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub jpeg: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl CapturedFrame {
    pub fn new(jpeg: Vec<u8>) -> Self {
        Self {
            jpeg,
            captured_at: Utc::now(),
        }
    }
}
