//! Wine-label recognition and enrichment engine.
//!
//! The embedding app supplies a [`FrameSource`] and an event channel, points
//! a [`ScanController`] at a recognition backend, and receives a
//! [`ScanEvent::IdentityResolved`] once a label is identified. Feeding that
//! identity to the [`EnrichmentAggregator`] produces a complete
//! [`models::WineDetail`]: rating, price, and tasting notes, each fetched
//! remotely when possible and estimated locally otherwise.

pub mod backend;
pub mod enrichment;
pub mod error;
pub mod models;
pub mod scanner;
pub mod settings;

pub use backend::{BackendClient, ConnectivityProbe, ConnectivityReport, EnrichmentSource, LabelRecognizer};
pub use enrichment::{EnrichmentAggregator, EstimateConfig};
pub use error::ScanError;
pub use models::{
    CapturedFrame, Enriched, Provenance, RecognitionOutcome, TastingNotes, WineDetail,
    WineIdentity, WinePrice, WineRating, WineType,
};
pub use scanner::{
    EventSender, FrameSource, ScanController, ScanEvent, ScanPhase, ScanSnapshot,
};
pub use settings::{EngineSettings, SettingsStore};
