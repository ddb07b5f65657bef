pub mod detail;
pub mod wine;

pub use detail::{Enriched, Provenance, TastingNotes, WineDetail, WinePrice, WineRating};
pub use wine::{CapturedFrame, RecognitionOutcome, WineIdentity, WineType};
