pub mod controller;
pub mod events;
pub(crate) mod loop_worker;
pub mod source;
pub mod state;

pub use controller::ScanController;
pub use events::{EventSender, ScanEvent};
pub use source::FrameSource;
pub use state::{ScanPhase, ScanSession, ScanSnapshot};
