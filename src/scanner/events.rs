use serde::Serialize;
use tokio::sync::mpsc;

use super::state::ScanPhase;
use crate::backend::ConnectivityReport;
use crate::error::ScanError;
use crate::models::{WineDetail, WineIdentity};

/// Events the pipeline delivers to the presentation layer. `IdentityResolved`
/// and `DetailReady` fire exactly once per initiating action.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScanEvent {
    PhaseChanged {
        phase: ScanPhase,
    },
    IdentityResolved {
        identity: Option<WineIdentity>,
        error: Option<ScanError>,
        message: Option<String>,
    },
    DetailReady {
        detail: WineDetail,
    },
    ConnectivityChecked {
        report: ConnectivityReport,
    },
}

pub type EventSender = mpsc::UnboundedSender<ScanEvent>;

/// Send without caring whether anyone is still listening; an abandoned
/// receiver just drops the event.
pub(crate) fn emit(events: &EventSender, event: ScanEvent) {
    let _ = events.send(event);
}
