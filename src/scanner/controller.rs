use anyhow::{bail, Result};
use chrono::Utc;
use log::info;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::events::{emit, EventSender, ScanEvent};
use super::loop_worker::{capture_and_recognize, scan_loop, ScanContext};
use super::source::FrameSource;
use super::state::{ScanPhase, ScanSession, ScanSnapshot};
use crate::backend::{ConnectivityProbe, ConnectivityReport, LabelRecognizer};
use crate::models::{CapturedFrame, WineIdentity};
use crate::settings::EngineSettings;

/// Owns the scan-session state machine and the periodic capture loop.
/// `start`/`stop` follow the capture screen's focus; everything else is a
/// user action relayed by the presentation layer.
pub struct ScanController {
    ctx: ScanContext,
    probe: Arc<dyn ConnectivityProbe>,
    worker: Mutex<Option<JoinHandle<()>>>,
    cancel_token: Mutex<Option<CancellationToken>>,
}

impl ScanController {
    pub fn new(
        recognizer: Arc<dyn LabelRecognizer>,
        frames: Arc<dyn FrameSource>,
        probe: Arc<dyn ConnectivityProbe>,
        events: EventSender,
        settings: &EngineSettings,
    ) -> Self {
        Self {
            ctx: ScanContext {
                session: Arc::new(Mutex::new(ScanSession::new())),
                recognizer,
                frames,
                events,
                capture_interval: settings.capture_interval(),
                cooldown: settings.recognition_cooldown(),
                recognition_timeout: settings.recognition_timeout(),
            },
            probe,
            worker: Mutex::new(None),
            cancel_token: Mutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> ScanSnapshot {
        self.ctx.session.lock().await.snapshot()
    }

    /// Capture screen gained focus (camera permission already granted).
    pub async fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            bail!("scanning already active");
        }

        {
            let mut session = self.ctx.session.lock().await;
            session.activate(Utc::now());
            info!("scan session {} started", session.id.as_deref().unwrap_or("?"));
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(scan_loop(self.ctx.clone(), cancel_token.clone()));
        *worker = Some(handle);
        *self.cancel_token.lock().await = Some(cancel_token);

        self.emit_phase(ScanPhase::Scanning);
        Ok(())
    }

    /// Capture screen lost focus. Cancels the periodic loop and bumps the
    /// session generation so an in-flight recognition result is discarded on
    /// arrival.
    pub async fn stop(&self) {
        let handle = self.worker.lock().await.take();
        if let Some(token) = self.cancel_token.lock().await.take() {
            token.cancel();
        }
        if let Some(handle) = handle {
            handle.abort();
        }

        {
            let mut session = self.ctx.session.lock().await;
            session.deactivate();
        }

        info!("scan session stopped");
        self.emit_phase(ScanPhase::Idle);
    }

    pub async fn pause(&self) {
        let phase = {
            let mut session = self.ctx.session.lock().await;
            session.pause();
            session.phase
        };
        self.emit_phase(phase);
    }

    /// Resume periodic scanning, both from an explicit pause and from the
    /// hold after a successful identification.
    pub async fn resume(&self) {
        let phase = {
            let mut session = self.ctx.session.lock().await;
            session.resume();
            session.phase
        };
        self.emit_phase(phase);
    }

    pub async fn open_menu(&self) {
        let phase = {
            let mut session = self.ctx.session.lock().await;
            session.open_menu();
            session.phase
        };
        self.emit_phase(phase);
    }

    pub async fn close_menu(&self) {
        let phase = {
            let mut session = self.ctx.session.lock().await;
            session.close_menu();
            session.phase
        };
        self.emit_phase(phase);
    }

    /// Manual "take photo now". Bypasses the periodic timer but still obeys
    /// the single-in-flight invariant.
    pub async fn capture_now(&self) -> Result<()> {
        let generation = self.claim_capture_slot().await?;
        capture_and_recognize(&self.ctx, None, generation).await;
        Ok(())
    }

    /// Recognize an externally supplied image (gallery pick).
    pub async fn submit_image(&self, jpeg: Vec<u8>) -> Result<()> {
        let generation = self.claim_capture_slot().await?;
        capture_and_recognize(&self.ctx, Some(CapturedFrame::new(jpeg)), generation).await;
        Ok(())
    }

    /// Probe backend reachability and report it. Holds the busy slot for the
    /// duration so it cannot interleave with a capture.
    pub async fn check_connectivity(&self) -> Result<ConnectivityReport> {
        let generation = {
            let mut session = self.ctx.session.lock().await;
            if session.phase == ScanPhase::Idle {
                bail!("scanner is not active");
            }
            if session.busy {
                bail!("another action is already in flight");
            }
            session.begin_task()
        };

        let report = self.probe.check_health().await;

        {
            let mut session = self.ctx.session.lock().await;
            if session.is_current(generation) {
                session.finish_task();
            }
        }

        emit(
            &self.ctx.events,
            ScanEvent::ConnectivityChecked {
                report: report.clone(),
            },
        );
        Ok(report)
    }

    /// Surface the fixed demonstration record as if it had been scanned.
    pub async fn load_demo(&self) -> Result<()> {
        {
            let mut session = self.ctx.session.lock().await;
            if session.phase == ScanPhase::Idle {
                bail!("scanner is not active");
            }
            if session.busy {
                bail!("another action is already in flight");
            }
            session.begin_task();
            session.settle(true);
        }

        emit(
            &self.ctx.events,
            ScanEvent::IdentityResolved {
                identity: Some(WineIdentity::demo()),
                error: None,
                message: None,
            },
        );
        self.emit_phase(ScanPhase::Paused);
        Ok(())
    }

    async fn claim_capture_slot(&self) -> Result<u64> {
        let mut session = self.ctx.session.lock().await;
        if session.phase == ScanPhase::Idle {
            bail!("scanner is not active");
        }
        if session.busy {
            bail!("a capture is already in flight");
        }
        Ok(session.begin_capture(Instant::now()))
    }

    fn emit_phase(&self, phase: ScanPhase) {
        emit(&self.ctx.events, ScanEvent::PhaseChanged { phase });
    }
}
