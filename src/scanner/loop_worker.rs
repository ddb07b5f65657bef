use anyhow::anyhow;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::events::{emit, EventSender, ScanEvent};
use super::source::FrameSource;
use super::state::{ScanPhase, ScanSession};
use crate::backend::LabelRecognizer;
use crate::error::ScanError;
use crate::models::{CapturedFrame, RecognitionOutcome};

/// Everything one scan round-trip needs. Cloned into the loop task and the
/// manual-action paths; all shared pieces sit behind `Arc`s.
#[derive(Clone)]
pub(crate) struct ScanContext {
    pub session: Arc<Mutex<ScanSession>>,
    pub recognizer: Arc<dyn LabelRecognizer>,
    pub frames: Arc<dyn FrameSource>,
    pub events: EventSender,
    pub capture_interval: Duration,
    pub cooldown: Duration,
    pub recognition_timeout: Duration,
}

pub(crate) async fn scan_loop(ctx: ScanContext, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(ctx.capture_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                poll_once(&ctx).await;
            }
            _ = cancel_token.cancelled() => {
                info!("scan loop shutting down");
                break;
            }
        }
    }
}

/// One periodic tick. Attempts below the interval threshold, while a
/// round-trip is in flight, or outside the Scanning phase are dropped
/// silently, never queued.
pub(crate) async fn poll_once(ctx: &ScanContext) {
    let generation = {
        let mut session = ctx.session.lock().await;
        match session.begin_periodic_capture(Instant::now(), ctx.capture_interval) {
            Some(generation) => generation,
            None => return,
        }
    };

    capture_and_recognize(ctx, None, generation).await;
}

/// Shared by the periodic loop and the manual capture actions once the busy
/// slot is held: grab a frame (unless one was provided), submit it, apply
/// the outcome, run the cooldown. The busy flag is released on every path
/// through here.
pub(crate) async fn capture_and_recognize(
    ctx: &ScanContext,
    provided: Option<CapturedFrame>,
    generation: u64,
) {
    let frame = match provided {
        Some(frame) => Ok(frame),
        None => {
            let frames = Arc::clone(&ctx.frames);
            match tokio::task::spawn_blocking(move || frames.capture_frame()).await {
                Ok(result) => result,
                Err(err) => Err(anyhow!("frame capture worker join failed: {err}")),
            }
        }
    };

    let frame = match frame {
        Ok(frame) => frame,
        Err(err) => {
            warn!("frame capture failed: {err:?}");
            let mut session = ctx.session.lock().await;
            if session.is_current(generation) {
                session.abort_capture();
            }
            return;
        }
    };

    {
        let mut session = ctx.session.lock().await;
        if !session.is_current(generation) {
            debug!("discarding captured frame for stale generation {generation}");
            return;
        }
        session.mark_awaiting();
    }
    emit(
        &ctx.events,
        ScanEvent::PhaseChanged {
            phase: ScanPhase::AwaitingRecognition,
        },
    );

    let recognition = ctx.recognizer.recognize(frame);
    let outcome = match tokio::time::timeout(ctx.recognition_timeout, recognition).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(
                "recognition exceeded {}s",
                ctx.recognition_timeout.as_secs()
            );
            RecognitionOutcome::Failed(ScanError::Timeout)
        }
    };

    handle_outcome(ctx, outcome, generation).await;
}

async fn handle_outcome(ctx: &ScanContext, outcome: RecognitionOutcome, generation: u64) {
    let identified = outcome.is_identified();

    {
        let mut session = ctx.session.lock().await;
        if !session.is_current(generation) {
            debug!("discarding recognition outcome for stale generation {generation}");
            return;
        }
        session.settle(identified);
    }

    match outcome {
        RecognitionOutcome::Identified(identity) => {
            info!("wine identified: {}", identity.display_name());
            emit(
                &ctx.events,
                ScanEvent::IdentityResolved {
                    identity: Some(identity),
                    error: None,
                    message: None,
                },
            );
            emit(
                &ctx.events,
                ScanEvent::PhaseChanged {
                    phase: ScanPhase::Paused,
                },
            );
        }
        RecognitionOutcome::NotIdentified { reason } => {
            info!("label not identified: {reason}");
            let error = ScanError::Unrecognized;
            emit(
                &ctx.events,
                ScanEvent::IdentityResolved {
                    identity: None,
                    message: Some(error.user_message().to_string()),
                    error: Some(error),
                },
            );
        }
        RecognitionOutcome::Failed(error) => {
            warn!("recognition failed: {error}");
            emit(
                &ctx.events,
                ScanEvent::IdentityResolved {
                    identity: None,
                    message: Some(error.user_message().to_string()),
                    error: Some(error),
                },
            );
        }
    }

    if !identified {
        tokio::time::sleep(ctx.cooldown).await;
        let mut session = ctx.session.lock().await;
        if session.is_current(generation) {
            session.resume_after_cooldown();
            emit(
                &ctx.events,
                ScanEvent::PhaseChanged {
                    phase: session.phase,
                },
            );
        }
    }
}
