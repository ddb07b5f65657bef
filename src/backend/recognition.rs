use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::multipart::{Form, Part};

use super::{ApiEnvelope, BackendClient};
use crate::error::ScanError;
use crate::models::{CapturedFrame, RecognitionOutcome, WineIdentity};

const SCAN_PATH: &str = "/api/v1/scan-wine-label";

/// Seam between the capture scheduler and the remote recognition call.
/// Implementations never propagate errors: every failure is folded into a
/// classified `RecognitionOutcome`.
#[async_trait]
pub trait LabelRecognizer: Send + Sync {
    async fn recognize(&self, frame: CapturedFrame) -> RecognitionOutcome;
}

fn label_form(frame: CapturedFrame) -> reqwest::Result<Form> {
    let part = Part::bytes(frame.jpeg)
        .file_name("label.jpg")
        .mime_str("image/jpeg")?;
    Ok(Form::new().part("file", part))
}

#[async_trait]
impl LabelRecognizer for BackendClient {
    async fn recognize(&self, frame: CapturedFrame) -> RecognitionOutcome {
        let payload_bytes = frame.jpeg.len();
        info!("submitting label frame ({payload_bytes} bytes)");

        let form = match label_form(frame) {
            Ok(form) => form,
            Err(err) => {
                error!("failed to build label upload: {err}");
                return RecognitionOutcome::Failed(ScanError::ClientInput(400));
            }
        };

        let url = self.endpoint(SCAN_PATH);
        let response = self
            .http
            .post(&url)
            .timeout(self.recognition_timeout())
            .multipart(form)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!("recognition request failed: {err}");
                return RecognitionOutcome::Failed(ScanError::from_transport(&err));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("recognition request returned status {status}");
            return RecognitionOutcome::Failed(ScanError::from_status(status.as_u16()));
        }

        let envelope: ApiEnvelope<WineIdentity> = match response.json().await {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!("malformed recognition response: {err}");
                return RecognitionOutcome::Failed(ScanError::Server(status.as_u16()));
            }
        };

        match envelope {
            ApiEnvelope {
                success: true,
                data: Some(identity),
                ..
            } => {
                info!(
                    "label identified as {} (confidence {:?})",
                    identity.display_name(),
                    identity.confidence
                );
                RecognitionOutcome::Identified(identity)
            }
            ApiEnvelope { message, .. } => RecognitionOutcome::NotIdentified {
                reason: message.unwrap_or_else(|| "no wine label found".to_string()),
            },
        }
    }
}
