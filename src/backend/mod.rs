pub mod enrichment;
pub mod recognition;

pub use enrichment::EnrichmentSource;
pub use recognition::LabelRecognizer;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use crate::error::ScanError;
use crate::models::WineIdentity;
use crate::settings::EngineSettings;

const USER_AGENT: &str = concat!("vinoscan/", env!("CARGO_PKG_VERSION"));

/// Response envelope shared by every backend endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

/// Outcome of the health probe, reported to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityReport {
    pub reachable: bool,
    pub status: Option<String>,
    pub service: Option<String>,
    pub detail: String,
}

#[derive(Debug, Deserialize)]
struct HealthPayload {
    status: Option<String>,
    service: Option<String>,
}

/// Seam for the connectivity check so the scheduler can be driven without a
/// live backend.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn check_health(&self) -> ConnectivityReport;
}

/// HTTP client for the recognition/enrichment backend. Stateless apart from
/// the connection pool; every call carries its own bounded timeout.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    recognition_timeout: Duration,
    enrichment_timeout: Duration,
    health_timeout: Duration,
}

impl BackendClient {
    pub fn new(settings: &EngineSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.backend_base_url.trim_end_matches('/').to_string(),
            recognition_timeout: settings.recognition_timeout(),
            enrichment_timeout: settings.enrichment_timeout(),
            health_timeout: settings.health_timeout(),
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn recognition_timeout(&self) -> Duration {
        self.recognition_timeout
    }

    /// Probe the backend health endpoint. Never errors: unreachability is a
    /// report, not a failure.
    pub async fn probe_health(&self) -> ConnectivityReport {
        let response = self
            .http
            .get(self.endpoint("/health"))
            .timeout(self.health_timeout)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                let classified = ScanError::from_transport(&err);
                warn!("health probe failed: {err}");
                return ConnectivityReport {
                    reachable: false,
                    status: None,
                    service: None,
                    detail: classified.user_message().to_string(),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            return ConnectivityReport {
                reachable: false,
                status: Some(status.to_string()),
                service: None,
                detail: ScanError::from_status(status.as_u16())
                    .user_message()
                    .to_string(),
            };
        }

        let payload: HealthPayload = response.json().await.unwrap_or(HealthPayload {
            status: None,
            service: None,
        });

        ConnectivityReport {
            reachable: true,
            status: payload.status,
            service: payload.service,
            detail: "Backend reachable".to_string(),
        }
    }

    /// Persist a scanned wine to the backend collection.
    pub async fn save_wine(&self, identity: &WineIdentity) -> Result<(), ScanError> {
        let envelope: ApiEnvelope<serde_json::Value> = self
            .post_json("/api/v1/wines", identity, self.enrichment_timeout)
            .await?;

        if envelope.success {
            Ok(())
        } else {
            warn!(
                "save-wine rejected: {}",
                envelope.message.as_deref().unwrap_or("no message")
            );
            Err(ScanError::Unrecognized)
        }
    }

    /// Fetch all previously saved wines.
    pub async fn list_wines(&self) -> Result<Vec<WineIdentity>, ScanError> {
        let response = self
            .http
            .get(self.endpoint("/api/v1/wines"))
            .timeout(self.enrichment_timeout)
            .send()
            .await
            .map_err(|err| ScanError::from_transport(&err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::from_status(status.as_u16()));
        }

        let envelope: ApiEnvelope<Vec<WineIdentity>> = response.json().await.map_err(|err| {
            warn!("malformed wine list response: {err}");
            ScanError::Server(status.as_u16())
        })?;

        Ok(envelope.data.unwrap_or_default())
    }

    /// POST a JSON body and decode the response envelope. Transport and
    /// status failures come back classified; a malformed body counts as a
    /// server fault.
    pub(crate) async fn post_json<Req, Data>(
        &self,
        path: &str,
        body: &Req,
        timeout: Duration,
    ) -> Result<ApiEnvelope<Data>, ScanError>
    where
        Req: Serialize + Sync,
        Data: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!("POST {url}");

        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                warn!("request to {url} failed: {err}");
                ScanError::from_transport(&err)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("request to {url} returned status {status}");
            return Err(ScanError::from_status(status.as_u16()));
        }

        response.json().await.map_err(|err| {
            warn!("malformed response from {url}: {err}");
            ScanError::Server(status.as_u16())
        })
    }
}

#[async_trait]
impl ConnectivityProbe for BackendClient {
    async fn check_health(&self) -> ConnectivityReport {
        self.probe_health().await
    }
}
