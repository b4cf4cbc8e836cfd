/*!
 * Asynchronous remote describer.
 *
 * The service works in three steps: request an upload slot, upload the
 * normalized image to it, then submit a description job for the uploaded
 * asset. The job is polled at a fixed interval until it carries a
 * description or the attempt budget runs out.
 */

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use super::normalize::ImageNormalizer;
use super::{DescribeOutcome, ImageDescriber};
use crate::errors::{DescribeError, ProviderError};

/// Waits between poll attempts; injected so tests run without real delays
#[async_trait]
pub trait Sleeper: Send + Sync + Debug {
    /// Suspend for the given duration
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Polling policy for description jobs
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Delay between two status requests
    pub interval: Duration,
    /// Maximum number of status requests
    pub attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            attempts: 10,
        }
    }
}

#[derive(Debug, Serialize)]
struct UploadSlotRequest<'a> {
    content_type: &'a str,
    size: usize,
}

/// Upload slot granted by the service
#[derive(Debug, Deserialize)]
pub struct UploadSlot {
    /// Where to PUT the image bytes (absolute or relative to the endpoint)
    pub upload_url: String,
    /// Identifier of the uploaded asset
    pub asset_id: String,
}

#[derive(Debug, Serialize)]
struct JobRequest<'a> {
    asset_id: &'a str,
    prompt: &'a str,
}

/// Ticket returned when a job is submitted
#[derive(Debug, Deserialize)]
pub struct JobTicket {
    /// Job identifier used for polling
    pub job_id: String,
}

/// Job status as reported by the service
#[derive(Debug, Deserialize)]
pub struct JobStatus {
    /// Free-form status (`pending`, `running`, `completed`, `failed`)
    #[serde(default)]
    pub status: String,
    /// Populated once the job is done
    #[serde(default)]
    pub description: Option<String>,
    /// Failure detail, if any
    #[serde(default)]
    pub error: Option<String>,
}

impl JobStatus {
    fn is_failed(&self) -> bool {
        matches!(self.status.to_lowercase().as_str(), "failed" | "error" | "cancelled")
    }
}

/// Describer for upload/submit/poll description services
#[derive(Debug)]
pub struct JobDescriber {
    client: Client,
    endpoint: String,
    api_key: String,
    prompt: String,
    policy: PollPolicy,
    normalizer: ImageNormalizer,
    sleeper: Arc<dyn Sleeper>,
}

impl JobDescriber {
    /// Create a describer for the service at `endpoint`
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        prompt: impl Into<String>,
        timeout: Duration,
        policy: PollPolicy,
        normalizer: ImageNormalizer,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            prompt: prompt.into(),
            policy,
            normalizer,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper used between poll attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.api_key)
        }
    }

    async fn checked(response: Result<Response, reqwest::Error>, step: &str) -> Result<Response, ProviderError> {
        let response = response.map_err(|e| ProviderError::from_transport(step, e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::from_status(status.as_u16(), format!("{}: {}", step, body)))
    }

    async fn parse<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, ProviderError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    fn resolve_upload_url(&self, upload_url: &str) -> Result<Url, ProviderError> {
        let base = Url::parse(&format!("{}/", self.endpoint))
            .map_err(|e| ProviderError::RequestFailed(format!("invalid endpoint: {}", e)))?;
        base.join(upload_url)
            .map_err(|e| ProviderError::ParseError(format!("invalid upload URL '{}': {}", upload_url, e)))
    }

    /// Request an upload slot and push the image into it
    async fn upload(&self, jpeg: Vec<u8>) -> Result<String, ProviderError> {
        let slot_request = UploadSlotRequest {
            content_type: "image/jpeg",
            size: jpeg.len(),
        };
        let response = self
            .authorized(self.client.post(format!("{}/uploads", self.endpoint)))
            .json(&slot_request)
            .send()
            .await;
        let slot: UploadSlot = Self::parse(Self::checked(response, "upload slot").await?).await?;

        let target = self.resolve_upload_url(&slot.upload_url)?;
        let response = self
            .client
            .put(target)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(jpeg)
            .send()
            .await;
        Self::checked(response, "image upload").await?;

        Ok(slot.asset_id)
    }

    async fn submit(&self, asset_id: &str) -> Result<String, ProviderError> {
        let response = self
            .authorized(self.client.post(format!("{}/jobs", self.endpoint)))
            .json(&JobRequest {
                asset_id,
                prompt: &self.prompt,
            })
            .send()
            .await;
        let ticket: JobTicket = Self::parse(Self::checked(response, "job submission").await?).await?;
        Ok(ticket.job_id)
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus, ProviderError> {
        let response = self
            .authorized(self.client.get(format!("{}/jobs/{}", self.endpoint, job_id)))
            .send()
            .await;
        Self::parse(Self::checked(response, "job status").await?).await
    }

    /// Poll a submitted job until it is described, fails, or the budget is spent
    pub async fn poll(&self, job_id: &str) -> Result<DescribeOutcome, DescribeError> {
        for attempt in 1..=self.policy.attempts {
            let status = self.status(job_id).await?;

            if let Some(description) = status.description.as_deref().filter(|d| !d.trim().is_empty()) {
                debug!("Job {} described after {} status check(s)", job_id, attempt);
                return Ok(DescribeOutcome::Described(description.trim().to_string()));
            }

            if status.is_failed() {
                return Err(DescribeError::JobFailed(
                    status.error.unwrap_or_else(|| status.status.clone()),
                ));
            }

            if attempt < self.policy.attempts {
                self.sleeper.sleep(self.policy.interval).await;
            }
        }

        Err(DescribeError::PollBudgetExhausted {
            attempts: self.policy.attempts,
        })
    }
}

#[async_trait]
impl ImageDescriber for JobDescriber {
    fn name(&self) -> &str {
        "job"
    }

    async fn describe(&self, image: &[u8]) -> Result<DescribeOutcome, DescribeError> {
        let normalized = self.normalizer.normalize_blocking(image).await?;
        let asset_id = self.upload(normalized.data).await?;
        let job_id = self.submit(&asset_id).await?;
        debug!("Submitted description job {} for asset {}", job_id, asset_id);
        self.poll(&job_id).await
    }
}
