//! HTTP client for the training trigger service.

use crate::error::{TrainingError, TrainingResult};
use crate::retry::AuthRetryPolicy;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of asking the service to start training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// `202 Accepted`: a new run was started.
    Accepted,
    /// `409 Conflict`: a run is already in progress.
    AlreadyRunning,
}

/// State of the current training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingStatus {
    InProgress,
    /// Finished; carries the response body.
    Done(String),
}

#[derive(Debug, Clone)]
pub struct TrainingClientConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub poll_interval: Duration,
    pub max_wait: Duration,
    /// Bound on any single request.
    pub request_timeout: Duration,
    pub auth_retry: AuthRetryPolicy,
}

impl TrainingClientConfig {
    /// Defaults: poll every 30s for at most 4h, 60s per request, three auth
    /// retries 5s apart.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            poll_interval: Duration::from_secs(30),
            max_wait: Duration::from_secs(4 * 60 * 60),
            request_timeout: Duration::from_secs(60),
            auth_retry: AuthRetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingClient {
    config: TrainingClientConfig,
    client: Client,
}

impl TrainingClient {
    pub fn new(mut config: TrainingClientConfig) -> TrainingResult<Self> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, client })
    }

    /// Starts a training run. A run already in progress is not an error.
    pub async fn trigger(&self) -> TrainingResult<TriggerOutcome> {
        let response = self.send("trigger", || self.client.post(self.url("/train"))).await?;
        match response.status() {
            StatusCode::ACCEPTED => {
                info!("Training run started");
                Ok(TriggerOutcome::Accepted)
            }
            StatusCode::CONFLICT => {
                info!("Training run already in progress");
                Ok(TriggerOutcome::AlreadyRunning)
            }
            _ => Err(unexpected("trigger", response).await),
        }
    }

    pub async fn status(&self) -> TrainingResult<TrainingStatus> {
        let response = self.send("status", || self.client.get(self.url("/train"))).await?;
        match response.status() {
            StatusCode::ACCEPTED => Ok(TrainingStatus::InProgress),
            StatusCode::OK => Ok(TrainingStatus::Done(response.text().await?)),
            _ => Err(unexpected("status", response).await),
        }
    }

    /// Polls `status` until the run finishes, the wait bound passes or `cancel` fires.
    pub async fn wait_for_completion(&self, cancel: &CancellationToken) -> TrainingResult<String> {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.max_wait;
        loop {
            let status = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(TrainingError::Cancelled),
                status = self.status() => status?,
                () = tokio::time::sleep_until(deadline) => return Err(TrainingError::Timeout(self.config.max_wait)),
            };
            if let TrainingStatus::Done(body) = status {
                info!(elapsed = ?started.elapsed(), "Training finished");
                return Ok(body);
            }
            if started.elapsed() >= self.config.max_wait {
                return Err(TrainingError::Timeout(self.config.max_wait));
            }
            debug!("Waiting for training to finish...");
            tokio::select! {
                () = cancel.cancelled() => return Err(TrainingError::Cancelled),
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// Triggers a run and waits for it to finish.
    pub async fn run(&self, cancel: &CancellationToken) -> TrainingResult<String> {
        self.trigger().await?;
        self.wait_for_completion(cancel).await
    }

    /// Downloads the most recent training data.
    pub async fn latest_data(&self) -> TrainingResult<String> {
        let response = self.send("latest_data", || self.client.get(self.url("/latest-data"))).await?;
        if response.status() == StatusCode::OK {
            Ok(response.text().await?)
        } else {
            Err(unexpected("latest_data", response).await)
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Sends a request, retrying `401` responses per the auth retry policy.
    async fn send(
        &self,
        operation: &'static str,
        build: impl Fn() -> RequestBuilder + Send,
    ) -> TrainingResult<Response> {
        let policy = self.config.auth_retry;
        let mut attempts = 0;
        loop {
            let mut request = build();
            if let Some(token) = &self.config.api_token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await?;
            attempts += 1;

            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }
            if !policy.should_retry(attempts) {
                return Err(TrainingError::Unauthorized { attempts });
            }
            warn!(operation, attempts, backoff = ?policy.backoff, "Training service returned 401, retrying");
            tokio::time::sleep(policy.backoff).await;
        }
    }
}

async fn unexpected(operation: &'static str, response: Response) -> TrainingError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    TrainingError::UnexpectedStatus { operation, status, body }
}
