//! Model preload
//!
//! After the model server is provisioned it may still be cold-starting, so
//! the pull request is retried with a fixed delay. Giving up is reported,
//! never fatal: the service itself is already provisioned.

use anyhow::{Context, Result};
use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::Request;
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tracing::{info, warn};


/// Something that can ask a model server to pull a model
#[async_trait]
pub trait ModelPreloader: Send + Sync {
    async fn pull(&self, base_url: &str, model: &str) -> Result<()>;
}

/// Calls the Ollama pull API over HTTP(S)
pub struct HttpPreloader {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HttpPreloader {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpsConnector::new());
        Self { client }
    }
}

impl Default for HttpPreloader {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull endpoint for a model server base URL
pub fn pull_url(base_url: &str) -> String {
    format!("{}/api/pull", base_url.trim_end_matches('/'))
}

#[async_trait]
impl ModelPreloader for HttpPreloader {
    async fn pull(&self, base_url: &str, model: &str) -> Result<()> {
        let url = pull_url(base_url);
        let body = serde_json::to_vec(&serde_json::json!({ "model": model }))?;

        let request = Request::post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .context("Failed to build pull request")?;

        let response = self
            .client
            .request(request)
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        // The pull API streams progress until the download completes
        let body = response
            .into_body()
            .collect()
            .await
            .context("Failed to read pull response")?
            .to_bytes();

        if !status.is_success() {
            anyhow::bail!(
                "Pull of {} returned {}: {}",
                model,
                status,
                String::from_utf8_lossy(&body)
            );
        }
        Ok(())
    }
}

/// How persistently to retry the preload
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Wait before the first attempt
    pub initial_delay: Duration,
    pub attempts: u32,
    /// Wait between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadOutcome {
    Loaded { attempts: u32 },
    GaveUp { attempts: u32, last_error: String },
}

impl PreloadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, PreloadOutcome::Loaded { .. })
    }
}

/// Pull `model` from the server at `base_url`, retrying per `policy`
pub async fn preload_with_retry(
    preloader: &dyn ModelPreloader,
    base_url: &str,
    model: &str,
    policy: &RetryPolicy,
) -> PreloadOutcome {
    tokio::time::sleep(policy.initial_delay).await;

    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match preloader.pull(base_url, model).await {
            Ok(()) => {
                info!(model = %model, attempt, "Model preloaded");
                return PreloadOutcome::Loaded { attempts: attempt };
            }
            Err(e) => {
                last_error = format!("{:#}", e);
                if attempt < attempts {
                    warn!(
                        model = %model,
                        attempt,
                        error = %last_error,
                        "Preload failed, retrying"
                    );
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    warn!(
        model = %model,
        attempts,
        error = %last_error,
        "Giving up on model preload; the service is provisioned but the model was not pulled"
    );
    PreloadOutcome::GaveUp {
        attempts,
        last_error,
    }
}
