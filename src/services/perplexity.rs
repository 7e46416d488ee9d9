// Perplexity Service
// Language-model inference collaborator: a trait for perplexity sources, an
// HTTP client for the inference service, and a fixed-value source.

use crate::services::config_store::ModelConfig;
use crate::services::round_to;
use crate::services::text_processor::head_chars;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("inference service error: {status} - {message}")]
    Status { status: u16, message: String },
    #[error("malformed inference response: {0}")]
    Malformed(String),
    #[error("model unavailable: {0}")]
    Unavailable(String),
}

/// Source of perplexity scores.
///
/// `perplexity` never fails: an unavailable model yields `None` so callers
/// can fall back to heuristics.
pub trait PerplexityModel: Send + Sync {
    /// Prepare the model once; concurrent callers share a single initialization.
    fn ensure_initialized(&self) -> impl Future<Output = Result<(), ModelError>> + Send;

    fn perplexity(&self, text: &str) -> impl Future<Output = Option<f64>> + Send;
}

#[derive(Debug, Serialize)]
struct PerplexityRequest<'a> {
    text: &'a str,
    max_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct PerplexityResponse {
    perplexity: f64,
    #[serde(default)]
    tokens: Option<usize>,
}

fn is_loopback(base_url: &str) -> bool {
    Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| matches!(h, "localhost" | "127.0.0.1" | "[::1]")))
        .unwrap_or(false)
}

/// Apply the token floor and the perplexity cap to a raw service response.
fn accept_score(resp: &PerplexityResponse, cfg: &ModelConfig) -> Result<Option<f64>, ModelError> {
    if !resp.perplexity.is_finite() || resp.perplexity <= 0.0 {
        return Err(ModelError::Malformed(format!(
            "perplexity must be a positive number, got {}",
            resp.perplexity
        )));
    }
    if let Some(tokens) = resp.tokens {
        if tokens < cfg.min_tokens {
            debug!(tokens, min_tokens = cfg.min_tokens, "model.too_few_tokens");
            return Ok(None);
        }
    }
    Ok(Some(round_to(resp.perplexity.min(cfg.max_perplexity), 2)))
}

/// Client for an HTTP inference service exposing `GET /health` and
/// `POST /perplexity`.
pub struct RemotePerplexityModel {
    config: ModelConfig,
    client: OnceCell<Client>,
}

impl RemotePerplexityModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Build the client and probe the service. A failure is not cached, so
    /// the next call tries again.
    async fn client(&self) -> Result<&Client, ModelError> {
        self.client
            .get_or_try_init(|| async {
                let mut builder =
                    Client::builder().timeout(Duration::from_secs(self.config.timeout_secs));
                if is_loopback(&self.config.base_url) {
                    builder = builder.no_proxy();
                }
                let client = builder.build()?;
                self.probe(&client).await?;
                info!(url = %self.base_url(), "model.initialized");
                Ok::<Client, ModelError>(client)
            })
            .await
    }

    async fn probe(&self, client: &Client) -> Result<(), ModelError> {
        let response = client.get(format!("{}/health", self.base_url())).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(())
    }

    async fn score(&self, client: &Client, text: &str) -> Result<Option<f64>, ModelError> {
        let request = PerplexityRequest {
            text,
            max_length: self.config.max_length,
        };
        let response = client
            .post(format!("{}/perplexity", self.base_url()))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: PerplexityResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;
        accept_score(&data, &self.config)
    }
}

impl PerplexityModel for RemotePerplexityModel {
    async fn ensure_initialized(&self) -> Result<(), ModelError> {
        self.client().await.map(|_| ())
    }

    async fn perplexity(&self, text: &str) -> Option<f64> {
        let input = head_chars(text.trim(), self.config.max_chars);
        if input.is_empty() {
            return None;
        }

        let client = match self.client().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, url = %self.base_url(), "model.unavailable");
                return None;
            }
        };

        match self.score(client, input).await {
            Ok(value) => {
                debug!(perplexity = ?value, chars = input.chars().count(), "model.scored");
                value
            }
            Err(e) => {
                warn!(error = %e, "model.score_failed");
                None
            }
        }
    }
}

/// Fixed perplexity source for offline runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPerplexity {
    pub value: Option<f64>,
}

impl StaticPerplexity {
    pub fn new(value: Option<f64>) -> Self {
        Self { value }
    }

    pub fn unavailable() -> Self {
        Self { value: None }
    }
}

impl PerplexityModel for StaticPerplexity {
    async fn ensure_initialized(&self) -> Result<(), ModelError> {
        match self.value {
            Some(_) => Ok(()),
            None => Err(ModelError::Unavailable("no perplexity configured".to_string())),
        }
    }

    async fn perplexity(&self, _text: &str) -> Option<f64> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::{TcpListener, TcpStream};

    const SAMPLE: &str = "Petroniusz obudził się zaledwie koło południa i jak zwykle był zmęczony.";

    fn config_for(base_url: &str) -> ModelConfig {
        ModelConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        l.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Minimal inference service answering every scoring call with fixed
    /// values. Returns its URL and the number of health checks it has served.
    async fn serve_stub(perplexity: f64, tokens: usize) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let health_hits = Arc::new(AtomicUsize::new(0));
        let hits = health_hits.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let hits = hits.clone();
                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    let body = if request.starts_with("GET /health") {
                        hits.fetch_add(1, Ordering::SeqCst);
                        r#"{"status":"ok"}"#.to_string()
                    } else {
                        format!(r#"{{"perplexity":{},"tokens":{}}}"#, perplexity, tokens)
                    };
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        (format!("http://{}", addr), health_hits)
    }

    #[tokio::test]
    async fn test_static_model() {
        let model = StaticPerplexity::new(Some(28.5));
        assert!(model.ensure_initialized().await.is_ok());
        assert_eq!(model.perplexity("cokolwiek").await, Some(28.5));

        let offline = StaticPerplexity::unavailable();
        assert!(offline.ensure_initialized().await.is_err());
        assert_eq!(offline.perplexity("cokolwiek").await, None);
    }

    #[tokio::test]
    async fn test_unreachable_service_yields_none() {
        let model = RemotePerplexityModel::new(config_for("http://127.0.0.1:9"));
        assert!(model.ensure_initialized().await.is_err());
        assert_eq!(model.perplexity(SAMPLE).await, None);
        // failed initialization is retried, not cached
        assert!(model.ensure_initialized().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_text_skips_service() {
        let model = RemotePerplexityModel::new(config_for("http://127.0.0.1:9"));
        assert_eq!(model.perplexity("   ").await, None);
    }

    #[tokio::test]
    async fn test_remote_score_is_rounded() {
        let (url, _) = serve_stub(25.4567, 120).await;
        let model = RemotePerplexityModel::new(config_for(&url));
        assert!(model.ensure_initialized().await.is_ok());
        assert_eq!(model.perplexity(SAMPLE).await, Some(25.46));
    }

    #[tokio::test]
    async fn test_remote_score_capped_and_token_floor() {
        let (url, _) = serve_stub(5000.0, 120).await;
        let model = RemotePerplexityModel::new(config_for(&url));
        assert_eq!(model.perplexity(SAMPLE).await, Some(1000.0));

        let (url, _) = serve_stub(30.0, 3).await;
        let model = RemotePerplexityModel::new(config_for(&url));
        assert_eq!(model.perplexity(SAMPLE).await, None);
    }

    #[tokio::test]
    async fn test_shared_model_initializes_once() {
        let (url, health_hits) = serve_stub(40.0, 50).await;
        let model = Arc::new(RemotePerplexityModel::new(config_for(&url)));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let m = model.clone();
            handles.push(tokio::spawn(async move { m.perplexity(SAMPLE).await }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), Some(40.0));
        }
        assert_eq!(health_hits.load(Ordering::SeqCst), 1);

        assert!(model.ensure_initialized().await.is_ok());
        assert_eq!(model.perplexity(SAMPLE).await, Some(40.0));
        assert_eq!(health_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_malformed_score_rejected() {
        let cfg = ModelConfig::default();
        let bad = PerplexityResponse { perplexity: f64::NAN, tokens: Some(100) };
        assert!(matches!(accept_score(&bad, &cfg), Err(ModelError::Malformed(_))));
        let no_tokens = PerplexityResponse { perplexity: 12.345, tokens: None };
        assert_eq!(accept_score(&no_tokens, &cfg).unwrap(), Some(12.35));
    }
}
