//! Arena HTTP surface: the `ArenaApi` trait and its reqwest client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ApiConfig;
use crate::models::{
    wire, ArenaSnapshot, BoosterCatalog, MoveAck, MoveCommand, RoundInfo,
};

/// Errors from the arena API. The variants matter: a `Throttled` rejection
/// is requeued by the scheduler, a `Rejected` one triggers reservation
/// rollback, transport and status errors are retried.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("rate limited by arena (retry_after={retry_after:?})")]
    Throttled { retry_after: Option<Duration> },

    #[error("rejected by arena: {0}")]
    Rejected(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Worth retrying through the scheduler's backoff, as opposed to a
    /// definitive game-logic rejection.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Throttled { .. } | ApiError::Status(_) | ApiError::Transport(_)
        )
    }
}

/// Abstract arena collaborator. The engine only ever talks to this trait;
/// tests substitute scripted implementations.
#[async_trait]
pub trait ArenaApi: Send + Sync {
    /// One call per tick; the result is cached for the whole tick.
    async fn fetch_arena_snapshot(&self, tick: u64) -> Result<ArenaSnapshot, ApiError>;

    /// Submit a single unit's move (path of at most 30 steps, optional
    /// bomb placement on the final tile).
    async fn submit_move(&self, cmd: &MoveCommand) -> Result<MoveAck, ApiError>;

    async fn fetch_booster_options(&self) -> Result<BoosterCatalog, ApiError>;

    async fn purchase_booster(&self, index: usize) -> Result<(), ApiError>;

    /// Informational; not consumed by the planning core.
    async fn fetch_round_schedule(&self) -> Result<Vec<RoundInfo>, ApiError>;
}

/// reqwest-backed client with auth headers and status mapping.
pub struct HttpArenaClient {
    http: reqwest::Client,
    base_url: String,
    tick_interval_ms: u64,
    version: AtomicU64,
}

impl HttpArenaClient {
    pub fn new(config: &ApiConfig, tick_interval_ms: u64) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.token.as_deref() {
            if config.use_bearer {
                let value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| ApiError::Malformed(e.to_string()))?;
                headers.insert(AUTHORIZATION, value);
            } else {
                let value = HeaderValue::from_str(token)
                    .map_err(|e| ApiError::Malformed(e.to_string()))?;
                headers.insert("X-Auth-Token", value);
            }
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tick_interval_ms,
            version: AtomicU64::new(0),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self.http.get(&url).send().await?;
        let response = Self::check(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))
    }

    async fn post<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<(), ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self.http.post(&url).json(body).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Map the status line to the error taxonomy; 2xx passes through.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<f64>().ok())
                    .map(Duration::from_secs_f64);
                Err(ApiError::Throttled { retry_after })
            }
            status if status.is_client_error() => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::Rejected(body))
            }
            status => Err(ApiError::Status(status.as_u16())),
        }
    }
}

#[async_trait]
impl ArenaApi for HttpArenaClient {
    async fn fetch_arena_snapshot(&self, tick: u64) -> Result<ArenaSnapshot, ApiError> {
        let response: wire::ArenaResponse = self.get_json("/api/arena").await?;
        let version = self.version.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(response.into_snapshot(tick, version, self.tick_interval_ms))
    }

    async fn submit_move(&self, cmd: &MoveCommand) -> Result<MoveAck, ApiError> {
        let request = wire::MoveRequest {
            bombers: vec![wire::MoveEntry::from_command(cmd)],
        };
        self.post("/api/move", &request).await?;
        Ok(MoveAck)
    }

    async fn fetch_booster_options(&self) -> Result<BoosterCatalog, ApiError> {
        let value: serde_json::Value = self.get_json("/api/booster").await?;
        let available = value
            .get("available")
            .cloned()
            .unwrap_or(serde_json::Value::Array(Vec::new()));
        let points = value
            .get("state")
            .and_then(|s| s.get("points"))
            .and_then(|p| p.as_u64())
            .unwrap_or(0) as u32;
        let available = serde_json::from_value(available)
            .map_err(|e| ApiError::Malformed(e.to_string()))?;
        Ok(BoosterCatalog { available, points })
    }

    async fn purchase_booster(&self, index: usize) -> Result<(), ApiError> {
        self.post("/api/booster", &wire::BoosterRequest { booster: index })
            .await
    }

    async fn fetch_round_schedule(&self) -> Result<Vec<RoundInfo>, ApiError> {
        let value: serde_json::Value = self.get_json("/api/rounds").await?;
        let rounds = value
            .get("rounds")
            .cloned()
            .unwrap_or(serde_json::Value::Array(Vec::new()));
        serde_json::from_value(rounds).map_err(|e| ApiError::Malformed(e.to_string()))
    }
}
