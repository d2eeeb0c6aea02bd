//! Night broker restart activity.
//!
//! A run is recorded when an operator starts the restart of one server set.
//! The support team is told through a webhook and acknowledges with the
//! run's code.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tokio::sync::Semaphore;

use crate::config::APP_CONFIG;
use crate::error::{AppError, AppResult};
use crate::utils::gen_ack_code;

/// Fresh acknowledgement codes tried before giving up on a run.
const ACK_CODE_ATTEMPTS: usize = 5;

/// Global HTTP client with timeout, connection pooling, and pre-configured headers.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .timeout(Duration::from_secs(APP_CONFIG.webhook_timeout_secs))
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(4)
        .default_headers(default_headers)
        .build()
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build notification client, using defaults");
            reqwest::Client::new()
        })
});

/// Semaphore to limit concurrent support notifications.
static NOTIFY_SEMAPHORE: Lazy<Arc<Semaphore>> =
    Lazy::new(|| Arc::new(Semaphore::new(APP_CONFIG.webhook_max_concurrent)));

/// Recorded broker restart run.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BrokerRestartRun {
    pub run_id: i64,
    pub set_name: String,
    pub servers: Vec<String>,
    pub operator_id: i64,
    pub ack_code: String,
    pub started_at: DateTime<Utc>,
}

/// Struct for recording a new run. The acknowledgement code is assigned
/// when the run is stored.
#[derive(Debug, Clone)]
pub struct NewBrokerRestartRun {
    pub set_name: String,
    pub servers: Vec<String>,
    pub operator_id: i64,
}

/// Splits a comma separated server list, dropping blanks and duplicates.
pub fn parse_server_list(raw: &str) -> Vec<String> {
    let mut servers: Vec<String> = Vec::new();
    for server in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !servers.iter().any(|s| s == server) {
            servers.push(server.to_string());
        }
    }
    servers
}

/// Payload posted to the support team's webhook.
#[derive(Debug, Serialize)]
struct SupportNotification<'a> {
    message: String,
    ack_code: &'a str,
    set_name: &'a str,
    servers: &'a [String],
    operator: &'a str,
    started_at: DateTime<Utc>,
}

impl BrokerRestartRun {
    /// Notifies the support team in the background with concurrency control.
    pub fn spawn_support_notification(self, operator: String) {
        let url = APP_CONFIG.support_webhook_url.clone();
        if url.is_empty() {
            tracing::debug!(run_id = self.run_id, "Support webhook not configured");
            return;
        }

        let semaphore = NOTIFY_SEMAPHORE.clone();

        tokio::spawn(async move {
            // Try to acquire permit, skip if queue is full
            let Ok(permit) = semaphore.try_acquire() else {
                tracing::warn!(run_id = self.run_id, "Notification queue full, skipping support notification");
                return;
            };

            if let Err(e) = self.notify_support(&url, &operator).await {
                tracing::warn!(run_id = self.run_id, error = %e, "Support notification failed");
            }

            drop(permit);
        });
    }

    async fn notify_support(&self, url: &str, operator: &str) -> AppResult<()> {
        let payload = SupportNotification {
            message: format!("Night Broker Restart Activity Started for {}", self.set_name),
            ack_code: &self.ack_code,
            set_name: &self.set_name,
            servers: &self.servers,
            operator,
            started_at: self.started_at,
        };

        let response = HTTP_CLIENT.post(url).json(&payload).send().await?;

        if !response.status().is_success() {
            tracing::warn!(
                run_id = self.run_id,
                status = %response.status().as_u16(),
                "Support webhook returned non-success status"
            );
        }

        Ok(())
    }
}

/// Broker restart repository.
pub struct BrokerRestartRepository;

impl BrokerRestartRepository {
    /// Stores the run under a fresh `ACK-XXXXXX` code, drawing a new code
    /// when one is already taken.
    pub async fn create(
        pool: &sqlx::PgPool,
        new_run: &NewBrokerRestartRun,
    ) -> AppResult<BrokerRestartRun> {
        for attempt in 1..=ACK_CODE_ATTEMPTS {
            let ack_code = gen_ack_code();
            let run = sqlx::query_as::<_, BrokerRestartRun>(
                r"
                INSERT INTO broker_restart_runs (set_name, servers, operator_id, ack_code, started_at)
                VALUES ($1, $2, $3, $4, NOW())
                ON CONFLICT (ack_code) DO NOTHING
                RETURNING run_id, set_name, servers, operator_id, ack_code, started_at
                ",
            )
            .bind(&new_run.set_name)
            .bind(&new_run.servers)
            .bind(new_run.operator_id)
            .bind(&ack_code)
            .fetch_optional(pool)
            .await?;

            if let Some(run) = run {
                return Ok(run);
            }
            tracing::warn!(attempt, ack_code = %ack_code, "Acknowledgement code already used, drawing another");
        }

        Err(AppError::Internal(format!(
            "No free acknowledgement code after {ACK_CODE_ATTEMPTS} attempts"
        )))
    }
}
