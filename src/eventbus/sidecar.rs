//! HTTP client for the local pub/sub + Jobs API sidecar.
//!
//! Endpoints, timeouts, and the "never throws, return bool" contract mirror
//! the reference sidecar client exactly (§10.6): `GET /v1.0/healthz` at 2s,
//! `POST /v1.0/publish/{pubsub}/{topic}` and the Jobs API at 10s. The
//! façade performs no in-process retries beyond this single short-timeout
//! request (§4.4) — durability and retry are the broker/sidecar's job.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::Topic;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SidecarBus {
    http: reqwest::Client,
    base_url: String,
    pubsub_name: String,
}

impl SidecarBus {
    pub fn new(base_url: impl Into<String>, pubsub_name: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            pubsub_name: pubsub_name.into(),
        }
    }

    /// Publish a JSON payload to `topic`. Producer failures are
    /// non-blocking to the write path (§4.4): this returns `false` on any
    /// failure rather than propagating an error, and the caller logs and
    /// moves on.
    pub async fn publish(&self, topic: Topic, payload: &impl Serialize) -> bool {
        let url = format!(
            "{}/v1.0/publish/{}/{}",
            self.base_url,
            self.pubsub_name,
            topic.as_str()
        );
        match self
            .http
            .post(&url)
            .timeout(CALL_TIMEOUT)
            .json(payload)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                log::warn!("publish to {} returned status {}", topic.as_str(), resp.status());
                false
            }
            Err(err) => {
                log::warn!("publish to {} failed: {}", topic.as_str(), err);
                false
            }
        }
    }

    /// Register a one-shot job named `name`, firing at `due_time`, whose
    /// callback body is `data`.
    pub async fn schedule_job(&self, name: &str, data: Value, due_time: DateTime<Utc>) -> bool {
        let url = format!("{}/v1.0-alpha1/jobs/{}", self.base_url, name);
        let body = serde_json::json!({
            "data": data,
            "dueTime": due_time.to_rfc3339(),
            "repeats": 0,
            "ttl": "1h",
        });
        match self
            .http
            .post(&url)
            .timeout(CALL_TIMEOUT)
            .json(&body)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                log::warn!("schedule job {} returned status {}", name, resp.status());
                false
            }
            Err(err) => {
                log::warn!("schedule job {} failed: {}", name, err);
                false
            }
        }
    }

    /// Best-effort job cancellation; callers never treat failure as fatal —
    /// a race where the job fires between cancel-request and cancel-apply
    /// is tolerated (§5).
    pub async fn cancel_job(&self, name: &str) -> bool {
        let url = format!("{}/v1.0-alpha1/jobs/{}", self.base_url, name);
        match self.http.delete(&url).timeout(CALL_TIMEOUT).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                log::warn!("cancel job {} returned status {}", name, resp.status());
                false
            }
            Err(err) => {
                log::warn!("cancel job {} failed: {}", name, err);
                false
            }
        }
    }

    /// Sidecar liveness check, used by readiness probes.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/v1.0/healthz", self.base_url);
        self.http
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }
}
