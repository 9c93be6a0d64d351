use crate::config::WorkUnitConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Result of processing a single id downstream.
#[derive(Debug, Clone, Serialize)]
pub struct WorkOutput {
    pub id: u64,
    pub data: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum WorkError {
    #[error("work unit failed for id {id}: {reason}")]
    Failed { id: u64, reason: String },
}

/// Downstream operation invoked once per id. May take arbitrarily long; the
/// dispatcher applies no timeout.
#[async_trait]
pub trait WorkUnit: Send + Sync {
    async fn process(&self, id: u64) -> Result<WorkOutput, WorkError>;
}

/// Stand-in for an external API: sleeps a random latency, then succeeds
/// (or fails with probability `failure_rate`).
pub struct MockWorkUnit {
    min_latency: Duration,
    max_latency: Duration,
    failure_rate: f64,
}

impl MockWorkUnit {
    pub fn new(min_latency: Duration, max_latency: Duration, failure_rate: f64) -> Self {
        Self {
            min_latency,
            max_latency: max_latency.max(min_latency),
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    fn draw(&self) -> (Duration, bool) {
        let mut rng = rand::thread_rng();
        let latency = if self.max_latency > self.min_latency {
            rng.gen_range(self.min_latency..self.max_latency)
        } else {
            self.min_latency
        };
        let fail = self.failure_rate > 0.0 && rng.gen_bool(self.failure_rate);
        (latency, fail)
    }
}

impl From<&WorkUnitConfig> for MockWorkUnit {
    fn from(config: &WorkUnitConfig) -> Self {
        Self::new(config.min_latency, config.max_latency, config.failure_rate)
    }
}

#[async_trait]
impl WorkUnit for MockWorkUnit {
    async fn process(&self, id: u64) -> Result<WorkOutput, WorkError> {
        // ThreadRng is not Send, so draw before the await point
        let (latency, fail) = self.draw();
        tokio::time::sleep(latency).await;

        if fail {
            return Err(WorkError::Failed {
                id,
                reason: "simulated downstream failure".to_string(),
            });
        }

        Ok(WorkOutput {
            id,
            data: "processed".to_string(),
            timestamp: Utc::now(),
        })
    }
}
