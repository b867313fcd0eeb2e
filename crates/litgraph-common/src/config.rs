//! Configuration surface recognized for a run and for the process (spec §6).

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token-bucket + retry policy shared by both providers (spec §4.1).
#[derive(Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Bucket capacity (max burst).
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Tokens added per second.
    #[serde(default = "default_refill_per_sec")]
    pub refill_per_sec: f64,
    /// Max time to wait for a token before failing with RateLimited.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl fmt::Debug for RateLimitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitConfig")
            .field("capacity", &self.capacity)
            .field("refill_per_sec", &self.refill_per_sec)
            .field("acquire_timeout_ms", &self.acquire_timeout_ms)
            .finish()
    }
}

fn default_capacity() -> u32 { 10 }
fn default_refill_per_sec() -> f64 { 10.0 }
fn default_acquire_timeout_ms() -> u64 { 30_000 }

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            refill_per_sec: default_refill_per_sec(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

/// Retry/backoff policy (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
}

fn default_max_attempts() -> u32 { 5 }
fn default_base_delay_ms() -> u64 { 200 }
fn default_backoff_factor() -> f64 { 2.0 }
fn default_max_delay_ms() -> u64 { 10_000 }
fn default_jitter_ratio() -> f64 { 0.2 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ratio: default_jitter_ratio(),
        }
    }
}

/// Connection/auth config for one external provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("rate_limit", &self.rate_limit)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Graph + vector store connection config (spec §6 Store scope).
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub graph_uri: String,
    pub graph_user: String,
    pub graph_password: Option<SecretString>,
    pub vector_store_path: String,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
    #[serde(default)]
    pub embedding_model_id: String,
}

fn default_embedding_dim() -> usize { 768 }

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("graph_uri", &self.graph_uri)
            .field("graph_user", &self.graph_user)
            .field("graph_password", &self.graph_password.as_ref().map(|_| "<redacted>"))
            .field("vector_store_path", &self.vector_store_path)
            .field("embedding_dim", &self.embedding_dim)
            .field("embedding_model_id", &self.embedding_model_id)
            .finish()
    }
}

/// Pipeline-wide run configuration, the `start(config)` payload (spec §4.5/§6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub seeds: Vec<String>,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    pub max_papers: Option<usize>,
    #[serde(default = "default_max_fanout")]
    pub max_fanout_per_paper: usize,
    #[serde(default = "default_true")]
    pub analyze_enabled: bool,
    #[serde(default = "default_true")]
    pub embed_enabled: bool,
    #[serde(default = "default_true")]
    pub use_metadata: bool,
    #[serde(default)]
    pub use_full_text: bool,
    #[serde(default)]
    pub stage_worker_counts: StageWorkerCounts,
    #[serde(default)]
    pub queue_capacities: QueueCapacities,
    #[serde(default = "default_checkpoint_every_n")]
    pub checkpoint_every_n: usize,
    #[serde(default)]
    pub resume: bool,
}

fn default_max_depth() -> u32 { 2 }
fn default_max_fanout() -> usize { 20 }
fn default_true() -> bool { true }
fn default_checkpoint_every_n() -> usize { 500 }

/// Worker pool sizes per stage (spec §4.5's 4-integer `stage_worker_counts`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageWorkerCounts {
    pub discover: usize,
    pub fetch: usize,
    pub analyze: usize,
    pub persist: usize,
}

impl Default for StageWorkerCounts {
    fn default() -> Self {
        Self { discover: 1, fetch: 4, analyze: 4, persist: 3 }
    }
}

/// Bounded-channel capacities between stages (spec §4.5's 3-integer `queue_capacities`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueCapacities {
    pub qa: usize,
    pub qb: usize,
    pub qc: usize,
}

impl Default for QueueCapacities {
    fn default() -> Self {
        Self { qa: 256, qb: 256, qc: 256 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_config_debug_redacts_api_key() {
        let cfg = ProviderConfig {
            base_url: "https://example.test".into(),
            api_key: Some(SecretString::from("super-secret".to_string())),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
        };
        let debugged = format!("{:?}", cfg);
        assert!(!debugged.contains("super-secret"));
        assert!(debugged.contains("<redacted>"));
    }

    #[test]
    fn store_config_debug_redacts_password() {
        let cfg = StoreConfig {
            graph_uri: "postgres://localhost/litgraph".into(),
            graph_user: "litgraph".into(),
            graph_password: Some(SecretString::from("hunter2".to_string())),
            vector_store_path: "./data/vectors".into(),
            embedding_dim: 768,
            embedding_model_id: "test-model".into(),
        };
        let debugged = format!("{:?}", cfg);
        assert!(!debugged.contains("hunter2"));
    }
}
