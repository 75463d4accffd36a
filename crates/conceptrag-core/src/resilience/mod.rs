//! Resilience kernel
//!
//! Composes bulkhead, circuit breaker, timeout, and retry around any
//! async operation, keyed by operation name. Breaker and bulkhead state
//! are the only mutable shared state on the query path; observers read
//! consistent snapshots via [`ResilienceKernel::get_metrics`].

mod bulkhead;
mod circuit_breaker;
mod retry;

pub use bulkhead::{Bulkhead, BulkheadConfig, BulkheadMetrics, BulkheadPermit};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitMetrics, CircuitState};
pub use retry::{run_with_retry, RetryConfig};

use crate::error::{ConceptRagError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Full per-operation resilience policy; every layer is optional
#[derive(Debug, Clone, Copy, Default)]
pub struct ResilienceConfig {
    pub bulkhead: Option<BulkheadConfig>,
    pub circuit_breaker: Option<CircuitBreakerConfig>,
    pub timeout: Option<Duration>,
    pub retry: Option<RetryConfig>,
}

/// Bundled defaults per dependency class
pub mod profiles {
    use super::*;

    /// Remote LLM calls: breaker 5/2/60s, 30s timeout, 3 retries
    pub fn llm_api() -> ResilienceConfig {
        ResilienceConfig {
            bulkhead: None,
            circuit_breaker: Some(CircuitBreakerConfig {
                failure_threshold: 5,
                success_threshold: 2,
                open_timeout: Duration::from_secs(60),
            }),
            timeout: Some(Duration::from_secs(30)),
            retry: Some(RetryConfig {
                max_retries: 3,
                ..RetryConfig::default()
            }),
        }
    }

    /// Embedding calls: bulkhead 10/20, 10s timeout
    pub fn embedding() -> ResilienceConfig {
        ResilienceConfig {
            bulkhead: Some(BulkheadConfig {
                max_concurrent: 10,
                max_queue: 20,
            }),
            circuit_breaker: None,
            timeout: Some(Duration::from_secs(10)),
            retry: None,
        }
    }

    /// Store access: 5 retries, 5s timeout
    pub fn database() -> ResilienceConfig {
        ResilienceConfig {
            bulkhead: None,
            circuit_breaker: None,
            timeout: Some(Duration::from_secs(5)),
            retry: Some(RetryConfig {
                max_retries: 5,
                ..RetryConfig::default()
            }),
        }
    }
}

/// The three built-in profiles, tunable through configuration
#[derive(Debug, Clone, Copy)]
pub struct ResilienceProfiles {
    pub llm_api: ResilienceConfig,
    pub embedding: ResilienceConfig,
    pub database: ResilienceConfig,
}

impl Default for ResilienceProfiles {
    fn default() -> Self {
        Self {
            llm_api: profiles::llm_api(),
            embedding: profiles::embedding(),
            database: profiles::database(),
        }
    }
}

impl ResilienceProfiles {
    /// Apply the configured timeout and retry overrides
    pub fn from_tuning(tuning: &crate::config::ResilienceTuning) -> Self {
        let mut this = Self::default();
        this.llm_api.timeout = Some(Duration::from_secs(tuning.llm_timeout_secs));
        if let Some(retry) = this.llm_api.retry.as_mut() {
            retry.max_retries = tuning.llm_max_retries;
        }
        this.embedding.timeout = Some(Duration::from_secs(tuning.embedding_timeout_secs));
        this.database.timeout = Some(Duration::from_secs(tuning.database_timeout_secs));
        if let Some(retry) = this.database.retry.as_mut() {
            retry.max_retries = tuning.database_max_retries;
        }
        this
    }
}

/// Combined metrics for one operation name
#[derive(Debug, Clone, Serialize)]
pub struct OperationMetrics {
    pub name: String,
    pub circuit: Option<CircuitMetrics>,
    pub bulkhead: Option<BulkheadMetrics>,
}

/// Overall health as seen by the status surface
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthSummary {
    pub open_circuits: Vec<String>,
    pub saturated_bulkheads: Vec<String>,
}

impl HealthSummary {
    pub fn is_healthy(&self) -> bool {
        self.open_circuits.is_empty() && self.saturated_bulkheads.is_empty()
    }
}

/// Process-wide kernel holding per-name breakers and bulkheads
#[derive(Default)]
pub struct ResilienceKernel {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    bulkheads: RwLock<HashMap<String, Arc<Bulkhead>>>,
}

impl ResilienceKernel {
    pub fn new() -> Self {
        Self::default()
    }

    fn breaker(&self, name: &str, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        if let Some(found) = self.breakers.read().ok().and_then(|m| m.get(name).cloned()) {
            return found;
        }
        let mut map = match self.breakers.write() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, config)))
            .clone()
    }

    fn bulkhead(&self, name: &str, config: BulkheadConfig) -> Arc<Bulkhead> {
        if let Some(found) = self.bulkheads.read().ok().and_then(|m| m.get(name).cloned()) {
            return found;
        }
        let mut map = match self.bulkheads.write() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(name.to_string())
            .or_insert_with(|| Arc::new(Bulkhead::new(name, config)))
            .clone()
    }

    /// Execute an operation under the given policy, outside-in:
    /// bulkhead admission, circuit check, then timeout over the retried
    /// call. `op` is re-invoked per retry attempt.
    pub async fn execute<T, F, Fut>(
        &self,
        name: &str,
        config: &ResilienceConfig,
        op: F,
    ) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _slot = match config.bulkhead {
            Some(cfg) => Some(self.bulkhead(name, cfg).acquire().await?),
            None => None,
        };

        let breaker = config
            .circuit_breaker
            .map(|cfg| self.breaker(name, cfg));
        if let Some(ref breaker) = breaker {
            breaker.try_admit()?;
        }

        let run = async {
            match &config.retry {
                Some(retry_config) => run_with_retry(retry_config, &op).await,
                None => op().await,
            }
        };

        let result = match config.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(result) => result,
                Err(_) => Err(ConceptRagError::Timeout(name.to_string())),
            },
            None => run.await,
        };

        if let Some(breaker) = breaker {
            match &result {
                Ok(_) => breaker.record_success(),
                // Missing entities and bad input are answers, not
                // dependency failures
                Err(e) if e.is_not_found() || matches!(e, ConceptRagError::Validation(_)) => {
                    breaker.record_success()
                }
                Err(_) => breaker.record_failure(),
            }
        }

        result
    }

    /// Metrics for one operation name, if it has run
    pub fn get_metrics(&self, name: &str) -> Option<OperationMetrics> {
        let circuit = self
            .breakers
            .read()
            .ok()
            .and_then(|m| m.get(name).map(|b| b.metrics()));
        let bulkhead = self
            .bulkheads
            .read()
            .ok()
            .and_then(|m| m.get(name).map(|b| b.metrics()));
        if circuit.is_none() && bulkhead.is_none() {
            return None;
        }
        Some(OperationMetrics {
            name: name.to_string(),
            circuit,
            bulkhead,
        })
    }

    /// Open circuits and saturated bulkheads across all names
    pub fn health_summary(&self) -> HealthSummary {
        let mut summary = HealthSummary::default();
        if let Ok(breakers) = self.breakers.read() {
            for (name, breaker) in breakers.iter() {
                if breaker.state() == CircuitState::Open {
                    summary.open_circuits.push(name.clone());
                }
            }
        }
        if let Ok(bulkheads) = self.bulkheads.read() {
            for (name, bulkhead) in bulkheads.iter() {
                if bulkhead.is_saturated() {
                    summary.saturated_bulkheads.push(name.clone());
                }
            }
        }
        summary.open_circuits.sort();
        summary.saturated_bulkheads.sort();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn breaker_config(open_timeout: Duration) -> ResilienceConfig {
        ResilienceConfig {
            circuit_breaker: Some(CircuitBreakerConfig {
                failure_threshold: 5,
                success_threshold: 2,
                open_timeout,
            }),
            ..ResilienceConfig::default()
        }
    }

    #[tokio::test]
    async fn test_circuit_lifecycle() {
        let kernel = ResilienceKernel::new();
        let config = breaker_config(Duration::from_millis(100));

        // Five consecutive failures open the circuit
        for _ in 0..5 {
            let result: Result<()> = kernel
                .execute("llm", &config, || async {
                    Err(ConceptRagError::transient("llm", "down"))
                })
                .await;
            assert!(result.is_err());
        }

        // Open: rejected fast without invoking the operation
        let invoked = AtomicU32::new(0);
        let start = Instant::now();
        let result: Result<()> = kernel
            .execute("llm", &config, || async {
                invoked.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(start.elapsed() < Duration::from_millis(10));
        assert!(matches!(result, Err(ConceptRagError::CircuitBreakerOpen(_))));
        assert_eq!(invoked.load(Ordering::SeqCst), 0);

        // After the open window, two successes close the circuit
        tokio::time::sleep(Duration::from_millis(110)).await;
        for _ in 0..2 {
            kernel
                .execute("llm", &config, || async { Ok(()) })
                .await
                .unwrap();
        }

        let metrics = kernel.get_metrics("llm").unwrap().circuit.unwrap();
        assert_eq!(metrics.state, CircuitState::Closed);
        assert!(metrics.total_successes >= 2);
        assert_eq!(metrics.total_failures, 5);
        assert_eq!(metrics.rejections, 1);
    }

    #[tokio::test]
    async fn test_success_increments_metrics_by_one() {
        let kernel = ResilienceKernel::new();
        let config = breaker_config(Duration::from_secs(60));

        kernel
            .execute("op", &config, || async { Ok(1u32) })
            .await
            .unwrap();
        let before = kernel.get_metrics("op").unwrap().circuit.unwrap();

        kernel
            .execute("op", &config, || async { Ok(2u32) })
            .await
            .unwrap();
        let after = kernel.get_metrics("op").unwrap().circuit.unwrap();
        assert_eq!(after.total_successes, before.total_successes + 1);
    }

    #[tokio::test]
    async fn test_timeout_surfaces() {
        let kernel = ResilienceKernel::new();
        let config = ResilienceConfig {
            timeout: Some(Duration::from_millis(20)),
            ..ResilienceConfig::default()
        };

        let result: Result<()> = kernel
            .execute("slow", &config, || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ConceptRagError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_not_found_does_not_trip_breaker() {
        let kernel = ResilienceKernel::new();
        let config = breaker_config(Duration::from_secs(60));

        for _ in 0..10 {
            let result: Result<()> = kernel
                .execute("lookup", &config, || async {
                    Err(ConceptRagError::ConceptNotFound("x".into()))
                })
                .await;
            assert!(result.is_err());
        }
        let metrics = kernel.get_metrics("lookup").unwrap().circuit.unwrap();
        assert_eq!(metrics.state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_health_summary() {
        let kernel = ResilienceKernel::new();
        let config = breaker_config(Duration::from_secs(60));
        for _ in 0..5 {
            let _: Result<()> = kernel
                .execute("llm", &config, || async {
                    Err(ConceptRagError::transient("llm", "down"))
                })
                .await;
        }

        let summary = kernel.health_summary();
        assert_eq!(summary.open_circuits, vec!["llm".to_string()]);
        assert!(!summary.is_healthy());
    }

    #[tokio::test]
    async fn test_retry_layer_inside_execute() {
        let kernel = ResilienceKernel::new();
        let config = ResilienceConfig {
            retry: Some(RetryConfig {
                max_retries: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
            }),
            ..ResilienceConfig::default()
        };

        let calls = AtomicU32::new(0);
        let result = kernel
            .execute("flaky", &config, || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ConceptRagError::transient("flaky", "first"))
                } else {
                    Ok(7u32)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
