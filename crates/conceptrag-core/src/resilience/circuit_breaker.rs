//! Circuit breaker state machine
//!
//! Per-operation-name breaker with the classic three states. The only
//! legal path back from open is through half-open: an open breaker
//! admits again only after its timeout, and must then observe
//! `success_threshold` consecutive successes before closing.

use crate::error::{ConceptRagError, Result};
use serde::Serialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Breaker tuning per operation name
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Successes in half-open required to close
    pub success_threshold: u32,
    /// Time the circuit stays open before probing
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(60),
        }
    }
}

/// Breaker state as observed in metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Snapshot of one breaker's counters
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CircuitMetrics {
    pub state: CircuitState,
    pub total_requests: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub rejections: u64,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
    total_requests: u64,
    total_successes: u64,
    total_failures: u64,
    rejections: u64,
}

/// Per-name circuit breaker
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                half_open_successes: 0,
                opened_at: None,
                total_requests: 0,
                total_successes: 0,
                total_failures: 0,
                rejections: 0,
            }),
        }
    }

    /// Admit or fast-fail. Open circuits answer without touching the
    /// underlying call; an expired open window flips to half-open.
    pub fn try_admit(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.total_requests += 1;
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.config.open_timeout {
                    tracing::debug!(name = %self.name, "circuit half-open, probing");
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_successes = 0;
                    Ok(())
                } else {
                    inner.rejections += 1;
                    Err(ConceptRagError::CircuitBreakerOpen(self.name.clone()))
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.total_successes += 1;
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.success_threshold {
                    tracing::info!(name = %self.name, "circuit closed");
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.total_failures += 1;
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    tracing::warn!(name = %self.name, "circuit opened");
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                tracing::warn!(name = %self.name, "probe failed, circuit re-opened");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::Open => {}
        }
    }

    pub fn metrics(&self) -> CircuitMetrics {
        let inner = self.lock();
        CircuitMetrics {
            state: inner.state,
            total_requests: inner.total_requests,
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
            rejections: inner.rejections,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic while holding it; the counters
        // are still usable
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
