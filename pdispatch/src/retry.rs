//! Kind-driven retry policy and the retrying executor.
//!
//! Rate limits retry up to the attempt budget, honoring the vendor's
//! `retry_after` hint when one was sent. Vendor faults retry exactly once
//! with a short fixed backoff. Everything else surfaces immediately.

use std::future::Future;
use std::time::Duration;

use pcommon::VendorName;
use pprovider::{VendorError, VendorErrorKind};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts allowed for rate-limited failures.
    pub max_attempts: u32,
    /// Extra attempts allowed after a vendor fault.
    pub vendor_fault_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    pub vendor_fault_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            vendor_fault_retries: 1,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            vendor_fault_backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// No retries at all; streams use this once deltas have been delivered.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            vendor_fault_retries: 0,
            ..Self::default()
        }
    }

    pub fn should_retry(&self, attempt: u32, error: &VendorError) -> bool {
        if !error.retryable {
            return false;
        }

        match error.kind {
            VendorErrorKind::RateLimited => attempt < self.max_attempts,
            VendorErrorKind::VendorFault => attempt < 1 + self.vendor_fault_retries,
            _ => false,
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32, error: &VendorError) -> Duration {
        match error.kind {
            VendorErrorKind::RateLimited => error
                .retry_after
                .unwrap_or_else(|| self.backoff_for_attempt(attempt)),
            VendorErrorKind::VendorFault => self.vendor_fault_backoff,
            _ => self.backoff_for_attempt(attempt),
        }
    }

    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = (attempt.saturating_sub(1)) as i32;
        let unbounded = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(unbounded.min(self.max_backoff.as_secs_f64()))
    }
}

pub trait DispatchHooks: Send + Sync {
    fn on_attempt_start(&self, _vendor: &VendorName, _operation: &str, _attempt: u32) {}

    fn on_retry_scheduled(
        &self,
        _vendor: &VendorName,
        _operation: &str,
        _attempt: u32,
        _delay: Duration,
        _error: &VendorError,
    ) {
    }

    fn on_success(&self, _vendor: &VendorName, _operation: &str, _attempts: u32) {}

    fn on_failure(
        &self,
        _vendor: &VendorName,
        _operation: &str,
        _attempts: u32,
        _error: &VendorError,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispatchHooks;

impl DispatchHooks for NoopDispatchHooks {}

pub async fn execute_with_retry<T, Op, OpFuture, Sleep, SleepFuture>(
    vendor: &VendorName,
    operation: &str,
    policy: &RetryPolicy,
    hooks: &dyn DispatchHooks,
    mut execute: Op,
    mut sleep: Sleep,
) -> Result<T, VendorError>
where
    Op: FnMut(u32) -> OpFuture,
    OpFuture: Future<Output = Result<T, VendorError>>,
    Sleep: FnMut(Duration) -> SleepFuture,
    SleepFuture: Future<Output = ()>,
{
    let mut attempt = 1;

    loop {
        hooks.on_attempt_start(vendor, operation, attempt);

        match execute(attempt).await {
            Ok(value) => {
                hooks.on_success(vendor, operation, attempt);
                return Ok(value);
            }
            Err(error) => {
                if policy.should_retry(attempt, &error) {
                    let delay = policy.delay_for_attempt(attempt, &error);
                    warn!(
                        vendor = %vendor,
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        kind = ?error.kind,
                        "retrying vendor call"
                    );
                    hooks.on_retry_scheduled(vendor, operation, attempt, delay, &error);
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                hooks.on_failure(vendor, operation, attempt, &error);
                return Err(error);
            }
        }
    }
}
