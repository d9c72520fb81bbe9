// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Retry with exponential backoff
//!
//! A [`RetryPolicy`] wraps any fallible async operation. Attempt `n` (for
//! `n >= 2`) is preceded by a wait of `initial_delay * multiplier^(n-2)`, so an
//! operation gets at most `max_attempts` attempts and `max_attempts - 1` waits.
//!
//! Waits race a [`CancellationToken`]. Once the token fires no new wait is
//! started and a wait in progress ends immediately. An attempt already in
//! flight is allowed to finish.

use std::{
    fmt,
    future::Future,
    pin::pin,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
    time::Duration,
};

use tokio_retry::Retry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{HarnessError, HarnessResult};

/// Backoff settings for model calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            initial_delay: Self::DEFAULT_INITIAL_DELAY,
            backoff_multiplier: Self::DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Default number of attempts, first call included
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    /// Default wait before the second attempt
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(2);
    /// Default growth factor between waits
    pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
    /// Upper bound on any single wait
    pub const MAX_DELAY: Duration = Duration::from_secs(300);

    /// Create a new retry policy
    ///
    /// # Errors
    ///
    /// Returns a setup error if `max_attempts` is zero, the multiplier is
    /// below 1.0 or not finite, or the initial delay exceeds [`Self::MAX_DELAY`]
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        backoff_multiplier: f64,
    ) -> HarnessResult<Self> {
        if max_attempts == 0 {
            return Err(HarnessError::setup("Retry max_attempts must be at least 1"));
        }
        if !backoff_multiplier.is_finite() || backoff_multiplier < 1.0 {
            return Err(HarnessError::setup(format!(
                "Invalid backoff multiplier: {backoff_multiplier} (must be >= 1.0)"
            )));
        }
        if initial_delay > Self::MAX_DELAY {
            return Err(HarnessError::setup(format!(
                "Initial retry delay {initial_delay:?} exceeds {:?}",
                Self::MAX_DELAY
            )));
        }
        Ok(Self {
            max_attempts,
            initial_delay,
            backoff_multiplier,
        })
    }

    /// A policy that makes exactly one attempt
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Get the maximum number of attempts
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Get the wait before the second attempt
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Get the backoff multiplier
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// The waits between attempts, in order
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let multiplier = self.backoff_multiplier;
        let waits = usize::try_from(self.max_attempts.saturating_sub(1)).unwrap_or(usize::MAX);
        std::iter::successors(Some(self.initial_delay), move |delay| {
            let next = (delay.as_secs_f64() * multiplier).min(Self::MAX_DELAY.as_secs_f64());
            Some(Duration::from_secs_f64(next))
        })
        .take(waits)
    }

    /// Run `operation` until it succeeds, attempts run out, or `cancel` fires
    /// during a wait
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Clone + fmt::Display,
    {
        let attempts = AtomicU32::new(0);
        let in_attempt = AtomicBool::new(false);
        let last_error: Mutex<Option<E>> = Mutex::new(None);

        let schedule_token = cancel.clone();
        let delays = self
            .delays()
            .take_while(move |_| !schedule_token.is_cancelled());

        let action = {
            let (attempts, in_attempt, last_error) = (&attempts, &in_attempt, &last_error);
            let mut operation = operation;
            move || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                in_attempt.store(true, Ordering::SeqCst);
                let call = operation();
                async move {
                    debug!(attempt, "Starting attempt");
                    let result = call.await;
                    in_attempt.store(false, Ordering::SeqCst);
                    if let Err(error) = &result {
                        warn!(attempt, error = %error, "Attempt failed");
                        if let Ok(mut slot) = last_error.lock() {
                            *slot = Some(error.clone());
                        }
                    }
                    result
                }
            }
        };

        let mut retry = pin!(Retry::spawn(delays, action));
        let result = tokio::select! {
            result = &mut retry => result,
            () = cancel.cancelled() => {
                if in_attempt.load(Ordering::SeqCst) {
                    // No further waits are scheduled once cancelled
                    retry.await
                } else {
                    let made = attempts.load(Ordering::SeqCst);
                    debug!(attempts = made, "Retry wait cancelled");
                    return Err(RetryError::Cancelled {
                        attempts: made,
                        last_error: last_error.lock().ok().and_then(|mut slot| slot.take()),
                    });
                }
            }
        };

        let made = attempts.load(Ordering::SeqCst);
        result.map_err(|last_error| {
            if made < self.max_attempts && cancel.is_cancelled() {
                RetryError::Cancelled {
                    attempts: made,
                    last_error: Some(last_error),
                }
            } else {
                RetryError::Exhausted {
                    attempts: made,
                    last_error,
                }
            }
        })
    }
}

/// Failure surfaced by [`RetryPolicy::run`]
#[derive(Debug, Clone, PartialEq)]
pub enum RetryError<E> {
    /// Every attempt failed
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error from the final attempt
        last_error: E,
    },
    /// Cancellation stopped the retries early
    Cancelled {
        /// Attempts made
        attempts: u32,
        /// Error from the latest attempt, if one had completed
        last_error: Option<E>,
    },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Cancelled { attempts, .. } => {
                *attempts
            }
        }
    }

    /// Check if the retries were cut short by cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted {
                attempts,
                last_error,
            } => write!(f, "{last_error} (after {attempts} attempts)"),
            RetryError::Cancelled {
                attempts,
                last_error: Some(last_error),
            } => write!(f, "{last_error} (cancelled after {attempts} attempts)"),
            RetryError::Cancelled {
                attempts,
                last_error: None,
            } => write!(f, "cancelled after {attempts} attempts"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}
