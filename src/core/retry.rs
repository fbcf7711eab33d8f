//! Lock-hold-and-retry-once engine shared by the domain executor and the
//! transactional interceptor.
//!
//! ```text
//! AcquireLock -> Executing -> Success
//!                          -> TransientFailure -> Backoff -> RetryExecuting -> Success | Fail
//!                          -> FatalFailure
//! ```
//!
//! The lock guard lives for the whole run, so it is released on entering any
//! terminal state.

use crate::core::registry::LockHandle;
use crate::domain::ports::Backoff;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    AcquireLock,
    Executing,
    TransientFailure,
    Backoff,
    RetryExecuting,
    Success,
    Fail,
    FatalFailure,
}

/// How a serialized run ended when it did not succeed.
#[derive(Debug)]
pub enum RetryFailure<E> {
    /// First attempt failed with a non-retryable error.
    Fatal(E),
    /// The single retry failed too; the error is the retry's, untouched.
    AfterRetry(E),
    /// The deadline passed while waiting for the lock or before the retry.
    Deadline { last: Option<E>, elapsed: Duration },
}

pub struct SerializedRun<'a> {
    pub lock: &'a LockHandle,
    pub scope: &'a str,
    pub backoff: &'a dyn Backoff,
    pub deadline: Option<Duration>,
}

impl SerializedRun<'_> {
    pub fn execute<T, E, P, F>(&self, is_transient: P, mut op: F) -> Result<T, RetryFailure<E>>
    where
        P: Fn(&E) -> bool,
        F: FnMut() -> Result<T, E>,
        E: std::fmt::Display,
    {
        let started = Instant::now();
        self.trace(AttemptState::AcquireLock);

        let _guard = match self.deadline {
            Some(deadline) => match self.lock.try_lock_for(deadline) {
                Some(guard) => guard,
                None => {
                    tracing::warn!(scope = self.scope, ?deadline, "timed out waiting for lock");
                    return Err(RetryFailure::Deadline {
                        last: None,
                        elapsed: started.elapsed(),
                    });
                }
            },
            None => self.lock.lock(),
        };

        self.trace(AttemptState::Executing);
        let error = match op() {
            Ok(value) => {
                self.trace(AttemptState::Success);
                return Ok(value);
            }
            Err(error) => error,
        };

        if !is_transient(&error) {
            self.trace(AttemptState::FatalFailure);
            return Err(RetryFailure::Fatal(error));
        }

        self.trace(AttemptState::TransientFailure);
        let delay = self.backoff.delay();
        if let Some(deadline) = self.deadline {
            if started.elapsed() + delay > deadline {
                self.trace(AttemptState::Fail);
                return Err(RetryFailure::Deadline {
                    last: Some(error),
                    elapsed: started.elapsed(),
                });
            }
        }

        tracing::warn!(
            scope = self.scope,
            ?delay,
            "transient contention, retrying once: {}",
            error
        );
        self.trace(AttemptState::Backoff);
        std::thread::sleep(delay);

        self.trace(AttemptState::RetryExecuting);
        match op() {
            Ok(value) => {
                self.trace(AttemptState::Success);
                Ok(value)
            }
            Err(error) => {
                self.trace(AttemptState::Fail);
                Err(RetryFailure::AfterRetry(error))
            }
        }
    }

    fn trace(&self, state: AttemptState) {
        tracing::trace!(scope = self.scope, ?state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backoff::{FixedBackoff, NoBackoff};

    fn run<'a>(lock: &'a LockHandle, backoff: &'a dyn Backoff) -> SerializedRun<'a> {
        SerializedRun {
            lock,
            scope: "test",
            backoff,
            deadline: None,
        }
    }

    #[test]
    fn test_success_runs_once() {
        let lock = LockHandle::new("t");
        let mut calls = 0;
        let result: Result<u8, RetryFailure<String>> = run(&lock, &NoBackoff).execute(
            |_: &String| true,
            || {
                calls += 1;
                Ok(1)
            },
        );
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls, 1);
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_second_failure_is_not_retried() {
        let lock = LockHandle::new("t");
        let mut calls = 0;
        let result: Result<(), _> = run(&lock, &NoBackoff).execute(
            |_: &String| true,
            || {
                calls += 1;
                Err(format!("deadlock #{}", calls))
            },
        );
        match result {
            Err(RetryFailure::AfterRetry(e)) => assert_eq!(e, "deadlock #2"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(calls, 2);
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_fatal_failure_skips_retry() {
        let lock = LockHandle::new("t");
        let mut calls = 0;
        let result: Result<(), _> = run(&lock, &NoBackoff).execute(
            |_: &String| false,
            || {
                calls += 1;
                Err("nope".to_string())
            },
        );
        assert!(matches!(result, Err(RetryFailure::Fatal(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_deadline_blocks_retry_that_cannot_start_in_time() {
        let lock = LockHandle::new("t");
        let backoff = FixedBackoff(Duration::from_secs(5));
        let runner = SerializedRun {
            lock: &lock,
            scope: "test",
            backoff: &backoff,
            deadline: Some(Duration::from_millis(50)),
        };
        let mut calls = 0;
        let result: Result<(), _> = runner.execute(
            |_: &String| true,
            || {
                calls += 1;
                Err("deadlock".to_string())
            },
        );
        assert!(matches!(result, Err(RetryFailure::Deadline { last: Some(_), .. })));
        assert_eq!(calls, 1);
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_deadline_bounds_lock_wait() {
        let lock = LockHandle::new("t");
        let _held = lock.lock();
        let runner = SerializedRun {
            lock: &lock,
            scope: "test",
            backoff: &NoBackoff,
            deadline: Some(Duration::from_millis(20)),
        };
        let result: Result<(), RetryFailure<String>> = runner.execute(|_| true, || Ok(()));
        assert!(matches!(result, Err(RetryFailure::Deadline { last: None, .. })));
    }
}
