use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Closed,
    HalfOpen,
    Open,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::HalfOpen => "half-open",
            State::Open => "open",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub max_failures: u32,
    pub timeout: Duration,
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            timeout: Duration::from_secs(10),
            reset_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Error)]
pub enum BreakerError<E> {
    #[error("circuit breaker is open")]
    Open,

    #[error("call timed out")]
    Timeout,

    #[error("{0}")]
    Call(E),
}

type StateChangeFn = Box<dyn Fn(State, State) + Send + Sync>;

struct Inner {
    state: State,
    failures: u32,
    last_attempt: Instant,
    on_state_change: Option<StateChangeFn>,
}

/// Failure isolation for an unreliable dependency. The mutex guards only the
/// small state transitions; it is never held across the wrapped call.
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: State::Closed,
                failures: 0,
                last_attempt: Instant::now(),
                on_state_change: None,
            }),
        }
    }

    pub fn on_state_change<F>(&self, callback: F)
    where
        F: Fn(State, State) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        inner.on_state_change = Some(Box::new(callback));
    }

    pub async fn call<T, E, F, Fut>(&self, f: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.can_attempt() {
            return Err(BreakerError::Open);
        }

        match tokio::time::timeout(self.config.timeout, f()).await {
            Ok(Ok(value)) => {
                self.record_success();
                Ok(value)
            }
            Ok(Err(err)) => {
                self.record_failure();
                Err(BreakerError::Call(err))
            }
            Err(_) => {
                self.record_failure();
                Err(BreakerError::Timeout)
            }
        }
    }

    pub fn state(&self) -> State {
        self.inner.lock().unwrap().state
    }

    pub fn failures(&self) -> u32 {
        self.inner.lock().unwrap().failures
    }

    /// Remaining wait before an open breaker admits the half-open probe.
    pub fn retry_after(&self) -> Duration {
        let inner = self.inner.lock().unwrap();
        if inner.state != State::Open {
            return Duration::ZERO;
        }
        self.config
            .reset_timeout
            .saturating_sub(inner.last_attempt.elapsed())
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failures = 0;
        Self::set_state(&mut inner, State::Closed);
    }

    fn can_attempt(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();

        if inner.state == State::Open {
            if inner.last_attempt.elapsed() > self.config.reset_timeout {
                Self::set_state(&mut inner, State::HalfOpen);
                return true;
            }
            return false;
        }

        true
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failures = 0;
        inner.last_attempt = Instant::now();

        if inner.state == State::HalfOpen {
            Self::set_state(&mut inner, State::Closed);
        }
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failures += 1;
        inner.last_attempt = Instant::now();

        if inner.state == State::HalfOpen {
            Self::set_state(&mut inner, State::Open);
            return;
        }

        if inner.failures >= self.config.max_failures {
            Self::set_state(&mut inner, State::Open);
        }
    }

    fn set_state(inner: &mut Inner, new_state: State) {
        if inner.state == new_state {
            return;
        }

        let old_state = inner.state;
        inner.state = new_state;

        if let Some(callback) = &inner.on_state_change {
            callback(old_state, new_state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn breaker(max_failures: u32) -> CircuitBreaker {
        CircuitBreaker::new(BreakerConfig {
            max_failures,
            timeout: Duration::from_secs(10),
            reset_timeout: Duration::from_secs(30),
        })
    }

    async fn failing_call(breaker: &CircuitBreaker, calls: &AtomicU32) -> Result<(), BreakerError<&'static str>> {
        breaker
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("declined")
            })
            .await
    }

    #[tokio::test]
    async fn trips_after_max_consecutive_failures() {
        let breaker = breaker(5);
        let calls = AtomicU32::new(0);

        for _ in 0..5 {
            let err = failing_call(&breaker, &calls).await.unwrap_err();
            assert!(matches!(err, BreakerError::Call("declined")));
        }

        assert_eq!(breaker.state(), State::Open);
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        // Sixth call is rejected without invoking the dependency.
        let err = failing_call(&breaker, &calls).await.unwrap_err();
        assert!(matches!(err, BreakerError::Open));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_probe_closes_on_success() {
        let breaker = breaker(1);
        let calls = AtomicU32::new(0);

        failing_call(&breaker, &calls).await.unwrap_err();
        assert_eq!(breaker.state(), State::Open);

        tokio::time::advance(Duration::from_secs(31)).await;

        let result: Result<u32, BreakerError<&'static str>> = breaker
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(breaker.state(), State::Closed);
        assert_eq!(breaker.failures(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_failure_reopens() {
        let breaker = breaker(1);
        let calls = AtomicU32::new(0);

        failing_call(&breaker, &calls).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(31)).await;

        failing_call(&breaker, &calls).await.unwrap_err();
        assert_eq!(breaker.state(), State::Open);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Straight back to rejecting until the next reset window.
        let err = failing_call(&breaker, &calls).await.unwrap_err();
        assert!(matches!(err, BreakerError::Open));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_as_failure() {
        let breaker = CircuitBreaker::new(BreakerConfig {
            max_failures: 1,
            timeout: Duration::from_millis(100),
            reset_timeout: Duration::from_secs(30),
        });

        let result: Result<(), BreakerError<&'static str>> = breaker
            .call(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result.unwrap_err(), BreakerError::Timeout));
        assert_eq!(breaker.state(), State::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn notifies_observer_on_transitions() {
        let breaker = breaker(1);
        let transitions: Arc<std::sync::Mutex<Vec<(State, State)>>> = Arc::default();

        let seen = transitions.clone();
        breaker.on_state_change(move |from, to| {
            seen.lock().unwrap().push((from, to));
        });

        let calls = AtomicU32::new(0);
        failing_call(&breaker, &calls).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(31)).await;
        let _: Result<(), BreakerError<&'static str>> =
            breaker.call(|| async { Ok(()) }).await;

        let seen = transitions.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (State::Closed, State::Open),
                (State::Open, State::HalfOpen),
                (State::HalfOpen, State::Closed),
            ]
        );
    }
}
