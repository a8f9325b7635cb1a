//! Integration tests for the retry module
//!
//! These tests drive providers built by the factory end to end, covering
//! attempt counts, handler cancellation, fast failures and concurrency.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::retry::{
    CodedError, ConfigurableRetryFactory, RetryError, RetryLogicProvider, StatsObserver,
    Termination,
};
use crate::types::RetryOptions;

/// Server failure carrying one or more error numbers
#[derive(Debug, Clone)]
struct ServerError {
    numbers: Vec<i32>,
    do_not_reconnect: bool,
}

impl ServerError {
    fn new(number: i32) -> Self {
        Self {
            numbers: vec![number],
            do_not_reconnect: false,
        }
    }

    /// Deadlock victim, in the intrinsic transient list
    fn deadlock() -> Self {
        Self::new(1205)
    }

    /// Invalid object name, never transient
    fn invalid_object() -> Self {
        Self::new(208)
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server error {:?}", self.numbers)
    }
}

impl std::error::Error for ServerError {}

impl CodedError for ServerError {
    fn error_codes(&self) -> Vec<i32> {
        self.numbers.clone()
    }

    fn suppresses_retry(&self) -> bool {
        self.do_not_reconnect
    }
}

/// Options with short waits for tests
fn quick_options(number_of_tries: u32) -> RetryOptions {
    RetryOptions::builder()
        .number_of_tries(number_of_tries)
        .delta_time(Duration::from_millis(1))
        .max_time_interval(Duration::from_millis(10))
        .build()
        .unwrap()
}

fn fixed_provider(number_of_tries: u32) -> RetryLogicProvider {
    ConfigurableRetryFactory::create_fixed_retry_provider(&quick_options(number_of_tries)).unwrap()
}

fn always_failing(
    provider: &RetryLogicProvider,
    error: ServerError,
) -> (u32, RetryError<ServerError>) {
    let calls = AtomicU32::new(0);
    let err = provider
        .execute(Some("SELECT 1"), || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(error.clone())
        })
        .unwrap_err();
    (calls.load(Ordering::SeqCst), err)
}

fn cancel_at(provider: &RetryLogicProvider, retry_count: u32) {
    provider.subscribe_retrying(move |args| {
        if args.retry_count == retry_count {
            args.cancel = true;
        }
    });
}

// ============================================================================
// Attempt counts
// ============================================================================

#[test]
fn test_exhausts_after_number_of_tries() {
    let provider = fixed_provider(3);
    let (calls, err) = always_failing(&provider, ServerError::deadlock());

    assert_eq!(calls, 3);
    assert!(err.is_exhausted());
    assert_eq!(err.causes().len(), 3);
    assert!(err
        .to_string()
        .contains("exceeded the maximum of 3 attempt(s)"));
}

#[test]
fn test_attempt_counts_for_various_tries() {
    for number_of_tries in [1, 2, 5] {
        let provider = fixed_provider(number_of_tries);
        let (calls, err) = always_failing(&provider, ServerError::deadlock());

        assert_eq!(calls, number_of_tries);
        assert!(err.is_exhausted());
        assert_eq!(err.causes().len() as u32, number_of_tries);
    }
}

#[test]
fn test_success_after_transient_failures() {
    let provider = fixed_provider(5);
    let calls = AtomicU32::new(0);

    let result = provider.execute(Some("SELECT 1"), || {
        if calls.fetch_add(1, Ordering::SeqCst) < 3 {
            Err(ServerError::new(40613))
        } else {
            Ok("rows")
        }
    });

    assert_eq!(result.unwrap(), "rows");
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

// ============================================================================
// Handler cancellation
// ============================================================================

#[test]
fn test_cancel_at_first_retry() {
    let provider = fixed_provider(3);
    cancel_at(&provider, 1);

    let (calls, err) = always_failing(&provider, ServerError::deadlock());

    assert_eq!(calls, 1);
    assert!(err.is_cancelled_by_handler());
    assert_eq!(err.causes().len(), 1);
    assert!(err.to_string().contains("canceled at attempt 1"));
}

#[test]
fn test_cancel_at_second_retry() {
    let provider = fixed_provider(3);
    cancel_at(&provider, 2);

    let (calls, err) = always_failing(&provider, ServerError::deadlock());

    assert_eq!(calls, 2);
    assert_eq!(err.termination(), Some(Termination::CancelledByHandler));
    assert_eq!(err.causes().len(), 2);
}

#[test]
fn test_cause_count_equals_retry_count_on_cancel() {
    for k in 1..5 {
        let provider = fixed_provider(5);
        cancel_at(&provider, k);

        let (_, err) = always_failing(&provider, ServerError::deadlock());
        assert_eq!(err.causes().len() as u32, k);
    }
}

#[test]
fn test_unsubscribed_handler_not_called() {
    let provider = fixed_provider(3);
    let calls = Arc::new(AtomicU32::new(0));

    let id = {
        let calls = Arc::clone(&calls);
        provider.subscribe_retrying(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };
    always_failing(&provider, ServerError::deadlock());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    assert!(provider.unsubscribe_retrying(id));
    always_failing(&provider, ServerError::deadlock());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_incremental_delays_reported_to_handlers() {
    let options = RetryOptions::builder()
        .number_of_tries(4)
        .delta_time(Duration::from_millis(2))
        .max_time_interval(Duration::from_millis(50))
        .build()
        .unwrap();
    let provider = ConfigurableRetryFactory::create_incremental_retry_provider(&options).unwrap();
    let delays = Arc::new(Mutex::new(Vec::new()));
    {
        let delays = Arc::clone(&delays);
        provider.subscribe_retrying(move |args| delays.lock().unwrap().push(args.delay));
    }

    always_failing(&provider, ServerError::deadlock());

    assert_eq!(
        *delays.lock().unwrap(),
        vec![
            Duration::from_millis(2),
            Duration::from_millis(4),
            Duration::from_millis(6),
        ]
    );
}

#[test]
fn test_handlers_run_before_the_wait() {
    let delay = Duration::from_millis(300);
    let options = RetryOptions::builder()
        .number_of_tries(2)
        .delta_time(delay)
        .max_time_interval(Duration::from_secs(1))
        .build()
        .unwrap();
    let provider = ConfigurableRetryFactory::create_fixed_retry_provider(&options).unwrap();

    let notified = Arc::new(Mutex::new(None));
    {
        let notified = Arc::clone(&notified);
        provider.subscribe_retrying(move |args| {
            assert_eq!(args.exceptions.len(), 1);
            assert_eq!(args.delay, delay);
            *notified.lock().unwrap() = Some(Instant::now());
        });
    }

    let started = Mutex::new(Vec::new());
    let _ = provider.execute(None, || {
        started.lock().unwrap().push(Instant::now());
        Err::<(), _>(ServerError::deadlock())
    });

    let started = started.into_inner().unwrap();
    let notified = notified.lock().unwrap().expect("handler was not called");
    assert_eq!(started.len(), 2);
    assert!(notified.duration_since(started[0]) < delay / 3);
    assert!(started[1].duration_since(notified) >= delay);
}

// ============================================================================
// Fast failures
// ============================================================================

#[test]
fn test_non_transient_error_is_returned_untouched() {
    let provider = fixed_provider(5);
    let (calls, err) = always_failing(&provider, ServerError::invalid_object());

    assert_eq!(calls, 1);
    assert!(err.is_original());
    assert_eq!(err.into_original().unwrap().numbers, vec![208]);
}

#[test]
fn test_any_transient_number_qualifies() {
    let provider = fixed_provider(2);
    let error = ServerError {
        numbers: vec![208, 1205],
        do_not_reconnect: false,
    };

    let (calls, err) = always_failing(&provider, error);
    assert_eq!(calls, 2);
    assert!(err.is_exhausted());
}

#[test]
fn test_do_not_reconnect_suppresses_retry() {
    let provider = fixed_provider(5);
    let error = ServerError {
        numbers: vec![1205],
        do_not_reconnect: true,
    };

    let (calls, err) = always_failing(&provider, error);
    assert_eq!(calls, 1);
    assert!(err.is_original());
}

#[test]
fn test_unauthorized_command_not_retried() {
    let options = RetryOptions::builder()
        .number_of_tries(5)
        .delta_time(Duration::from_millis(1))
        .max_time_interval(Duration::from_millis(1))
        .authorized_sql_condition(|sql| sql.trim_start().starts_with("SELECT"))
        .build()
        .unwrap();
    let provider = ConfigurableRetryFactory::create_fixed_retry_provider(&options).unwrap();
    let calls = AtomicU32::new(0);

    let err = provider
        .execute(Some("UPDATE orders SET shipped = 1"), || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(ServerError::deadlock())
        })
        .unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(err.is_original());

    // Connection opens carry no command text and are retried
    let calls = AtomicU32::new(0);
    let err = provider
        .execute(None, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(ServerError::deadlock())
        })
        .unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert!(err.is_exhausted());
}

#[test]
fn test_none_provider_runs_once() {
    let provider = ConfigurableRetryFactory::create_none_retry_provider();
    let stats = Arc::new(StatsObserver::new());
    let provider = provider.with_observer(Arc::clone(&stats));

    let (calls, err) = always_failing(&provider, ServerError::deadlock());

    assert_eq!(calls, 1);
    assert!(err.is_original());
    assert_eq!(stats.retries(), 0);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_invocations_keep_their_own_causes() {
    let provider = Arc::new(fixed_provider(4));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let provider = Arc::clone(&provider);
            thread::spawn(move || {
                let err = provider
                    .execute(Some("SELECT 1"), || Err::<(), _>(ServerError::deadlock()))
                    .unwrap_err();
                err.causes().len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 4);
    }
}

#[test]
fn test_provider_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RetryLogicProvider>();
}

// ============================================================================
// Async execution
// ============================================================================

#[tokio::test]
async fn test_async_exhausts_after_number_of_tries() {
    let provider = fixed_provider(3);
    let token = CancellationToken::new();
    let calls = AtomicU32::new(0);

    let err = provider
        .execute_async(Some("SELECT 1"), &token, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ServerError::deadlock()) }
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(err.is_exhausted());
    assert_eq!(err.causes().len(), 3);
}

#[tokio::test]
async fn test_async_cancelled_during_wait() {
    let options = RetryOptions::builder()
        .number_of_tries(3)
        .delta_time(Duration::from_secs(30))
        .max_time_interval(Duration::from_secs(30))
        .build()
        .unwrap();
    let provider = ConfigurableRetryFactory::create_fixed_retry_provider(&options).unwrap();
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let calls = AtomicU32::new(0);
    let err = provider
        .execute_async(None, &token, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ServerError::deadlock()) }
        })
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(!err.is_exhausted());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_async_handler_cancel() {
    let provider = fixed_provider(5);
    cancel_at(&provider, 2);
    let token = CancellationToken::new();

    let err = provider
        .execute_async(Some("SELECT 1"), &token, || async {
            Err::<(), _>(ServerError::deadlock())
        })
        .await
        .unwrap_err();

    assert!(err.is_cancelled_by_handler());
    assert_eq!(err.causes().len(), 2);
}

#[tokio::test]
async fn test_async_concurrent_tasks() {
    let provider = Arc::new(fixed_provider(3));
    let mut tasks = Vec::new();

    for _ in 0..5 {
        let provider = Arc::clone(&provider);
        tasks.push(tokio::spawn(async move {
            let token = CancellationToken::new();
            let err = provider
                .execute_async(None, &token, || async {
                    Err::<(), _>(ServerError::deadlock())
                })
                .await
                .unwrap_err();
            err.causes().len()
        }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap(), 3);
    }
}
