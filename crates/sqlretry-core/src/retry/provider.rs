//! Retry logic provider
//!
//! A [`RetryLogicProvider`] runs a unit of work and re-runs it while its retry
//! logic approves. Each invocation works on its own copy of the configured
//! logic, so a provider can be shared freely across threads and tasks.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::error::{RetryError, Termination};
use super::logic::{RetryDecision, RetryLogic, RetryLogicSnapshot, RetryState};
use super::observer::{RetryObserver, TracingObserver};
use super::predicates::CodedError;

/// Notification raised before each wait
///
/// Setting `cancel` stops the sequence; the call then fails with every error
/// accumulated so far.
pub struct RetryingEventArgs<'a> {
    /// Retries scheduled so far, 1 at the first retry
    pub retry_count: u32,
    /// Wait before the upcoming attempt
    pub delay: Duration,
    /// Every failure of this invocation, oldest first
    pub exceptions: Vec<&'a dyn CodedError>,
    /// Stop retrying when set
    pub cancel: bool,
}

impl fmt::Debug for RetryingEventArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingEventArgs")
            .field("retry_count", &self.retry_count)
            .field("delay", &self.delay)
            .field("exceptions", &self.exceptions.len())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Callback subscribed to the `retrying` notification
pub type RetryingHandler = Arc<dyn Fn(&mut RetryingEventArgs<'_>) + Send + Sync>;

/// Token returned by [`RetryLogicProvider::subscribe_retrying`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetryingHandlerId(u64);

/// What the loop does after a failed attempt
enum Step<E> {
    Wait(Duration),
    Fail(RetryError<E>),
}

/// Executes operations under a retry logic
///
/// # Example
///
/// ```rust
/// use sqlretry_core::retry::ConfigurableRetryFactory;
/// use sqlretry_core::types::RetryOptions;
/// use std::time::Duration;
///
/// let options = RetryOptions::builder()
///     .number_of_tries(3)
///     .delta_time(Duration::from_millis(1))
///     .max_time_interval(Duration::from_millis(5))
///     .build()
///     .unwrap();
/// let provider = ConfigurableRetryFactory::create_fixed_retry_provider(&options).unwrap();
///
/// let value = provider
///     .execute(Some("SELECT 1"), || Ok::<_, std::io::Error>(1))
///     .unwrap();
/// assert_eq!(value, 1);
/// ```
pub struct RetryLogicProvider {
    retry_logic: RetryLogic,
    observer: Arc<dyn RetryObserver>,
    handlers: RwLock<Vec<(RetryingHandlerId, RetryingHandler)>>,
    next_handler_id: AtomicU64,
    last_snapshot: Mutex<Option<RetryLogicSnapshot>>,
}

impl RetryLogicProvider {
    /// Create a provider around a prototype retry logic
    pub fn new(retry_logic: RetryLogic) -> Self {
        Self {
            retry_logic,
            observer: Arc::new(TracingObserver::default()),
            handlers: RwLock::new(Vec::new()),
            next_handler_id: AtomicU64::new(1),
            last_snapshot: Mutex::new(None),
        }
    }

    /// Replace the observer receiving loop events
    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: RetryObserver + 'static,
    {
        self.observer = Arc::new(observer);
        self
    }

    /// The prototype retry logic; invocations run on fresh copies of it
    pub fn retry_logic(&self) -> &RetryLogic {
        &self.retry_logic
    }

    /// Counters of the most recently finished invocation
    ///
    /// Diagnostic only; concurrent invocations overwrite each other.
    pub fn last_snapshot(&self) -> Option<RetryLogicSnapshot> {
        *self
            .last_snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe a handler to the `retrying` notification
    ///
    /// Handlers run in subscription order.
    pub fn subscribe_retrying<F>(&self, handler: F) -> RetryingHandlerId
    where
        F: Fn(&mut RetryingEventArgs<'_>) + Send + Sync + 'static,
    {
        let id = RetryingHandlerId(self.next_handler_id.fetch_add(1, Ordering::Relaxed));
        let handler: RetryingHandler = Arc::new(handler);
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, handler));
        id
    }

    /// Remove a handler; returns false when it was not subscribed
    pub fn unsubscribe_retrying(&self, id: RetryingHandlerId) -> bool {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Number of subscribed `retrying` handlers
    pub fn retrying_handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run `operation` on the calling thread, sleeping between attempts
    ///
    /// `command_text` feeds the authorized condition; pass `None` for
    /// operations without command text.
    pub fn execute<T, E, F>(
        &self,
        command_text: Option<&str>,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: CodedError + 'static,
    {
        let mut logic = self.fresh_logic();
        let mut errors = Vec::new();
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.observer
                .on_attempt_start(attempt, logic.number_of_tries());

            match operation() {
                Ok(value) => {
                    self.observer.on_success(attempt, start.elapsed());
                    self.record(&logic);
                    return Ok(value);
                }
                Err(error) => {
                    match self.on_failure(&mut logic, command_text, &mut errors, error, attempt) {
                        Step::Wait(delay) => thread::sleep(delay),
                        Step::Fail(error) => return Err(error),
                    }
                }
            }
        }
    }

    /// Run `operation` on the calling task, waiting asynchronously between
    /// attempts
    ///
    /// The token is checked before every attempt and raced against every wait;
    /// once it fires the call fails with [`RetryError::Cancelled`].
    pub async fn execute_async<T, E, F, Fut>(
        &self,
        command_text: Option<&str>,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: CodedError + 'static,
    {
        let mut logic = self.fresh_logic();
        let mut errors = Vec::new();
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(&logic, attempt));
            }

            attempt += 1;
            self.observer
                .on_attempt_start(attempt, logic.number_of_tries());

            match operation().await {
                Ok(value) => {
                    self.observer.on_success(attempt, start.elapsed());
                    self.record(&logic);
                    return Ok(value);
                }
                Err(error) => {
                    match self.on_failure(&mut logic, command_text, &mut errors, error, attempt) {
                        Step::Wait(delay) => {
                            tokio::select! {
                                biased;
                                _ = cancel.cancelled() => {
                                    return Err(self.cancelled(&logic, attempt));
                                }
                                _ = tokio::time::sleep(delay) => {}
                            }
                        }
                        Step::Fail(error) => return Err(error),
                    }
                }
            }
        }
    }

    fn fresh_logic(&self) -> RetryLogic {
        let mut logic = self.retry_logic.clone();
        logic.reset();
        logic
    }

    fn record(&self, logic: &RetryLogic) {
        *self
            .last_snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(logic.snapshot());
    }

    fn cancelled<E>(&self, logic: &RetryLogic, attempts: u32) -> RetryError<E> {
        self.observer.on_cancelled(attempts);
        self.record(logic);
        RetryError::cancelled(attempts)
    }

    fn on_failure<E>(
        &self,
        logic: &mut RetryLogic,
        command_text: Option<&str>,
        errors: &mut Vec<E>,
        error: E,
        attempt: u32,
    ) -> Step<E>
    where
        E: CodedError + 'static,
    {
        let delay = match logic.decide(command_text, &error) {
            RetryDecision::Retry(delay) => delay,
            RetryDecision::Stop(state) => {
                self.record(logic);
                return self.stop(logic, state, errors, error, attempt);
            }
        };

        errors.push(error);
        tracing::trace!(
            retry_count = logic.current(),
            "operation is eligible for retry"
        );

        if self.raise_retrying(logic.current(), delay, errors) {
            self.observer
                .on_stopped(attempt, Termination::CancelledByHandler, last_error(errors));
            self.record(logic);
            return Step::Fail(RetryError::aggregate(
                Termination::CancelledByHandler,
                std::mem::take(errors),
                logic.number_of_tries(),
            ));
        }

        if let Some(last) = last_error(errors) {
            self.observer.on_retry_scheduled(attempt, last, delay);
        }
        Step::Wait(delay)
    }

    fn stop<E>(
        &self,
        logic: &RetryLogic,
        state: RetryState,
        errors: &mut Vec<E>,
        error: E,
        attempt: u32,
    ) -> Step<E>
    where
        E: CodedError + 'static,
    {
        let reason = match state {
            RetryState::AuthorizationDenied => Termination::Unauthorized,
            RetryState::Exhausted => Termination::Exhausted,
            _ => Termination::NonTransient,
        };

        if reason == Termination::Exhausted {
            self.observer.on_exhausted(attempt, &error);
        } else {
            self.observer.on_stopped(attempt, reason, Some(&error));
            if errors.is_empty() {
                return Step::Fail(RetryError::Original(error));
            }
        }

        errors.push(error);
        Step::Fail(RetryError::aggregate(
            reason,
            std::mem::take(errors),
            logic.number_of_tries(),
        ))
    }

    /// Invoke every handler; true when one of them cancelled
    fn raise_retrying<E>(&self, retry_count: u32, delay: Duration, errors: &[E]) -> bool
    where
        E: CodedError + 'static,
    {
        let handlers: Vec<RetryingHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        if handlers.is_empty() {
            return false;
        }

        let mut args = RetryingEventArgs {
            retry_count,
            delay,
            exceptions: errors.iter().map(|e| e as &dyn CodedError).collect(),
            cancel: false,
        };
        for handler in &handlers {
            handler(&mut args);
        }

        if args.cancel {
            tracing::debug!(retry_count, "retry cancelled by a retrying handler");
        }
        args.cancel
    }
}

fn last_error<E: CodedError + 'static>(errors: &[E]) -> Option<&dyn Error> {
    errors.last().map(|e| e as &dyn Error)
}

impl fmt::Debug for RetryLogicProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryLogicProvider")
            .field("retry_logic", &self.retry_logic)
            .field("retrying_handlers", &self.retrying_handler_count())
            .finish()
    }
}
