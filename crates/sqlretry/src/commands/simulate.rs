//! Simulate command
//!
//! Runs an operation that fails with a chosen server error a number of times
//! under a section's policy, exactly as a client would, and reports each
//! retry. Ctrl-C cancels the pending wait.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context, Result};
use sqlretry_core::config::RetrySection;
use sqlretry_core::retry::{CodedError, RetryError};
use sqlretry_core::RetryLogicManager;
use tokio_util::sync::CancellationToken;

use crate::cli::SimulateArgs;
use crate::output;

/// Failure raised by the simulated operation
#[derive(Debug)]
pub(crate) struct SimulatedError {
    number: i32,
    attempt: u32,
}

impl fmt::Display for SimulatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "server error {} on attempt {}",
            self.number, self.attempt
        )
    }
}

impl std::error::Error for SimulatedError {}

impl CodedError for SimulatedError {
    fn error_codes(&self) -> Vec<i32> {
        vec![self.number]
    }
}

pub async fn run(args: SimulateArgs) -> Result<()> {
    let settings = super::load_settings(&args.file)?;
    let section: RetrySection = args.section.into();
    let provider = RetryLogicManager::from_settings(&settings).provider(section);

    provider.subscribe_retrying(|event| {
        let last = event
            .exceptions
            .last()
            .map(|e| e.to_string())
            .unwrap_or_default();
        output::warning(&format!(
            "retry {} in {}ms after: {}",
            event.retry_count,
            event.delay.as_millis(),
            last
        ));
    });

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let command_text = section
        .honors_sql_condition()
        .then_some(args.command_text.as_str());

    let result = simulate(&provider, command_text, &cancel, args.failures, args.error_number).await;
    match result {
        Ok(attempt) => {
            output::success(&format!("Operation succeeded on attempt {}", attempt));
            Ok(())
        }
        Err(e) => {
            for cause in e.causes() {
                output::error(&cause.to_string());
            }
            Err(e).with_context(|| format!("Simulated {} operation failed", section))
        }
    }
}

/// Run an operation that fails `failures` times before succeeding
pub(crate) async fn simulate(
    provider: &sqlretry_core::RetryLogicProvider,
    command_text: Option<&str>,
    cancel: &CancellationToken,
    failures: u32,
    error_number: i32,
) -> std::result::Result<u32, RetryError<SimulatedError>> {
    let calls = AtomicU32::new(0);
    provider
        .execute_async(command_text, cancel, || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt <= failures {
                    Err(SimulatedError {
                        number: error_number,
                        attempt,
                    })
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
}
