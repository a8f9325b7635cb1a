//! Schedule command

use anyhow::{Context, Result};
use sqlretry_core::config::{resolve_section, RetrySection};
use sqlretry_core::retry::{ConfigurableRetryFactory, IntervalEnumerator};
use sqlretry_core::RetryMethodRegistry;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::ScheduleArgs;
use crate::output;

/// One retry of the previewed schedule
#[derive(Tabled, Debug, PartialEq, Eq)]
pub(crate) struct ScheduleRow {
    retry: u32,
    #[tabled(rename = "attempt")]
    attempt: u32,
    #[tabled(rename = "wait (ms)")]
    delay_ms: u128,
    #[tabled(rename = "elapsed (ms)")]
    elapsed_ms: u128,
}

pub fn run(args: ScheduleArgs) -> Result<()> {
    let settings = super::load_settings(&args.file)?;
    let section: RetrySection = args.section.into();

    let provider = resolve_section(
        section,
        section.select(&settings),
        &RetryMethodRegistry::with_builtins(),
    )
    .with_context(|| format!("Invalid {} section in {}", section, args.file))?;

    if !ConfigurableRetryFactory::is_retriable(&provider) {
        output::info(&format!(
            "The {} policy never retries; operations run once",
            section
        ));
        return Ok(());
    }

    let logic = provider.retry_logic();
    let rows = schedule_rows(logic.intervals(), logic.number_of_tries(), !args.no_jitter);
    if rows.is_empty() {
        output::info(&format!(
            "The {} policy allows a single attempt; operations run once",
            section
        ));
        return Ok(());
    }

    output::header(&format!(
        "{} retry schedule ({}, {} tries)",
        section,
        logic.intervals().strategy(),
        logic.number_of_tries()
    ));
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{}", table);

    Ok(())
}

/// The waits before each retry, with running totals
pub(crate) fn schedule_rows(
    intervals: &IntervalEnumerator,
    number_of_tries: u32,
    jitter: bool,
) -> Vec<ScheduleRow> {
    let intervals = if jitter {
        intervals.clone()
    } else {
        intervals.clone().without_jitter()
    };

    let retries = number_of_tries.saturating_sub(1) as usize;
    let mut elapsed = 0;
    intervals
        .preview(retries)
        .into_iter()
        .zip(1..)
        .map(|(delay, retry)| {
            elapsed += delay.as_millis();
            ScheduleRow {
                retry,
                attempt: retry + 1,
                delay_ms: delay.as_millis(),
                elapsed_ms: elapsed,
            }
        })
        .collect()
}
