use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::app::{BuildResult, CheckResult, ProgressEvent, ProgressSink, SetupAllResult};
use crate::fetch::FetchReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_setup(result: &SetupAllResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_check(result: &CheckResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_fetch(result: &FetchReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_build(result: &BuildResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Forwards progress events to the `tracing` subscriber.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_setup(result: &SetupAllResult) {
        for item in &result.items {
            println!(
                "{} ({}) in {}: {:?} -> {:?}",
                item.name, item.db_type, item.directory, item.state, item.action
            );
            for url in &item.fetch.fetched {
                println!("  fetched {url}");
            }
            for url in &item.fetch.skipped {
                println!("  skipped {url}");
            }
        }
    }

    pub fn print_check(result: &CheckResult) {
        if result.complete {
            println!("{} ({}) is complete", result.name, result.db_type);
            return;
        }
        println!("{} ({}) is incomplete; missing:", result.name, result.db_type);
        for path in &result.missing {
            println!("  {path}");
        }
    }

    pub fn print_fetch(result: &FetchReport) {
        println!(
            "fetched {} source(s), skipped {}",
            result.fetched.len(),
            result.skipped.len()
        );
    }

    pub fn print_build(result: &BuildResult) {
        println!("{}: {:?}", result.name, result.outcome);
    }
}
