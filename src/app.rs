use std::fs;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::check;
use crate::config::ResolvedConfig;
use crate::domain::{DatabaseSpec, DatabaseType, SourceSpecifier};
use crate::error::BlastDbError;
use crate::fetch::{FetchReport, SourceClient, fetch_sources};
use crate::formatter::{BuildOutcome, DatabaseFormatter, FormatInput, build_database};
use crate::probe::DatabaseProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupState {
    NoDirectory,
    DirectoryExistsNoDb,
    DirectoryExistsWithDb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupAction {
    /// The probe already knew the database.
    Existing,
    Built,
    /// Every expected file was on disk, so the formatter was not run.
    Skipped,
}

impl From<BuildOutcome> for SetupAction {
    fn from(outcome: BuildOutcome) -> Self {
        match outcome {
            BuildOutcome::Built => SetupAction::Built,
            BuildOutcome::Skipped => SetupAction::Skipped,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupResult {
    pub name: String,
    pub directory: String,
    pub db_type: DatabaseType,
    pub state: SetupState,
    pub action: SetupAction,
    pub fetch: FetchReport,
    pub completed_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupAllResult {
    pub items: Vec<SetupResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub directory: String,
    pub db_type: DatabaseType,
    pub complete: bool,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    pub name: String,
    pub outcome: BuildOutcome,
}

impl CheckResult {
    pub fn for_spec(spec: &DatabaseSpec) -> Self {
        let missing = check::missing_files(spec);
        CheckResult {
            name: spec.name().to_string(),
            directory: spec.directory().to_string(),
            db_type: spec.db_type(),
            complete: missing.is_empty(),
            missing: missing.into_iter().map(|path| path.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<P: DatabaseProbe, C: SourceClient, F: DatabaseFormatter> {
    probe: P,
    client: C,
    formatter: F,
}

impl<P: DatabaseProbe, C: SourceClient, F: DatabaseFormatter> App<P, C, F> {
    pub fn new(probe: P, client: C, formatter: F) -> Self {
        Self {
            probe,
            client,
            formatter,
        }
    }

    pub fn formatter(&self) -> &F {
        &self.formatter
    }

    pub fn check(&self, spec: &DatabaseSpec) -> CheckResult {
        CheckResult::for_spec(spec)
    }

    /// Downloads raw data for `spec` into `{directory}/{name}`.
    pub fn fetch(
        &self,
        spec: &DatabaseSpec,
        source: &SourceSpecifier,
        sink: &dyn ProgressSink,
    ) -> Result<FetchReport, BlastDbError> {
        if let SourceSpecifier::Urls(urls) = source {
            info!("Fetching database {} from {}", spec.name(), urls.join(", "));
        }
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; {}", spec.name()),
            elapsed: None,
        });
        let start = Instant::now();
        let report = fetch_sources(&self.client, source, &spec.raw_data_path())?;
        sink.event(ProgressEvent {
            message: format!(
                "fetch.done fetched={} skipped={}",
                report.fetched.len(),
                report.skipped.len()
            ),
            elapsed: Some(start.elapsed()),
        });
        Ok(report)
    }

    pub fn build(
        &self,
        spec: &DatabaseSpec,
        input: FormatInput,
        sink: &dyn ProgressSink,
    ) -> Result<BuildResult, BlastDbError> {
        build_with_progress(&self.formatter, spec, input, sink)
    }

    pub fn resolve_state(&self, spec: &DatabaseSpec) -> SetupState {
        if !spec.directory().as_std_path().exists() {
            return SetupState::NoDirectory;
        }
        if self.probe.exists_compiled_database(&spec.database_path()) {
            SetupState::DirectoryExistsWithDb
        } else {
            SetupState::DirectoryExistsNoDb
        }
    }

    /// Makes sure `spec` is formatted on disk, fetching and building as needed.
    pub fn setup(
        &self,
        spec: &DatabaseSpec,
        source: &SourceSpecifier,
        sink: &dyn ProgressSink,
    ) -> Result<SetupResult, BlastDbError> {
        let db_path = spec.database_path();
        let state = self.resolve_state(spec);
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; {db_path} state={state:?}"),
            elapsed: None,
        });

        let (action, fetch) = match state {
            SetupState::NoDirectory => {
                fs::create_dir_all(spec.directory().as_std_path())
                    .map_err(|err| BlastDbError::Filesystem(err.to_string()))?;
                let report = self.fetch(spec, source, sink)?;
                (self.build_from_raw_data(spec, sink)?, report)
            }
            SetupState::DirectoryExistsNoDb => {
                info!("No Blast DB {db_path}");
                let report = if spec.raw_data_path().as_std_path().exists() {
                    FetchReport::default()
                } else {
                    self.fetch(spec, source, sink)?
                };
                (self.build_from_raw_data(spec, sink)?, report)
            }
            SetupState::DirectoryExistsWithDb => {
                info!("found local Blast DB {db_path}");
                (SetupAction::Existing, FetchReport::default())
            }
        };

        debug!(database = spec.name(), ?action, "setup finished");
        Ok(SetupResult {
            name: spec.name().to_string(),
            directory: spec.directory().to_string(),
            db_type: spec.db_type(),
            state,
            action,
            fetch,
            completed_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Sets up every configured database in order, stopping at the first failure.
    pub fn setup_all(
        &self,
        config: &ResolvedConfig,
        sink: &dyn ProgressSink,
    ) -> Result<SetupAllResult, BlastDbError> {
        let mut items = Vec::with_capacity(config.databases.len());
        for request in &config.databases {
            items.push(self.setup(&request.spec, &request.source, sink)?);
        }
        Ok(SetupAllResult { items })
    }

    fn build_from_raw_data(
        &self,
        spec: &DatabaseSpec,
        sink: &dyn ProgressSink,
    ) -> Result<SetupAction, BlastDbError> {
        let raw = spec.raw_data_path();
        if !raw.as_std_path().exists() {
            return Err(BlastDbError::MissingSourceData(raw.to_string()));
        }
        info!("found local data at {raw}. Creating database");
        let result = self.build(spec, FormatInput::File(raw), sink)?;
        Ok(result.outcome.into())
    }
}

/// Guarded build with progress events; needs only a formatter, not a whole `App`.
pub fn build_with_progress<F: DatabaseFormatter + ?Sized>(
    formatter: &F,
    spec: &DatabaseSpec,
    input: FormatInput,
    sink: &dyn ProgressSink,
) -> Result<BuildResult, BlastDbError> {
    sink.event(ProgressEvent {
        message: format!("phase=Build; {}", spec.name()),
        elapsed: None,
    });
    let start = Instant::now();
    let outcome = build_database(formatter, spec, input)?;
    sink.event(ProgressEvent {
        message: format!("build.done outcome={outcome:?}"),
        elapsed: Some(start.elapsed()),
    });
    Ok(BuildResult {
        name: spec.name().to_string(),
        outcome,
    })
}
