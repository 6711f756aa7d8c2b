use std::io::{self, ErrorKind, Read};
use std::process::{Command, ExitStatus, Output, Stdio};
use std::thread;

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::check;
use crate::domain::DatabaseSpec;
use crate::error::BlastDbError;

pub enum FormatInput {
    /// Passed to the formatter as `-in <path>`.
    File(Utf8PathBuf),
    /// Piped into the formatter's standard input.
    Reader(Box<dyn Read + Send>),
}

impl FormatInput {
    pub fn reader<R: Read + Send + 'static>(reader: R) -> Self {
        FormatInput::Reader(Box::new(reader))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildOutcome {
    Built,
    Skipped,
}

pub trait DatabaseFormatter: Send + Sync {
    fn format(&self, spec: &DatabaseSpec, input: FormatInput) -> Result<(), BlastDbError>;
}

impl<F: DatabaseFormatter + ?Sized> DatabaseFormatter for Box<F> {
    fn format(&self, spec: &DatabaseSpec, input: FormatInput) -> Result<(), BlastDbError> {
        (**self).format(spec, input)
    }
}

/// Runs the spec's formatter command (`makeblastdb` by default) as a child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFormatter;

impl SystemFormatter {
    fn run_with_file(&self, spec: &DatabaseSpec, args: &[String]) -> Result<Output, BlastDbError> {
        Command::new(spec.formatter())
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| spawn_error(spec, err))
    }

    fn run_with_reader(
        &self,
        spec: &DatabaseSpec,
        args: &[String],
        mut reader: Box<dyn Read + Send>,
    ) -> Result<Output, BlastDbError> {
        let mut child = Command::new(spec.formatter())
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| spawn_error(spec, err))?;

        let mut stdin = child.stdin.take().ok_or_else(|| BlastDbError::Build {
            name: spec.name().to_string(),
            message: "formatter stdin was not captured".to_string(),
        })?;
        let writer = thread::spawn(move || {
            let copied = io::copy(&mut reader, &mut stdin);
            drop(stdin);
            copied
        });

        let output = child.wait_with_output().map_err(|err| BlastDbError::Build {
            name: spec.name().to_string(),
            message: err.to_string(),
        })?;

        match writer.join() {
            Ok(Ok(_)) => {}
            // The child stopped reading; its exit status tells the real story.
            Ok(Err(err)) if err.kind() == ErrorKind::BrokenPipe => {}
            Ok(Err(err)) if output.status.success() => {
                return Err(BlastDbError::Build {
                    name: spec.name().to_string(),
                    message: format!("writing formatter input failed: {err}"),
                });
            }
            Ok(Err(_)) => {}
            Err(_) => {
                return Err(BlastDbError::Build {
                    name: spec.name().to_string(),
                    message: "formatter input thread panicked".to_string(),
                });
            }
        }
        Ok(output)
    }
}

impl DatabaseFormatter for SystemFormatter {
    fn format(&self, spec: &DatabaseSpec, input: FormatInput) -> Result<(), BlastDbError> {
        let args = formatter_args(spec, &input);
        info!("running {} {}", spec.formatter(), args.join(" "));
        let output = match input {
            FormatInput::File(_) => self.run_with_file(spec, &args)?,
            FormatInput::Reader(reader) => self.run_with_reader(spec, &args, reader)?,
        };
        check_status(spec, output.status, &output.stderr)
    }
}

/// `-dbtype <type> [-in <path>] -out <directory/name> -title <name>`
pub fn formatter_args(spec: &DatabaseSpec, input: &FormatInput) -> Vec<String> {
    let mut args = vec!["-dbtype".to_string(), spec.db_type().dbtype_arg().to_string()];
    if let FormatInput::File(path) = input {
        args.push("-in".to_string());
        args.push(path.to_string());
    }
    args.extend([
        "-out".to_string(),
        spec.database_path().to_string(),
        "-title".to_string(),
        spec.name().to_string(),
    ]);
    args
}

/// Formats the database unless every expected file is already on disk.
pub fn build_database<F: DatabaseFormatter + ?Sized>(
    formatter: &F,
    spec: &DatabaseSpec,
    input: FormatInput,
) -> Result<BuildOutcome, BlastDbError> {
    if check::is_complete(spec) {
        info!("The database {} is complete. Not reformatting", spec.name());
        return Ok(BuildOutcome::Skipped);
    }

    formatter.format(spec, input)?;

    let missing = check::missing_files(spec);
    if !missing.is_empty() {
        warn!(
            database = spec.name(),
            missing = missing.len(),
            "formatter finished but some expected files are absent"
        );
    }
    Ok(BuildOutcome::Built)
}

fn check_status(spec: &DatabaseSpec, status: ExitStatus, stderr: &[u8]) -> Result<(), BlastDbError> {
    if status.success() {
        return Ok(());
    }
    error!("Creating db {} failed. Aborting.", spec.name());
    let stderr = String::from_utf8_lossy(stderr).trim().to_string();
    let message = if stderr.is_empty() {
        format!("{} exited with {status}", spec.formatter())
    } else {
        stderr
    };
    Err(BlastDbError::Build {
        name: spec.name().to_string(),
        message,
    })
}

fn spawn_error(spec: &DatabaseSpec, err: io::Error) -> BlastDbError {
    if err.kind() == ErrorKind::NotFound {
        return BlastDbError::MissingTool(spec.formatter().to_string());
    }
    BlastDbError::Build {
        name: spec.name().to_string(),
        message: err.to_string(),
    }
}
