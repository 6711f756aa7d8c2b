use std::io;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use blastdb_manager::app::{App, CheckResult, ProgressSink, SetupAllResult, build_with_progress};
use blastdb_manager::config::{ConfigLoader, DatabaseRequest, ResolvedConfig};
use blastdb_manager::domain::{DatabaseSpec, SourceSpecifier, validate_database_name};
use blastdb_manager::error::BlastDbError;
use blastdb_manager::fetch::{HttpSourceClient, fetch_sources};
use blastdb_manager::formatter::{FormatInput, SystemFormatter};
use blastdb_manager::output::{JsonOutput, LogSink, OutputMode, TextOutput};
use blastdb_manager::probe::system_probe;

const EXIT_INCOMPLETE: u8 = 5;

#[derive(Parser)]
#[command(name = "blastdb-manager")]
#[command(about = "Check, fetch and format local BLAST databases")]
#[command(version, author)]
struct Cli {
    /// Print results as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Make sure databases exist, fetching and formatting as needed")]
    Setup(SetupArgs),
    #[command(about = "Report whether every database file is on disk")]
    Check(DatabaseArgs),
    #[command(about = "Download and decompress raw source data only")]
    Fetch(FetchArgs),
    #[command(about = "Run the formatter on local input")]
    Build(BuildArgs),
}

#[derive(Args, Clone)]
struct DatabaseArgs {
    #[arg(long)]
    name: String,

    #[arg(long = "dir")]
    directory: String,

    /// nucleotide, protein or reverse-position-specific (nucl/prot/rps).
    #[arg(long = "type")]
    db_type: String,
}

#[derive(Args, Clone)]
struct SetupArgs {
    #[arg(long, conflicts_with = "name")]
    config: Option<String>,

    #[arg(long, requires_all = ["directory", "db_type"])]
    name: Option<String>,

    #[arg(long = "dir")]
    directory: Option<String>,

    #[arg(long = "type")]
    db_type: Option<String>,

    #[arg(long)]
    formatter: Option<String>,

    /// Gzipped source to fetch; repeat for several. Omit when data is pre-seeded.
    #[arg(long = "source")]
    sources: Vec<String>,
}

#[derive(Args, Clone)]
struct FetchArgs {
    #[arg(long)]
    name: String,

    #[arg(long = "dir")]
    directory: String,

    #[arg(long = "source", required = true)]
    sources: Vec<String>,
}

#[derive(Args, Clone)]
struct BuildArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    #[arg(long)]
    formatter: Option<String>,

    /// Input file; defaults to `{dir}/{name}`.
    #[arg(long = "in", conflicts_with = "stdin")]
    input: Option<String>,

    /// Pipe standard input into the formatter.
    #[arg(long)]
    stdin: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(error) = report.downcast_ref::<BlastDbError>() {
                return ExitCode::from(map_exit_code(error));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &BlastDbError) -> u8 {
    match error {
        BlastDbError::UnknownDatabaseType(_)
        | BlastDbError::InvalidDatabaseName(_)
        | BlastDbError::MissingConfig
        | BlastDbError::ConfigRead(_)
        | BlastDbError::ConfigParse(_) => 2,
        err if err.is_fetch_failure() => 3,
        BlastDbError::Build { .. }
        | BlastDbError::MissingTool(_)
        | BlastDbError::MissingSourceData(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    match cli.command {
        Commands::Setup(args) => run_setup(args, output_mode),
        Commands::Check(args) => run_check(args, output_mode),
        Commands::Fetch(args) => run_fetch(args, output_mode),
        Commands::Build(args) => run_build(args, output_mode),
    }
}

fn sink_for(output_mode: OutputMode) -> &'static dyn ProgressSink {
    match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Text => &LogSink,
    }
}

fn build_spec(args: &DatabaseArgs, formatter: Option<&str>) -> Result<DatabaseSpec, BlastDbError> {
    let spec = DatabaseSpec::parse(&args.name, args.directory.as_str(), &args.db_type)?;
    Ok(match formatter {
        Some(formatter) => spec.with_formatter(formatter),
        None => spec,
    })
}

fn run_setup(args: SetupArgs, output_mode: OutputMode) -> miette::Result<ExitCode> {
    let resolved = match (args.name, args.directory, args.db_type) {
        (Some(name), Some(directory), Some(db_type)) => {
            let database = DatabaseArgs {
                name,
                directory,
                db_type,
            };
            let spec = build_spec(&database, args.formatter.as_deref())?;
            ResolvedConfig {
                schema_version: 1,
                databases: vec![DatabaseRequest {
                    spec,
                    source: SourceSpecifier::from_urls(args.sources),
                }],
            }
        }
        _ => ConfigLoader::resolve(args.config.as_deref())?,
    };

    let client = HttpSourceClient::new()?;
    let app = App::new(system_probe(), client, SystemFormatter);
    let result: SetupAllResult = app.setup_all(&resolved, sink_for(output_mode))?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_setup(&result).into_diagnostic()?,
        OutputMode::Text => TextOutput::print_setup(&result),
    }
    Ok(ExitCode::SUCCESS)
}

fn run_check(args: DatabaseArgs, output_mode: OutputMode) -> miette::Result<ExitCode> {
    let spec = build_spec(&args, None)?;
    let result = CheckResult::for_spec(&spec);

    match output_mode {
        OutputMode::Json => JsonOutput::print_check(&result).into_diagnostic()?,
        OutputMode::Text => TextOutput::print_check(&result),
    }
    if result.complete {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_INCOMPLETE))
    }
}

fn run_fetch(args: FetchArgs, output_mode: OutputMode) -> miette::Result<ExitCode> {
    let name = validate_database_name(&args.name)?;
    let target = Utf8PathBuf::from(args.directory).join(name);
    let source = SourceSpecifier::from_urls(args.sources);
    let client = HttpSourceClient::new()?;
    let report = fetch_sources(&client, &source, &target)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_fetch(&report).into_diagnostic()?,
        OutputMode::Text => TextOutput::print_fetch(&report),
    }
    Ok(ExitCode::SUCCESS)
}

fn run_build(args: BuildArgs, output_mode: OutputMode) -> miette::Result<ExitCode> {
    let spec = build_spec(&args.database, args.formatter.as_deref())?;
    let input = if args.stdin {
        FormatInput::reader(io::stdin())
    } else {
        let path = args
            .input
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| spec.raw_data_path());
        if !path.as_std_path().exists() {
            return Err(BlastDbError::MissingSourceData(path.to_string()).into());
        }
        FormatInput::File(path)
    };

    let result = build_with_progress(&SystemFormatter, &spec, input, sink_for(output_mode))?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_build(&result).into_diagnostic()?,
        OutputMode::Text => TextOutput::print_build(&result),
    }
    Ok(ExitCode::SUCCESS)
}
