//! Funnel CLI - Command-line interface for Funnel Flux
//!
//! Commands:
//! - report: Compute funnel conversion metrics from a raw event log
//! - validate: Validate raw event records
//! - catalogue: Print the active transition catalogue
//! - doctor: Diagnose configuration and environment

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use funnel_flux::config::FunnelConfig;
use funnel_flux::encoder::rows_to_ndjson;
use funnel_flux::filter::PopulationFilter;
use funnel_flux::pipeline::FunnelProcessor;
use funnel_flux::schema::{RawEventAdapter, SCHEMA_VERSION};
use funnel_flux::taxonomy::SYSTEM_FOLDERS;
use funnel_flux::types::{FolderSpec, FunnelReport, REPORT_COLUMNS};
use funnel_flux::{FunnelError, FUNNEL_VERSION, PRODUCER_NAME};

/// Funnel - Recruiting funnel conversion metrics
#[derive(Parser)]
#[command(name = "funnel")]
#[command(version = FUNNEL_VERSION)]
#[command(about = "Compute recruiting funnel conversion metrics", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG is honored otherwise)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the funnel report for a population
    Report {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "table")]
        output_format: OutputFormat,

        /// First invitation date included (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last invitation date included (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Keep every invitation date instead of the default lookback window
        #[arg(long, conflicts_with_all = ["start", "end"])]
        all_dates: bool,

        /// Restrict to a site (repeatable)
        #[arg(long = "site")]
        sites: Vec<String>,

        /// Restrict to a campaign (repeatable)
        #[arg(long = "campaign")]
        campaigns: Vec<String>,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate raw event records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the active transition catalogue
    Catalogue {
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Full report as compact JSON
    Json,
    /// Full report as pretty-printed JSON
    JsonPretty,
    /// Report rows only, one JSON object per line
    Ndjson,
    /// Summary table
    Table,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn run(cli: Cli) -> Result<(), FunnelCliError> {
    match cli.command {
        Commands::Report {
            input,
            output,
            input_format,
            output_format,
            start,
            end,
            all_dates,
            sites,
            campaigns,
            config,
        } => {
            let window = DateWindow {
                start,
                end,
                all_dates,
            };
            let filter_args = FilterArgs {
                window,
                sites,
                campaigns,
            };
            cmd_report(
                &input,
                output.as_deref(),
                input_format,
                output_format,
                filter_args,
                config.as_deref(),
            )
        }

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Catalogue { config, json } => cmd_catalogue(config.as_deref(), json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

struct DateWindow {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    all_dates: bool,
}

struct FilterArgs {
    window: DateWindow,
    sites: Vec<String>,
    campaigns: Vec<String>,
}

fn cmd_report(
    input: &Path,
    output: Option<&Path>,
    input_format: InputFormat,
    output_format: OutputFormat,
    filter_args: FilterArgs,
    config: Option<&Path>,
) -> Result<(), FunnelCliError> {
    let config = load_config(config)?;
    let mut processor = FunnelProcessor::with_config(config)?;

    let input_data = read_input(input)?;
    match input_format {
        InputFormat::Ndjson => processor.load_ndjson(&input_data)?,
        InputFormat::Json => processor.load_json(&input_data)?,
    }

    if processor.event_count() == 0 {
        return Err(FunnelCliError::NoEvents);
    }

    let filter = resolve_filter(&processor, filter_args);
    log::info!(
        "Reporting on invitations {} to {}",
        filter.start.map_or("*".to_string(), |d| d.to_string()),
        filter.end.map_or("*".to_string(), |d| d.to_string())
    );

    let report = processor.report(&filter)?;
    let output_data = format_report(&report, &output_format)?;

    match output {
        Some(path) if path.to_string_lossy() != "-" => fs::write(path, output_data)?,
        _ => print!("{}", output_data),
    }

    Ok(())
}

/// Explicit dates win; otherwise the lookback window unless `--all-dates`
fn resolve_filter(processor: &FunnelProcessor, args: FilterArgs) -> PopulationFilter {
    let DateWindow {
        start,
        end,
        all_dates,
    } = args.window;

    let mut filter = if all_dates {
        PopulationFilter::all()
    } else if start.is_some() || end.is_some() {
        PopulationFilter {
            start,
            end,
            ..Default::default()
        }
    } else {
        processor.default_filter().unwrap_or_else(|| {
            log::warn!("No invitation dates in input; reporting on every event");
            PopulationFilter::all()
        })
    };

    filter.sites = args.sites;
    filter.campaigns = args.campaigns;
    filter
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), FunnelCliError> {
    let input_data = read_input(input)?;

    let events = match input_format {
        InputFormat::Ndjson => RawEventAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => RawEventAdapter::parse_array(&input_data)?,
    };

    let results = RawEventAdapter::validate_events(&events);

    let report = ValidationReport {
        total_events: events.len(),
        valid_events: events.len() - results.len(),
        invalid_events: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                candidate_id: r.candidate_id.clone(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Schema:         {}", SCHEMA_VERSION);
        println!("Total records:  {}", report.total_events);
        println!("Valid records:  {}", report.valid_events);
        println!("Invalid:        {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Candidate {} (index {}): {}",
                    err.candidate_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_events > 0 {
        Err(FunnelCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_catalogue(config: Option<&Path>, json: bool) -> Result<(), FunnelCliError> {
    let catalogue = load_config(config)?.catalogue();

    if json {
        println!("{}", serde_json::to_string_pretty(&catalogue)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Metric", "From", "To"]);
    for def in &catalogue {
        table.add_row(vec![
            def.title.clone(),
            describe_spec(&def.from),
            describe_spec(&def.to),
        ]);
    }
    println!("{table}");

    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), FunnelCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "funnel_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Funnel Flux version {}", FUNNEL_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    checks.push(DoctorCheck {
        name: "taxonomy".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} system folders", SYSTEM_FOLDERS.len()),
    });

    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        } else {
            match FunnelConfig::load(config_path) {
                Ok(loaded) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid ({} transitions, {}-day gap, {}-day lookback)",
                        loaded.catalogue().len(),
                        loaded.engagement_gap_days,
                        loaded.lookback_days
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            }
        };
        checks.push(check);
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FUNNEL_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Funnel Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(FunnelCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, FunnelCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_config(path: Option<&Path>) -> Result<FunnelConfig, FunnelCliError> {
    match path {
        Some(path) => Ok(FunnelConfig::load(path)?),
        None => Ok(FunnelConfig::default()),
    }
}

fn describe_spec(spec: &FolderSpec) -> String {
    match spec {
        FolderSpec::Empty => "(none)".to_string(),
        other => other.to_string(),
    }
}

fn format_report(report: &FunnelReport, format: &OutputFormat) -> Result<String, FunnelCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(report)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(report)? + "\n"),
        OutputFormat::Ndjson => Ok(rows_to_ndjson(report)?),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(REPORT_COLUMNS.to_vec());
            for row in &report.rows {
                table.add_row(vec![
                    row.title.clone(),
                    row.count.to_string(),
                    row.percentage.clone(),
                    row.avg_duration_days.clone(),
                    row.avg_duration_days_engaged.clone(),
                    row.unengaged_count.to_string(),
                ]);
            }
            Ok(format!(
                "Population: {} candidates ({} events, {} unengaged at {}-day gap)\n{}\n",
                report.population,
                report.events_considered,
                report.unengaged_population,
                report.engagement_gap_days,
                table
            ))
        }
    }
}

// Error types

#[derive(Debug)]
enum FunnelCliError {
    Io(io::Error),
    Funnel(FunnelError),
    Json(serde_json::Error),
    NoEvents,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for FunnelCliError {
    fn from(e: io::Error) -> Self {
        FunnelCliError::Io(e)
    }
}

impl From<FunnelError> for FunnelCliError {
    fn from(e: FunnelError) -> Self {
        FunnelCliError::Funnel(e)
    }
}

impl From<serde_json::Error> for FunnelCliError {
    fn from(e: serde_json::Error) -> Self {
        FunnelCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FunnelCliError> for CliError {
    fn from(e: FunnelCliError) -> Self {
        match e {
            FunnelCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FunnelCliError::Funnel(e) => {
                let (code, hint) = match &e {
                    FunnelError::ParseError(_) | FunnelError::JsonError(_) => (
                        "PARSE_ERROR",
                        "Ensure input matches the funnel.raw_event.v1 schema",
                    ),
                    FunnelError::ConfigError(_) | FunnelError::InvalidTransition(_) => {
                        ("CONFIG_ERROR", "Run 'funnel doctor --config <file>' for details")
                    }
                    FunnelError::InvalidFilter(_) => {
                        ("FILTER_ERROR", "Check that --start is not after --end")
                    }
                    FunnelError::InconsistentIndex(_) | FunnelError::EncodingError(_) => {
                        ("INTERNAL_ERROR", "Re-run with --verbose and report the log")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            FunnelCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FunnelCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events with a candidate identifier found in input".to_string(),
                hint: Some("Run 'funnel validate' for details".to_string()),
            },
            FunnelCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Records with unusable fields are kept with those fields absent".to_string()),
            },
            FunnelCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    candidate_id: Option<String>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
