use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use staffsheet_core::{ParseMode, ParserConfig, PayrollParser};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod formatter;

#[derive(Parser)]
#[command(name = "staffsheet")]
#[command(about = "Extract payroll records from staffing-company workbooks", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the workbook (xlsx, xlsm, xlsb, xls, ods)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// How sheet columns are located
    #[arg(short, long, value_enum, default_value = "intelligent")]
    mode: ModeArg,

    /// Period for rows whose sheet carries none (e.g. 2024-03)
    #[arg(short, long, value_name = "YYYY-MM")]
    period: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Also print every extracted record (human format)
    #[arg(short, long)]
    records: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Heuristic header detection
    Intelligent,
    /// Configured templates matched by sentinel cells
    FixedTemplate,
}

impl From<ModeArg> for ParseMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Intelligent => ParseMode::Intelligent,
            ModeArg::FixedTemplate => ParseMode::FixedTemplate,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for downstream tooling
    Json,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<ParserConfig> {
    let mut config = if let Some(config_path) = &cli.config {
        ParserConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        // Try to load default config from current directory if it exists
        let default_config_path = PathBuf::from("staffsheet.toml");
        if default_config_path.exists() {
            ParserConfig::from_file(&default_config_path).with_context(|| {
                format!(
                    "Failed to load config from {}",
                    default_config_path.display()
                )
            })?
        } else {
            ParserConfig::default()
        }
    };

    if let Some(period) = &cli.period {
        config.period = Some(period.clone());
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let content = std::fs::read(&cli.file)
        .with_context(|| format!("Failed to read file: {}", cli.file.display()))?;

    let mode: ParseMode = cli.mode.into();
    debug!(file = %cli.file.display(), bytes = content.len(), mode = ?mode, "workbook read");

    let parser = PayrollParser::with_config(config);
    let outcome = parser
        .extract(&content, mode)
        .with_context(|| format!("Failed to parse workbook: {}", cli.file.display()))?;

    match cli.format {
        OutputFormat::Human => formatter::print_human(&cli.file, &outcome, cli.records),
        OutputFormat::Json => formatter::print_json(&cli.file, &outcome)?,
    }

    // Exit 1 when no record was extracted
    let exit_code = if outcome.records.is_empty() { 1 } else { 0 };
    std::process::exit(exit_code);
}
