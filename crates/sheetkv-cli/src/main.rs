//! sheetkv CLI - key/value section extraction tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sheetkv::prelude::*;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "sheetkv")]
#[command(
    author,
    version,
    about = "Extract and update configured key/value sections in spreadsheets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract configured sections as JSON
    Extract {
        /// Input spreadsheet file (xlsx, xlsm)
        input: PathBuf,

        /// Settings file with an "ExcelSections" object
        #[arg(short, long)]
        config: PathBuf,

        /// Sheet name or 0-based index (overrides the settings file)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Output JSON file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write JSON on a single line
        #[arg(long)]
        compact: bool,
    },

    /// Show the display value and formula of one cell
    Get {
        /// Input spreadsheet file
        input: PathBuf,

        /// Cell reference, e.g. B2
        cell: String,

        /// Sheet name or 0-based index (default: first sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Currency symbol for currency formats
        #[arg(long, default_value = "$")]
        currency: String,
    },

    /// Apply update requests and save
    Update {
        /// Input spreadsheet file
        input: PathBuf,

        /// JSON file with [{"sheet": .., "cell": .., "value": ..}, ...]
        #[arg(short, long)]
        requests: PathBuf,

        /// Output spreadsheet file (default: overwrite the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Settings file; when given, sections are extracted from the saved file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List all sheets in a workbook
    Sheets {
        /// Input spreadsheet file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            input,
            config,
            sheet,
            output,
            compact,
        } => extract(&input, &config, sheet.as_deref(), output.as_deref(), compact),
        Commands::Get {
            input,
            cell,
            sheet,
            currency,
        } => get_cell(&input, &cell, sheet.as_deref(), &currency),
        Commands::Update {
            input,
            requests,
            output,
            config,
        } => update(&input, &requests, output.as_deref(), config.as_deref()),
        Commands::Sheets { input } => list_sheets(&input),
    }
}

fn load_config(path: &Path) -> Result<ExtractionConfig> {
    ExtractionConfig::load(path)
        .with_context(|| format!("Failed to load settings '{}'", path.display()))
}

fn parse_sheet(sheet: Option<&str>) -> Result<SheetRef> {
    match sheet {
        Some(s) => s.parse().with_context(|| format!("Invalid sheet '{}'", s)),
        None => Ok(SheetRef::default()),
    }
}

fn extract(
    input: &Path,
    config_path: &Path,
    sheet: Option<&str>,
    output: Option<&Path>,
    compact: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(sheet) = sheet {
        config.sheet = Some(parse_sheet(Some(sheet))?);
    }

    let sections = sheetkv::read_sections(input, &config)
        .with_context(|| format!("Failed to extract sections from '{}'", input.display()))?;

    write_json(&sections, output, compact)
}

fn write_json(sections: &SectionMap, output: Option<&Path>, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(sections)?
    } else {
        serde_json::to_string_pretty(sections)?
    };

    match output {
        Some(path) => {
            fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}

fn get_cell(input: &Path, cell: &str, sheet: Option<&str>, currency: &str) -> Result<()> {
    let sheet = parse_sheet(sheet)?;
    let formatter = NumberFormatter::new().with_currency_symbol(currency);
    let value = sheetkv::read_cell(input, &sheet, cell, formatter)
        .with_context(|| format!("Failed to read {} from '{}'", cell, input.display()))?;

    println!("{}", value.display);
    if !value.formula.is_empty() {
        println!("={}", value.formula);
    }
    Ok(())
}

fn update(
    input: &Path,
    requests: &Path,
    output: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let json = fs::read_to_string(requests)
        .with_context(|| format!("Failed to read requests '{}'", requests.display()))?;
    let updates = CellUpdate::load_list(&json)
        .with_context(|| format!("Invalid requests in '{}'", requests.display()))?;

    // Load settings before touching the workbook so a bad file writes nothing
    let config = config.map(load_config).transpose()?;

    sheetkv::apply_updates(input, output, &updates)
        .with_context(|| format!("Failed to update '{}'", input.display()))?;

    let saved = output.unwrap_or(input);
    info!("{} cell(s) updated in {}", updates.len(), saved.display());

    if let Some(config) = config {
        let sections = sheetkv::read_sections(saved, &config)
            .with_context(|| format!("Failed to extract sections from '{}'", saved.display()))?;
        write_json(&sections, None, false)?;
    }
    Ok(())
}

fn list_sheets(input: &Path) -> Result<()> {
    let names = sheetkv::sheet_names(input)
        .with_context(|| format!("Failed to open '{}'", input.display()))?;

    println!("Sheets in '{}':", input.display());
    for (i, name) in names.iter().enumerate() {
        println!("  [{}] {}", i, name);
    }
    Ok(())
}
