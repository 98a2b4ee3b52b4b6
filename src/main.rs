//! Gridsift CLI - explore and export delimited or JSON datasets
//!
//! # Main Commands
//!
//! ```bash
//! gridsift view input.csv --filter city=Paris   # Print the current grid
//! gridsift export input.csv -f json -o report   # Export the view
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! gridsift parse input.csv          # Parse + flatten to JSON records
//! gridsift columns input.csv        # Show the reconciled field list
//! gridsift distinct input.csv city  # Distinct values of one column
//! gridsift config validate cfg.json # Validate a view configuration
//! ```

use clap::{Parser, Subcommand};
use gridsift::{
    ExportFormat, ExportOptions, LoadOptions, Session, ViewConfig, MATCH_ALL,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gridsift")]
#[command(about = "Explore and export delimited or JSON datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// View-shaping flags shared by `view` and `export`.
#[derive(clap::Args, Clone)]
struct ViewArgs {
    /// Exact-match filter, repeatable: --filter field=value ("All" matches everything)
    #[arg(long = "filter", value_name = "FIELD=VALUE")]
    filters: Vec<String>,

    /// Substring search, repeatable: --search field=text
    #[arg(long = "search", value_name = "FIELD=TEXT")]
    searches: Vec<String>,

    /// Group rows by a column, repeatable
    #[arg(long = "group-by", value_name = "FIELD")]
    group_by: Vec<String>,

    /// Hide a column, repeatable
    #[arg(long = "hide", value_name = "FIELD")]
    hide: Vec<String>,

    /// Relabel a column, repeatable: --rename field=Label
    #[arg(long = "rename", value_name = "FIELD=LABEL")]
    renames: Vec<String>,

    /// View configuration file to apply at load
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drop rows that are identical after flattening
    #[arg(long)]
    dedup: bool,

    /// Columns to flatten and merge (default: PROPERTIES, TAGS)
    #[arg(long = "nested", value_name = "FIELD")]
    nested: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a dataset, flatten nested columns and output JSON records
    Parse {
        /// Input file (.csv, .tsv, .txt or .json)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the reconciled field list
    Columns {
        /// Input file
        input: PathBuf,
    },

    /// Show the distinct values of one column
    Distinct {
        /// Input file
        input: PathBuf,

        /// Column name (original, pre-rename)
        field: String,

        /// Narrow to values containing this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Print the filtered and grouped grid
    View {
        /// Input file
        input: PathBuf,

        #[command(flatten)]
        view: ViewArgs,

        /// Show at most this many rows
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Export the filtered and grouped view to a file
    Export {
        /// Input file
        input: PathBuf,

        #[command(flatten)]
        view: ViewArgs,

        /// Output format
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output name; the format's extension is appended
        #[arg(short, long, default_value = "filtered_data")]
        output: String,

        /// Field separator for delimited output
        #[arg(long, default_value = ",")]
        delimiter: char,
    },

    /// Manage view configuration documents
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a configuration file
    Validate {
        /// Configuration JSON file
        file: PathBuf,
    },

    /// Write a starter configuration
    Init {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Columns { input } => cmd_columns(&input),

        Commands::Distinct {
            input,
            field,
            search,
        } => cmd_distinct(&input, &field, search.as_deref()),

        Commands::View { input, view, limit } => cmd_view(&input, &view, limit),

        Commands::Export {
            input,
            view,
            format,
            output,
            delimiter,
        } => cmd_export(&input, &view, &format, &output, delimiter),

        Commands::Config { action } => match action {
            ConfigAction::Validate { file } => cmd_config_validate(&file),
            ConfigAction::Init { output } => cmd_config_init(output.as_deref()),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Split a repeatable `field=value` flag.
fn split_pair<'a>(raw: &'a str, flag: &str) -> Result<(&'a str, &'a str), String> {
    raw.split_once('=')
        .ok_or_else(|| format!("--{} expects FIELD=VALUE, got '{}'", flag, raw))
}

fn load_session(input: &Path, view: &ViewArgs) -> Result<Session, Box<dyn std::error::Error>> {
    let mut options = LoadOptions {
        dedup: view.dedup,
        ..LoadOptions::default()
    };
    if !view.nested.is_empty() {
        options.nested_columns = view.nested.clone();
    }
    if let Some(ref path) = view.config {
        options.config = ViewConfig::load(path)?;
    }

    let mut session = Session::load_path(input, options)?;
    for raw in &view.renames {
        let (field, label) = split_pair(raw, "rename")?;
        session.rename_column(field, label);
    }
    for field in &view.hide {
        if !session.view().is_hidden(field) {
            session.toggle_column(field);
        }
    }
    for raw in &view.searches {
        let (field, text) = split_pair(raw, "search")?;
        session.set_search(field, text);
    }
    for raw in &view.filters {
        let (field, value) = split_pair(raw, "filter")?;
        session.set_criterion(field, value);
    }
    for field in &view.group_by {
        session.toggle_group_by(field);
    }
    Ok(session)
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> CliResult {
    let mut session = Session::load_path(input, LoadOptions::default())?;
    let info = session.info();

    eprintln!("Parsed: {}", input.display());
    eprintln!("   Encoding: {}", info.encoding);
    if let Some(d) = info.delimiter {
        eprintln!(
            "   Delimiter: '{}' (auto-detected)",
            if d == '\t' { "\\t".to_string() } else { d.to_string() }
        );
    }
    eprintln!("   Rows: {}", info.row_count);

    let json = serde_json::to_string_pretty(session.rows())?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_columns(input: &Path) -> CliResult {
    let session = Session::load_path(input, LoadOptions::default())?;

    println!("{} columns:", session.field_list().len());
    for descriptor in session.descriptors() {
        let marker = if descriptor.hidden { " (empty, pre-hidden)" } else { "" };
        println!("   {}{}", descriptor.original_name, marker);
    }
    Ok(())
}

fn cmd_distinct(input: &Path, field: &str, search: Option<&str>) -> CliResult {
    let mut session = Session::load_path(input, LoadOptions::default())?;
    if let Some(text) = search {
        session.set_search(field, text);
    }

    println!("{}", MATCH_ALL);
    for value in session.suggestions(field) {
        println!("{}", value);
    }
    Ok(())
}

fn cmd_view(input: &Path, view: &ViewArgs, limit: Option<usize>) -> CliResult {
    let mut session = load_session(input, view)?;
    let grid = session.grid();

    if grid.columns.is_empty() {
        println!("(empty dataset)");
        return Ok(());
    }

    // Column widths from headers and the shown rows.
    let shown = limit.unwrap_or(grid.rows.len()).min(grid.rows.len());
    let mut widths: Vec<usize> = grid
        .columns
        .iter()
        .map(|c| c.display_name.chars().count())
        .collect();
    for row in grid.rows.iter().take(shown) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let header: Vec<String> = grid
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:width$}", c.display_name, width = widths[i]))
        .collect();
    println!("{}", header.join(" | "));
    println!("{}", "-".repeat(header.join(" | ").chars().count()));

    for row in grid.rows.iter().take(shown) {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:width$}", cell, width = widths[i]))
            .collect();
        println!("{}", line.join(" | "));
    }

    if shown < grid.rows.len() {
        eprintln!("... {} more rows", grid.rows.len() - shown);
    }
    eprintln!("{} rows, {} columns", grid.rows.len(), grid.columns.len());
    Ok(())
}

fn cmd_export(
    input: &Path,
    view: &ViewArgs,
    format: &str,
    output: &str,
    delimiter: char,
) -> CliResult {
    let format = match format.to_lowercase().as_str() {
        "csv" | "delimited" => ExportFormat::Delimited,
        "json" => ExportFormat::Json,
        other => return Err(format!("Unknown export format '{}'", other).into()),
    };

    let mut session = load_session(input, view)?;
    let options = ExportOptions {
        format,
        delimiter: delimiter as u8,
    };
    let payload = session.export(output, &options)?;

    fs::write(&payload.filename, &payload.bytes)?;
    eprintln!(
        "Exported {} rows to {}",
        session.rows().len(),
        payload.filename
    );
    Ok(())
}

fn cmd_config_validate(file: &Path) -> CliResult {
    let config = ViewConfig::load(file)?;
    println!("Configuration OK");
    println!("   Ignored key prefixes: {}", config.ignored_keys.len());
    println!("   Pre-hidden columns: {}", config.columns_to_uncheck.len());
    Ok(())
}

fn cmd_config_init(output: Option<&Path>) -> CliResult {
    let config = ViewConfig {
        ignored_keys: vec![],
        columns_to_uncheck: vec![],
    };
    write_output(&config.to_json()?, output)
}

/// Write to a file, or stdout when no path is given.
fn write_output(content: &str, output: Option<&Path>) -> CliResult {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!("Saved to: {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
