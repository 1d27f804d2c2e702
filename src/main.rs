use chatgpt_export::{BranchPolicy, ExportConfig, Format, sequential};
use clap::Parser;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_INPUT: &str = "conversations.json";
const DEFAULT_TARGET_DIR: &str = "chatgpt_export_reader_output";

/// Convert a ChatGPT data export into Markdown and Word documents.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the exported conversations.json.
    /// Defaults to ./conversations.json if not set in config.
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Directory to write the converted files to.
    /// Defaults to ./chatgpt_export_reader_output if not set in config.
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/chatgpt-export/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Which reply to follow when a message was edited or regenerated.
    #[arg(long, value_enum, value_name = "POLICY")]
    branch: Option<BranchPolicy>,

    /// Comma-separated output formats (e.g. "md,docx").
    #[arg(long, value_enum, value_name = "FORMATS", value_delimiter = ',')]
    formats: Option<Vec<Format>>,

    /// Print each file written or skipped.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress standard output (progress bar and summary).
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    input: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    branch: Option<BranchPolicy>,
    formats: Option<Vec<Format>>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("chatgpt-export/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve paths (CLI > Config > Default)
    let input = cli
        .input
        .or(file_cfg.input)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT));
    let target_dir = cli
        .output
        .or(file_cfg.output_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET_DIR));

    if !input.exists() {
        return Err(eyre!(
            "Input not found at: {}\nPass the path to conversations.json as the first argument.",
            input.display()
        ));
    }

    // 3. Resolve conversion options (CLI > Config > Default)
    let branch = cli.branch.or(file_cfg.branch).unwrap_or_default();
    let formats = cli
        .formats
        .or(file_cfg.formats)
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| Format::ALL.to_vec());

    let config = ExportConfig {
        input,
        target_dir,
        branch,
        formats,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    // 4. Run the conversion
    let summary = sequential::execute(&config)?;

    if !config.quiet {
        let mut line = format!(
            "Done. {} written, {} skipped into '{}'.",
            summary.written,
            summary.skipped,
            config.target_dir.display()
        );
        if summary.errors > 0 {
            line.push_str(&format!(" Completed with {} error(s).", summary.errors));
        }
        println!("{}", line);
    }

    if summary.errors > 0 {
        return Err(eyre!(
            "{} of {} conversation(s) could not be converted",
            summary.errors,
            summary.total
        ));
    }

    Ok(())
}
