use crate::thread::BranchPolicy;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use eyre::{Result, eyre};
use serde::Deserialize;
use std::path::PathBuf;

/// Maximum length, in characters, of the title part of a filename.
pub const MAX_TITLE_STEM: usize = 50;

const DISALLOWED: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Configuration required to run the export process.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub input: PathBuf,
    pub target_dir: PathBuf,
    pub branch: BranchPolicy,
    pub formats: Vec<Format>,
    pub verbose: bool,
    pub quiet: bool,
}

impl ExportConfig {
    pub fn new(input: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            target_dir: target_dir.into(),
            branch: BranchPolicy::default(),
            formats: Format::ALL.to_vec(),
            verbose: false,
            quiet: true,
        }
    }

    pub fn wants(&self, format: Format) -> bool {
        self.formats.contains(&format)
    }
}

/// Output file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[value(name = "md")]
    #[serde(rename = "md")]
    Markdown,
    Docx,
}

impl Format {
    pub const ALL: [Format; 2] = [Format::Markdown, Format::Docx];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Markdown => "md",
            Format::Docx => "docx",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    Written,
    Skipped,
}

/// Remove characters that are not allowed in filenames on common filesystems.
pub fn sanitize_filename(name: &str) -> String {
    name.chars().filter(|c| !DISALLOWED.contains(c)).collect()
}

/// Title portion of an output filename: spaces become underscores, disallowed
/// characters are dropped and the result is capped at [`MAX_TITLE_STEM`] characters.
pub fn title_stem(title: &str) -> String {
    let stem: String = sanitize_filename(&title.replace(' ', "_"))
        .chars()
        .take(MAX_TITLE_STEM)
        .collect();
    if stem.is_empty() {
        "Untitled".to_string()
    } else {
        stem
    }
}

/// Convert export seconds (possibly fractional) into a UTC timestamp.
pub fn timestamp(seconds: f64) -> Result<DateTime<Utc>> {
    if !seconds.is_finite() {
        return Err(eyre!("Invalid create_time: {}", seconds));
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
        .ok_or_else(|| eyre!("create_time out of range: {}", seconds))
}

/// `YYYY-MM-DD` in UTC.
pub fn date_stem(seconds: f64) -> Result<String> {
    Ok(timestamp(seconds)?.format("%Y-%m-%d").to_string())
}
