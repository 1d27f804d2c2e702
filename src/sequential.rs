use crate::document;
use crate::importer::{self, Conversation};
use crate::renderer;
use crate::thread::{self, Entry};
use crate::utils::{ExportConfig, Format, ProcessResult, date_stem, title_stem};
use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Counts reported at the end of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub written: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// The main entry point for the export.
/// Loads the input, then converts every record one after another. A failing
/// record is reported and counted; it never stops the run.
pub fn execute(config: &ExportConfig) -> Result<Summary> {
    let records = importer::load_records(&config.input)?;
    fs::create_dir_all(&config.target_dir).wrap_err_with(|| {
        format!(
            "Failed to create target directory: {}",
            config.target_dir.display()
        )
    })?;
    run_records(records, config, io::stderr())
}

/// Diagnostic lines go above the progress bar, or to `fallback` when the bar
/// is not drawn (`--quiet`, or stderr is not a terminal).
struct Reporter<'a, W: Write> {
    pb: &'a ProgressBar,
    fallback: W,
}

impl<W: Write> Reporter<'_, W> {
    fn line(&mut self, line: String) {
        if self.pb.is_hidden() {
            let _ = writeln!(self.fallback, "{}", line);
        } else {
            self.pb.println(line);
        }
    }
}

fn run_records<W: Write>(
    records: Vec<Value>,
    config: &ExportConfig,
    fallback: W,
) -> Result<Summary> {
    let mut summary = Summary {
        total: records.len(),
        ..Summary::default()
    };

    let pb = if config.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(summary.total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
            )
            .wrap_err("Invalid progress bar template")?
            .progress_chars("=>-"),
        );
        bar.println(format!("Found {} conversations.", summary.total));
        bar
    };

    let mut registry: HashSet<String> = HashSet::new();
    let mut log = Reporter { pb: &pb, fallback };

    for (index, record) in records.into_iter().enumerate() {
        let label = record_label(index, &record);
        match export_conversation(record, config, &mut registry, &mut log) {
            Ok(ProcessResult::Written) => summary.written += 1,
            Ok(ProcessResult::Skipped) => summary.skipped += 1,
            Err(e) => {
                summary.errors += 1;
                log.line(format!("Error [{}]: {:#}", label, e));
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(summary)
}

/// `#index title` for error lines; the title is read raw so it is available
/// even when the record fails to decode.
fn record_label(index: usize, record: &Value) -> String {
    match record.get("title").and_then(Value::as_str) {
        Some(title) => format!("#{} {}", index, title.trim()),
        None => format!("#{}", index),
    }
}

fn export_conversation<W: Write>(
    record: Value,
    config: &ExportConfig,
    registry: &mut HashSet<String>,
    log: &mut Reporter<'_, W>,
) -> Result<ProcessResult> {
    let convo = Conversation::from_value(record)?;
    let title = convo.title();
    let created = date_stem(convo.create_time())?;

    let entries = thread::extract(&convo.mapping, config.branch)
        .wrap_err("Failed to extract conversation thread")?;
    if entries.is_empty() {
        if config.verbose {
            log.line(format!("Skipped:  {} (empty)", title));
        }
        return Ok(ProcessResult::Skipped);
    }

    let stem = allocate_filename(&created, title, registry);

    for &format in &config.formats {
        let path = config
            .target_dir
            .join(format!("{}.{}", stem, format.extension()));
        write_output(&path, format, &entries, title, &created)?;
        if config.verbose {
            log.line(format!("Written:  {}", file_name(&path)));
        }
    }

    Ok(ProcessResult::Written)
}

/// `{date}_{title}`, with `_2`, `_3`, ... appended when an earlier record in
/// this run already claimed the same stem.
fn allocate_filename(created: &str, title: &str, registry: &mut HashSet<String>) -> String {
    let base = format!("{}_{}", created, title_stem(title));
    if registry.insert(base.clone()) {
        return base;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{}_{}", base, n);
        if registry.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn write_output(
    path: &Path,
    format: Format,
    entries: &[Entry],
    title: &str,
    created: &str,
) -> Result<()> {
    let file =
        File::create(path).wrap_err_with(|| format!("Failed to create: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let result = match format {
        Format::Markdown => renderer::write_markdown(&mut writer, entries, title, created)
            .wrap_err("Failed to write markdown"),
        Format::Docx => document::write_docx(&mut writer, entries, title, created),
    }
    .and_then(|()| writer.flush().wrap_err("Failed to flush output file"));

    if result.is_err() {
        drop(writer);
        let _ = fs::remove_file(path);
    }
    result.wrap_err_with(|| format!("Failed to write: {}", path.display()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(title: &str, create_time: Value, text: &str) -> Value {
        json!({
            "title": title,
            "create_time": create_time,
            "mapping": {
                "root": {"parent": null, "children": ["a"]},
                "a": {
                    "parent": "root",
                    "children": [],
                    "message": {"author": {"role": "user"}, "content": {"parts": [text]}}
                }
            }
        })
    }

    fn config(dir: &Path) -> ExportConfig {
        ExportConfig::new(dir.join("conversations.json"), dir.join("out"))
    }

    #[test]
    fn allocate_filename_disambiguates() {
        let mut registry = HashSet::new();
        assert_eq!(
            allocate_filename("2024-01-01", "Same", &mut registry),
            "2024-01-01_Same"
        );
        assert_eq!(
            allocate_filename("2024-01-01", "Same", &mut registry),
            "2024-01-01_Same_2"
        );
        assert_eq!(
            allocate_filename("2024-01-01", "Same", &mut registry),
            "2024-01-01_Same_3"
        );
        assert_eq!(
            allocate_filename("2024-01-02", "Same", &mut registry),
            "2024-01-02_Same"
        );
    }

    #[test]
    fn empty_threads_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        fs::create_dir_all(&cfg.target_dir).unwrap();

        let records = vec![
            record("Blank", json!(0), "   "),
            json!({"title": "No root", "mapping": {"x": {"parent": "y", "children": []}}}),
        ];
        let summary = run_records(records, &cfg, io::sink()).unwrap();
        assert_eq!(
            summary,
            Summary {
                total: 2,
                written: 0,
                skipped: 2,
                errors: 0
            }
        );
        assert_eq!(fs::read_dir(&cfg.target_dir).unwrap().count(), 0);
    }

    #[test]
    fn bad_record_does_not_abort_batch() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        fs::create_dir_all(&cfg.target_dir).unwrap();

        let records = vec![
            record("First", json!(0), "one"),
            json!({"title": "Broken", "mapping": {"root": {"parent": null, "children": ["gone"]}}}),
            json!({"title": "No mapping"}),
            record("Last", json!(86400), "two"),
        ];
        let mut errors = Vec::new();
        let summary = run_records(records, &cfg, &mut errors).unwrap();
        assert_eq!(summary.written, 2);
        assert_eq!(summary.errors, 2);

        // Quiet run: the bar is hidden, so failures still reach the fallback stream.
        let errors = String::from_utf8(errors).unwrap();
        assert!(errors.contains("Error [#1 Broken]"), "{}", errors);
        assert!(errors.contains("gone"), "{}", errors);
        assert!(errors.contains("Error [#2 No mapping]"), "{}", errors);

        assert!(cfg.target_dir.join("1970-01-01_First.md").exists());
        assert!(cfg.target_dir.join("1970-01-01_First.docx").exists());
        assert!(cfg.target_dir.join("1970-01-02_Last.md").exists());
        assert!(cfg.target_dir.join("1970-01-02_Last.docx").exists());
    }

    #[test]
    fn duplicate_titles_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        fs::create_dir_all(&cfg.target_dir).unwrap();

        let records = vec![
            record("Dup", json!(0), "first"),
            record("Dup", json!(0), "second"),
        ];
        run_records(records, &cfg, io::sink()).unwrap();

        let first = fs::read_to_string(cfg.target_dir.join("1970-01-01_Dup.md")).unwrap();
        let second = fs::read_to_string(cfg.target_dir.join("1970-01-01_Dup_2.md")).unwrap();
        assert!(first.contains("first"));
        assert!(second.contains("second"));
    }

    #[test]
    fn title_without_usable_characters_is_named_untitled() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        fs::create_dir_all(&cfg.target_dir).unwrap();

        run_records(vec![record("???", json!(0), "x")], &cfg, io::sink()).unwrap();
        assert!(cfg.target_dir.join("1970-01-01_Untitled.md").exists());
        assert!(cfg.target_dir.join("1970-01-01_Untitled.docx").exists());

        // The raw title is still used inside the document.
        let md = fs::read_to_string(cfg.target_dir.join("1970-01-01_Untitled.md")).unwrap();
        assert!(md.starts_with("# ???\n"));
    }

    #[test]
    fn reporter_prints_to_fallback_when_bar_is_hidden() {
        let pb = ProgressBar::hidden();
        let mut out = Vec::new();
        let mut log = Reporter {
            pb: &pb,
            fallback: &mut out,
        };
        log.line("Error [#0 x]: boom".to_string());
        assert_eq!(String::from_utf8(out).unwrap(), "Error [#0 x]: boom\n");
    }

    #[test]
    fn only_selected_formats_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.formats = vec![Format::Markdown];
        fs::create_dir_all(&cfg.target_dir).unwrap();

        run_records(vec![record("Only md", json!(0), "x")], &cfg, io::sink()).unwrap();
        assert!(cfg.target_dir.join("1970-01-01_Only_md.md").exists());
        assert!(!cfg.target_dir.join("1970-01-01_Only_md.docx").exists());
    }

    #[test]
    fn execute_creates_missing_target_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        fs::write(
            &cfg.input,
            json!({"conversations": [record("Wrapped", json!(0), "hi")]}).to_string(),
        )
        .unwrap();

        let summary = execute(&cfg).unwrap();
        assert_eq!(summary.written, 1);
        assert!(cfg.target_dir.join("1970-01-01_Wrapped.md").exists());
    }

    #[test]
    fn unreadable_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        assert!(execute(&cfg).is_err());
    }
}
