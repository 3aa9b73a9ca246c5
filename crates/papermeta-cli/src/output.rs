use std::io::Write;
use std::path::Path;

use owo_colors::OwoColorize;
use papermeta_core::PipelineConfig;
use papermeta_ingest::{BatchOutcome, CopySummary, HeaderPreview, ProgressEvent};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// One line per finished or failed document, printed above the progress bar.
pub fn progress_line(event: &ProgressEvent, color: ColorMode) -> String {
    match event {
        ProgressEvent::Started { index, total, path } => {
            format!("[{}/{}] Reading {}", index + 1, total, file_name(path))
        }
        ProgressEvent::Finished {
            index,
            total,
            path,
            title,
            ..
        } => {
            let prefix = format!("[{}/{}]", index + 1, total);
            let title = shorten(title, 60);
            if color.enabled() {
                format!(
                    "{} {} {} -> \"{}\"",
                    prefix,
                    "\u{2713}".green(),
                    file_name(path),
                    title.bold()
                )
            } else {
                format!("{} OK {} -> \"{}\"", prefix, file_name(path), title)
            }
        }
        ProgressEvent::Failed {
            index,
            total,
            path,
            error,
        } => {
            let prefix = format!("[{}/{}]", index + 1, total);
            if color.enabled() {
                format!(
                    "{} {} {}: {}",
                    prefix,
                    "\u{2717}".red(),
                    file_name(path),
                    error.red()
                )
            } else {
                format!("{} FAILED {}: {}", prefix, file_name(path), error)
            }
        }
    }
}

/// Print the date line and candidate block found for one document.
pub fn print_preview(
    w: &mut dyn Write,
    preview: &HeaderPreview,
    color: ColorMode,
) -> std::io::Result<()> {
    let name = file_name(&preview.path);
    if color.enabled() {
        writeln!(w, "{}", name.bold())?;
    } else {
        writeln!(w, "{}", name)?;
    }
    writeln!(
        w,
        "  pages: {} ({} read for the header)",
        preview.page_count, preview.header_pages
    )?;

    match &preview.header.date {
        Some(date) => {
            if color.enabled() {
                writeln!(w, "  date:  {} ({})", date.date_value.cyan(), date.source_line.dimmed())?;
            } else {
                writeln!(w, "  date:  {} ({})", date.date_value, date.source_line)?;
            }
        }
        None => {
            if color.enabled() {
                writeln!(w, "  date:  {}", "none found".yellow())?;
            } else {
                writeln!(w, "  date:  none found")?;
            }
        }
    }

    writeln!(w, "  candidates:")?;
    for (i, line) in preview.header.candidate_lines.iter().enumerate() {
        writeln!(w, "    {:>2}. {}", i + 1, line)?;
    }
    writeln!(w)?;
    Ok(())
}

pub fn print_error(
    w: &mut dyn Write,
    path: &Path,
    error: &str,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}: {}", "error".red().bold(), file_name(path), error)?;
    } else {
        writeln!(w, "error {}: {}", file_name(path), error)?;
    }
    Ok(())
}

/// Print the end-of-batch summary.
pub fn print_summary(
    w: &mut dyn Write,
    outcomes: &[BatchOutcome],
    output_dir: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    let ok = outcomes.iter().filter(|o| o.result.is_ok()).count();
    let failed = outcomes.len() - ok;

    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "SUMMARY".bold())?;
        writeln!(w, "  Processed: {}", ok.to_string().green())?;
        if failed > 0 {
            writeln!(w, "  Failed:    {}", failed.to_string().red())?;
        }
    } else {
        writeln!(w, "SUMMARY")?;
        writeln!(w, "  Processed: {}", ok)?;
        if failed > 0 {
            writeln!(w, "  Failed:    {}", failed)?;
        }
    }
    for outcome in outcomes {
        if let Err(e) = &outcome.result {
            writeln!(w, "    {}: {}", file_name(&outcome.path), e)?;
        }
    }
    writeln!(w, "  Sidecars:  {}", output_dir.display())?;
    Ok(())
}

pub fn print_copy_summary(
    w: &mut dyn Write,
    summary: &CopySummary,
    output_dir: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(
            w,
            "Copied {} file(s) into {} ({} skipped, {} errors)",
            summary.copied.green(),
            output_dir.display(),
            summary.skipped.yellow(),
            if summary.errors > 0 {
                summary.errors.red().to_string()
            } else {
                summary.errors.to_string()
            }
        )?;
    } else {
        writeln!(
            w,
            "Copied {} file(s) into {} ({} skipped, {} errors)",
            summary.copied,
            output_dir.display(),
            summary.skipped,
            summary.errors
        )?;
    }
    Ok(())
}

pub fn print_config(
    w: &mut dyn Write,
    config: &PipelineConfig,
    config_path: Option<&Path>,
) -> std::io::Result<()> {
    match config_path {
        Some(path) => writeln!(w, "# config file: {}", path.display())?,
        None => writeln!(w, "# config file: (no platform config directory)")?,
    }
    writeln!(w, "[extraction]")?;
    writeln!(w, "min_line_chars = {}", config.min_line_chars)?;
    writeln!(w, "max_header_lines = {}", config.max_header_lines)?;
    writeln!(w, "min_content_chars = {}", config.min_content_chars)?;
    writeln!(w, "max_summary_pages = {}", config.max_summary_pages)?;
    writeln!(w, "candidate_policy = \"{}\"", config.candidate_policy)?;
    writeln!(w)?;
    writeln!(w, "[llm]")?;
    writeln!(w, "host = \"{}\"", config.llm.host)?;
    writeln!(w, "title_model = \"{}\"", config.llm.title_model)?;
    writeln!(w, "authors_model = \"{}\"", config.llm.authors_model)?;
    writeln!(w, "summary_model = \"{}\"", config.llm.summary_model)?;
    writeln!(w, "timeout_secs = {}", config.llm.timeout_secs)?;
    match config.llm.requests_per_minute {
        Some(n) => writeln!(w, "requests_per_minute = {}", n)?,
        None => writeln!(w, "# requests_per_minute = unlimited")?,
    }
    writeln!(w)?;
    writeln!(w, "[output]")?;
    writeln!(w, "dir = \"{}\"", config.output_dir.display())?;
    writeln!(w, "num_workers = {}", config.num_workers)?;
    Ok(())
}
