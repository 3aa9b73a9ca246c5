use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use papermeta_core::config_file::{self, ConfigFile};
use papermeta_core::{CandidatePolicy, PipelineConfig};
use papermeta_ingest::{Pipeline, ProgressEvent};
use papermeta_llm::{ChatModel, OllamaChat, RateLimitedChat};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod output;

use output::ColorMode;

const LOG_FILE: &str = "process.log";

/// Extract title, authors, date and summary from academic PDFs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract metadata from PDFs and write one JSON sidecar per document
    Extract {
        /// PDF files, or directories whose *.pdf files should be processed
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Write logs to stderr instead of <output-dir>/process.log
        #[arg(long)]
        log_stderr: bool,

        /// Print the detected date and candidate lines without calling the model
        #[arg(long)]
        dry_run: bool,
    },

    /// Copy each source PDF into the output directory under its new name
    Copy {
        /// Directory holding the JSON sidecars
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Write logs to stderr instead of <output-dir>/process.log
        #[arg(long)]
        log_stderr: bool,
    },

    /// Print the resolved configuration
    Config {
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

/// Settings that can come from flags, the environment or a config file.
#[derive(Args, Debug, Default)]
struct SettingsArgs {
    /// Directory for sidecars and the log file
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Ollama server URL
    #[arg(long)]
    host: Option<String>,

    /// Model used for every request
    #[arg(long)]
    model: Option<String>,

    /// Model used for the title request
    #[arg(long)]
    title_model: Option<String>,

    /// Model used for the authors request
    #[arg(long)]
    authors_model: Option<String>,

    /// Model used for the summary request
    #[arg(long)]
    summary_model: Option<String>,

    /// Number of documents processed concurrently
    #[arg(short, long)]
    workers: Option<usize>,

    /// Which header lines are sent as candidates: after-date or whole-window
    #[arg(long)]
    candidates: Option<CandidatePolicy>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let file = config_file::load_config();

    match cli.command {
        Command::Extract {
            paths,
            settings,
            no_color,
            log_stderr,
            dry_run,
        } => {
            let config = resolve_config(&settings, &file, env_var)?;
            let _guard = init_logging(&config.output_dir, log_stderr)?;
            let color = ColorMode(!no_color);
            if dry_run {
                dry_run_extract(paths, config, color).await
            } else {
                extract(paths, config, color).await
            }
        }
        Command::Copy {
            output_dir,
            no_color,
            log_stderr,
        } => {
            let settings = SettingsArgs {
                output_dir,
                ..SettingsArgs::default()
            };
            let config = resolve_config(&settings, &file, env_var)?;
            let _guard = init_logging(&config.output_dir, log_stderr)?;
            copy(&config.output_dir, ColorMode(!no_color))
        }
        Command::Config { settings } => {
            let config = resolve_config(&settings, &file, env_var)?;
            let mut out = std::io::stdout();
            output::print_config(&mut out, &config, config_file::config_path().as_deref())?;
            Ok(())
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve settings: CLI flags > environment > config file > defaults.
fn resolve_config(
    args: &SettingsArgs,
    file: &ConfigFile,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<PipelineConfig> {
    let mut builder = file.to_builder();

    if let Some(host) = env("OLLAMA_HOST") {
        builder = builder.host(host);
    }
    if let Some(dir) = env("PAPERMETA_OUTPUT_DIR") {
        builder = builder.output_dir(dir);
    }
    if let Some(model) = env("PAPERMETA_MODEL") {
        builder = builder.model(model);
    }

    if let Some(host) = &args.host {
        builder = builder.host(host.clone());
    }
    if let Some(model) = &args.model {
        builder = builder.model(model.clone());
    }
    if let Some(m) = &args.title_model {
        builder = builder.title_model(m.clone());
    }
    if let Some(m) = &args.authors_model {
        builder = builder.authors_model(m.clone());
    }
    if let Some(m) = &args.summary_model {
        builder = builder.summary_model(m.clone());
    }
    if let Some(dir) = &args.output_dir {
        builder = builder.output_dir(dir.clone());
    }
    if let Some(n) = args.workers {
        builder = builder.num_workers(n);
    }
    if let Some(policy) = args.candidates {
        builder = builder.candidate_policy(policy);
    }

    Ok(builder.build()?)
}

/// Install the global subscriber. Logs go to `<output_dir>/process.log`
/// unless `to_stderr` is set; the returned guard flushes the file on drop.
fn init_logging(
    output_dir: &Path,
    to_stderr: bool,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("papermeta=info"));

    if to_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    }

    std::fs::create_dir_all(output_dir)?;
    let appender = tracing_appender::rolling::never(output_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

async fn extract(paths: Vec<PathBuf>, config: PipelineConfig, color: ColorMode) -> anyhow::Result<()> {
    let paths = papermeta_ingest::collect_pdf_paths(&paths)?;
    if paths.is_empty() {
        anyhow::bail!("No PDF files found");
    }
    let config = Arc::new(config);

    let ollama = OllamaChat::from_config(&config.llm);
    if let Err(e) = ollama.check_connectivity().await {
        anyhow::bail!("{e}");
    }
    let chat: Arc<dyn ChatModel> =
        RateLimitedChat::wrap(Arc::new(ollama), config.llm.requests_per_minute);
    let backend = papermeta_ingest::default_backend()?;
    let pipeline = Arc::new(Pipeline::new(backend, chat, config.clone()));

    tracing::info!(
        documents = paths.len(),
        host = %config.llm.host,
        output_dir = %config.output_dir.display(),
        "starting extraction"
    );

    let bar = ProgressBar::new(paths.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let progress_cb = {
        let bar = bar.clone();
        move |event: ProgressEvent| match &event {
            ProgressEvent::Started { path, .. } => bar.set_message(output::file_name(path)),
            ProgressEvent::Finished { .. } | ProgressEvent::Failed { .. } => {
                bar.println(output::progress_line(&event, color));
                bar.inc(1);
            }
        }
    };

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let outcomes =
        papermeta_ingest::process_batch(paths, pipeline, Arc::new(progress_cb), cancel.clone()).await;
    bar.finish_and_clear();

    let mut out = std::io::stdout();
    output::print_summary(&mut out, &outcomes, &config.output_dir, color)?;
    out.flush()?;

    if cancel.is_cancelled() {
        anyhow::bail!("Cancelled");
    }
    Ok(())
}

async fn dry_run_extract(paths: Vec<PathBuf>, config: PipelineConfig, color: ColorMode) -> anyhow::Result<()> {
    let paths = papermeta_ingest::collect_pdf_paths(&paths)?;
    if paths.is_empty() {
        anyhow::bail!("No PDF files found");
    }
    let config = Arc::new(config);
    // The model is never contacted in a dry run.
    let chat: Arc<dyn ChatModel> = Arc::new(OllamaChat::from_config(&config.llm));
    let pipeline = Pipeline::new(papermeta_ingest::default_backend()?, chat, config);

    let mut out = std::io::stdout();
    for path in &paths {
        match pipeline.preview(path).await {
            Ok(preview) => output::print_preview(&mut out, &preview, color)?,
            Err(e) => output::print_error(&mut out, path, &e.to_string(), color)?,
        }
    }
    Ok(())
}

fn copy(output_dir: &Path, color: ColorMode) -> anyhow::Result<()> {
    let summary = papermeta_ingest::copy_renamed(output_dir)?;
    let mut out = std::io::stdout();
    output::print_copy_summary(&mut out, &summary, output_dir, color)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use papermeta_core::config_file::{LlmSection, OutputConfig};

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn file_with_host(host: &str) -> ConfigFile {
        ConfigFile {
            llm: Some(LlmSection {
                host: Some(host.to_string()),
                ..Default::default()
            }),
            output: Some(OutputConfig {
                dir: Some("/from/file".to_string()),
                num_workers: Some(6),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_without_any_source() {
        let config = resolve_config(&SettingsArgs::default(), &ConfigFile::default(), env_from(&[])).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_file_then_env_then_flags() {
        let file = file_with_host("http://file:11434");

        let config = resolve_config(&SettingsArgs::default(), &file, env_from(&[])).unwrap();
        assert_eq!(config.llm.host, "http://file:11434");
        assert_eq!(config.output_dir, PathBuf::from("/from/file"));
        assert_eq!(config.num_workers, 6);

        let env = env_from(&[
            ("OLLAMA_HOST", "http://env:11434"),
            ("PAPERMETA_OUTPUT_DIR", "/from/env"),
            ("PAPERMETA_MODEL", "llama3:8b"),
        ]);
        let config = resolve_config(&SettingsArgs::default(), &file, &env).unwrap();
        assert_eq!(config.llm.host, "http://env:11434");
        assert_eq!(config.output_dir, PathBuf::from("/from/env"));
        assert_eq!(config.llm.summary_model, "llama3:8b");

        let args = SettingsArgs {
            host: Some("http://flag:11434".into()),
            output_dir: Some(PathBuf::from("/from/flag")),
            summary_model: Some("qwen3:14b".into()),
            workers: Some(1),
            candidates: Some(CandidatePolicy::WholeWindow),
            ..SettingsArgs::default()
        };
        let config = resolve_config(&args, &file, &env).unwrap();
        assert_eq!(config.llm.host, "http://flag:11434");
        assert_eq!(config.output_dir, PathBuf::from("/from/flag"));
        assert_eq!(config.llm.title_model, "llama3:8b");
        assert_eq!(config.llm.summary_model, "qwen3:14b");
        assert_eq!(config.num_workers, 1);
        assert_eq!(config.candidate_policy, CandidatePolicy::WholeWindow);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let args = SettingsArgs {
            workers: Some(0),
            ..SettingsArgs::default()
        };
        assert!(resolve_config(&args, &ConfigFile::default(), env_from(&[])).is_err());

        let env = env_from(&[("OLLAMA_HOST", "localhost:11434")]);
        assert!(resolve_config(&SettingsArgs::default(), &ConfigFile::default(), env).is_err());
    }

    #[test]
    fn test_cli_parses_extract_flags() {
        let cli = Cli::try_parse_from([
            "papermeta",
            "extract",
            "a.pdf",
            "papers/",
            "--candidates",
            "whole-window",
            "--workers",
            "4",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Command::Extract {
                paths,
                settings,
                dry_run,
                ..
            } => {
                assert_eq!(paths, vec![PathBuf::from("a.pdf"), PathBuf::from("papers/")]);
                assert_eq!(settings.candidates, Some(CandidatePolicy::WholeWindow));
                assert_eq!(settings.workers, Some(4));
                assert!(dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_extract_requires_paths() {
        assert!(Cli::try_parse_from(["papermeta", "extract"]).is_err());
    }
}
