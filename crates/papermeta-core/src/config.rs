use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MIN_LINE_CHARS: usize = 5;
pub const DEFAULT_MAX_HEADER_LINES: usize = 16;
pub const DEFAULT_MIN_CONTENT_CHARS: usize = 25;
pub const DEFAULT_MAX_SUMMARY_PAGES: usize = 8;
pub const DEFAULT_NUM_WORKERS: usize = 2;
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "gpt-oss:latest";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_OUTPUT_DIR: &str = "./output";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("invalid model host {0:?}: expected an http:// or https:// URL")]
    InvalidHost(String),
    #[error("model name for {0} is empty")]
    EmptyModel(&'static str),
    #[error("unknown candidate policy {0:?} (expected after-date or whole-window)")]
    UnknownPolicy(String),
}

/// Which scanned header lines become title/author candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidatePolicy {
    /// Only lines scanned after the first date line. Lines before the date
    /// are dropped and no date means no candidates.
    #[default]
    AfterDate,
    /// Every scanned line except the date line, whether or not a date is found.
    WholeWindow,
}

impl CandidatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidatePolicy::AfterDate => "after-date",
            CandidatePolicy::WholeWindow => "whole-window",
        }
    }
}

impl fmt::Display for CandidatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidatePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "after-date" | "after_date" => Ok(CandidatePolicy::AfterDate),
            "whole-window" | "whole_window" => Ok(CandidatePolicy::WholeWindow),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Model endpoint and model identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    /// Base URL of the Ollama server.
    pub host: String,
    pub title_model: String,
    pub authors_model: String,
    pub summary_model: String,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
    /// Optional cap on model requests per minute, shared by all workers.
    pub requests_per_minute: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            title_model: DEFAULT_MODEL.to_string(),
            authors_model: DEFAULT_MODEL.to_string(),
            summary_model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            requests_per_minute: None,
        }
    }
}

/// Configuration for the metadata extraction pipeline.
///
/// Passed explicitly to every stage; nothing is read from process-wide state.
/// Use [`PipelineConfigBuilder`] to construct a validated instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// A cleaned line must be strictly longer than this many characters.
    pub min_line_chars: usize,
    /// Number of cleaned lines scanned for the date and header candidates.
    pub max_header_lines: usize,
    /// Raw characters required before header accumulation stops pulling pages.
    pub min_content_chars: usize,
    /// Number of leading pages concatenated for the summary prompt.
    pub max_summary_pages: usize,
    pub candidate_policy: CandidatePolicy,
    pub llm: LlmConfig,
    /// Directory receiving sidecar records (and renamed copies).
    pub output_dir: PathBuf,
    /// Documents processed concurrently by the batch driver.
    pub num_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_line_chars: DEFAULT_MIN_LINE_CHARS,
            max_header_lines: DEFAULT_MAX_HEADER_LINES,
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            max_summary_pages: DEFAULT_MAX_SUMMARY_PAGES,
            candidate_policy: CandidatePolicy::default(),
            llm: LlmConfig::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            num_workers: DEFAULT_NUM_WORKERS,
        }
    }
}

/// Builder for [`PipelineConfig`].
///
/// Unset values fall back to the defaults; [`build()`](Self::build) rejects
/// zero-valued limits and malformed hosts.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    min_line_chars: Option<usize>,
    max_header_lines: Option<usize>,
    min_content_chars: Option<usize>,
    max_summary_pages: Option<usize>,
    candidate_policy: Option<CandidatePolicy>,
    host: Option<String>,
    title_model: Option<String>,
    authors_model: Option<String>,
    summary_model: Option<String>,
    timeout_secs: Option<u64>,
    requests_per_minute: Option<u32>,
    output_dir: Option<PathBuf>,
    num_workers: Option<usize>,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Text heuristics ──

    pub fn min_line_chars(mut self, n: usize) -> Self {
        self.min_line_chars = Some(n);
        self
    }

    pub fn max_header_lines(mut self, n: usize) -> Self {
        self.max_header_lines = Some(n);
        self
    }

    pub fn min_content_chars(mut self, n: usize) -> Self {
        self.min_content_chars = Some(n);
        self
    }

    pub fn max_summary_pages(mut self, n: usize) -> Self {
        self.max_summary_pages = Some(n);
        self
    }

    pub fn candidate_policy(mut self, policy: CandidatePolicy) -> Self {
        self.candidate_policy = Some(policy);
        self
    }

    // ── Model ──

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Use the same model for the title, authors and summary prompts.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.title_model = Some(model.clone());
        self.authors_model = Some(model.clone());
        self.summary_model = Some(model);
        self
    }

    pub fn title_model(mut self, model: impl Into<String>) -> Self {
        self.title_model = Some(model.into());
        self
    }

    pub fn authors_model(mut self, model: impl Into<String>) -> Self {
        self.authors_model = Some(model.into());
        self
    }

    pub fn summary_model(mut self, model: impl Into<String>) -> Self {
        self.summary_model = Some(model.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn requests_per_minute(mut self, n: u32) -> Self {
        self.requests_per_minute = Some(n);
        self
    }

    // ── Output / batch ──

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = Some(n);
        self
    }

    /// Validate and produce a [`PipelineConfig`].
    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let non_zero = |value: Option<usize>, default: usize, name: &'static str| {
            match value.unwrap_or(default) {
                0 => Err(ConfigError::Zero(name)),
                n => Ok(n),
            }
        };
        let model = |value: Option<String>, name: &'static str| {
            let model = value.unwrap_or_else(|| DEFAULT_MODEL.to_string());
            if model.trim().is_empty() {
                Err(ConfigError::EmptyModel(name))
            } else {
                Ok(model)
            }
        };

        let host = self
            .host
            .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(ConfigError::InvalidHost(host));
        }

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Zero("timeout_secs"));
        }
        if self.requests_per_minute == Some(0) {
            return Err(ConfigError::Zero("requests_per_minute"));
        }

        Ok(PipelineConfig {
            min_line_chars: self.min_line_chars.unwrap_or(DEFAULT_MIN_LINE_CHARS),
            max_header_lines: non_zero(
                self.max_header_lines,
                DEFAULT_MAX_HEADER_LINES,
                "max_header_lines",
            )?,
            min_content_chars: non_zero(
                self.min_content_chars,
                DEFAULT_MIN_CONTENT_CHARS,
                "min_content_chars",
            )?,
            max_summary_pages: non_zero(
                self.max_summary_pages,
                DEFAULT_MAX_SUMMARY_PAGES,
                "max_summary_pages",
            )?,
            candidate_policy: self.candidate_policy.unwrap_or_default(),
            llm: LlmConfig {
                host,
                title_model: model(self.title_model, "title")?,
                authors_model: model(self.authors_model, "authors")?,
                summary_model: model(self.summary_model, "summary")?,
                timeout_secs,
                requests_per_minute: self.requests_per_minute,
            },
            output_dir: self
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            num_workers: non_zero(self.num_workers, DEFAULT_NUM_WORKERS, "num_workers")?,
        })
    }
}
