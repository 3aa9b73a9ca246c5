use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{CandidatePolicy, PipelineConfigBuilder};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub extraction: Option<ExtractionConfig>,
    pub llm: Option<LlmSection>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub min_line_chars: Option<usize>,
    pub max_header_lines: Option<usize>,
    pub min_content_chars: Option<usize>,
    pub max_summary_pages: Option<usize>,
    pub candidate_policy: Option<CandidatePolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmSection {
    pub host: Option<String>,
    pub title_model: Option<String>,
    pub authors_model: Option<String>,
    pub summary_model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub requests_per_minute: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: Option<String>,
    pub num_workers: Option<usize>,
}

/// Platform config directory path: `<config_dir>/papermeta/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("papermeta").join("config.toml"))
}

/// Load config by cascading CWD `.papermeta.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".papermeta.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_ex = base.extraction.unwrap_or_default();
    let over_ex = overlay.extraction.unwrap_or_default();
    let base_llm = base.llm.unwrap_or_default();
    let over_llm = overlay.llm.unwrap_or_default();
    let base_out = base.output.unwrap_or_default();
    let over_out = overlay.output.unwrap_or_default();

    ConfigFile {
        extraction: Some(ExtractionConfig {
            min_line_chars: over_ex.min_line_chars.or(base_ex.min_line_chars),
            max_header_lines: over_ex.max_header_lines.or(base_ex.max_header_lines),
            min_content_chars: over_ex.min_content_chars.or(base_ex.min_content_chars),
            max_summary_pages: over_ex.max_summary_pages.or(base_ex.max_summary_pages),
            candidate_policy: over_ex.candidate_policy.or(base_ex.candidate_policy),
        }),
        llm: Some(LlmSection {
            host: over_llm.host.or(base_llm.host),
            title_model: over_llm.title_model.or(base_llm.title_model),
            authors_model: over_llm.authors_model.or(base_llm.authors_model),
            summary_model: over_llm.summary_model.or(base_llm.summary_model),
            timeout_secs: over_llm.timeout_secs.or(base_llm.timeout_secs),
            requests_per_minute: over_llm.requests_per_minute.or(base_llm.requests_per_minute),
        }),
        output: Some(OutputConfig {
            dir: over_out.dir.or(base_out.dir),
            num_workers: over_out.num_workers.or(base_out.num_workers),
        }),
    }
}

impl ConfigFile {
    /// Seed a [`PipelineConfigBuilder`] with every value present in the file.
    ///
    /// Callers apply CLI flags and environment variables on top of the
    /// returned builder, so file values only win over built-in defaults.
    pub fn to_builder(&self) -> PipelineConfigBuilder {
        let mut builder = PipelineConfigBuilder::new();

        if let Some(ex) = &self.extraction {
            if let Some(n) = ex.min_line_chars {
                builder = builder.min_line_chars(n);
            }
            if let Some(n) = ex.max_header_lines {
                builder = builder.max_header_lines(n);
            }
            if let Some(n) = ex.min_content_chars {
                builder = builder.min_content_chars(n);
            }
            if let Some(n) = ex.max_summary_pages {
                builder = builder.max_summary_pages(n);
            }
            if let Some(policy) = ex.candidate_policy {
                builder = builder.candidate_policy(policy);
            }
        }

        if let Some(llm) = &self.llm {
            if let Some(host) = &llm.host {
                builder = builder.host(host.clone());
            }
            if let Some(m) = &llm.title_model {
                builder = builder.title_model(m.clone());
            }
            if let Some(m) = &llm.authors_model {
                builder = builder.authors_model(m.clone());
            }
            if let Some(m) = &llm.summary_model {
                builder = builder.summary_model(m.clone());
            }
            if let Some(secs) = llm.timeout_secs {
                builder = builder.timeout_secs(secs);
            }
            if let Some(n) = llm.requests_per_minute {
                builder = builder.requests_per_minute(n);
            }
        }

        if let Some(out) = &self.output {
            if let Some(dir) = &out.dir {
                builder = builder.output_dir(dir);
            }
            if let Some(n) = out.num_workers {
                builder = builder.num_workers(n);
            }
        }

        builder
    }
}
