use std::sync::Arc;

use papermeta_core::{CandidatePolicy, DetectedDate, PipelineConfig};

use crate::date::{DateDetector, PatternDateDetector};

/// The date and title/author candidate lines found at the top of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    pub date: Option<DetectedDate>,
    pub candidate_lines: Vec<String>,
}

/// Splits cleaned lines into a detected date and a candidate block.
#[derive(Clone)]
pub struct HeaderSplitter {
    max_scan: usize,
    policy: CandidatePolicy,
    detector: Arc<dyn DateDetector>,
}

impl Default for HeaderSplitter {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl HeaderSplitter {
    pub fn new(max_scan: usize, policy: CandidatePolicy, detector: Arc<dyn DateDetector>) -> Self {
        Self {
            max_scan,
            policy,
            detector,
        }
    }

    /// Build a splitter using [`PatternDateDetector`].
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.max_header_lines,
            config.candidate_policy,
            Arc::new(PatternDateDetector::new()),
        )
    }

    pub fn with_detector(mut self, detector: Arc<dyn DateDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn policy(&self) -> CandidatePolicy {
        self.policy
    }

    pub fn split(&self, lines: &[String]) -> HeaderBlock {
        split_with_policy(lines, self.max_scan, self.policy, self.detector.as_ref())
    }
}

/// Scan the first `max_scan` lines for a date and collect the lines after it.
///
/// The first line holding a date becomes [`HeaderBlock::date`] and is not a
/// candidate itself. Lines scanned before the date are dropped, so a title
/// printed above the date never reaches the candidate block; with no date
/// in the window the block is empty. Use [`CandidatePolicy::WholeWindow`]
/// through [`HeaderSplitter`] to keep those lines instead.
pub fn split_header(lines: &[String], max_scan: usize, detector: &dyn DateDetector) -> HeaderBlock {
    split_with_policy(lines, max_scan, CandidatePolicy::AfterDate, detector)
}

fn split_with_policy(
    lines: &[String],
    max_scan: usize,
    policy: CandidatePolicy,
    detector: &dyn DateDetector,
) -> HeaderBlock {
    let mut block = HeaderBlock::default();

    for line in lines.iter().take(max_scan) {
        if block.date.is_none() {
            if let Some(found) = detector.find_dates(line).into_iter().next() {
                tracing::debug!(date = %found.normalized, line = %line, "date line found");
                block.date = Some(DetectedDate {
                    date_value: found.normalized,
                    source_line: line.clone(),
                });
                continue;
            }
            if policy == CandidatePolicy::WholeWindow {
                block.candidate_lines.push(line.clone());
            }
        } else {
            block.candidate_lines.push(line.clone());
        }
    }

    if block.date.is_none() {
        tracing::debug!(scanned = lines.len().min(max_scan), "no date in header window");
    }
    block
}
