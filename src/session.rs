//! Request-scoped analysis state: an explicit struct passed around
//! instead of implicit globals. One session exists per running process
//! (single-user deployment).

use std::path::PathBuf;

use crate::diagnosis::DiagnosisError;

/// Season choices offered by the form. The empty entry means
/// "not specified".
pub const SEASONS: &[&str] = &["", "Spring", "Summer", "Monsoon", "Autumn", "Winter"];

/// Optional context accompanying an analysis. Each field is either empty
/// or a non-empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafContext {
    pub species: String,
    pub region: String,
    pub season: String,
}

/// Fixed ordered rating scale for diagnosis feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rating {
    Poor,
    Okay,
    Good,
    Great,
    Excellent,
}

impl Rating {
    pub const ALL: [Rating; 5] = [
        Rating::Poor,
        Rating::Okay,
        Rating::Good,
        Rating::Great,
        Rating::Excellent,
    ];

    /// The literal label; this exact string lands in the feedback log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Poor => "\u{2b50} Poor",
            Rating::Okay => "\u{2b50}\u{2b50} Okay",
            Rating::Good => "\u{2b50}\u{2b50}\u{2b50} Good",
            Rating::Great => "\u{2b50}\u{2b50}\u{2b50}\u{2b50} Great",
            Rating::Excellent => "\u{2b50}\u{2b50}\u{2b50}\u{2b50}\u{2b50} Excellent",
        }
    }

    /// Parse a submitted form value back into a rating level.
    pub fn parse(value: &str) -> Option<Rating> {
        Rating::ALL.into_iter().find(|r| r.as_str() == value)
    }
}

/// Outcome of the latest analysis, tagged so callers can branch without
/// inspecting strings.
#[derive(Debug)]
pub enum AnalysisOutcome {
    Diagnosis(String),
    Failed(DiagnosisError),
}

impl AnalysisOutcome {
    /// Text shown in the result panel and captured by feedback: the
    /// model's response verbatim, or the error rendered the way it has
    /// always read.
    pub fn display_text(&self) -> String {
        match self {
            AnalysisOutcome::Diagnosis(text) => text.clone(),
            AnalysisOutcome::Failed(e) => e.display_text(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AnalysisOutcome::Failed(_))
    }
}

/// State carried between form interactions: the current image, the prompt
/// as last submitted, the latest outcome, and one-shot messages for the
/// next page render.
#[derive(Debug, Default)]
pub struct AnalysisSession {
    pub image: Option<PathBuf>,
    pub prompt: Option<String>,
    pub outcome: Option<AnalysisOutcome>,
    pub context: LeafContext,
    warnings: Vec<String>,
    notice: Option<String>,
}

impl AnalysisSession {
    /// Queue a warning for the next page render.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Queue a confirmation message for the next page render.
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    /// Drain queued warnings; they render once, then disappear.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    /// Basename of the current image, for display and for the feedback
    /// log (which records names, not full paths).
    pub fn image_name(&self) -> Option<String> {
        self.image
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
    }
}
