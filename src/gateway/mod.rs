//! Boundary to the generative-AI service.
//!
//! Every call is blocking; the app runs them on worker threads through
//! [`task::PendingTask`]. Paper generation failures are surfaced as
//! [`GatewayError`]s the user can retry. Commentary and mistake analysis are
//! best-effort and always resolve to displayable text via the `*_or_fallback`
//! helpers.

pub mod demo;
#[cfg(feature = "network")]
pub mod gemini;
pub mod paper;
pub mod prompt;
pub mod task;

use std::sync::Arc;

use thiserror::Error;

use crate::exam::model::{Difficulty, ExamPaper, ExamResult, Subject};
use task::PendingTask;

pub const COMMENTARY_FALLBACK: &str =
    "由于网络原因，暂时无法获取 AI 深度点评。请查看下方的详细答题情况进行自我总结。";
pub const ANALYSIS_FAILURE: &str = "分析失败，请稍后重试。";
pub const EMPTY_COMMENTARY: &str = "暂时无法生成分析。";
pub const EMPTY_ANALYSIS: &str = "无法生成深度分析。";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no API key configured (set GEMINI_API_KEY or api_key in config.toml)")]
    MissingApiKey,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("AI service unavailable: {0}")]
    Unavailable(String),
    #[error("AI service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("malformed AI response: {0}")]
    Malformed(String),
    #[error("network error: {0}")]
    Transport(String),
}

impl GatewayError {
    /// Whether trying the same request again could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::MissingApiKey | GatewayError::InvalidRequest(_) => false,
            GatewayError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PaperRequest {
    pub subject: Subject,
    pub chapters: Vec<String>,
    pub difficulty: Difficulty,
    pub count: usize,
}

impl PaperRequest {
    pub fn new(subject: Subject, chapters: Vec<String>, difficulty: Difficulty, count: usize) -> Self {
        Self {
            subject,
            chapters,
            difficulty,
            count,
        }
    }

    /// Checked before any request goes out.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.chapters.iter().all(|c| c.trim().is_empty()) {
            return Err(GatewayError::InvalidRequest(
                "select at least one chapter".to_string(),
            ));
        }
        if self.count == 0 {
            return Err(GatewayError::InvalidRequest(
                "question count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub trait ExamAi: Send + Sync {
    fn name(&self) -> &str;

    fn generate_paper(&self, request: &PaperRequest) -> Result<ExamPaper, GatewayError>;

    fn generate_commentary(
        &self,
        result: &ExamResult,
        paper: &ExamPaper,
    ) -> Result<String, GatewayError>;

    /// `summary` is the text built by [`prompt::mistake_summary`].
    fn analyze_mistakes(&self, summary: &str) -> Result<String, GatewayError>;
}

/// Commentary text for the result screen. Never fails.
pub fn commentary_or_fallback(ai: &dyn ExamAi, result: &ExamResult, paper: &ExamPaper) -> String {
    match ai.generate_commentary(result, paper) {
        Ok(text) if text.trim().is_empty() => EMPTY_COMMENTARY.to_string(),
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(gateway = ai.name(), "commentary failed, using fallback: {e}");
            COMMENTARY_FALLBACK.to_string()
        }
    }
}

/// Mistake-bank analysis text. Never fails.
pub fn analysis_or_fallback(ai: &dyn ExamAi, summary: &str) -> String {
    match ai.analyze_mistakes(summary) {
        Ok(text) if text.trim().is_empty() => EMPTY_ANALYSIS.to_string(),
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(gateway = ai.name(), "mistake analysis failed: {e}");
            ANALYSIS_FAILURE.to_string()
        }
    }
}

pub fn spawn_paper(
    ai: Arc<dyn ExamAi>,
    request: PaperRequest,
) -> PendingTask<Result<ExamPaper, GatewayError>> {
    PendingTask::spawn("paper", move || {
        request.validate()?;
        tracing::info!(
            gateway = ai.name(),
            subject = request.subject.label(),
            chapters = request.chapters.len(),
            count = request.count,
            "generating paper"
        );
        ai.generate_paper(&request)
    })
}

pub fn spawn_commentary(
    ai: Arc<dyn ExamAi>,
    result: ExamResult,
    paper: ExamPaper,
) -> PendingTask<String> {
    PendingTask::spawn("commentary", move || {
        commentary_or_fallback(ai.as_ref(), &result, &paper)
    })
}

pub fn spawn_analysis(ai: Arc<dyn ExamAi>, summary: String) -> PendingTask<String> {
    PendingTask::spawn("analysis", move || analysis_or_fallback(ai.as_ref(), &summary))
}

/// Used when no API key is available and demo mode is off.
pub struct OfflineGateway;

impl ExamAi for OfflineGateway {
    fn name(&self) -> &str {
        "offline"
    }

    fn generate_paper(&self, _request: &PaperRequest) -> Result<ExamPaper, GatewayError> {
        Err(GatewayError::MissingApiKey)
    }

    fn generate_commentary(
        &self,
        _result: &ExamResult,
        _paper: &ExamPaper,
    ) -> Result<String, GatewayError> {
        Err(GatewayError::Unavailable("offline".to_string()))
    }

    fn analyze_mistakes(&self, _summary: &str) -> Result<String, GatewayError> {
        Err(GatewayError::Unavailable("offline".to_string()))
    }
}
