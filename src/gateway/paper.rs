//! Turning the model's JSON reply into an [`ExamPaper`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::exam::model::{
    Difficulty, ExamPaper, Question, QuestionSource, QuestionType, generate_id,
};
use crate::gateway::{GatewayError, PaperRequest};

pub const MAX_SOURCES: usize = 5;
pub const DEFAULT_SOURCE_TITLE: &str = "教育参考来源";
/// Upper bound on the points of a single question.
pub const MAX_QUESTION_POINTS: u32 = 100;

#[derive(Debug, Deserialize)]
struct RawPaper {
    #[serde(default)]
    title: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    content: String,
    #[serde(default)]
    options: Vec<String>,
    answer: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    points: f64,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    chapter: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebSource>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Web citations from grounding chunks, at most [`MAX_SOURCES`].
pub fn collect_sources(chunks: &[GroundingChunk]) -> Vec<QuestionSource> {
    chunks
        .iter()
        .filter_map(|c| c.web.as_ref())
        .filter_map(|web| {
            let uri = web.uri.as_deref()?.trim();
            if uri.is_empty() {
                return None;
            }
            let title = web
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_SOURCE_TITLE);
            Some(QuestionSource {
                title: title.to_string(),
                uri: uri.to_string(),
            })
        })
        .take(MAX_SOURCES)
        .collect()
}

/// Strip a surrounding markdown code fence, if the model added one.
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn parse_kind(raw: &str) -> Result<QuestionType, GatewayError> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_string()))
        .map_err(|_| GatewayError::Malformed(format!("unknown question type '{raw}'")))
}

fn parse_difficulty(raw: Option<&str>, fallback: Difficulty) -> Difficulty {
    raw.and_then(|d| serde_json::from_value(serde_json::Value::String(d.trim().to_string())).ok())
        .unwrap_or(fallback)
}

fn round_points(points: f64) -> u32 {
    if points.is_finite() && points > 0.0 {
        points.round() as u32
    } else {
        0
    }
}

fn question_points(points: f64, index: usize) -> Result<u32, GatewayError> {
    let rounded = round_points(points);
    if rounded > MAX_QUESTION_POINTS {
        return Err(GatewayError::Malformed(format!(
            "question {} is worth {points} points, more than {MAX_QUESTION_POINTS}",
            index + 1
        )));
    }
    Ok(rounded)
}

/// Parse and validate a paper reply.
///
/// Question ids are prefixed with the new paper id so that questions from
/// different papers never share an id in the mistake bank.
pub fn parse_paper(
    text: &str,
    request: &PaperRequest,
    default_minutes: u32,
    sources: Vec<QuestionSource>,
    now: DateTime<Utc>,
) -> Result<ExamPaper, GatewayError> {
    let raw: RawPaper = serde_json::from_str(strip_fence(text))
        .map_err(|e| GatewayError::Malformed(format!("paper is not valid JSON: {e}")))?;
    if raw.questions.is_empty() {
        return Err(GatewayError::Malformed("paper has no questions".to_string()));
    }

    let paper_id = generate_id("paper", now);
    let default_chapter = request.chapters.first().cloned().unwrap_or_default();
    let mut seen = HashSet::new();
    let mut questions = Vec::with_capacity(raw.questions.len());

    for (i, rq) in raw.questions.into_iter().enumerate() {
        let kind = parse_kind(&rq.kind)?;
        let options: Vec<String> = rq
            .options
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if kind.is_choice() && options.is_empty() {
            return Err(GatewayError::Malformed(format!(
                "question {} is {} but has no options",
                i + 1,
                kind.label()
            )));
        }

        let raw_id = rq
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("q{}", i + 1));
        let mut id = format!("{paper_id}-{raw_id}");
        if !seen.insert(id.clone()) {
            id = format!("{id}-{}", i + 1);
            seen.insert(id.clone());
        }

        let chapter = rq
            .chapter
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| default_chapter.clone());

        questions.push(Question {
            id,
            kind,
            content: rq.content,
            options: if kind.is_choice() { options } else { Vec::new() },
            answer: rq.answer.trim().to_string(),
            explanation: rq.explanation,
            points: question_points(rq.points, i)?,
            subject: request.subject,
            chapter,
            difficulty: parse_difficulty(rq.difficulty.as_deref(), request.difficulty),
        });
    }

    let duration = raw
        .duration
        .map(round_points)
        .filter(|d| *d > 0)
        .unwrap_or(default_minutes);
    let title = if raw.title.trim().is_empty() {
        format!("{} 练习卷", request.subject.label())
    } else {
        raw.title.trim().to_string()
    };

    Ok(ExamPaper::new(
        paper_id,
        title,
        request.subject,
        request.difficulty,
        questions,
        duration,
        sources,
    ))
}
