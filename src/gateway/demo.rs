use chrono::Utc;
use rust_embed::Embed;

use crate::exam::model::{ExamPaper, ExamResult, Subject};
use crate::gateway::paper::parse_paper;
use crate::gateway::prompt::{ALL_CORRECT, mistake_lines};
use crate::gateway::{ExamAi, GatewayError, PaperRequest};

#[derive(Embed)]
#[folder = "assets/samples/"]
struct SampleAssets;

const FALLBACK_SUBJECT: Subject = Subject::Math;

/// Offline stand-in: serves bundled sample papers and writes commentary locally.
pub struct DemoGateway {
    default_minutes: u32,
}

impl DemoGateway {
    pub fn new(default_minutes: u32) -> Self {
        Self { default_minutes }
    }

    fn sample_for(subject: Subject) -> Option<(Subject, String)> {
        [subject, FALLBACK_SUBJECT].into_iter().find_map(|s| {
            let file = SampleAssets::get(&format!("{}.json", s.key()))?;
            let text = std::str::from_utf8(file.data.as_ref()).ok()?.to_string();
            Some((s, text))
        })
    }
}

impl ExamAi for DemoGateway {
    fn name(&self) -> &str {
        "demo"
    }

    fn generate_paper(&self, request: &PaperRequest) -> Result<ExamPaper, GatewayError> {
        request.validate()?;
        let (subject, text) = Self::sample_for(request.subject)
            .ok_or_else(|| GatewayError::Unavailable("no bundled sample papers".to_string()))?;
        let sample_request = PaperRequest {
            subject,
            ..request.clone()
        };
        let paper = parse_paper(
            &text,
            &sample_request,
            self.default_minutes,
            Vec::new(),
            Utc::now(),
        )?;

        let mut questions = paper.questions;
        questions.truncate(request.count);
        Ok(ExamPaper::new(
            paper.id,
            paper.title,
            paper.subject,
            paper.difficulty,
            questions,
            paper.duration,
            paper.sources,
        ))
    }

    fn generate_commentary(
        &self,
        result: &ExamResult,
        paper: &ExamPaper,
    ) -> Result<String, GatewayError> {
        let percent = result.percent();
        let lines = mistake_lines(result, paper);
        let mut text = format!(
            "【离线点评】本次{}考试得分 {}/{}（{percent:.0}%）。\n\n",
            result.subject.label(),
            result.score,
            result.total_points
        );
        if lines.is_empty() {
            text.push_str(ALL_CORRECT);
        } else {
            text.push_str(&format!("共有 {} 道题需要复习：\n", lines.len()));
            text.push_str(&lines.join("\n"));
        }
        text.push_str("\n\n");
        text.push_str(if percent >= 90.0 {
            "基础扎实，可以尝试更高难度的试卷。"
        } else if percent >= 60.0 {
            "整体掌握良好，建议针对错题所在章节做专项练习。"
        } else {
            "建议回到课本梳理基本概念，再通过错题本反复巩固。"
        });
        Ok(text)
    }

    fn analyze_mistakes(&self, summary: &str) -> Result<String, GatewayError> {
        let count = summary.lines().filter(|l| !l.trim().is_empty()).count();
        if count == 0 {
            return Ok(String::new());
        }
        Ok(format!(
            "【离线分析】错题本共 {count} 条记录。\n\
             建议按学科分组，每天挑选 3 到 5 道错题重做，并写出错误原因；\
             同一道题连续两次做对后再降低复习频率。"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::model::Difficulty;
    use crate::gateway::{EMPTY_ANALYSIS, analysis_or_fallback};

    fn request(subject: Subject, count: usize) -> PaperRequest {
        PaperRequest::new(subject, vec!["第一章".to_string()], Difficulty::Medium, count)
    }

    #[test]
    fn test_sample_paper_respects_count() {
        let gateway = DemoGateway::new(45);
        let paper = gateway.generate_paper(&request(Subject::Math, 3)).unwrap();
        assert_eq!(paper.questions.len(), 3);
        assert_eq!(paper.subject, Subject::Math);
        assert_eq!(
            paper.total_points,
            paper.questions.iter().map(|q| q.points).sum::<u32>()
        );
    }

    #[test]
    fn test_unknown_subject_falls_back_to_math_sample() {
        let gateway = DemoGateway::new(45);
        let paper = gateway.generate_paper(&request(Subject::Biology, 10)).unwrap();
        assert_eq!(paper.subject, Subject::Math);
        assert!(!paper.questions.is_empty());
    }

    #[test]
    fn test_request_without_chapters_rejected() {
        let gateway = DemoGateway::new(45);
        let mut req = request(Subject::Math, 5);
        req.chapters.clear();
        assert!(gateway.generate_paper(&req).is_err());
    }

    #[test]
    fn test_empty_mistake_bank_gets_placeholder() {
        assert_eq!(analysis_or_fallback(&DemoGateway::new(45), ""), EMPTY_ANALYSIS);
    }
}
